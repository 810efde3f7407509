//! WEFT, a literate programming tool
//!
//! A WEB source file interleaves prose and code. From one web, weft produces
//! two artifacts:
//!
//! - **tangled** source files: compilable code assembled by expanding named
//!   chunk references in dependency order, with contextual indentation;
//! - a **woven** document: the prose with code blocks and cross references,
//!   rendered through a pluggable template set (RST, HTML, and Markdown sets
//!   ship builtin).
//!
//! ## Pipeline
//!
//! Processing is a straight line through the modules:
//!
//! 1. [`tokenizer`] splits raw input into `@x` markers, newlines, and text
//!    runs.
//! 2. [`parser`] drives a Prose/InBody state machine over the tokens,
//!    handles `@i` includes, and builds the document model.
//! 3. [`model`] holds the result: a [`Web`](model::Web) of chunks and
//!    commands plus the name indexes and cross-reference tables.
//! 4. [`tangle`] expands references into output files.
//! 5. [`weave`] renders the woven document.
//!
//! [`actions`] composes these into Load, Tangle, and Weave actions behind a
//! shared options record; the `weft` binary is a thin CLI over them.
//!
//! ## Usage
//!
//! ```rust
//! use weft::parser;
//! use weft::tangle::Tangler;
//!
//! let web = parser::parse("@o hello.txt @{hello@}", "doc.w")?;
//! let content = Tangler::new(&web).expand_output("hello.txt")?;
//! assert_eq!(content, "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod actions;
pub mod model;
pub mod parser;
pub mod tangle;
pub mod tokenizer;
pub mod weave;
pub mod writer;

pub use actions::{ActionError, Options};
pub use model::{Chunk, ChunkKind, Command, IndentRule, Web};
pub use parser::{ParseError, ParseErrorList, ReaderConfig, WebReader};
pub use tangle::{TangleError, Tangler};
pub use weave::{ReferenceStyle, TemplateSet, WeaveError, Weaver};
