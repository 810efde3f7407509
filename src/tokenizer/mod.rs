//! WEB Tokenizer
//!
//! Lexical analysis for WEB sources. The tokenizer is deliberately small: it
//! knows nothing about chunks, headers, or includes. It only breaks raw input
//! into an ordered stream of three token kinds:
//!
//! - **Command**: exactly two characters, the command lead character (default
//!   `@`) followed by any single non-newline character, e.g. `@d` or `@{`.
//! - **Newline**: a single `\n`, kept distinct from text so the reader can
//!   implement line-terminated commands such as `@i`.
//! - **Text**: everything between markers and newlines, possibly empty runs
//!   are skipped.
//!
//! The escape marker `@@` is *not* rewritten here; it reaches the reader as an
//! ordinary `Command` token and the reader substitutes a literal lead
//! character into whatever text it is accumulating. Likewise unrecognized
//! markers pass through: accepting or rejecting them is a reader policy
//! (lenient in prose, strict inside chunk bodies).
//!
//! ## Usage
//!
//! ```rust
//! use weft::tokenizer::{split, TokenKind};
//!
//! let tokens: Vec<_> = split("prose @d name @{code@}").collect();
//! assert_eq!(tokens[1].kind, TokenKind::Command);
//! assert_eq!(tokens[1].value, "@d");
//! ```

pub mod splitter;
pub mod tokens;

pub use splitter::Splitter;
pub use tokens::{Token, TokenKind};

/// Split WEB text into tokens using the default `@` command character.
pub fn split(text: &str) -> Splitter<'_> {
    Splitter::new(text, '@')
}
