//! WEB Parser
//!
//! Consumes the tokenizer's stream and builds the document model. Three
//! pieces:
//!
//! - [`options`]: shell-style parsing of `@d`/`@o` header tails
//! - [`reader`]: the Prose/InBody state machine and the `@i` include stack
//! - [`error`]: located, classified parse errors, collected per run
//!
//! The reader owns the post-parse pass as well: reference resolution with
//! back-link recording, cross-reference table construction, and
//! unreferenced-chunk warnings.

pub mod error;
pub mod options;
pub mod reader;

pub use error::{ErrorKind, ParseError, ParseErrorList};
pub use options::{parse_definition_header, parse_output_header, ChunkHeader, HeaderError};
pub use reader::{ReaderConfig, WebReader};

use crate::model::Web;

/// Parse WEB text with default configuration. The main entry point for
/// callers that do not need include permits or a custom command character.
pub fn parse(text: &str, file_name: &str) -> Result<Web, ParseErrorList> {
    WebReader::new(ReaderConfig::default()).read(text, file_name)
}
