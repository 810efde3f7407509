//! Header option parser
//!
//! Parses the argument tail of a `@d` or `@o` header (the text between the
//! opening marker and `@{`) as a shell-style argument line: options first,
//! positional name tokens last. Joining the positionals with single spaces
//! doubles as name canonicalization.

use crate::model::{canonical_name, IndentRule};

/// Parsed header of a named or output chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHeader {
    pub name: String,
    pub indent_rule: IndentRule,
}

/// Header parse failures, mapped to located [`ErrorKind`]s by the reader.
///
/// [`ErrorKind`]: super::error::ErrorKind
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderError {
    UnknownOption(String),
    DuplicateOption(String),
    MissingName,
}

/// Parse a `@d` header. Recognized options: `-indent` (default) and
/// `-noindent`; they are one knob, so giving either twice or both at once is
/// a duplicate.
pub fn parse_definition_header(text: &str) -> Result<ChunkHeader, HeaderError> {
    let mut indent_rule = IndentRule::Indent;
    let mut indent_seen = false;
    let mut positionals: Vec<&str> = Vec::new();

    for token in text.split_whitespace() {
        if positionals.is_empty() && token.starts_with('-') {
            match token {
                "-indent" | "-noindent" => {
                    if indent_seen {
                        return Err(HeaderError::DuplicateOption("indent".to_string()));
                    }
                    indent_seen = true;
                    indent_rule = if token == "-noindent" {
                        IndentRule::NoIndent
                    } else {
                        IndentRule::Indent
                    };
                }
                _ => return Err(HeaderError::UnknownOption(token.to_string())),
            }
        } else {
            positionals.push(token);
        }
    }

    if positionals.is_empty() {
        return Err(HeaderError::MissingName);
    }
    Ok(ChunkHeader {
        name: canonical_name(&positionals.join(" ")),
        indent_rule,
    })
}

/// Parse a `@o` header. No options are recognized; the positional tail is
/// the output file path.
pub fn parse_output_header(text: &str) -> Result<ChunkHeader, HeaderError> {
    let mut positionals: Vec<&str> = Vec::new();

    for token in text.split_whitespace() {
        if positionals.is_empty() && token.starts_with('-') {
            return Err(HeaderError::UnknownOption(token.to_string()));
        }
        positionals.push(token);
    }

    if positionals.is_empty() {
        return Err(HeaderError::MissingName);
    }
    Ok(ChunkHeader {
        name: canonical_name(&positionals.join(" ")),
        indent_rule: IndentRule::Indent,
    })
}
