use serde::Serialize;

/// Source position of a chunk or command, with the owning file identified by
/// its index in [`Web::file_names`](super::Web).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: usize,
    /// 1-based line
    pub line: usize,
    /// 0-based column
    pub column: usize,
}

impl Location {
    pub fn new(file: usize, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}

/// An atom inside a chunk. Commands do not nest; a chunk's command list is
/// flat.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Prose text in an anonymous chunk, escape substitution already applied
    Text { text: String, line: usize },
    /// Literal code inside a `@{ … @}` body, escape substitution already
    /// applied
    Code { text: String, line: usize },
    /// `@<name@>`, expanded at tangle time, woven as a link. The name is
    /// canonical but may still be an abbreviation; resolution goes through
    /// the web's name index. The line and column record where the `@<`
    /// marker sat in the source.
    Reference {
        name: String,
        line: usize,
        column: usize,
    },
    /// `@f`, file cross-reference placeholder, weave only
    FileXref { line: usize },
    /// `@m`, macro cross-reference placeholder, weave only
    MacroXref { line: usize },
    /// `@u`, user-identifier cross-reference placeholder, weave only
    UserIdXref { line: usize },
}

impl Command {
    pub fn line(&self) -> usize {
        match self {
            Command::Text { line, .. }
            | Command::Code { line, .. }
            | Command::Reference { line, .. }
            | Command::FileXref { line }
            | Command::MacroXref { line }
            | Command::UserIdXref { line } => *line,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Command::Reference { .. })
    }
}
