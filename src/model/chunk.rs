use super::command::{Command, Location};

/// The three chunk variants of a WEB document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Prose between definitions; woven verbatim, never tangled
    Anonymous,
    /// `@d name ...`, contributing to a named macro
    Named,
    /// `@o filename ...`, contributing to a tangled output file
    Output,
}

/// Indentation behavior of a chunk when it is expanded by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentRule {
    /// Honor the ambient indentation of the reference site (default)
    #[default]
    Indent,
    /// Emit the body at column 0 regardless of the reference site
    NoIndent,
}

/// A reference site recorded on the *target* chunk: which chunk expanded it,
/// and where.
#[derive(Debug, Clone, PartialEq)]
pub struct BackRef {
    /// Sequence number of the referring chunk
    pub seq: usize,
    pub location: Location,
}

/// A contiguous slice of the WEB document.
///
/// Chunks are created by the reader and immutable afterwards, except for the
/// referenced-by back-links which the post-parse pass fills in exactly once.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Canonical name (`@d`) or output file name (`@o`); `None` for prose
    pub name: Option<String>,
    pub indent_rule: IndentRule,
    /// 1-based sequence number, assigned by the web when the chunk is added
    pub seq: usize,
    /// Location of the opening command
    pub location: Location,
    pub commands: Vec<Command>,
    /// Identifiers declared with `@|`, in declaration order
    pub user_ids: Vec<String>,
    /// Sites where this chunk is expanded, populated post-parse
    pub referenced_by: Vec<BackRef>,
}

impl Chunk {
    pub fn anonymous(location: Location) -> Self {
        Self {
            kind: ChunkKind::Anonymous,
            name: None,
            indent_rule: IndentRule::default(),
            seq: 0,
            location,
            commands: Vec::new(),
            user_ids: Vec::new(),
            referenced_by: Vec::new(),
        }
    }

    pub fn named(name: String, indent_rule: IndentRule, location: Location) -> Self {
        Self {
            kind: ChunkKind::Named,
            name: Some(name),
            indent_rule,
            seq: 0,
            location,
            commands: Vec::new(),
            user_ids: Vec::new(),
            referenced_by: Vec::new(),
        }
    }

    pub fn output(file_name: String, location: Location) -> Self {
        Self {
            kind: ChunkKind::Output,
            name: Some(file_name),
            indent_rule: IndentRule::default(),
            seq: 0,
            location,
            commands: Vec::new(),
            user_ids: Vec::new(),
            referenced_by: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// The chunk's code text, concatenated. Used for the user-identifier
    /// cross-reference search.
    pub fn code_text(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            if let Command::Code { text, .. } = command {
                out.push_str(text);
            }
        }
        out
    }

    pub fn has_body(&self) -> bool {
        matches!(self.kind, ChunkKind::Named | ChunkKind::Output)
    }
}
