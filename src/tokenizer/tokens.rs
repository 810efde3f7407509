#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Two-character command marker, e.g. `@d`
    Command,
    /// Opaque text run between markers; never contains a marker or newline
    Text,
    /// Line terminator, emitted separately so the single-line `@i` rule
    /// can be implemented by the reader
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    /// 1-based source line of the token's first character
    pub line: usize,
    /// 0-based source column of the token's first character
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            value,
            line,
            column,
        }
    }

    /// For a `Command` token, the character following the lead character.
    pub fn command_char(&self) -> Option<char> {
        match self.kind {
            TokenKind::Command => self.value.chars().nth(1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Token({:?}, {:?}, {}:{})",
            self.kind, self.value, self.line, self.column
        )
    }
}
