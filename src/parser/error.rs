//! Located parse errors
//!
//! Every error carries the file, line, and a short classification keyword so
//! the CLI can print `file:line: classification: detail` diagnostics. The
//! reader collects all errors it can recover from and reports them together.

/// Classification of a parse or resolve failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Unrecognized `@x` marker (strict mode in prose, always in bodies)
    UnknownCommand(String),
    /// `@o`/`@d`/`@i` or EOF inside a body
    UnclosedChunk,
    /// Header with no name, or interrupted before `@{`
    MalformedHeader(String),
    /// Option not in the recognized set
    UnknownOption(String),
    /// The same option given twice in one header
    DuplicateOption(String),
    /// `@i` target could not be opened and was not permitted to fail
    MissingInclude(String),
    /// Includes nested past the fixed depth limit
    IncludeDepth(String),
    /// Marker between `@<` and `@>`; the command character cannot appear in
    /// a reference name
    MarkerInReference,
    /// Reference to a name with no definition
    UndefinedReference(String),
    /// `...` abbreviation matching more than one full name
    AmbiguousAbbreviation {
        name: String,
        candidates: Vec<String>,
    },
}

impl ErrorKind {
    /// Stable keyword used in diagnostics and exit summaries.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::UnknownCommand(_) => "unknown-command",
            ErrorKind::UnclosedChunk => "unclosed-chunk",
            ErrorKind::MalformedHeader(_) => "malformed-header",
            ErrorKind::UnknownOption(_) => "unknown-option",
            ErrorKind::DuplicateOption(_) => "duplicate-option",
            ErrorKind::MissingInclude(_) => "missing-include",
            ErrorKind::IncludeDepth(_) => "include-depth",
            ErrorKind::MarkerInReference => "marker-in-reference-name",
            ErrorKind::UndefinedReference(_) => "undefined-reference",
            ErrorKind::AmbiguousAbbreviation { .. } => "ambiguous-abbreviation",
        }
    }

    fn detail(&self) -> String {
        match self {
            ErrorKind::UnknownCommand(marker) => format!("unrecognized marker '{}'", marker),
            ErrorKind::UnclosedChunk => "chunk body was not closed".to_string(),
            ErrorKind::MalformedHeader(reason) => reason.clone(),
            ErrorKind::UnknownOption(option) => format!("option '{}' is not recognized", option),
            ErrorKind::DuplicateOption(option) => format!("option '{}' given twice", option),
            ErrorKind::MissingInclude(path) => format!("cannot open include file '{}'", path),
            ErrorKind::IncludeDepth(path) => {
                format!("includes nested too deeply at '{}'", path)
            }
            ErrorKind::MarkerInReference => {
                "command character is not allowed inside a reference name".to_string()
            }
            ErrorKind::UndefinedReference(name) => {
                format!("referenced chunk '{}' is not defined", name)
            }
            ErrorKind::AmbiguousAbbreviation { name, candidates } => format!(
                "abbreviation '{}' matches {}",
                name,
                candidates.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub file: String,
    pub line: usize,
    pub column: Option<usize>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, file: &str, line: usize) -> Self {
        Self {
            kind,
            file: file.to_string(),
            line,
            column: None,
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.column {
            Some(column) => write!(
                f,
                "{}:{}:{}: {}: {}",
                self.file,
                self.line,
                column + 1,
                self.kind.label(),
                self.kind.detail()
            ),
            None => write!(
                f,
                "{}:{}: {}: {}",
                self.file,
                self.line,
                self.kind.label(),
                self.kind.detail()
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Every error found while loading one web, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseErrorList(pub Vec<ParseError>);

impl ParseErrorList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for ParseErrorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, error) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrorList {}
