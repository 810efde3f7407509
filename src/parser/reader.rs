//! WEB Reader
//!
//! Drives the tokenizer through a small command-driven state machine and
//! assembles the document model. Two top-level states, *Prose* and *InBody*,
//! with short-lived sub-states for headers, include lines, reference names,
//! and user-identifier lists.
//!
//! Includes (`@i`) are textual: the reader recurses into the included file
//! with the state machine state intact, so a prose run or even a chunk body
//! may span file boundaries. The include stack is the call stack; every open
//! file is released on every exit path by ownership alone.
//!
//! The reader recovers from most errors (recording them and continuing) so a
//! single run reports everything wrong with a file; the load fails at the
//! end if any error was recorded.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::model::{canonical_name, Chunk, Command, Location, NameError, Web};
use crate::tokenizer::{Splitter, Token, TokenKind};

use super::error::{ErrorKind, ParseError, ParseErrorList};
use super::options::{parse_definition_header, parse_output_header, HeaderError};

/// Hard ceiling on `@i` nesting; a self-including file hits this instead of
/// recursing forever.
const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Command lead character, default `@`
    pub command_char: char,
    /// Command characters whose missing file argument is non-fatal;
    /// contains `i` to tolerate missing includes with a warning
    pub permitted: Vec<char>,
    /// Reject unknown markers in prose instead of passing them through
    pub strict: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            command_char: '@',
            permitted: Vec::new(),
            strict: false,
        }
    }
}

/// Parser states. `Prose` and `Body` are the two top-level states; the rest
/// are intra-command accumulators.
#[derive(Debug)]
enum Mode {
    Prose,
    /// Collecting the filename of `@i`, which runs to end of line
    IncludeName { buf: String, line: usize },
    /// Collecting a `@d`/`@o` header up to `@{`
    Header {
        cmd: char,
        buf: String,
        location: Location,
    },
    Body,
    /// Collecting a reference name between `@<` and `@>`
    RefName {
        buf: String,
        line: usize,
        column: usize,
    },
    /// Collecting identifiers between `@|` and `@}`
    UserIds { buf: String },
}

/// Mutable assembly state, shared across include boundaries.
struct ParseState {
    mode: Mode,
    /// Accumulating prose (in `Prose`) or code (in `Body`)
    text: String,
    text_line: usize,
    text_file: usize,
    /// Chunk under construction while in a body
    current: Option<Chunk>,
}

impl ParseState {
    fn new() -> Self {
        Self {
            mode: Mode::Prose,
            text: String::new(),
            text_line: 1,
            text_file: 0,
            current: None,
        }
    }
}

/// Per-file context for the current token source.
struct SourceCtx {
    file_idx: usize,
    file_name: String,
    dir: PathBuf,
    depth: usize,
}

pub struct WebReader {
    config: ReaderConfig,
    errors: Vec<ParseError>,
}

impl WebReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
        }
    }

    /// Parse `text` into a [`Web`]. `file_name` labels error locations and
    /// anchors relative `@i` paths.
    pub fn read(&mut self, text: &str, file_name: &str) -> Result<Web, ParseErrorList> {
        self.errors.clear();
        let mut web = Web::new();
        let mut state = ParseState::new();

        let file_idx = web.add_file_name(file_name);
        let dir = Path::new(file_name)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let ctx = SourceCtx {
            file_idx,
            file_name: file_name.to_string(),
            dir,
            depth: 0,
        };

        self.process_source(text, &ctx, &mut web, &mut state);
        self.finish(&ctx, &mut web, &mut state);
        self.post_parse(&mut web);

        if self.errors.is_empty() {
            Ok(web)
        } else {
            Err(ParseErrorList(std::mem::take(&mut self.errors)))
        }
    }

    fn error(&mut self, kind: ErrorKind, file: &str, line: usize, column: Option<usize>) {
        let mut err = ParseError::new(kind, file, line);
        if let Some(column) = column {
            err = err.with_column(column);
        }
        self.errors.push(err);
    }

    fn process_source(&mut self, text: &str, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        for token in Splitter::new(text, self.config.command_char) {
            self.dispatch(token, ctx, web, state);
        }
        // A trailing `@i` without a newline: end of input terminates the line.
        if let Mode::IncludeName { .. } = state.mode {
            if let Mode::IncludeName { buf, line } = std::mem::replace(&mut state.mode, Mode::Prose)
            {
                self.include(buf.trim(), line, ctx, web, state);
            }
        }
    }

    fn dispatch(&mut self, token: Token, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        match &mut state.mode {
            Mode::Prose => self.prose_token(token, ctx, web, state),
            Mode::IncludeName { buf, .. } => match token.kind {
                TokenKind::Text => buf.push_str(&token.value),
                TokenKind::Command => {
                    if token.command_char() == Some(self.config.command_char) {
                        buf.push(self.config.command_char);
                    } else {
                        buf.push_str(&token.value);
                    }
                }
                TokenKind::Newline => {
                    if let Mode::IncludeName { buf, line } =
                        std::mem::replace(&mut state.mode, Mode::Prose)
                    {
                        self.include(buf.trim(), line, ctx, web, state);
                    }
                }
            },
            Mode::Header { buf, .. } => match token.kind {
                TokenKind::Text => buf.push_str(&token.value),
                TokenKind::Newline => buf.push(' '),
                TokenKind::Command => self.header_command(token, ctx, web, state),
            },
            Mode::Body => self.body_token(token, ctx, web, state),
            Mode::RefName { buf, .. } => match token.kind {
                TokenKind::Text => buf.push_str(&token.value),
                TokenKind::Newline => buf.push(' '),
                TokenKind::Command => {
                    if token.command_char() == Some('>') {
                        if let Mode::RefName { buf, line, column } =
                            std::mem::replace(&mut state.mode, Mode::Body)
                        {
                            if let Some(chunk) = state.current.as_mut() {
                                chunk.push(Command::Reference {
                                    name: canonical_name(&buf),
                                    line,
                                    column,
                                });
                            }
                        }
                    } else {
                        self.error(
                            ErrorKind::MarkerInReference,
                            &ctx.file_name,
                            token.line,
                            Some(token.column),
                        );
                    }
                }
            },
            Mode::UserIds { buf } => match token.kind {
                TokenKind::Text => buf.push_str(&token.value),
                TokenKind::Newline => buf.push(' '),
                TokenKind::Command => self.user_ids_command(token, ctx, web, state),
            },
        }
    }

    fn prose_token(&mut self, token: Token, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        match token.kind {
            TokenKind::Text => self.push_text(state, &token.value, token.line, ctx.file_idx),
            TokenKind::Newline => self.push_text(state, "\n", token.line, ctx.file_idx),
            TokenKind::Command => {
                let c = token.command_char().unwrap_or('\0');
                if c == self.config.command_char {
                    // `@@` is a literal lead character
                    let literal = c.to_string();
                    self.push_text(state, &literal, token.line, ctx.file_idx);
                } else {
                    match c {
                        'd' | 'o' => {
                            self.finish_prose(web, state);
                            state.mode = Mode::Header {
                                cmd: c,
                                buf: String::new(),
                                location: Location::new(ctx.file_idx, token.line, token.column),
                            };
                        }
                        'i' => {
                            state.mode = Mode::IncludeName {
                                buf: String::new(),
                                line: token.line,
                            };
                        }
                        _ => {
                            if self.config.strict {
                                self.error(
                                    ErrorKind::UnknownCommand(token.value.clone()),
                                    &ctx.file_name,
                                    token.line,
                                    Some(token.column),
                                );
                            } else {
                                // lenient: an unrecognized marker in prose is
                                // just text
                                self.push_text(state, &token.value, token.line, ctx.file_idx);
                            }
                        }
                    }
                }
            }
        }
    }

    fn header_command(&mut self, token: Token, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        let c = token.command_char().unwrap_or('\0');
        if c == self.config.command_char {
            if let Mode::Header { buf, .. } = &mut state.mode {
                buf.push(c);
            }
            return;
        }
        if c == '{' {
            if let Mode::Header { cmd, buf, location } =
                std::mem::replace(&mut state.mode, Mode::Body)
            {
                self.open_body(cmd, &buf, location, ctx, state);
            }
            return;
        }
        // Any other marker interrupts the header.
        if let Mode::Header { location, .. } = state.mode {
            self.error(
                ErrorKind::MalformedHeader(format!(
                    "chunk header interrupted by '{}' before '{}{{'",
                    token.value, self.config.command_char
                )),
                &ctx.file_name,
                location.line,
                Some(location.column),
            );
        }
        state.mode = Mode::Prose;
        match c {
            'd' | 'o' => {
                state.mode = Mode::Header {
                    cmd: c,
                    buf: String::new(),
                    location: Location::new(ctx.file_idx, token.line, token.column),
                };
            }
            'i' => {
                state.mode = Mode::IncludeName {
                    buf: String::new(),
                    line: token.line,
                };
            }
            _ => self.prose_token(token, ctx, web, state),
        }
    }

    fn open_body(
        &mut self,
        cmd: char,
        header: &str,
        location: Location,
        ctx: &SourceCtx,
        state: &mut ParseState,
    ) {
        let parsed = if cmd == 'd' {
            parse_definition_header(header)
        } else {
            parse_output_header(header)
        };
        let chunk = match parsed {
            Ok(parsed_header) => {
                if cmd == 'd' {
                    Chunk::named(parsed_header.name, parsed_header.indent_rule, location)
                } else {
                    Chunk::output(parsed_header.name, location)
                }
            }
            Err(err) => {
                let kind = match err {
                    HeaderError::UnknownOption(option) => ErrorKind::UnknownOption(option),
                    HeaderError::DuplicateOption(option) => ErrorKind::DuplicateOption(option),
                    HeaderError::MissingName => {
                        ErrorKind::MalformedHeader("chunk header has no name".to_string())
                    }
                };
                self.error(kind, &ctx.file_name, location.line, Some(location.column));
                // Recover with a best-effort name so the body still parses.
                let fallback: String = canonical_name(
                    &header
                        .split_whitespace()
                        .filter(|tok| !tok.starts_with('-'))
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                let name = if fallback.is_empty() {
                    "<malformed>".to_string()
                } else {
                    fallback
                };
                if cmd == 'd' {
                    Chunk::named(name, Default::default(), location)
                } else {
                    Chunk::output(name, location)
                }
            }
        };
        debug!(name = ?chunk.name, "opening chunk body");
        state.current = Some(chunk);
    }

    fn body_token(&mut self, token: Token, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        match token.kind {
            TokenKind::Text => self.push_text(state, &token.value, token.line, ctx.file_idx),
            TokenKind::Newline => self.push_text(state, "\n", token.line, ctx.file_idx),
            TokenKind::Command => {
                let c = token.command_char().unwrap_or('\0');
                if c == self.config.command_char {
                    let literal = c.to_string();
                    self.push_text(state, &literal, token.line, ctx.file_idx);
                    return;
                }
                match c {
                    '}' => {
                        self.flush_code(state);
                        self.close_body(web, state);
                    }
                    '<' => {
                        self.flush_code(state);
                        state.mode = Mode::RefName {
                            buf: String::new(),
                            line: token.line,
                            column: token.column,
                        };
                    }
                    'f' => {
                        self.flush_code(state);
                        self.push_command(state, Command::FileXref { line: token.line });
                    }
                    'm' => {
                        self.flush_code(state);
                        self.push_command(state, Command::MacroXref { line: token.line });
                    }
                    'u' => {
                        self.flush_code(state);
                        self.push_command(state, Command::UserIdXref { line: token.line });
                    }
                    '|' => {
                        self.flush_code(state);
                        state.mode = Mode::UserIds { buf: String::new() };
                    }
                    'd' | 'o' | 'i' => {
                        self.error(
                            ErrorKind::UnclosedChunk,
                            &ctx.file_name,
                            token.line,
                            Some(token.column),
                        );
                        // Recover: close the chunk here and reprocess the
                        // command as prose.
                        self.flush_code(state);
                        self.close_body(web, state);
                        self.prose_token(token, ctx, web, state);
                    }
                    _ => self.error(
                        ErrorKind::UnknownCommand(token.value.clone()),
                        &ctx.file_name,
                        token.line,
                        Some(token.column),
                    ),
                }
            }
        }
    }

    fn user_ids_command(&mut self, token: Token, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        let c = token.command_char().unwrap_or('\0');
        if c == self.config.command_char {
            if let Mode::UserIds { buf } = &mut state.mode {
                buf.push(c);
            }
            return;
        }
        match c {
            '}' => {
                if let Mode::UserIds { buf } = std::mem::replace(&mut state.mode, Mode::Body) {
                    if let Some(chunk) = state.current.as_mut() {
                        chunk
                            .user_ids
                            .extend(buf.split_whitespace().map(str::to_string));
                    }
                }
                self.close_body(web, state);
            }
            'd' | 'o' | 'i' => {
                self.error(
                    ErrorKind::UnclosedChunk,
                    &ctx.file_name,
                    token.line,
                    Some(token.column),
                );
                state.mode = Mode::Body;
                self.close_body(web, state);
                self.prose_token(token, ctx, web, state);
            }
            _ => self.error(
                ErrorKind::UnknownCommand(token.value.clone()),
                &ctx.file_name,
                token.line,
                Some(token.column),
            ),
        }
    }

    /// Append to the active text accumulator (prose or code), recording where
    /// the run began.
    fn push_text(&mut self, state: &mut ParseState, text: &str, line: usize, file_idx: usize) {
        if state.text.is_empty() {
            state.text_line = line;
            state.text_file = file_idx;
        }
        state.text.push_str(text);
    }

    /// Turn accumulated prose into an anonymous chunk, unless it is entirely
    /// whitespace. Blank stretches between definitions never materialize.
    fn finish_prose(&mut self, web: &mut Web, state: &mut ParseState) {
        if state.text.trim().is_empty() {
            state.text.clear();
            return;
        }
        let text = std::mem::take(&mut state.text);
        let mut chunk = Chunk::anonymous(Location::new(state.text_file, state.text_line, 0));
        chunk.push(Command::Text {
            text,
            line: state.text_line,
        });
        // Anonymous chunks never fail to index.
        let _ = web.add_chunk(chunk);
    }

    /// Turn accumulated code into a Code command on the current chunk.
    fn flush_code(&mut self, state: &mut ParseState) {
        if state.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut state.text);
        let line = state.text_line;
        self.push_command(state, Command::Code { text, line });
    }

    fn push_command(&mut self, state: &mut ParseState, command: Command) {
        if let Some(chunk) = state.current.as_mut() {
            chunk.push(command);
        }
    }

    /// Close the current body chunk and hand it to the web. Abbreviated
    /// definition names resolve here, against the names defined so far.
    fn close_body(&mut self, web: &mut Web, state: &mut ParseState) {
        state.mode = Mode::Prose;
        if let Some(chunk) = state.current.take() {
            let location = chunk.location;
            if let Err(err) = web.add_chunk(chunk) {
                let file = web.file_name(location.file).to_string();
                self.name_error(err, &file, location.line, Some(location.column));
            }
        }
    }

    fn name_error(&mut self, err: NameError, file: &str, line: usize, column: Option<usize>) {
        let kind = match err {
            NameError::Undefined { name } => ErrorKind::UndefinedReference(name),
            NameError::Ambiguous { name, candidates } => {
                ErrorKind::AmbiguousAbbreviation { name, candidates }
            }
        };
        self.error(kind, file, line, column);
    }

    /// Push the include stack: read the file and splice its token stream in,
    /// with the state machine state intact.
    fn include(&mut self, path_spec: &str, line: usize, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        if path_spec.is_empty() {
            self.error(
                ErrorKind::MalformedHeader("include with no file name".to_string()),
                &ctx.file_name,
                line,
                None,
            );
            return;
        }
        if ctx.depth >= MAX_INCLUDE_DEPTH {
            self.error(
                ErrorKind::IncludeDepth(path_spec.to_string()),
                &ctx.file_name,
                line,
                None,
            );
            return;
        }
        let path = if Path::new(path_spec).is_absolute() {
            PathBuf::from(path_spec)
        } else {
            ctx.dir.join(path_spec)
        };
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!(path = %path.display(), "reading include");
                let file_idx = web.add_file_name(&path.display().to_string());
                let nested = SourceCtx {
                    file_idx,
                    file_name: path.display().to_string(),
                    dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                    depth: ctx.depth + 1,
                };
                self.process_source(&text, &nested, web, state);
            }
            Err(io_err) => {
                if self.config.permitted.contains(&'i') {
                    warn!(
                        path = %path.display(),
                        error = %io_err,
                        "include file missing, continuing"
                    );
                } else {
                    self.error(
                        ErrorKind::MissingInclude(path_spec.to_string()),
                        &ctx.file_name,
                        line,
                        None,
                    );
                }
            }
        }
    }

    /// Root end-of-input: flag anything left open, then flush prose.
    fn finish(&mut self, ctx: &SourceCtx, web: &mut Web, state: &mut ParseState) {
        match state.mode {
            Mode::Prose | Mode::IncludeName { .. } => {}
            Mode::Header { location, .. } => {
                self.error(
                    ErrorKind::MalformedHeader("chunk header not closed at end of input".to_string()),
                    &ctx.file_name,
                    location.line,
                    Some(location.column),
                );
            }
            Mode::Body | Mode::RefName { .. } | Mode::UserIds { .. } => {
                let location = state
                    .current
                    .as_ref()
                    .map(|chunk| chunk.location)
                    .unwrap_or(Location::new(ctx.file_idx, 1, 0));
                self.error(
                    ErrorKind::UnclosedChunk,
                    web.file_name(location.file),
                    location.line,
                    Some(location.column),
                );
                self.flush_code(state);
                self.close_body(web, state);
            }
        }
        state.mode = Mode::Prose;
        self.finish_prose(web, state);
    }

    /// Resolve references, build cross-reference tables, report
    /// unreferenced names.
    fn post_parse(&mut self, web: &mut Web) {
        if let Err(errors) = web.resolve_references() {
            for (location, err) in errors {
                let file = web.file_name(location.file).to_string();
                self.name_error(err, &file, location.line, Some(location.column));
            }
        }
        debug_assert!(web.check_consistency());
        web.build_user_id_table();
        if self.errors.is_empty() {
            for name in web.unreferenced_names() {
                warn!(chunk = name, "chunk is defined but never referenced");
            }
        }
    }
}
