//! Tangler
//!
//! Walks the web following named references and writes one file per `@o`
//! name. A multi-defined name expands as the concatenation of all its
//! definitions in source order. Contextual indentation comes from the
//! [`Emitter`]: a reference found at column `C` indents the expansion's
//! continuation lines by `C`, accumulating additively through nested
//! references; a `-noindent` chunk resets to the margin for the duration of
//! its expansion.
//!
//! Undefined references are caught at parse time but re-checked here; cycles
//! in the macro graph are detected with a visited set on the expansion stack
//! and reported with the full cycle path. Files go through the
//! write-if-changed wrapper so untouched outputs keep their modification
//! time.

pub mod emitter;

use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::model::{Command, IndentRule, NameError, Web};
use crate::writer::{path_is_safe, write_if_changed, WriteOutcome};

use emitter::Emitter;

#[derive(Debug)]
pub enum TangleError {
    UndefinedChunk {
        name: String,
        file: String,
        line: usize,
    },
    AmbiguousName {
        name: String,
        candidates: Vec<String>,
        file: String,
        line: usize,
    },
    /// The macro graph loops; `path` lists the chunk names along the cycle,
    /// ending with the name that closed it.
    Cycle { path: Vec<String> },
    UnsafePath { name: String },
    Io(io::Error),
}

impl std::fmt::Display for TangleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TangleError::UndefinedChunk { name, file, line } => write!(
                f,
                "{}:{}: undefined-reference: chunk '{}' is not defined",
                file, line, name
            ),
            TangleError::AmbiguousName {
                name,
                candidates,
                file,
                line,
            } => write!(
                f,
                "{}:{}: ambiguous-abbreviation: '{}' matches {}",
                file,
                line,
                name,
                candidates.join(", ")
            ),
            TangleError::Cycle { path } => {
                write!(f, "cyclic-reference: {}", path.join(" -> "))
            }
            TangleError::UnsafePath { name } => write!(
                f,
                "unsafe-path: output file '{}' would escape the output directory",
                name
            ),
            TangleError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for TangleError {}

impl From<io::Error> for TangleError {
    fn from(err: io::Error) -> Self {
        TangleError::Io(err)
    }
}

/// Per-run summary, used for the action's one-line report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TangleSummary {
    pub written: usize,
    pub unchanged: usize,
}

pub struct Tangler<'a> {
    web: &'a Web,
    /// `(start, stop)` comment delimiters for source line-number comments;
    /// `None` disables them
    comment_style: Option<(String, String)>,
}

impl<'a> Tangler<'a> {
    pub fn new(web: &'a Web) -> Self {
        Self {
            web,
            comment_style: None,
        }
    }

    pub fn with_comment_style(mut self, start: &str, stop: &str) -> Self {
        self.comment_style = Some((start.to_string(), stop.to_string()));
        self
    }

    /// Tangle every output file into `out_dir`.
    pub fn tangle_to(&self, out_dir: &Path) -> Result<TangleSummary, TangleError> {
        let mut summary = TangleSummary::default();
        for file_name in self.web.output_files() {
            if !path_is_safe(file_name) {
                return Err(TangleError::UnsafePath {
                    name: file_name.clone(),
                });
            }
            let content = self.expand_output(file_name)?;
            let path = out_dir.join(file_name);
            match write_if_changed(&path, &content)? {
                WriteOutcome::Written => {
                    info!(path = %path.display(), bytes = content.len(), "tangled");
                    summary.written += 1;
                }
                WriteOutcome::Unchanged => {
                    debug!(path = %path.display(), "up to date");
                    summary.unchanged += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Expand one output file fully in memory.
    pub fn expand_output(&self, file_name: &str) -> Result<String, TangleError> {
        let indices = self
            .web
            .output_chunks(file_name)
            .ok_or_else(|| TangleError::UndefinedChunk {
                name: file_name.to_string(),
                file: "<unknown>".to_string(),
                line: 0,
            })?;
        let mut emitter = Emitter::new();
        let mut stack: Vec<String> = Vec::new();
        for &idx in indices {
            self.expand_chunk(idx, &mut emitter, &mut stack)?;
        }
        Ok(emitter.finish())
    }

    fn expand_chunk(
        &self,
        idx: usize,
        emitter: &mut Emitter,
        stack: &mut Vec<String>,
    ) -> Result<(), TangleError> {
        let chunk = &self.web.chunks()[idx];
        if let Some((start, stop)) = &self.comment_style {
            let file = self.web.file_name(chunk.location.file);
            emitter.write_text(&format!(
                "{} line {} of \"{}\" {}\n",
                start, chunk.location.line, file, stop
            ));
        }
        for command in &chunk.commands {
            match command {
                Command::Code { text, .. } | Command::Text { text, .. } => {
                    emitter.write_text(text);
                }
                Command::Reference { name, line, .. } => {
                    self.expand_reference(name, *line, chunk.location.file, emitter, stack)?;
                }
                // xref placeholders only mean something to the weaver
                Command::FileXref { .. }
                | Command::MacroXref { .. }
                | Command::UserIdXref { .. } => {}
            }
        }
        Ok(())
    }

    fn expand_reference(
        &self,
        name: &str,
        line: usize,
        file_idx: usize,
        emitter: &mut Emitter,
        stack: &mut Vec<String>,
    ) -> Result<(), TangleError> {
        let file = self.web.file_name(file_idx).to_string();
        let full = self.web.full_name_for(name).map_err(|err| match err {
            NameError::Undefined { name } => TangleError::UndefinedChunk {
                name,
                file: file.clone(),
                line,
            },
            NameError::Ambiguous { name, candidates } => TangleError::AmbiguousName {
                name,
                candidates,
                file: file.clone(),
                line,
            },
        })?;
        if stack.contains(&full) {
            let mut path = stack.clone();
            path.push(full);
            return Err(TangleError::Cycle { path });
        }
        let targets = self
            .web
            .named(&full)
            .ok_or_else(|| TangleError::UndefinedChunk {
                name: full.clone(),
                file,
                line,
            })?;

        // Captured once: every definition of the name expands at the column
        // where the reference sits.
        let ambient = emitter.ambient();
        stack.push(full);
        for &target in targets {
            match self.web.chunks()[target].indent_rule {
                IndentRule::Indent => emitter.push_absolute(ambient),
                IndentRule::NoIndent => emitter.push_noindent(),
            }
            let result = self.expand_chunk(target, emitter, stack);
            emitter.pop_indent();
            result?;
        }
        stack.pop();
        Ok(())
    }
}
