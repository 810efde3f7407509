//! Weaver
//!
//! Walks the web in source order and renders a single woven document through
//! a [`TemplateSet`]. Anonymous prose is emitted verbatim; named and output
//! chunk bodies are wrapped in their begin/end templates; references weave as
//! links via `refto_name_template`, never as expansions; the `@f`/`@m`/`@u`
//! placeholders render the complete global cross-reference lists.
//!
//! Weaving is structured substitution and nothing more: a custom weaver is
//! just a custom template set.

pub mod templates;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::model::{Chunk, ChunkKind, Command, NameError, Web};
use crate::writer::{write_if_changed, WriteOutcome};

pub use templates::{expand_template, TemplateError, TemplateSet};

/// How the "used by" list of a chunk is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceStyle {
    /// Each direct referrer, once
    #[default]
    Simple,
    /// The full up-chain: referrers, their referrers, and so on
    Transitive,
}

#[derive(Debug)]
pub enum WeaveError {
    Template(TemplateError),
    UndefinedReference {
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
    Io(io::Error),
}

impl std::fmt::Display for WeaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeaveError::Template(err) => write!(f, "{}", err),
            WeaveError::UndefinedReference { name, file, line } => write!(
                f,
                "{}:{}: undefined-reference: chunk '{}' is not defined",
                file, line, name
            ),
            WeaveError::AmbiguousName {
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
            WeaveError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for WeaveError {}

impl From<io::Error> for WeaveError {
    fn from(err: io::Error) -> Self {
        WeaveError::Io(err)
    }
}

impl From<TemplateError> for WeaveError {
    fn from(err: TemplateError) -> Self {
        WeaveError::Template(err)
    }
}

pub struct Weaver<'a> {
    web: &'a Web,
    templates: &'a TemplateSet,
    reference_style: ReferenceStyle,
    timestamp: String,
}

impl<'a> Weaver<'a> {
    pub fn new(web: &'a Web, templates: &'a TemplateSet) -> Self {
        Self {
            web,
            templates,
            reference_style: ReferenceStyle::default(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        }
    }

    pub fn with_reference_style(mut self, style: ReferenceStyle) -> Self {
        self.reference_style = style;
        self
    }

    /// Pin the `${date}` value; tests use this for reproducible output.
    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = timestamp.to_string();
        self
    }

    /// Name of the woven document for a given web file: the web's stem with
    /// the template set's extension.
    pub fn woven_file_name(&self, web_name: &str) -> String {
        let stem = Path::new(web_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| web_name.to_string());
        format!("{}.{}", stem, self.templates.extension)
    }

    /// Weave into `out_dir`, through the write-if-changed path.
    pub fn weave_to(
        &self,
        out_dir: &Path,
        web_name: &str,
    ) -> Result<(PathBuf, WriteOutcome), WeaveError> {
        let content = self.weave_to_string(web_name)?;
        let path = out_dir.join(self.woven_file_name(web_name));
        let outcome = write_if_changed(&path, &content)?;
        info!(path = %path.display(), bytes = content.len(), "wove");
        Ok((path, outcome))
    }

    pub fn weave_to_string(&self, web_name: &str) -> Result<String, WeaveError> {
        let mut out = String::new();
        let doc_values = self.doc_values(web_name);
        out.push_str(&expand_template(
            "doc_head_template",
            &self.templates.doc_head_template,
            &doc_values,
        )?);
        for chunk in self.web.chunks() {
            match chunk.kind {
                ChunkKind::Anonymous => {
                    for command in &chunk.commands {
                        if let Command::Text { text, .. } = command {
                            out.push_str(text);
                        }
                    }
                }
                ChunkKind::Named | ChunkKind::Output => self.weave_chunk(chunk, &mut out)?,
            }
        }
        out.push_str(&expand_template(
            "doc_foot_template",
            &self.templates.doc_foot_template,
            &doc_values,
        )?);
        Ok(out)
    }

    fn doc_values(&self, web_name: &str) -> HashMap<&'static str, String> {
        let mut values = HashMap::new();
        values.insert("webName", web_name.to_string());
        values.insert("date", self.timestamp.clone());
        values
    }

    fn weave_chunk(&self, chunk: &Chunk, out: &mut String) -> Result<(), WeaveError> {
        let name = chunk.name.as_deref().unwrap_or("");
        let (begin_name, begin, end_name, end) = match chunk.kind {
            ChunkKind::Named => (
                "cb_template",
                &self.templates.cb_template,
                "ce_template",
                &self.templates.ce_template,
            ),
            _ => (
                "fb_template",
                &self.templates.fb_template,
                "fe_template",
                &self.templates.fe_template,
            ),
        };

        let mut values = HashMap::new();
        values.insert("seq", chunk.seq.to_string());
        values.insert("fullName", name.to_string());
        values.insert("concat", self.concat_marker(chunk));
        values.insert("lineNumber", chunk.location.line.to_string());
        values.insert("references", self.used_by(chunk)?);

        out.push_str(&expand_template(begin_name, begin, &values)?);
        for command in &chunk.commands {
            match command {
                Command::Code { text, .. } | Command::Text { text, .. } => out.push_str(text),
                Command::Reference { name, line, .. } => {
                    out.push_str(&self.weave_reference(name, *line, chunk)?);
                }
                Command::FileXref { .. } => out.push_str(&self.file_xref()?),
                Command::MacroXref { .. } => out.push_str(&self.macro_xref()?),
                Command::UserIdXref { .. } => out.push_str(&self.user_id_xref()?),
            }
        }
        out.push_str(&expand_template(end_name, end, &values)?);
        Ok(())
    }

    /// Which definition of its name this chunk is, rendered only when the
    /// name is defined more than once.
    fn concat_marker(&self, chunk: &Chunk) -> String {
        let name = chunk.name.as_deref().unwrap_or("");
        let indices = match chunk.kind {
            ChunkKind::Named => self.web.named(name),
            _ => self.web.output_chunks(name),
        };
        match indices {
            Some(indices) if indices.len() > 1 => {
                let position = indices
                    .iter()
                    .position(|&idx| self.web.chunks()[idx].seq == chunk.seq)
                    .map(|p| p + 1)
                    .unwrap_or(0);
                format!(" ({} of {})", position, indices.len())
            }
            _ => String::new(),
        }
    }

    /// Render the "used by" list from the chunk's back-links, per the
    /// configured reference style.
    fn used_by(&self, chunk: &Chunk) -> Result<String, WeaveError> {
        let referrers = match self.reference_style {
            ReferenceStyle::Simple => {
                let mut seen = Vec::new();
                for backref in &chunk.referenced_by {
                    if !seen.contains(&backref.seq) {
                        seen.push(backref.seq);
                    }
                }
                seen
            }
            ReferenceStyle::Transitive => self.up_chain(chunk),
        };
        if referrers.is_empty() {
            return Ok(String::new());
        }
        let mut items = Vec::new();
        for seq in referrers {
            if let Some(referrer) = self.web.chunk_by_seq(seq) {
                let mut values = HashMap::new();
                values.insert("seq", seq.to_string());
                values.insert(
                    "fullName",
                    referrer.name.clone().unwrap_or_default(),
                );
                items.push(expand_template(
                    "ref_item_template",
                    &self.templates.ref_item_template,
                    &values,
                )?);
            }
        }
        let mut values = HashMap::new();
        values.insert("refList", items.join("; "));
        Ok(expand_template(
            "ref_template",
            &self.templates.ref_template,
            &values,
        )?)
    }

    /// Walk the referenced-by relation to the top, cycle-safe.
    fn up_chain(&self, chunk: &Chunk) -> Vec<usize> {
        let mut ordered = Vec::new();
        let mut queue: Vec<usize> = chunk.referenced_by.iter().map(|b| b.seq).collect();
        while let Some(seq) = queue.pop() {
            if ordered.contains(&seq) || seq == chunk.seq {
                continue;
            }
            ordered.push(seq);
            if let Some(referrer) = self.web.chunk_by_seq(seq) {
                queue.extend(referrer.referenced_by.iter().map(|b| b.seq));
            }
        }
        ordered
    }

    fn weave_reference(
        &self,
        name: &str,
        line: usize,
        chunk: &Chunk,
    ) -> Result<String, WeaveError> {
        let file = self.web.file_name(chunk.location.file).to_string();
        let full = self.web.full_name_for(name).map_err(|err| match err {
            NameError::Undefined { name } => WeaveError::UndefinedReference {
                name,
                file: file.clone(),
                line,
            },
            NameError::Ambiguous { name, candidates } => WeaveError::AmbiguousName {
                name,
                candidates,
                file: file.clone(),
                line,
            },
        })?;
        let seq = self
            .web
            .named(&full)
            .and_then(|indices| indices.first())
            .map(|&idx| self.web.chunks()[idx].seq)
            .unwrap_or(0);
        let mut values = HashMap::new();
        values.insert("seq", seq.to_string());
        values.insert("fullName", full);
        Ok(expand_template(
            "refto_name_template",
            &self.templates.refto_name_template,
            &values,
        )?)
    }

    fn seq_list(&self, indices: &[usize]) -> Result<String, WeaveError> {
        let mut items = Vec::new();
        for &idx in indices {
            let mut values = HashMap::new();
            values.insert("seq", self.web.chunks()[idx].seq.to_string());
            items.push(expand_template(
                "refto_seq_template",
                &self.templates.refto_seq_template,
                &values,
            )?);
        }
        Ok(items.join(" "))
    }

    fn xref_block(&self, items: Vec<(String, String)>) -> Result<String, WeaveError> {
        let empty = HashMap::new();
        let mut out = expand_template(
            "xref_head_template",
            &self.templates.xref_head_template,
            &empty,
        )?;
        for (full_name, ref_list) in items {
            let mut values = HashMap::new();
            values.insert("fullName", full_name);
            values.insert("refList", ref_list);
            out.push_str(&expand_template(
                "xref_item_template",
                &self.templates.xref_item_template,
                &values,
            )?);
        }
        out.push_str(&expand_template(
            "xref_foot_template",
            &self.templates.xref_foot_template,
            &empty,
        )?);
        Ok(out)
    }

    /// `@f`: every output file with the chunks defining it.
    fn file_xref(&self) -> Result<String, WeaveError> {
        let mut items = Vec::new();
        let mut files: Vec<&String> = self.web.output_files().iter().collect();
        files.sort();
        for file in files {
            if let Some(indices) = self.web.output_chunks(file) {
                items.push((file.clone(), self.seq_list(indices)?));
            }
        }
        self.xref_block(items)
    }

    /// `@m`: every macro name with the chunks defining it.
    fn macro_xref(&self) -> Result<String, WeaveError> {
        let mut items = Vec::new();
        for name in self.web.macro_names() {
            if let Some(indices) = self.web.named(name) {
                items.push((name.to_string(), self.seq_list(indices)?));
            }
        }
        self.xref_block(items)
    }

    /// `@u`: every user identifier, its definition first, then its uses.
    fn user_id_xref(&self) -> Result<String, WeaveError> {
        let mut items = Vec::new();
        for entry in self.web.user_ids() {
            let mut parts = Vec::new();
            let mut values = HashMap::new();
            values.insert("seq", entry.defined_in.to_string());
            parts.push(expand_template(
                "name_def_template",
                &self.templates.name_def_template,
                &values,
            )?);
            for &seq in &entry.used_in {
                let mut values = HashMap::new();
                values.insert("seq", seq.to_string());
                parts.push(expand_template(
                    "name_ref_template",
                    &self.templates.name_ref_template,
                    &values,
                )?);
            }
            items.push((entry.name.clone(), parts.join(" ")));
        }
        self.xref_block(items)
    }
}
