//! The Web container
//!
//! Owns every chunk in source order and maintains the name and output-file
//! indexes. Cross-chunk references are resolved through the indexes by
//! canonical name, never by direct ownership, so the object graph stays a
//! tree even when the macro graph is cyclic.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;

use super::chunk::{BackRef, Chunk, ChunkKind};
use super::command::{Command, Location};

/// Failure to map a (possibly abbreviated) name to a concrete entry in the
/// name index.
#[derive(Debug, Clone, PartialEq)]
pub enum NameError {
    Undefined {
        name: String,
    },
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
}

impl std::fmt::Display for NameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameError::Undefined { name } => write!(f, "chunk '{}' is not defined", name),
            NameError::Ambiguous { name, candidates } => write!(
                f,
                "abbreviation '{}' is ambiguous: matches {}",
                name,
                candidates.join(", ")
            ),
        }
    }
}

impl std::error::Error for NameError {}

/// One user identifier with its defining chunk and every chunk whose code
/// mentions it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserIdEntry {
    pub name: String,
    /// Sequence number of the chunk that declared the identifier with `@|`
    pub defined_in: usize,
    /// Sequence numbers of chunks whose code text mentions the identifier,
    /// excluding the defining chunk, in source order
    pub used_in: Vec<usize>,
}

/// Counts reported by the Load action; serializable for the CLI's
/// `--stats` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebStats {
    pub chunks: usize,
    pub named_definitions: usize,
    pub distinct_names: usize,
    pub output_files: usize,
    pub user_ids: usize,
}

/// Collapse whitespace runs to single spaces and trim. Two raw names denote
/// the same chunk iff their canonical forms are equal.
pub fn canonical_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a canonical name is written in `...`-abbreviated form.
pub fn is_abbreviated(name: &str) -> bool {
    name.ends_with("...")
}

#[derive(Debug, Default)]
pub struct Web {
    /// All input file names, indexed by [`Location::file`]
    file_names: Vec<String>,
    chunks: Vec<Chunk>,
    named_index: HashMap<String, Vec<usize>>,
    output_index: HashMap<String, Vec<usize>>,
    /// Output file names in first-definition order
    output_order: Vec<String>,
    /// User-identifier table, built by [`Web::build_user_id_table`]
    user_ids: Vec<UserIdEntry>,
}

impl Web {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file_name(&mut self, name: &str) -> usize {
        let idx = self.file_names.len();
        self.file_names.push(name.to_string());
        idx
    }

    pub fn file_name(&self, idx: usize) -> &str {
        self.file_names
            .get(idx)
            .map(|s| s.as_str())
            .unwrap_or("<unknown>")
    }

    /// Add a chunk, assign its sequence number, and index it by kind.
    ///
    /// A named chunk whose name is abbreviated is resolved against the full
    /// names defined so far; the definition then extends the matching entry.
    pub fn add_chunk(&mut self, mut chunk: Chunk) -> Result<usize, NameError> {
        let idx = self.chunks.len();
        chunk.seq = idx + 1;

        match chunk.kind {
            ChunkKind::Anonymous => {}
            ChunkKind::Named => {
                let raw = chunk.name.clone().unwrap_or_default();
                let full = if is_abbreviated(&raw) {
                    let resolved = self.full_name_for(&raw)?;
                    chunk.name = Some(resolved.clone());
                    resolved
                } else {
                    raw
                };
                self.named_index.entry(full).or_default().push(idx);
            }
            ChunkKind::Output => {
                let file = chunk.name.clone().unwrap_or_default();
                let entry = self.output_index.entry(file.clone()).or_default();
                if entry.is_empty() {
                    self.output_order.push(file);
                }
                entry.push(idx);
            }
        }

        self.chunks.push(chunk);
        Ok(idx)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Chunk by 1-based sequence number.
    pub fn chunk_by_seq(&self, seq: usize) -> Option<&Chunk> {
        self.chunks.get(seq.checked_sub(1)?)
    }

    /// Resolve a canonical, possibly abbreviated, name to the full name it
    /// denotes. An exact index hit wins; otherwise a `...` abbreviation
    /// matches the unique full name sharing its prefix.
    pub fn full_name_for(&self, name: &str) -> Result<String, NameError> {
        if self.named_index.contains_key(name) {
            return Ok(name.to_string());
        }
        if let Some(prefix) = name.strip_suffix("...") {
            let mut candidates: Vec<String> = self
                .named_index
                .keys()
                .filter(|full| full.starts_with(prefix))
                .cloned()
                .collect();
            candidates.sort();
            match candidates.len() {
                1 => return Ok(candidates.remove(0)),
                0 => {}
                _ => {
                    return Err(NameError::Ambiguous {
                        name: name.to_string(),
                        candidates,
                    })
                }
            }
        }
        Err(NameError::Undefined {
            name: name.to_string(),
        })
    }

    /// Indices of every definition of a full name, in source order.
    pub fn named(&self, full_name: &str) -> Option<&[usize]> {
        self.named_index.get(full_name).map(|v| v.as_slice())
    }

    /// All full macro names, sorted for stable cross-reference output.
    pub fn macro_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.named_index.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Output file names in first-definition order.
    pub fn output_files(&self) -> &[String] {
        &self.output_order
    }

    pub fn output_chunks(&self, file_name: &str) -> Option<&[usize]> {
        self.output_index.get(file_name).map(|v| v.as_slice())
    }

    pub fn user_ids(&self) -> &[UserIdEntry] {
        &self.user_ids
    }

    /// Resolve every reference and record the back-link on its target.
    ///
    /// Runs once, after parsing and before any tangle or weave. Errors are
    /// collected rather than short-circuited so a single pass reports every
    /// bad reference in the document.
    pub fn resolve_references(&mut self) -> Result<(), Vec<(Location, NameError)>> {
        let mut errors = Vec::new();
        let mut links: Vec<(usize, BackRef)> = Vec::new();

        for chunk in &self.chunks {
            for command in &chunk.commands {
                if let Command::Reference { name, line, column } = command {
                    let location = Location::new(chunk.location.file, *line, *column);
                    match self.full_name_for(name) {
                        Ok(full) => {
                            if let Some(targets) = self.named_index.get(&full) {
                                for &target in targets {
                                    links.push((
                                        target,
                                        BackRef {
                                            seq: chunk.seq,
                                            location,
                                        },
                                    ));
                                }
                            }
                        }
                        Err(err) => errors.push((location, err)),
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        for (target, backref) in links {
            self.chunks[target].referenced_by.push(backref);
        }
        Ok(())
    }

    /// Build the user-identifier table: each identifier declared with `@|`
    /// is paired with every chunk whose code mentions it as a whole word.
    pub fn build_user_id_table(&mut self) {
        let mut entries = Vec::new();
        for chunk in &self.chunks {
            for id in &chunk.user_ids {
                let pattern = format!(r"\b{}\b", regex::escape(id));
                // The identifier comes from source text, escaped; the
                // pattern cannot fail to compile.
                let word_re = Regex::new(&pattern).expect("invalid identifier pattern");
                let used_in: Vec<usize> = self
                    .chunks
                    .iter()
                    .filter(|other| {
                        other.seq != chunk.seq
                            && other.has_body()
                            && word_re.is_match(&other.code_text())
                    })
                    .map(|other| other.seq)
                    .collect();
                entries.push(UserIdEntry {
                    name: id.clone(),
                    defined_in: chunk.seq,
                    used_in,
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        self.user_ids = entries;
    }

    /// Named chunks that are never expanded by any reference. Reported at
    /// warning level after loading.
    pub fn unreferenced_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .named_index
            .iter()
            .filter(|(_, indices)| {
                indices
                    .iter()
                    .all(|&idx| self.chunks[idx].referenced_by.is_empty())
            })
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort();
        names
    }

    /// Internal consistency: sequence numbers are contiguous from 1 and each
    /// output file owns at least one chunk.
    pub fn check_consistency(&self) -> bool {
        self.chunks
            .iter()
            .enumerate()
            .all(|(idx, chunk)| chunk.seq == idx + 1)
            && self.output_index.values().all(|v| !v.is_empty())
    }

    pub fn stats(&self) -> WebStats {
        WebStats {
            chunks: self.chunks.len(),
            named_definitions: self.named_index.values().map(|v| v.len()).sum(),
            distinct_names: self.named_index.len(),
            output_files: self.output_index.len(),
            user_ids: self.user_ids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::chunk::IndentRule;

    fn loc() -> Location {
        Location::new(0, 1, 0)
    }

    fn named(web: &mut Web, name: &str) -> usize {
        web.add_chunk(Chunk::named(
            canonical_name(name),
            IndentRule::default(),
            loc(),
        ))
        .unwrap()
    }

    #[test]
    fn canonical_names_collapse_whitespace() {
        assert_eq!(canonical_name("  foo    bar "), "foo bar");
        assert_eq!(canonical_name("foo bar"), "foo bar");
        assert_eq!(canonical_name("\tfoo\t bar\n"), "foo bar");
    }

    #[test]
    fn same_canonical_name_is_same_chunk() {
        let mut web = Web::new();
        named(&mut web, "foo bar");
        named(&mut web, "  foo    bar ");
        assert_eq!(web.named("foo bar").unwrap().len(), 2);
        assert_eq!(web.macro_names(), vec!["foo bar"]);
    }

    #[test]
    fn sequence_numbers_are_contiguous_from_one() {
        let mut web = Web::new();
        web.add_chunk(Chunk::anonymous(loc())).unwrap();
        named(&mut web, "a");
        web.add_chunk(Chunk::output("out.txt".to_string(), loc()))
            .unwrap();
        assert_eq!(
            web.chunks().iter().map(|c| c.seq).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(web.check_consistency());
    }

    #[test]
    fn abbreviation_resolves_to_unique_full_name() {
        let mut web = Web::new();
        named(&mut web, "long chunk name");
        assert_eq!(
            web.full_name_for("long chunk...").unwrap(),
            "long chunk name"
        );
    }

    #[test]
    fn ambiguous_abbreviation_is_an_error() {
        let mut web = Web::new();
        named(&mut web, "long chunk name");
        named(&mut web, "long chunk other");
        match web.full_name_for("long chunk...") {
            Err(NameError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates, vec!["long chunk name", "long chunk other"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn unknown_name_is_undefined() {
        let web = Web::new();
        assert!(matches!(
            web.full_name_for("nope"),
            Err(NameError::Undefined { .. })
        ));
    }

    #[test]
    fn abbreviated_first_definition_is_an_error() {
        let mut web = Web::new();
        let result = web.add_chunk(Chunk::named(
            "never defined...".to_string(),
            IndentRule::default(),
            loc(),
        ));
        assert!(matches!(result, Err(NameError::Undefined { .. })));
    }

    #[test]
    fn abbreviated_definition_extends_existing_entry() {
        let mut web = Web::new();
        named(&mut web, "weave overheads and main");
        named(&mut web, "weave overheads...");
        assert_eq!(web.named("weave overheads and main").unwrap().len(), 2);
    }

    #[test]
    fn output_files_keep_first_definition_order() {
        let mut web = Web::new();
        web.add_chunk(Chunk::output("b.txt".to_string(), loc()))
            .unwrap();
        web.add_chunk(Chunk::output("a.txt".to_string(), loc()))
            .unwrap();
        web.add_chunk(Chunk::output("b.txt".to_string(), loc()))
            .unwrap();
        assert_eq!(web.output_files(), ["b.txt", "a.txt"]);
        assert_eq!(web.output_chunks("b.txt").unwrap().len(), 2);
    }

    #[test]
    fn resolve_references_records_backlinks() {
        let mut web = Web::new();
        web.add_file_name("test.w");
        let target = named(&mut web, "body");
        let mut out = Chunk::output("out.txt".to_string(), loc());
        out.push(Command::Reference {
            name: "body".to_string(),
            line: 3,
            column: 4,
        });
        web.add_chunk(out).unwrap();

        web.resolve_references().unwrap();
        let backrefs = &web.chunks()[target].referenced_by;
        assert_eq!(backrefs.len(), 1);
        assert_eq!(backrefs[0].seq, 2);
    }

    #[test]
    fn resolve_references_collects_all_errors() {
        let mut web = Web::new();
        web.add_file_name("test.w");
        let mut out = Chunk::output("out.txt".to_string(), loc());
        out.push(Command::Reference {
            name: "ghost".to_string(),
            line: 1,
            column: 0,
        });
        out.push(Command::Reference {
            name: "phantom".to_string(),
            line: 2,
            column: 0,
        });
        web.add_chunk(out).unwrap();

        let errors = web.resolve_references().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn user_id_table_finds_word_uses() {
        let mut web = Web::new();
        let mut def = Chunk::named("defs".to_string(), IndentRule::default(), loc());
        def.push(Command::Code {
            text: "int count = 0;".to_string(),
            line: 1,
        });
        def.user_ids.push("count".to_string());
        web.add_chunk(def).unwrap();

        let mut user = Chunk::output("main.c".to_string(), loc());
        user.push(Command::Code {
            text: "count += 1; recount();".to_string(),
            line: 5,
        });
        web.add_chunk(user).unwrap();

        web.build_user_id_table();
        let entry = &web.user_ids()[0];
        assert_eq!(entry.name, "count");
        assert_eq!(entry.defined_in, 1);
        // whole-word match only: `recount` does not count
        assert_eq!(entry.used_in, vec![2]);
    }

    #[test]
    fn unreferenced_names_are_reported() {
        let mut web = Web::new();
        named(&mut web, "used");
        named(&mut web, "orphan");
        let mut out = Chunk::output("out.txt".to_string(), loc());
        out.push(Command::Reference {
            name: "used".to_string(),
            line: 1,
            column: 0,
        });
        web.add_chunk(out).unwrap();
        web.resolve_references().unwrap();
        assert_eq!(web.unreferenced_names(), vec!["orphan"]);
    }
}
