//! Document model
//!
//! In-memory representation of a parsed WEB: a [`Web`] owning an ordered list
//! of [`Chunk`]s, each owning an ordered list of [`Command`]s, plus the name
//! and output-file indexes and the cross-reference tables.
//!
//! The model is built once by the reader, then the post-parse pass resolves
//! references and fills in back-links; afterwards everything is read-only for
//! tangling and weaving.

pub mod chunk;
pub mod command;
pub mod web;

pub use chunk::{BackRef, Chunk, ChunkKind, IndentRule};
pub use command::{Command, Location};
pub use web::{canonical_name, is_abbreviated, NameError, UserIdEntry, Web, WebStats};
