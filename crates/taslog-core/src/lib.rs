//! taslog-core — schema, document model, and streaming codec for TASLog.
//!
//! A TASLog is a compact JSON record of a tool-assisted game session: one
//! root object holding physics frames, each of which holds command frames
//! (player input and movement state) and sparse events (damage, object
//! pushes, collisions, console output).
//!
//! This crate provides:
//! - the canonical key table and schema defaults ([`schema`]),
//! - the in-memory model ([`TasLog`] and friends),
//! - a streaming producer ([`LogWriter`]) that queues sparse events and omits
//!   default-valued fields,
//! - an event-driven consumer ([`LogReader`] / [`LogHandler`]) that rebuilds
//!   the model and rejects anything outside the format,
//! - file helpers and expanded JSON/CBOR export ([`io`]).
//!
//! ```
//! use taslog_core::prelude::*;
//!
//! let mut w = LogWriter::new();
//! w.start_log("1.0", 42, "valve")?;
//! w.start_physics_frame(0.0166, 5, false, "")?;
//! w.start_cmd_frame(0, 16, 0.0)?;
//! w.set_shared_seed(12345)?;
//! w.end_cmd_frame()?;
//! w.push_object_move(ObjectMove::default())?;
//! w.end_physics_frame()?;
//! w.end_log()?;
//!
//! let log = read_str(w.as_str()?)?;
//! assert_eq!(log.command_frame_count(), 1);
//! assert!(log.physics_frames[0].object_moves[0].pull);
//! # Ok::<(), anyhow::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Push-style JSON token stream on top of `serde_json`.
pub mod events;
/// File helpers: wire-format read/write and expanded JSON/CBOR export.
pub mod io;
/// Event-driven reader that rebuilds a [`TasLog`].
pub mod reader;
/// Canonical key table, defaults and the pre/post [`Side`] tag.
pub mod schema;
/// Checked token-level JSON generator.
pub mod sink;
/// In-memory document model.
pub mod types;
/// Streaming writer with sparse-event queues.
pub mod writer;

// ---- Re-exports ----
pub use events::EventHandler;
pub use reader::{read_from, read_slice, read_str, LogHandler, LogReader, ReaderConfig};
pub use schema::Side;
pub use types::*;
pub use writer::LogWriter;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use taslog_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::io::{read_log_file, write_log_file};
    pub use crate::reader::{read_str, LogReader, ReaderConfig};
    pub use crate::types::*;
    pub use crate::writer::LogWriter;
    pub use crate::Side;
}
