//! Synthetic TASLog documents.
//!
//! [`generate_log`] produces a deterministic, plausible-looking session from
//! a [`SynthConfig`]: a player drifting through the world, occasional
//! damage, physics-object pushes, collisions and console output. Optional
//! fields take non-default values often enough that every omission rule of
//! the writer is exercised in both directions.
//!
//! Used by the CLI `simulate` subcommand and the benchmark harness.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

/// Seeded session generator.
pub mod generator;

pub use generator::{generate_log, SynthConfig};
