//! Streamed bulk ingestion.
//!
//! A bulk stream replaces the full contents of the collections named in the
//! request metadata. [`BulkRunner`] sits between the wire stream and the
//! backend, authorizing every item and turning the first failure into a
//! rollback of the whole stream.

mod runner;
mod settings;

pub use runner::*;
pub use settings::*;

#[cfg(test)]
mod settings_test;
