//! Storage backend boundary.
//!
//! The store never assumes a physical medium; everything it needs from
//! persistence is expressed by [`StorageBackend`] and, optionally,
//! [`BulkProcessingBackend`].

mod adaptors;
mod backend;

pub use adaptors::*;
pub use backend::*;
