//! Consistency and distribution core of a versioned, multi-tenant resource
//! store.
//!
//! Writes are authorized, validated into [`core::WriteEvent`]s and handed to
//! a [`storage::StorageBackend`] that assigns strictly increasing resource
//! versions. Committed changes are fanned out to watchers through a
//! [`watch::Broadcaster`] with bounded replay, and whole collections can be
//! replaced atomically from a bulk stream.
//!
//! [`ResourceServer`] ties the pieces together.

pub mod access;
pub mod bulk;
pub mod config;
pub mod constants;
pub mod core;
mod errors;
mod metrics;
pub mod proto;
pub mod search;
pub mod server;
pub mod storage;
pub mod utils;
pub mod watch;

pub use errors::*;
pub use metrics::*;
pub use proto::ErrorResult;
pub use server::ResourceServer;
pub use server::ResourceServerBuilder;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
