//! Request orchestration on top of a [`StorageBackend`](crate::storage::StorageBackend).
//!
//! ```text
//!   create/update/delete ──> authorize ──> read current ──> EventValidator ──> backend.write_event
//!                                                                                  │
//!   watch <── Subscription <── Broadcaster <── connector <── backend.watch_write_events
//! ```
//!
//! Every unary call answers with a response that embeds its own
//! [`ErrorResult`](crate::proto::ErrorResult); only the streaming watch
//! returns a crate error.

mod builder;
mod resource_server;
mod watch;

pub use builder::*;
pub use resource_server::*;
pub use watch::WatchSender;

#[cfg(test)]
mod watch_test;
