//! Watch fan-out.
//!
//! ```text
//! backend change stream -> connector -> input channel
//!                                          |
//!                             Broadcaster actor (owns subscribers)
//!                               |                      |
//!                    ReplayCache actor        try_send per subscriber
//! ```
//!
//! Both actors own their state exclusively and are driven by channel
//! messages only. A subscriber that can not keep up is dropped instead of
//! slowing down everybody else.

mod broadcaster;
mod replay_cache;

pub use broadcaster::*;
pub use replay_cache::*;
