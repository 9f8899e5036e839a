//! Wire contract of the resource store.
//!
//! The messages are declared with prost derives so they can travel over any
//! tonic transport without a code generation step. Helper constructors and
//! conversions live under [`exts`].

pub mod bulk;
pub mod error;
pub mod exts;
pub mod resource;
pub mod watch;

pub use bulk::*;
pub use error::*;
pub use resource::*;
pub use watch::*;
