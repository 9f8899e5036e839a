//! Identity and authorization boundary.
//!
//! Policy evaluation lives behind [`Authorizer`]; this module only defines
//! the capability checks the store asks for and a constant implementation.

mod authorizer;
mod hooks;
mod requester;

pub use authorizer::*;
pub use hooks::*;
pub use requester::*;

#[cfg(test)]
mod authorizer_test;
