//! the test_utils folder here will share utils or test components between
//! unit tests
mod bulk;
mod common;
mod fixtures;

pub use bulk::*;
pub use common::*;
pub use fixtures::*;
