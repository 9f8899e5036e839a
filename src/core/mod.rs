mod collection;
mod event;
mod object;
mod validator;
mod version;

pub use collection::*;
pub use event::*;
pub use object::*;
pub use validator::*;
pub use version::*;

#[cfg(test)]
mod collection_test;
#[cfg(test)]
mod object_test;
