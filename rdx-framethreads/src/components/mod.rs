//! The building blocks of the scheduler: threads, their scratch storage and
//! the registry that names them.

pub mod properties;
pub mod registry;
pub mod thread;
