//! Application layer: blueprints and error context
//!
//! This layer builds domain trees from files and owns file I/O.

pub mod blueprint;
pub mod error;
pub mod error_ext;

pub use blueprint::{Blueprint, BuiltTree, SystemSpec};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
