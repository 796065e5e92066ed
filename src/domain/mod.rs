//! Domain layer: the system tree and its message delivery
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod display;
pub mod error;
pub mod router;
pub mod system;

pub use arena::{LinkMode, SubtreeIter, SystemNode, SystemTree};
pub use display::TreeNodeConvert;
pub use error::{DomainError, DomainResult};
pub use system::{Delivery, Named, Passive, Routing, System, SystemId};
