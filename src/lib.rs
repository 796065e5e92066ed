//! Hierarchical subsystem trees with synchronous message broadcast.
//!
//! Systems live in a [`SystemTree`] arena and are linked into parent/child
//! hierarchies. Any system can post a message that is delivered depth-first
//! to every system of its tree, optionally skipping its own subtree.
//!
//! ```
//! use systree::{Passive, SystemTree};
//!
//! let mut tree: SystemTree<&str> = SystemTree::new();
//! let root = tree.spawn(Passive);
//! let audio = tree.spawn(Passive);
//! tree.add_child(root, audio);
//!
//! assert_eq!(tree.child(root, 0), Some(audio));
//! tree.post_message(audio, "pause", None, None, true);
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod util;

pub use domain::{
    Delivery, DomainError, DomainResult, LinkMode, Named, Passive, Routing, System, SystemId,
    SystemTree,
};
