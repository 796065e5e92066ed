//! The message handling capability of a tree node.

use std::any::{type_name, Any};
use std::borrow::Cow;
use std::fmt;

use generational_arena::Index;

/// Handle of a system inside a [`SystemTree`](crate::domain::SystemTree).
pub type SystemId = Index;

/// Whether a message keeps travelling into the children of the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Routing {
    #[default]
    Forward,
    Stop,
}

/// One message as seen by one node during a broadcast.
pub struct Delivery<'a, K> {
    /// Node currently handling the message
    pub target: SystemId,
    /// Declared sender; `None` matches no node
    pub source: Option<SystemId>,
    /// Caller-defined message kind
    pub kind: &'a K,
    /// First payload, downcast with `lparam::<T>()`
    pub lparam: Option<&'a dyn Any>,
    /// Second payload, downcast with `rparam::<T>()`
    pub rparam: Option<&'a dyn Any>,
    /// Distance from the node the broadcast started at
    pub depth: usize,
}

impl<'a, K> Delivery<'a, K> {
    /// Left payload downcast to `T`, `None` if absent or of another type.
    pub fn lparam<T: Any>(&self) -> Option<&'a T> {
        self.lparam.and_then(|p| p.downcast_ref::<T>())
    }

    /// Right payload downcast to `T`, `None` if absent or of another type.
    pub fn rparam<T: Any>(&self) -> Option<&'a T> {
        self.rparam.and_then(|p| p.downcast_ref::<T>())
    }

    pub fn is_from(&self, id: SystemId) -> bool {
        self.source == Some(id)
    }

    pub(crate) fn descend(&self, target: SystemId) -> Self {
        Self {
            target,
            depth: self.depth + 1,
            ..*self
        }
    }
}

impl<K> Clone for Delivery<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Delivery<'_, K> {}

impl<K: fmt::Debug> fmt::Debug for Delivery<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("target", &self.target)
            .field("source", &self.source)
            .field("kind", self.kind)
            .field("lparam", &self.lparam.is_some())
            .field("rparam", &self.rparam.is_some())
            .field("depth", &self.depth)
            .finish()
    }
}

/// A node variant taking part in broadcasts.
///
/// Both hooks default to pure forwarding, so an empty impl behaves like a
/// plain routing node. `on_message` runs before the children are visited
/// and decides whether they are; `after_children` runs once the subtree is
/// done (also when it was not entered).
pub trait System<K> {
    fn on_message(&mut self, _delivery: &Delivery<'_, K>) -> Routing {
        Routing::Forward
    }

    fn after_children(&mut self, _delivery: &Delivery<'_, K>) {}

    /// Display name used when rendering a tree.
    fn label(&self) -> Cow<'_, str> {
        let name = type_name::<Self>();
        Cow::Borrowed(name.rsplit("::").next().unwrap_or(name))
    }
}

/// Routing-only node: handles nothing, forwards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passive;

impl<K> System<K> for Passive {}

/// Routing-only node carrying a display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Named(pub String);

impl<K> System<K> for Named {
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }
}
