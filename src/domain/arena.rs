use std::fmt;

use generational_arena::Arena;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::system::{System, SystemId};

/// How `add_child`/`remove_child` treat links the caller left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Links are rewritten exactly as requested: adopting a child keeps it in
    /// its previous parent's list, removing a child keeps its parent link.
    #[default]
    Literal,
    /// Adopting detaches the child from its previous parent and refuses
    /// cycles; removing clears the child's parent link.
    Strict,
}

/// Tree node in the arena-based system hierarchy.
pub struct SystemNode<K> {
    /// Message handler of this node
    pub system: Box<dyn System<K>>,
    /// Node whose `add_child` adopted this one, None for roots
    pub parent: Option<SystemId>,
    /// Children in insertion order
    pub children: Vec<SystemId>,
}

impl<K> fmt::Debug for SystemNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemNode")
            .field("system", &self.system.label())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

/// Arena owning every system of one or more trees.
///
/// Nodes live until `despawn`; the tree structure only records membership.
/// Handles of despawned nodes are never reused thanks to arena generations,
/// so stale handles simply resolve to nothing.
#[derive(Debug)]
pub struct SystemTree<K> {
    pub(crate) arena: Arena<SystemNode<K>>,
    mode: LinkMode,
}

impl<K> Default for SystemTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> SystemTree<K> {
    pub fn new() -> Self {
        Self::with_mode(LinkMode::default())
    }

    pub fn with_mode(mode: LinkMode) -> Self {
        Self {
            arena: Arena::new(),
            mode,
        }
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Store a new detached system (no parent, no children).
    #[instrument(level = "trace", skip_all)]
    pub fn spawn(&mut self, system: impl System<K> + 'static) -> SystemId {
        self.spawn_boxed(Box::new(system))
    }

    pub fn spawn_boxed(&mut self, system: Box<dyn System<K>>) -> SystemId {
        self.arena.insert(SystemNode {
            system,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Drop a system from the arena and hand its handler back.
    ///
    /// The node is unlinked from its recorded parent and its children become
    /// roots. Other lists still naming it (literal mode multi-parenting) keep
    /// a stale handle that traversal skips.
    #[instrument(level = "trace", skip(self))]
    pub fn despawn(&mut self, id: SystemId) -> Option<Box<dyn System<K>>> {
        let node = self.arena.remove(id)?;
        if let Some(parent) = node.parent.and_then(|p| self.arena.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        for child in node.children {
            if let Some(child) = self.arena.get_mut(child) {
                if child.parent == Some(id) {
                    child.parent = None;
                }
            }
        }
        Some(node.system)
    }

    pub fn contains(&self, id: SystemId) -> bool {
        self.arena.contains(id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get_node(&self, id: SystemId) -> Option<&SystemNode<K>> {
        self.arena.get(id)
    }

    pub fn system(&self, id: SystemId) -> Option<&dyn System<K>> {
        self.arena.get(id).map(|n| n.system.as_ref())
    }

    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut (dyn System<K> + 'static)> {
        self.arena.get_mut(id).map(|n| n.system.as_mut())
    }

    /// Append `child` to the end of `parent`'s children and point it at `parent`.
    ///
    /// Never fails: unknown handles are ignored. In strict mode the child is
    /// first detached from any previous parent, and links that would create
    /// a cycle are refused.
    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: SystemId, child: SystemId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        match self.mode {
            LinkMode::Literal => {
                debug_assert!(
                    !self.is_ancestor_or_self(child, parent),
                    "add_child would make {child:?} its own ancestor"
                );
            }
            LinkMode::Strict => {
                if self.is_ancestor_or_self(child, parent) {
                    warn!(?parent, ?child, "refusing link that would create a cycle");
                    return;
                }
                self.detach(child);
            }
        }
        self.link(parent, child);
    }

    /// Checked `add_child`: the child must be a detached root and must not
    /// be an ancestor of `parent`.
    #[instrument(level = "trace", skip(self))]
    pub fn try_add_child(&mut self, parent: SystemId, child: SystemId) -> DomainResult<()> {
        if !self.contains(parent) {
            return Err(DomainError::UnknownSystem(parent));
        }
        let current = self
            .arena
            .get(child)
            .ok_or(DomainError::UnknownSystem(child))?
            .parent;
        if parent == child {
            return Err(DomainError::SelfParent(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(DomainError::CycleDetected { parent, child });
        }
        if let Some(existing) = current {
            return Err(DomainError::AlreadyParented {
                child,
                parent: existing,
            });
        }
        self.link(parent, child);
        Ok(())
    }

    fn link(&mut self, parent: SystemId, child: SystemId) {
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.arena.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    fn detach(&mut self, child: SystemId) {
        let Some(old) = self.arena.get_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.arena.get_mut(old) {
            node.children.retain(|&c| c != child);
        }
    }

    /// Unlink the first occurrence of `child` from `parent`'s children.
    ///
    /// A child that is not listed is a silent no-op. Only strict mode clears
    /// the removed child's parent link.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_child(&mut self, parent: SystemId, child: SystemId) {
        let Some(node) = self.arena.get_mut(parent) else {
            return;
        };
        let Some(pos) = node.children.iter().position(|&c| c == child) else {
            return;
        };
        node.children.remove(pos);

        if self.mode == LinkMode::Strict {
            if let Some(node) = self.arena.get_mut(child) {
                if node.parent == Some(parent) {
                    node.parent = None;
                }
            }
        }
    }

    /// Child at `index` in insertion order.
    pub fn child(&self, parent: SystemId, index: usize) -> Option<SystemId> {
        self.arena.get(parent)?.children.get(index).copied()
    }

    pub fn children(&self, parent: SystemId) -> &[SystemId] {
        self.arena
            .get(parent)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn child_count(&self, parent: SystemId) -> usize {
        self.children(parent).len()
    }

    pub fn parent(&self, id: SystemId) -> Option<SystemId> {
        self.arena.get(id)?.parent
    }

    /// Follow parent links up to the topmost live node.
    ///
    /// A parent link pointing at a despawned node ends the walk there.
    #[instrument(level = "trace", skip(self))]
    pub fn root_of(&self, id: SystemId) -> SystemId {
        let mut current = id;
        while let Some(parent) = self.parent(current).filter(|&p| self.contains(p)) {
            current = parent;
        }
        current
    }

    /// True if `ancestor` is reached by walking parent links up from `id`.
    pub fn is_ancestor(&self, ancestor: SystemId, id: SystemId) -> bool {
        let mut current = self.parent(id);
        let mut steps = 0;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            // a parent chain longer than the arena means the links already loop
            steps += 1;
            if steps > self.arena.len() {
                return false;
            }
            current = self.parent(node);
        }
        false
    }

    fn is_ancestor_or_self(&self, ancestor: SystemId, id: SystemId) -> bool {
        ancestor == id || self.is_ancestor(ancestor, id)
    }

    /// Number of levels in the subtree below and including `id`.
    #[instrument(level = "debug", skip(self))]
    pub fn height(&self, id: SystemId) -> usize {
        match self.arena.get(id) {
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|&child| self.height(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Pre-order walk of the subtree at `id`, yielding each node with its
    /// depth relative to `id`.
    pub fn iter_subtree(&self, id: SystemId) -> SubtreeIter<'_, K> {
        SubtreeIter::new(self, id)
    }
}

pub struct SubtreeIter<'a, K> {
    tree: &'a SystemTree<K>,
    stack: Vec<(SystemId, usize)>,
}

impl<'a, K> SubtreeIter<'a, K> {
    fn new(tree: &'a SystemTree<K>, start: SystemId) -> Self {
        let mut stack = Vec::new();
        if tree.contains(start) {
            stack.push((start, 0));
        }
        Self { tree, stack }
    }
}

impl<K> Iterator for SubtreeIter<'_, K> {
    type Item = (SystemId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, depth)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push((child, depth + 1));
                }
                return Some((current, depth));
            }
        }
        None
    }
}
