//! Depth-first message delivery over a [`SystemTree`].
//!
//! Delivery is synchronous and stack-recursive: every call returns only
//! once the whole subtree has been visited. Handlers get a [`Delivery`]
//! view and cannot touch the tree while a broadcast is in flight.

use std::any::Any;

use tracing::{debug, instrument, trace};

use crate::domain::arena::SystemTree;
use crate::domain::system::{Delivery, Routing, SystemId};

impl<K> SystemTree<K> {
    /// Deliver a message to `node` and, unless its handler stops it, to the
    /// whole subtree below in pre-order.
    ///
    /// If `source` is `node` itself nothing below (and including) `node` is
    /// visited. Children are visited in insertion order.
    pub fn route(
        &mut self,
        node: SystemId,
        source: Option<SystemId>,
        kind: &K,
        lparam: Option<&dyn Any>,
        rparam: Option<&dyn Any>,
    ) {
        let delivery = Delivery {
            target: node,
            source,
            kind,
            lparam,
            rparam,
            depth: 0,
        };
        self.route_delivery(&delivery);
    }

    fn route_delivery(&mut self, delivery: &Delivery<'_, K>) {
        let id = delivery.target;
        if delivery.is_from(id) {
            trace!(?id, "skipping sender subtree");
            return;
        }
        let Some(node) = self.arena.get_mut(id) else {
            return;
        };
        if node.system.on_message(delivery) == Routing::Forward {
            let mut index = 0;
            while let Some(child) = self.child(id, index) {
                self.route_delivery(&delivery.descend(child));
                index += 1;
            }
        }
        if let Some(node) = self.arena.get_mut(id) {
            node.system.after_children(delivery);
        }
    }

    /// Broadcast to the whole tree `from` belongs to.
    ///
    /// With `filter` set, `from` is the declared sender and its own subtree
    /// is skipped; otherwise every node of the tree is visited.
    #[instrument(level = "debug", skip(self, kind, lparam, rparam))]
    pub fn post_message(
        &mut self,
        from: SystemId,
        kind: K,
        lparam: Option<&dyn Any>,
        rparam: Option<&dyn Any>,
        filter: bool,
    ) {
        let source = filter.then_some(from);
        self.post_message_from(from, source, kind, lparam, rparam);
    }

    /// Broadcast to the whole tree `from` belongs to, with an explicit sender.
    #[instrument(level = "debug", skip(self, kind, lparam, rparam))]
    pub fn post_message_from(
        &mut self,
        from: SystemId,
        source: Option<SystemId>,
        kind: K,
        lparam: Option<&dyn Any>,
        rparam: Option<&dyn Any>,
    ) {
        let root = self.root_of(from);
        debug!(?root, "broadcasting from root");
        self.route(root, source, &kind, lparam, rparam);
    }
}
