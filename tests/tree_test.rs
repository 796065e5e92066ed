//! Structural operations and broadcast delivery of SystemTree

use std::cell::RefCell;
use std::rc::Rc;

use rstest::{fixture, rstest};
use systree::util::testing;
use systree::{Delivery, LinkMode, Passive, Routing, System, SystemId, SystemTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Tick,
    Shutdown,
}

type Journal = Rc<RefCell<Vec<(SystemId, Msg, Option<i32>, Option<&'static str>)>>>;

/// Records every delivery it receives.
struct Listener {
    journal: Journal,
}

impl System<Msg> for Listener {
    fn on_message(&mut self, delivery: &Delivery<'_, Msg>) -> Routing {
        self.journal.borrow_mut().push((
            delivery.target,
            *delivery.kind,
            delivery.lparam::<i32>().copied(),
            delivery.rparam::<&'static str>().copied(),
        ));
        Routing::Forward
    }
}

struct Scene {
    tree: SystemTree<Msg>,
    journal: Journal,
    root: SystemId,
    a: SystemId,
    b: SystemId,
    c: SystemId,
    d: SystemId,
    e: SystemId,
}

impl Scene {
    fn visited(&self) -> Vec<SystemId> {
        self.journal.borrow().iter().map(|v| v.0).collect()
    }

    fn clear(&self) {
        self.journal.borrow_mut().clear();
    }
}

//      root
//      /  \
//     a    b
//    / \    \
//   c   d    e
#[fixture]
fn scene() -> Scene {
    testing::init_test_setup();
    let journal = Journal::default();
    let mut tree = SystemTree::new();
    let spawn = |tree: &mut SystemTree<Msg>| {
        tree.spawn(Listener {
            journal: journal.clone(),
        })
    };
    let root = spawn(&mut tree);
    let a = spawn(&mut tree);
    let b = spawn(&mut tree);
    let c = spawn(&mut tree);
    let d = spawn(&mut tree);
    let e = spawn(&mut tree);
    tree.add_child(root, a);
    tree.add_child(root, b);
    tree.add_child(a, c);
    tree.add_child(a, d);
    tree.add_child(b, e);
    Scene {
        tree,
        journal,
        root,
        a,
        b,
        c,
        d,
        e,
    }
}

// ============================================================
// Structure
// ============================================================

#[rstest]
#[case(0)]
#[case(1)]
#[case(5)]
fn given_children_added_in_order_when_indexing_then_returns_same_order(#[case] n: usize) {
    let mut tree: SystemTree<Msg> = SystemTree::new();
    let parent = tree.spawn(Passive);
    let children: Vec<_> = (0..n).map(|_| tree.spawn(Passive)).collect();
    for &child in &children {
        tree.add_child(parent, child);
    }

    for (i, &child) in children.iter().enumerate() {
        assert_eq!(tree.child(parent, i), Some(child));
    }
    assert_eq!(tree.child(parent, n), None);
    assert_eq!(tree.child(parent, n + 10), None);
}

#[rstest]
fn given_three_children_when_removing_middle_then_sequence_is_first_and_last() {
    let mut tree: SystemTree<Msg> = SystemTree::new();
    let n = tree.spawn(Passive);
    let c1 = tree.spawn(Passive);
    let c2 = tree.spawn(Passive);
    let c3 = tree.spawn(Passive);
    tree.add_child(n, c1);
    tree.add_child(n, c2);
    tree.add_child(n, c3);

    tree.remove_child(n, c2);

    assert_eq!(tree.children(n), &[c1, c3]);
}

#[rstest]
fn given_stranger_when_removing_then_children_unchanged(scene: Scene) {
    let mut scene = scene;
    let before = scene.tree.children(scene.root).to_vec();

    scene.tree.remove_child(scene.root, scene.c);
    let stranger = scene.tree.spawn(Passive);
    scene.tree.remove_child(scene.root, stranger);

    assert_eq!(scene.tree.children(scene.root), before.as_slice());
}

#[rstest]
fn given_no_mutation_when_indexing_repeatedly_then_same_child(scene: Scene) {
    let first = scene.tree.child(scene.a, 1);
    for _ in 0..3 {
        assert_eq!(scene.tree.child(scene.a, 1), first);
    }
    assert_eq!(first, Some(scene.d));
}

// ============================================================
// Broadcast
// ============================================================

#[rstest]
fn given_post_from_root_then_visits_whole_tree_in_preorder(scene: Scene) {
    let mut scene = scene;
    scene
        .tree
        .post_message(scene.root, Msg::Tick, Some(&1_i32), Some(&"two"), false);

    let expected = vec![scene.root, scene.a, scene.c, scene.d, scene.b, scene.e];
    assert_eq!(scene.visited(), expected);
    assert!(scene
        .journal
        .borrow()
        .iter()
        .all(|v| v.1 == Msg::Tick && v.2 == Some(1) && v.3 == Some("two")));
}

#[rstest]
fn given_post_from_any_node_then_visitation_matches_post_from_root(scene: Scene) {
    let mut scene = scene;
    scene.tree.post_message(scene.root, Msg::Tick, None, None, false);
    let from_root = scene.visited();

    for node in [scene.a, scene.b, scene.c, scene.d, scene.e] {
        scene.clear();
        scene.tree.post_message(node, Msg::Tick, None, None, false);
        assert_eq!(scene.visited(), from_root);
    }
}

#[rstest]
fn given_filter_when_posting_then_sender_subtree_is_skipped(scene: Scene) {
    let mut scene = scene;
    scene.tree.post_message(scene.a, Msg::Shutdown, None, None, true);

    assert_eq!(scene.visited(), vec![scene.root, scene.b, scene.e]);
}

#[rstest]
fn given_filter_on_leaf_then_only_that_leaf_is_skipped(scene: Scene) {
    let mut scene = scene;
    scene.tree.post_message(scene.e, Msg::Tick, None, None, true);

    assert_eq!(
        scene.visited(),
        vec![scene.root, scene.a, scene.c, scene.d, scene.b]
    );
}

#[rstest]
fn given_filter_on_root_then_nothing_is_visited(scene: Scene) {
    let mut scene = scene;
    scene.tree.post_message(scene.root, Msg::Tick, None, None, true);

    assert!(scene.visited().is_empty());
}

#[rstest]
fn given_explicit_source_when_posting_then_source_subtree_is_skipped(scene: Scene) {
    let mut scene = scene;
    scene
        .tree
        .post_message_from(scene.c, Some(scene.b), Msg::Tick, None, None);

    assert_eq!(scene.visited(), vec![scene.root, scene.a, scene.c, scene.d]);
}

#[rstest]
fn given_no_source_when_posting_then_every_node_is_visited(scene: Scene) {
    let mut scene = scene;
    scene
        .tree
        .post_message_from(scene.d, None, Msg::Tick, None, None);

    assert_eq!(scene.visited().len(), 6);
}

#[rstest]
fn given_route_on_subtree_then_only_subtree_is_visited(scene: Scene) {
    let mut scene = scene;
    scene.tree.route(scene.a, None, &Msg::Tick, None, None);

    assert_eq!(scene.visited(), vec![scene.a, scene.c, scene.d]);
}

#[rstest]
fn given_passive_root_when_posting_then_listeners_below_still_hear() {
    // R{A{C}, B} with a routing-only root
    let journal = Journal::default();
    let mut tree: SystemTree<Msg> = SystemTree::new();
    let r = tree.spawn(Passive);
    let listener = || Listener {
        journal: journal.clone(),
    };
    let a = tree.spawn(listener());
    let b = tree.spawn(listener());
    let c = tree.spawn(listener());
    tree.add_child(r, a);
    tree.add_child(r, b);
    tree.add_child(a, c);

    tree.post_message(r, Msg::Tick, Some(&1_i32), Some(&"2"), false);

    let visited: Vec<_> = journal.borrow().iter().map(|v| v.0).collect();
    assert_eq!(visited, vec![a, c, b]);
}

// ============================================================
// Link modes
// ============================================================

#[rstest]
fn given_literal_reparenting_when_posting_then_child_is_visited_twice() {
    let journal = Journal::default();
    let mut tree: SystemTree<Msg> = SystemTree::with_mode(LinkMode::Literal);
    let root = tree.spawn(Passive);
    let p1 = tree.spawn(Passive);
    let p2 = tree.spawn(Passive);
    let child = tree.spawn(Listener {
        journal: journal.clone(),
    });
    tree.add_child(root, p1);
    tree.add_child(root, p2);
    tree.add_child(p1, child);
    tree.add_child(p2, child);

    tree.post_message(root, Msg::Tick, None, None, false);

    assert_eq!(journal.borrow().len(), 2);
}

#[rstest]
fn given_strict_reparenting_when_posting_then_child_is_visited_once() {
    let journal = Journal::default();
    let mut tree: SystemTree<Msg> = SystemTree::with_mode(LinkMode::Strict);
    let root = tree.spawn(Passive);
    let p1 = tree.spawn(Passive);
    let p2 = tree.spawn(Passive);
    let child = tree.spawn(Listener {
        journal: journal.clone(),
    });
    tree.add_child(root, p1);
    tree.add_child(root, p2);
    tree.add_child(p1, child);
    tree.add_child(p2, child);

    tree.post_message(root, Msg::Tick, None, None, false);

    assert_eq!(journal.borrow().len(), 1);
    assert_eq!(tree.parent(child), Some(p2));
}

#[rstest]
#[case(LinkMode::Literal, 0)]
#[case(LinkMode::Strict, 1)]
fn given_removed_child_when_it_posts_then_reach_depends_on_mode(
    #[case] mode: LinkMode,
    #[case] expected: usize,
) {
    let journal = Journal::default();
    let mut tree: SystemTree<Msg> = SystemTree::with_mode(mode);
    let root = tree.spawn(Passive);
    let removed = tree.spawn(Listener {
        journal: journal.clone(),
    });
    tree.add_child(root, removed);
    tree.remove_child(root, removed);

    // literal mode: the stale parent link leads to the old root, which no
    // longer lists the node; strict mode: the node is its own root
    tree.post_message(removed, Msg::Tick, None, None, false);

    assert_eq!(journal.borrow().len(), expected);
}
