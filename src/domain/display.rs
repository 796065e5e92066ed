use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::SystemTree;
use crate::domain::system::SystemId;

pub trait TreeNodeConvert {
    fn to_tree_string(&self, root: SystemId) -> Tree<String>;
}

impl<K> TreeNodeConvert for SystemTree<K> {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, root: SystemId) -> Tree<String> {
        fn build_tree<K>(tree: &SystemTree<K>, node_idx: SystemId, parent_tree: &mut Tree<String>) {
            for &child_idx in tree.children(node_idx) {
                if let Some(child) = tree.system(child_idx) {
                    let mut child_tree = Tree::new(child.label().into_owned());
                    build_tree(tree, child_idx, &mut child_tree);
                    parent_tree.push(child_tree);
                }
            }
        }

        match self.system(root) {
            Some(system) => {
                let mut rendered = Tree::new(system.label().into_owned());
                build_tree(self, root, &mut rendered);
                rendered
            }
            None => Tree::new("Empty tree".to_string()),
        }
    }
}
