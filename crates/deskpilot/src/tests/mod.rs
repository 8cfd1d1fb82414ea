mod search_tests;

use crate::control_type::ControlType;
use crate::platforms::memory::{MemoryNode, MemoryTree};

/// A flat tree: `count` buttons named `b0..` directly under the root
pub(crate) fn flat_tree(count: usize) -> MemoryTree {
    let tree = MemoryTree::new(MemoryNode::new(ControlType::Pane, "root"));
    for i in 0..count {
        tree.add_child(
            MemoryTree::ROOT,
            MemoryNode::new(ControlType::Button, format!("b{i}")),
        );
    }
    tree
}
