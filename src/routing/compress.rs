//! Static-chain compression.
//!
//! A static node with no handler, no param child, no catch-all child and
//! exactly one static child absorbs that child: labels are joined with `/`
//! and the child's children and handler move up. The root never absorbs.
//!
//! The matcher commits to a static child as soon as its first segment
//! matches, so a merged label fails in exactly the places the unmerged chain
//! of nodes would have failed.

use crate::routing::tree::{NodeId, NodeKind, RouteTree};

/// Compress `tree` in place. Returns the number of merges performed.
pub fn compress(tree: &mut RouteTree) -> usize {
    let mut merges = 0;
    let mut stack = vec![NodeId::ROOT];

    while let Some(id) = stack.pop() {
        if id != NodeId::ROOT {
            while let Some(child) = mergeable_child(tree, id) {
                absorb(tree, id, child);
                merges += 1;
            }
        }

        let node = tree.node(id);
        stack.extend(node.statics.iter().copied());
        stack.extend(node.param);
        stack.extend(node.catch_all);
    }

    if merges > 0 {
        tree.compact();
    }
    tracing::debug!(merges, nodes = tree.node_count(), "Route tree compressed");
    merges
}

fn mergeable_child(tree: &RouteTree, id: NodeId) -> Option<NodeId> {
    let node = tree.node(id);
    let eligible = matches!(node.kind, NodeKind::Static { .. })
        && node.leaf.is_none()
        && node.param.is_none()
        && node.catch_all.is_none()
        && node.statics.len() == 1;
    eligible.then(|| node.statics[0])
}

fn absorb(tree: &mut RouteTree, id: NodeId, child: NodeId) {
    let child = std::mem::replace(
        &mut tree.nodes[child.index()],
        crate::routing::tree::Node::detached(),
    );
    let node = &mut tree.nodes[id.index()];

    if let (NodeKind::Static { label }, NodeKind::Static { label: tail }) =
        (&mut node.kind, &child.kind)
    {
        label.push('/');
        label.push_str(tail);
    }
    node.statics = child.statics;
    node.param = child.param;
    node.catch_all = child.catch_all;
    node.leaf = child.leaf;
}
