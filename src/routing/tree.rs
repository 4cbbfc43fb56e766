//! Prefix tree construction.
//!
//! # Responsibilities
//! - Insert parsed routes segment by segment, sharing common prefixes
//! - Detect duplicate terminal paths and incompatible parameters
//!
//! # Design Decisions
//! - Nodes live in an arena (`Vec<Node>`) and refer to children by index;
//!   every node except the root has exactly one parent
//! - Static children are kept sorted by the first segment of their label,
//!   which is unique among siblings
//! - A failed insertion may leave handler-less static nodes behind; the
//!   compile aborts on any conflict so they are never frozen

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::definition::{ParamType, RouteDefinition};
use crate::routing::grammar::Segment;
use crate::routing::wrappers::WrapperChain;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Literal label; after compression it may span several `/`-joined segments.
    Static { label: String },
    Param { name: String, ty: ParamType },
    CatchAll { name: String },
}

/// A handler bound to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// Index into the tree's route list.
    pub route: usize,
    pub chain: WrapperChain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub statics: Vec<NodeId>,
    pub param: Option<NodeId>,
    pub catch_all: Option<NodeId>,
    pub leaf: Option<Leaf>,
    /// Source of the route that created a param or catch-all node.
    #[serde(skip)]
    origin: String,
}

impl Node {
    fn new(kind: NodeKind, origin: &str) -> Self {
        Self {
            kind,
            statics: Vec::new(),
            param: None,
            catch_all: None,
            leaf: None,
            origin: origin.to_string(),
        }
    }

    pub(crate) fn detached() -> Self {
        Self::new(
            NodeKind::Static {
                label: String::new(),
            },
            "",
        )
    }

    /// Static label, or `None` for param and catch-all nodes.
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Static { label } => Some(label),
            _ => None,
        }
    }

    /// First `/`-delimited segment of a static label.
    pub(crate) fn head(&self) -> &str {
        self.label()
            .map(|label| label.split('/').next().unwrap_or(label))
            .unwrap_or("")
    }

    pub fn is_terminal(&self) -> bool {
        self.statics.is_empty() && self.param.is_none() && self.catch_all.is_none()
    }
}

/// Structural conflict between two routes. Fatal to the compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("duplicate route '{path}': declared by '{first}' and '{second}'")]
    DuplicateRoute {
        path: String,
        first: String,
        second: String,
    },

    #[error(
        "route '{path}' declared by '{incoming_source}' binds {incoming} where '{existing_source}' binds {existing}"
    )]
    ParamMismatch {
        path: String,
        existing: String,
        existing_source: String,
        incoming: String,
        incoming_source: String,
    },
}

/// Arena-backed prefix tree plus the routes bound to its leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) routes: Vec<RouteDefinition>,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self {
            nodes: vec![Node::detached()],
            routes: Vec::new(),
        }
    }
}

impl RouteTree {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn root(&self) -> &Node {
        self.node(NodeId::ROOT)
    }

    pub fn route(&self, index: usize) -> &RouteDefinition {
        &self.routes[index]
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes carrying a handler, in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = (&RouteDefinition, &Leaf)> {
        self.nodes
            .iter()
            .filter_map(|node| node.leaf.as_ref())
            .map(|leaf| (&self.routes[leaf.route], leaf))
    }

    pub(crate) fn leaves_mut(&mut self) -> impl Iterator<Item = (&RouteDefinition, &mut Leaf)> {
        let routes = &self.routes;
        self.nodes
            .iter_mut()
            .filter_map(|node| node.leaf.as_mut())
            .map(move |leaf| (&routes[leaf.route], leaf))
    }

    /// Find the static child of `parent` whose label starts with segment `head`.
    pub(crate) fn static_child(&self, parent: NodeId, head: &str) -> Option<NodeId> {
        let statics = &self.node(parent).statics;
        statics
            .binary_search_by(|id| self.node(*id).head().cmp(head))
            .ok()
            .map(|i| statics[i])
    }

    /// Rebuild the arena keeping only nodes reachable from the root.
    pub(crate) fn compact(&mut self) {
        let mut old = std::mem::take(&mut self.nodes);
        let mut nodes = Vec::with_capacity(old.len());
        relocate(&mut old, NodeId::ROOT, &mut nodes);
        self.nodes = nodes;
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

fn relocate(old: &mut [Node], id: NodeId, out: &mut Vec<Node>) -> NodeId {
    let mut node = std::mem::replace(&mut old[id.0], Node::detached());
    let new_id = NodeId(out.len());
    out.push(Node::detached());

    let mut statics: Vec<NodeId> = node
        .statics
        .iter()
        .map(|child| relocate(old, *child, out))
        .collect();
    statics.sort_by(|a, b| out[a.0].head().cmp(out[b.0].head()));
    node.statics = statics;
    node.param = node.param.map(|child| relocate(old, child, out));
    node.catch_all = node.catch_all.map(|child| relocate(old, child, out));

    out[new_id.0] = node;
    new_id
}

/// Builds a [`RouteTree`] one route at a time.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: RouteTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route, attaching it to the node its pattern ends on.
    pub fn insert(&mut self, route: RouteDefinition) -> Result<(), ConflictError> {
        let mut current = NodeId::ROOT;

        for segment in &route.segments {
            current = match segment {
                Segment::Static { text } => self.static_child_or_insert(current, text),
                Segment::Param { name, ty } => self.param_child_or_insert(current, name, *ty, &route)?,
                Segment::CatchAll { name } => {
                    self.catch_all_child_or_insert(current, name, &route)?
                }
            };
            if matches!(segment, Segment::CatchAll { .. }) {
                break;
            }
        }

        if let Some(existing) = &self.tree.nodes[current.0].leaf {
            return Err(ConflictError::DuplicateRoute {
                path: route.pattern.clone(),
                first: self.tree.routes[existing.route].source.clone(),
                second: route.source,
            });
        }

        let index = self.tree.routes.len();
        self.tree.nodes[current.0].leaf = Some(Leaf {
            route: index,
            chain: WrapperChain::default(),
        });
        self.tree.routes.push(route);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.routes.is_empty()
    }

    pub fn finish(self) -> RouteTree {
        self.tree
    }

    fn static_child_or_insert(&mut self, parent: NodeId, text: &str) -> NodeId {
        if let Some(existing) = self.tree.nodes[parent.0]
            .statics
            .iter()
            .copied()
            .find(|id| self.tree.nodes[id.0].label() == Some(text))
        {
            return existing;
        }

        let id = self.tree.push(Node::new(
            NodeKind::Static {
                label: text.to_string(),
            },
            "",
        ));
        let tree = &mut self.tree;
        let at = tree.nodes[parent.0]
            .statics
            .partition_point(|sibling| tree.nodes[sibling.0].head() < text);
        tree.nodes[parent.0].statics.insert(at, id);
        id
    }

    fn param_child_or_insert(
        &mut self,
        parent: NodeId,
        name: &str,
        ty: ParamType,
        route: &RouteDefinition,
    ) -> Result<NodeId, ConflictError> {
        let wanted = NodeKind::Param {
            name: name.to_string(),
            ty,
        };
        match self.tree.nodes[parent.0].param {
            Some(existing) => self.reuse(existing, &wanted, route),
            None => {
                let id = self.tree.push(Node::new(wanted, &route.source));
                self.tree.nodes[parent.0].param = Some(id);
                Ok(id)
            }
        }
    }

    fn catch_all_child_or_insert(
        &mut self,
        parent: NodeId,
        name: &str,
        route: &RouteDefinition,
    ) -> Result<NodeId, ConflictError> {
        let wanted = NodeKind::CatchAll {
            name: name.to_string(),
        };
        match self.tree.nodes[parent.0].catch_all {
            Some(existing) => self.reuse(existing, &wanted, route),
            None => {
                let id = self.tree.push(Node::new(wanted, &route.source));
                self.tree.nodes[parent.0].catch_all = Some(id);
                Ok(id)
            }
        }
    }

    fn reuse(
        &self,
        existing: NodeId,
        wanted: &NodeKind,
        route: &RouteDefinition,
    ) -> Result<NodeId, ConflictError> {
        let node = &self.tree.nodes[existing.0];
        if &node.kind == wanted {
            return Ok(existing);
        }
        Err(ConflictError::ParamMismatch {
            path: route.pattern.clone(),
            existing: describe(&node.kind),
            existing_source: node.origin.clone(),
            incoming: describe(wanted),
            incoming_source: route.source.clone(),
        })
    }
}

fn describe(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Static { label } => format!("'{}'", label),
        NodeKind::Param {
            name,
            ty: ParamType::String,
        } => format!("[{}]", name),
        NodeKind::Param { name, ty } => format!("[{}:{}]", name, ty),
        NodeKind::CatchAll { name } => format!("[...{}]", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::definition::{HandlerRef, RouteKind};

    fn route(pattern: &str, source: &str) -> RouteDefinition {
        RouteDefinition::parse(pattern, source, "", HandlerRef::new(source), RouteKind::Page)
            .unwrap()
    }

    fn labels(tree: &RouteTree, id: NodeId) -> Vec<String> {
        tree.node(id)
            .statics
            .iter()
            .map(|c| tree.node(*c).label().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_shared_prefixes_reuse_nodes() {
        let mut builder = TreeBuilder::new();
        builder.insert(route("/blog/posts", "a")).unwrap();
        builder.insert(route("/blog/tags", "b")).unwrap();
        builder.insert(route("/about", "c")).unwrap();
        let tree = builder.finish();

        assert_eq!(labels(&tree, NodeId::ROOT), vec!["about", "blog"]);
        let blog = tree.static_child(NodeId::ROOT, "blog").unwrap();
        assert_eq!(labels(&tree, blog), vec!["posts", "tags"]);
        // root + about + blog + posts + tags
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn test_duplicate_route_names_both_sources() {
        let mut builder = TreeBuilder::new();
        builder.insert(route("/foo", "foo.rs")).unwrap();
        let err = builder.insert(route("/foo/", "foo/index.rs")).unwrap_err();
        assert_eq!(
            err,
            ConflictError::DuplicateRoute {
                path: "/foo".into(),
                first: "foo.rs".into(),
                second: "foo/index.rs".into(),
            }
        );
    }

    #[test]
    fn test_param_mismatch_is_conflict() {
        let mut builder = TreeBuilder::new();
        builder.insert(route("/item/[id:int]", "item/[id:int].rs")).unwrap();
        builder
            .insert(route("/item/[id:int]/edit", "item/[id:int]/edit.rs"))
            .unwrap();

        let err = builder
            .insert(route("/item/[slug]", "item/[slug].rs"))
            .unwrap_err();
        match err {
            ConflictError::ParamMismatch {
                existing,
                existing_source,
                incoming,
                incoming_source,
                ..
            } => {
                assert_eq!(existing, "[id:int]");
                assert_eq!(existing_source, "item/[id:int].rs");
                assert_eq!(incoming, "[slug]");
                assert_eq!(incoming_source, "item/[slug].rs");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = builder
            .insert(route("/item/[id]", "item/[id].rs"))
            .unwrap_err();
        assert!(matches!(err, ConflictError::ParamMismatch { .. }));
    }

    #[test]
    fn test_catch_all_is_terminal_and_named_once() {
        let mut builder = TreeBuilder::new();
        builder.insert(route("/docs/[...path]", "docs.rs")).unwrap();
        let err = builder
            .insert(route("/docs/[...rest]", "docs2.rs"))
            .unwrap_err();
        assert!(matches!(err, ConflictError::ParamMismatch { .. }));

        let tree = builder.finish();
        let docs = tree.static_child(NodeId::ROOT, "docs").unwrap();
        let catch_all = tree.node(docs).catch_all.unwrap();
        assert!(tree.node(catch_all).is_terminal());
        assert!(tree.node(catch_all).leaf.is_some());
    }

    #[test]
    fn test_root_route_binds_root() {
        let mut builder = TreeBuilder::new();
        builder.insert(route("/", "index.rs")).unwrap();
        let tree = builder.finish();
        assert_eq!(tree.root().leaf.as_ref().map(|l| l.route), Some(0));
    }

    #[test]
    fn test_compact_drops_unreachable_nodes() {
        let mut builder = TreeBuilder::new();
        builder.insert(route("/a/b", "ab")).unwrap();
        let mut tree = builder.finish();
        tree.nodes.push(Node::detached());
        tree.compact();
        assert_eq!(tree.node_count(), 3);
        let a = tree.static_child(NodeId::ROOT, "a").unwrap();
        assert!(tree.static_child(a, "b").is_some());
    }
}
