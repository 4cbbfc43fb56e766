//! Route matching against a frozen tree.
//!
//! # Responsibilities
//! - Normalize the request path (leading `/`, no trailing `/`)
//! - Walk the tree: static child, then param child, then catch-all child
//! - Bind parameters and validate them against their declared types
//!
//! # Design Decisions
//! - No backtracking: once a branch is chosen a later failure is final
//! - A static child is chosen by its first label segment; the rest of the
//!   label must then match or the lookup fails
//! - Type validation failures are reported as a structured miss, never
//!   as an error
//! - Cost is proportional to path length (binary search among siblings)

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::routing::definition::{ParamType, RouteDefinition};
use crate::routing::tree::{NodeId, NodeKind, RouteTree};
use crate::routing::wrappers::WrapperChain;

/// Captured parameter values keyed by name.
pub type Params = BTreeMap<String, String>;

/// Root-level special handler slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRoutes {
    pub not_found: Option<String>,
    pub server_error: Option<String>,
}

/// A parameter value failed its type predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parameter '{param}' expects {expected}, got '{value}'")]
pub struct ValidationError {
    pub param: String,
    pub expected: ParamType,
    pub value: String,
}

/// Why a lookup found nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// No branch of the tree accepts the path.
    NoRoute,
    /// The path ends on a node that has no handler.
    NoHandler,
    /// A parameter segment failed validation.
    Invalid(ValidationError),
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDefinition,
    pub params: Params,
    pub chain: &'a WrapperChain,
}

impl RouteMatch<'_> {
    pub fn handler(&self) -> &str {
        self.route.handler.as_str()
    }

    pub fn middleware(&self) -> &[String] {
        &self.chain.middleware
    }

    pub fn layouts(&self) -> &[String] {
        &self.chain.layouts
    }
}

/// Result of [`CompiledRoutes::match_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome<'a> {
    Found(RouteMatch<'a>),
    NotFound(Miss),
}

impl<'a> MatchOutcome<'a> {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchOutcome::Found(_))
    }

    pub fn found(self) -> Option<RouteMatch<'a>> {
        match self {
            MatchOutcome::Found(m) => Some(m),
            MatchOutcome::NotFound(_) => None,
        }
    }
}

/// The frozen, read-only route tree.
///
/// Built once by the compiler and shared (`Arc<CompiledRoutes>`) with every
/// request task; nothing mutates it after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRoutes {
    tree: RouteTree,
    specials: SpecialRoutes,
}

impl CompiledRoutes {
    pub fn new(tree: RouteTree, specials: SpecialRoutes) -> Self {
        Self { tree, specials }
    }

    /// Reload a tree snapshot written by the emitter.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    pub fn specials(&self) -> &SpecialRoutes {
        &self.specials
    }

    pub fn len(&self) -> usize {
        self.tree.routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.routes().is_empty()
    }

    /// Routes with their wrapper chains, sorted by pattern.
    pub fn routes(&self) -> Vec<(&RouteDefinition, &WrapperChain)> {
        let mut routes: Vec<_> = self
            .tree
            .leaves()
            .map(|(route, leaf)| (route, &leaf.chain))
            .collect();
        routes.sort_by(|a, b| a.0.pattern.cmp(&b.0.pattern));
        routes
    }

    /// Resolve `path` to a handler, its parameters and its wrapper chain.
    pub fn match_path(&self, path: &str) -> MatchOutcome<'_> {
        let path = normalize_path(path);
        let mut rest = &path[1..];
        let mut current = NodeId::ROOT;
        let mut params = Params::new();

        loop {
            let node = self.tree.node(current);

            if rest.is_empty() {
                return match &node.leaf {
                    Some(leaf) => MatchOutcome::Found(RouteMatch {
                        route: self.tree.route(leaf.route),
                        params,
                        chain: &leaf.chain,
                    }),
                    None => MatchOutcome::NotFound(Miss::NoHandler),
                };
            }

            let (head, tail) = split_segment(rest);

            if let Some(child) = self.tree.static_child(current, head) {
                let label = self.tree.node(child).label().unwrap_or_default();
                match consume_label(label, rest) {
                    LabelMatch::Full(next) => {
                        current = child;
                        rest = next;
                        continue;
                    }
                    LabelMatch::Exhausted => return MatchOutcome::NotFound(Miss::NoHandler),
                    LabelMatch::Diverged => return MatchOutcome::NotFound(Miss::NoRoute),
                }
            }

            if let Some(child) = node.param {
                if let NodeKind::Param { name, ty } = &self.tree.node(child).kind {
                    if !ty.accepts(head) {
                        return MatchOutcome::NotFound(Miss::Invalid(ValidationError {
                            param: name.clone(),
                            expected: *ty,
                            value: head.to_string(),
                        }));
                    }
                    params.insert(name.clone(), head.to_string());
                }
                current = child;
                rest = tail;
                continue;
            }

            if let Some(child) = node.catch_all {
                if let NodeKind::CatchAll { name } = &self.tree.node(child).kind {
                    params.insert(name.clone(), rest.to_string());
                }
                current = child;
                rest = "";
                continue;
            }

            return MatchOutcome::NotFound(Miss::NoRoute);
        }
    }
}

/// Ensure a leading `/` and drop trailing slashes (except for the root).
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        if trimmed.len() == path.len() {
            Cow::Borrowed(path)
        } else {
            Cow::Borrowed(trimmed)
        }
    } else if trimmed.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", trimmed))
    }
}

/// Split off the first segment; the remainder skips one `/`.
fn split_segment(rest: &str) -> (&str, &str) {
    match rest.split_once('/') {
        Some((head, tail)) => (head, tail),
        None => (rest, ""),
    }
}

enum LabelMatch<'p> {
    /// The whole label matched; holds the remaining path.
    Full(&'p str),
    /// The path ended on a segment boundary inside the label.
    Exhausted,
    /// A segment inside the label differs from the path.
    Diverged,
}

fn consume_label<'p>(label: &str, rest: &'p str) -> LabelMatch<'p> {
    let mut remaining = rest;
    for expected in label.split('/') {
        if remaining.is_empty() {
            return LabelMatch::Exhausted;
        }
        let (head, tail) = split_segment(remaining);
        if head != expected {
            return LabelMatch::Diverged;
        }
        remaining = tail;
    }
    LabelMatch::Full(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::compress::compress;
    use crate::routing::definition::{HandlerRef, RouteKind};
    use crate::routing::tree::TreeBuilder;

    fn compiled(patterns: &[&str], compressed: bool) -> CompiledRoutes {
        let mut builder = TreeBuilder::new();
        for pattern in patterns {
            let route = RouteDefinition::parse(
                pattern,
                *pattern,
                "",
                HandlerRef::new(*pattern),
                RouteKind::Page,
            )
            .unwrap();
            builder.insert(route).unwrap();
        }
        let mut tree = builder.finish();
        if compressed {
            compress(&mut tree);
        }
        CompiledRoutes::new(tree, SpecialRoutes::default())
    }

    fn handler_of(routes: &CompiledRoutes, path: &str) -> Option<String> {
        routes
            .match_path(path)
            .found()
            .map(|m| m.handler().to_string())
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("foo"), "/foo");
        assert_eq!(normalize_path("/foo/"), "/foo");
        assert_eq!(normalize_path("/foo/bar"), "/foo/bar");
    }

    #[test]
    fn test_every_route_matches_itself() {
        let patterns = ["/", "/about", "/blog", "/blog/archive/2024", "/shop/cart"];
        for compressed in [false, true] {
            let routes = compiled(&patterns, compressed);
            for pattern in patterns {
                assert_eq!(handler_of(&routes, pattern).as_deref(), Some(pattern));
            }
        }
    }

    #[test]
    fn test_int_param_validation() {
        let routes = compiled(&["/item/[id:int]"], true);

        let found = routes.match_path("/item/42").found().unwrap();
        assert_eq!(found.params.get("id").map(String::as_str), Some("42"));

        assert_eq!(
            routes.match_path("/item/abc"),
            MatchOutcome::NotFound(Miss::Invalid(ValidationError {
                param: "id".into(),
                expected: ParamType::Int,
                value: "abc".into(),
            }))
        );
    }

    #[test]
    fn test_catch_all_binds_remainder() {
        let routes = compiled(&["/docs/[...path]"], true);
        let found = routes.match_path("/docs/a/b/c").found().unwrap();
        assert_eq!(found.params.get("path").map(String::as_str), Some("a/b/c"));

        assert_eq!(
            routes.match_path("/docs"),
            MatchOutcome::NotFound(Miss::NoHandler)
        );
    }

    #[test]
    fn test_static_beats_param() {
        let routes = compiled(&["/users/new", "/users/[id]"], true);
        assert_eq!(handler_of(&routes, "/users/new").as_deref(), Some("/users/new"));
        assert_eq!(handler_of(&routes, "/users/7").as_deref(), Some("/users/[id]"));
    }

    #[test]
    fn test_no_backtracking_after_static_commit() {
        // "/x/z" commits to the static "x" branch and never reaches [id].
        let patterns = ["/x/a/1", "/[id]/z"];
        for compressed in [false, true] {
            let routes = compiled(&patterns, compressed);
            assert_eq!(routes.match_path("/x/z"), MatchOutcome::NotFound(Miss::NoRoute));
            assert_eq!(handler_of(&routes, "/y/z").as_deref(), Some("/[id]/z"));
        }
    }

    #[test]
    fn test_no_backtracking_after_param_failure() {
        let routes = compiled(&["/p/[id:int]", "/p/[id:int]/x"], true);
        assert!(matches!(
            routes.match_path("/p/abc/x"),
            MatchOutcome::NotFound(Miss::Invalid(_))
        ));
    }

    #[test]
    fn test_segment_boundaries_respected() {
        let routes = compiled(&["/blog"], true);
        assert_eq!(
            routes.match_path("/blogger"),
            MatchOutcome::NotFound(Miss::NoRoute)
        );
        assert!(routes.match_path("/blog/").is_found());
    }

    #[test]
    fn test_compressed_label_misses_match_uncompressed() {
        let patterns = ["/api/v1/users"];
        let plain = compiled(&patterns, false);
        let packed = compiled(&patterns, true);
        for path in ["/api", "/api/v1", "/api/v2/users", "/api/v1/users/x", "/other"] {
            assert_eq!(plain.match_path(path), packed.match_path(path), "path {path}");
        }
    }

    #[test]
    fn test_uuid_param() {
        let routes = compiled(&["/orders/[id:uuid]"], true);
        assert!(routes
            .match_path("/orders/123e4567-e89b-12d3-a456-426614174000")
            .is_found());
        assert!(!routes
            .match_path("/orders/123e4567-e89b-12d3-a456-42661417400")
            .is_found());
        assert!(!routes
            .match_path("/orders/123e4567-e89b-12d3-a456-4266141740000")
            .is_found());
    }

    #[test]
    fn test_empty_segment_fails_param() {
        let routes = compiled(&["/a/[b]/c"], true);
        assert!(matches!(
            routes.match_path("/a//c"),
            MatchOutcome::NotFound(Miss::Invalid(_))
        ));
    }

    #[test]
    fn test_snapshot_round_trip_matches() {
        let routes = compiled(&["/a/b/c", "/a/[x:int]"], true);
        let json = serde_json::to_string(&routes).unwrap();
        let reloaded = CompiledRoutes::from_json(&json).unwrap();
        assert_eq!(handler_of(&reloaded, "/a/b/c").as_deref(), Some("/a/b/c"));
        assert_eq!(handler_of(&reloaded, "/a/9").as_deref(), Some("/a/[x:int]"));
    }
}
