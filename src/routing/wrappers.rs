//! Middleware and layout chain resolution.
//!
//! # Responsibilities
//! - Record which directories expose a middleware or layout provider
//! - Compose each route's chain by walking its ancestor directories
//!
//! # Design Decisions
//! - Resolution is a pure function of (declaring directory, provider index)
//! - Directories are relative to the routes root; the walk ends at `""`
//!   and can never leave the root
//! - Middleware runs outer ancestor first; layouts wrap innermost first

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered wrapper references attached to a route leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperChain {
    /// Middleware references, topmost ancestor first.
    pub middleware: Vec<String>,
    /// Layout references, nearest ancestor first.
    pub layouts: Vec<String>,
}

impl WrapperChain {
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty() && self.layouts.is_empty()
    }
}

/// Providers declared by a single directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirProviders {
    pub middleware: Option<String>,
    pub layout: Option<String>,
}

/// Index of wrapper providers keyed by directory (relative, `/`-separated).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIndex {
    dirs: BTreeMap<String, DirProviders>,
}

impl ProviderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware provider. Returns the previous one, if any.
    pub fn set_middleware(
        &mut self,
        dir: impl Into<String>,
        reference: impl Into<String>,
    ) -> Option<String> {
        self.dirs
            .entry(dir.into())
            .or_default()
            .middleware
            .replace(reference.into())
    }

    /// Register a layout provider. Returns the previous one, if any.
    pub fn set_layout(
        &mut self,
        dir: impl Into<String>,
        reference: impl Into<String>,
    ) -> Option<String> {
        self.dirs
            .entry(dir.into())
            .or_default()
            .layout
            .replace(reference.into())
    }

    pub fn get(&self, dir: &str) -> Option<&DirProviders> {
        self.dirs.get(dir)
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// All middleware references, sorted.
    pub fn middleware_refs(&self) -> impl Iterator<Item = &str> {
        self.dirs.values().filter_map(|p| p.middleware.as_deref())
    }

    /// All layout references, sorted.
    pub fn layout_refs(&self) -> impl Iterator<Item = &str> {
        self.dirs.values().filter_map(|p| p.layout.as_deref())
    }
}

/// Compose the wrapper chain for a route declared in `dir`.
pub fn resolve_chain(dir: &str, providers: &ProviderIndex) -> WrapperChain {
    let mut chain = WrapperChain::default();
    for ancestor in Ancestors::new(dir) {
        let Some(found) = providers.get(ancestor) else {
            continue;
        };
        if let Some(middleware) = &found.middleware {
            chain.middleware.insert(0, middleware.clone());
        }
        if let Some(layout) = &found.layout {
            chain.layouts.push(layout.clone());
        }
    }
    chain
}

/// Iterates `a/b/c`, `a/b`, `a`, `""`.
struct Ancestors<'a> {
    next: Option<&'a str>,
}

impl<'a> Ancestors<'a> {
    fn new(dir: &'a str) -> Self {
        Self {
            next: Some(dir.trim_matches('/')),
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.next?;
        self.next = if current.is_empty() {
            None
        } else {
            Some(current.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(""))
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_end_at_root() {
        let dirs: Vec<&str> = Ancestors::new("a/b/c").collect();
        assert_eq!(dirs, vec!["a/b/c", "a/b", "a", ""]);

        let dirs: Vec<&str> = Ancestors::new("").collect();
        assert_eq!(dirs, vec![""]);
    }

    #[test]
    fn test_middleware_outer_first() {
        let mut providers = ProviderIndex::new();
        providers.set_middleware("a", "a/middleware");
        providers.set_middleware("a/b", "a/b/middleware");
        providers.set_middleware("a/b/c", "a/b/c/middleware");

        let chain = resolve_chain("a/b/c", &providers);
        assert_eq!(
            chain.middleware,
            vec!["a/middleware", "a/b/middleware", "a/b/c/middleware"]
        );
        assert!(chain.layouts.is_empty());
    }

    #[test]
    fn test_layouts_nearest_first() {
        let mut providers = ProviderIndex::new();
        providers.set_layout("", "layout");
        providers.set_layout("shop", "shop/layout");

        let chain = resolve_chain("shop/cart", &providers);
        assert_eq!(chain.layouts, vec!["shop/layout", "layout"]);
    }

    #[test]
    fn test_siblings_do_not_leak() {
        let mut providers = ProviderIndex::new();
        providers.set_middleware("admin", "admin/middleware");

        assert!(resolve_chain("blog", &providers).is_empty());
        assert!(resolve_chain("", &providers).is_empty());
        assert!(resolve_chain("administrator", &providers).is_empty());
    }
}
