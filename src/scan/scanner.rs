//! Route tree scanner.
//!
//! # Responsibilities
//! - Walk the routes root recursively, in file-name order
//! - Turn each route file into a `RouteDeclaration`
//! - Index `middleware` and `layout` providers per directory
//! - Fill the root-level not-found and server-error slots
//!
//! # Design Decisions
//! - Per-entry failures are collected and the walk continues
//! - Only a missing or unreadable root aborts the scan
//! - Symlinks and hidden entries are skipped

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RoutesConfig;
use crate::routing::definition::{HandlerRef, RouteKind};
use crate::routing::matcher::SpecialRoutes;
use crate::routing::wrappers::ProviderIndex;
use crate::scan::conventions::{classify, FileRole};

/// Failure to read part of the routes tree.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("routes root '{}' does not exist or is not a directory", .0.display())]
    MissingRoot(PathBuf),

    #[error("failed to read directory '{}': {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to inspect '{}': {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file name '{}' is not valid UTF-8", .0.display())]
    NonUtf8Name(PathBuf),

    #[error("directory '{dir}' declares more than one {kind} provider ('{first}' and '{second}')")]
    DuplicateProvider {
        dir: String,
        kind: &'static str,
        first: String,
        second: String,
    },
}

impl ScanError {
    /// Whether the whole scan had to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::MissingRoot(_))
    }
}

/// Scanner settings.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Extensions (without the dot) of route declaration files.
    pub extensions: Vec<String>,
    /// Top-level directory whose routes are API routes.
    pub api_dir: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&RoutesConfig::default())
    }
}

impl From<&RoutesConfig> for ScanOptions {
    fn from(config: &RoutesConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            api_dir: config.api_dir.clone(),
        }
    }
}

/// A route file found by the scanner, before its pattern is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDeclaration {
    pub pattern: String,
    /// File path relative to the routes root, `/`-separated.
    pub source: String,
    /// Declaring directory relative to the routes root.
    pub dir: String,
    pub handler: HandlerRef,
    pub kind: RouteKind,
}

impl RouteDeclaration {
    /// Declare a page route whose handler id is the pattern's location.
    pub fn page(pattern: &str, dir: &str) -> Self {
        Self::new(pattern, dir, RouteKind::Page)
    }

    pub fn api(pattern: &str, dir: &str) -> Self {
        Self::new(pattern, dir, RouteKind::Api)
    }

    fn new(pattern: &str, dir: &str, kind: RouteKind) -> Self {
        let id = pattern.trim_matches('/');
        let id = if id.is_empty() { "index" } else { id };
        Self {
            pattern: pattern.to_string(),
            source: id.to_string(),
            dir: dir.to_string(),
            handler: HandlerRef::new(id),
            kind,
        }
    }
}

/// Everything a scan produced.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub declarations: Vec<RouteDeclaration>,
    pub providers: ProviderIndex,
    pub specials: SpecialRoutes,
    pub errors: Vec<ScanError>,
}

impl ScanOutput {
    pub fn with_route(mut self, declaration: RouteDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn with_middleware(mut self, dir: &str, reference: &str) -> Self {
        self.providers.set_middleware(dir, reference);
        self
    }

    pub fn with_layout(mut self, dir: &str, reference: &str) -> Self {
        self.providers.set_layout(dir, reference);
        self
    }
}

/// Scan `root` for route declarations.
pub fn scan_routes(root: &Path, options: &ScanOptions) -> Result<ScanOutput, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }

    let mut scanner = Scanner {
        options,
        output: ScanOutput::default(),
    };
    let entries = fs::read_dir(root).map_err(|source| ScanError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;
    let entries = sorted_entries(root, entries, &mut scanner.output.errors);
    scanner.visit_entries(entries, &[]);

    let output = scanner.output;
    tracing::info!(
        root = %root.display(),
        routes = output.declarations.len(),
        errors = output.errors.len(),
        "Route scan complete"
    );
    Ok(output)
}

struct Scanner<'a> {
    options: &'a ScanOptions,
    output: ScanOutput,
}

impl Scanner<'_> {
    fn visit_dir(&mut self, path: &Path, rel: &[String]) {
        match fs::read_dir(path) {
            Ok(entries) => {
                let entries = sorted_entries(path, entries, &mut self.output.errors);
                self.visit_entries(entries, rel);
            }
            Err(source) => self.output.errors.push(ScanError::ReadDir {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn visit_entries(&mut self, entries: Vec<fs::DirEntry>, rel: &[String]) {
        for entry in entries {
            let path = entry.path();
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => {
                    self.output.errors.push(ScanError::NonUtf8Name(path));
                    continue;
                }
            };
            if name.starts_with('.') {
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(source) => {
                    self.output.errors.push(ScanError::Metadata { path, source });
                    continue;
                }
            };

            if file_type.is_symlink() {
                debug!(path = %path.display(), "Skipping symlink");
            } else if file_type.is_dir() {
                let mut child = rel.to_vec();
                child.push(name);
                self.visit_dir(&path, &child);
            } else if file_type.is_file() {
                self.visit_file(&name, rel);
            }
        }
    }

    fn visit_file(&mut self, name: &str, rel: &[String]) {
        let Some((stem, ext)) = name.rsplit_once('.') else {
            return;
        };
        if stem.is_empty() || !self.options.extensions.iter().any(|e| e == ext) {
            return;
        }

        let dir = rel.join("/");
        let location = join(&dir, stem);
        let source = join(&dir, name);

        match classify(stem) {
            role @ (FileRole::Route | FileRole::Index) => {
                let pattern = if role == FileRole::Index {
                    format!("/{}", dir)
                } else {
                    format!("/{}", location)
                };
                // `api.rs` at the root declares the same path as `api/index.rs`.
                let top = match rel.first() {
                    Some(top) => Some(top.as_str()),
                    None if role == FileRole::Route => Some(stem),
                    None => None,
                };
                let kind = match top {
                    Some(top) if top == self.options.api_dir => RouteKind::Api,
                    _ => RouteKind::Page,
                };
                debug!(pattern = %pattern, source = %source, kind = kind.as_str(), "Route declared");
                self.output.declarations.push(RouteDeclaration {
                    pattern,
                    source,
                    dir,
                    handler: HandlerRef::new(location),
                    kind,
                });
            }
            FileRole::Middleware => {
                if let Some(first) = self.output.providers.set_middleware(&dir, &location) {
                    self.duplicate_provider(dir, "middleware", first, location);
                }
            }
            FileRole::Layout => {
                if let Some(first) = self.output.providers.set_layout(&dir, &location) {
                    self.duplicate_provider(dir, "layout", first, location);
                }
            }
            FileRole::NotFound | FileRole::ServerError if !dir.is_empty() => {
                warn!(source = %source, "Special handlers are only recognised at the routes root");
            }
            FileRole::NotFound => self.output.specials.not_found = Some(location),
            FileRole::ServerError => self.output.specials.server_error = Some(location),
            FileRole::Test => debug!(source = %source, "Skipping test file"),
        }
    }

    fn duplicate_provider(&mut self, dir: String, kind: &'static str, first: String, second: String) {
        self.output.errors.push(ScanError::DuplicateProvider {
            dir,
            kind,
            first,
            second,
        });
    }
}

/// Readable entries of `dir` in file-name order; unreadable ones become errors.
fn sorted_entries(
    dir: &Path,
    entries: fs::ReadDir,
    errors: &mut Vec<ScanError>,
) -> Vec<fs::DirEntry> {
    let mut entries = keep_readable(dir, entries, errors);
    entries.sort_by_key(|entry| entry.file_name());
    entries
}

fn keep_readable<T>(
    dir: &Path,
    entries: impl IntoIterator<Item = std::io::Result<T>>,
    errors: &mut Vec<ScanError>,
) -> Vec<T> {
    let mut kept = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => kept.push(entry),
            Err(source) => {
                warn!(dir = %dir.display(), error = %source, "Skipping unreadable directory entry");
                errors.push(ScanError::Metadata {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        }
    }
    kept
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    fn patterns(output: &ScanOutput) -> Vec<&str> {
        output
            .declarations
            .iter()
            .map(|d| d.pattern.as_str())
            .collect()
    }

    #[test]
    fn test_index_maps_to_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "index.rs");
        touch(dir.path(), "foo/index.rs");
        touch(dir.path(), "foo/bar.rs");

        let output = scan_routes(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(patterns(&output), vec!["/foo/bar", "/foo", "/"]);
        assert_eq!(output.declarations[1].handler.as_str(), "foo/index");
        assert_eq!(output.declarations[1].dir, "foo");
        assert_eq!(output.declarations[2].handler.as_str(), "index");
        assert_eq!(output.declarations[2].dir, "");
    }

    #[test]
    fn test_reserved_files_are_not_routes() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "layout.rs");
        touch(dir.path(), "not_found.rs");
        touch(dir.path(), "error.rs");
        touch(dir.path(), "admin/middleware.rs");
        touch(dir.path(), "admin/users_test.rs");
        touch(dir.path(), "admin/users.rs");
        touch(dir.path(), "admin/not_found.rs");
        touch(dir.path(), "README.md");
        touch(dir.path(), ".hidden.rs");

        let output = scan_routes(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(patterns(&output), vec!["/admin/users"]);
        assert_eq!(
            output.providers.get("admin").and_then(|p| p.middleware.as_deref()),
            Some("admin/middleware")
        );
        assert_eq!(
            output.providers.get("").and_then(|p| p.layout.as_deref()),
            Some("layout")
        );
        assert_eq!(output.specials.not_found.as_deref(), Some("not_found"));
        assert_eq!(output.specials.server_error.as_deref(), Some("error"));
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_api_kind_from_location() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "api/users/[id:int].rs");
        touch(dir.path(), "blog/[slug].rs");

        let output = scan_routes(dir.path(), &ScanOptions::default()).unwrap();
        let api = &output.declarations[0];
        assert_eq!(api.pattern, "/api/users/[id:int]");
        assert_eq!(api.kind, RouteKind::Api);
        assert_eq!(api.source, "api/users/[id:int].rs");
        assert_eq!(output.declarations[1].kind, RouteKind::Page);
    }

    #[test]
    fn test_root_file_named_like_api_dir_is_api() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "api.rs");
        touch(dir.path(), "api/index.rs");
        touch(dir.path(), "apis.rs");
        touch(dir.path(), "index.rs");

        let output = scan_routes(dir.path(), &ScanOptions::default()).unwrap();
        let kinds: Vec<(&str, RouteKind)> = output
            .declarations
            .iter()
            .map(|d| (d.source.as_str(), d.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("api/index.rs", RouteKind::Api),
                ("api.rs", RouteKind::Api),
                ("apis.rs", RouteKind::Page),
                ("index.rs", RouteKind::Page),
            ]
        );
    }

    #[test]
    fn test_unreadable_entry_keeps_siblings() {
        let entries = vec![
            Ok("a.rs"),
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")),
            Ok("b.rs"),
        ];
        let mut errors = Vec::new();
        let kept = keep_readable(Path::new("routes/blog"), entries, &mut errors);

        assert_eq!(kept, vec!["a.rs", "b.rs"]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ScanError::Metadata { path, .. } if path == Path::new("routes/blog")
        ));
        assert!(!errors[0].is_fatal());
    }

    #[test]
    fn test_duplicate_provider_is_collected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "shop/layout.rs");
        touch(dir.path(), "shop/layout.tmpl");
        touch(dir.path(), "shop/cart.rs");

        let options = ScanOptions {
            extensions: vec!["rs".into(), "tmpl".into()],
            api_dir: "api".into(),
        };
        let output = scan_routes(dir.path(), &options).unwrap();
        assert_eq!(patterns(&output), vec!["/shop/cart"]);
        assert_eq!(output.errors.len(), 1);
        assert!(!output.errors[0].is_fatal());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = scan_routes(&dir.path().join("nope"), &ScanOptions::default()).unwrap_err();
        assert!(err.is_fatal());
    }
}
