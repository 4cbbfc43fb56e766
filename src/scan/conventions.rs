//! File naming conventions for route directories.

/// What a file in the routes tree declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// A route at `<dir>/<stem>`.
    Route,
    /// A route at `<dir>` itself.
    Index,
    Layout,
    Middleware,
    NotFound,
    ServerError,
    /// Test files are never routes.
    Test,
}

impl FileRole {
    pub fn is_route(&self) -> bool {
        matches!(self, FileRole::Route | FileRole::Index)
    }
}

pub const INDEX: &str = "index";
pub const LAYOUT: &str = "layout";
pub const MIDDLEWARE: &str = "middleware";
pub const NOT_FOUND: &str = "not_found";
pub const SERVER_ERROR: &str = "error";

/// Classify a file by its stem (file name without extension).
pub fn classify(stem: &str) -> FileRole {
    match stem {
        INDEX => FileRole::Index,
        LAYOUT => FileRole::Layout,
        MIDDLEWARE => FileRole::Middleware,
        NOT_FOUND => FileRole::NotFound,
        SERVER_ERROR => FileRole::ServerError,
        _ if stem.ends_with("_test") || stem.starts_with("test_") => FileRole::Test,
        _ => FileRole::Route,
    }
}
