//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use route_compiler::routing::{compile_root, CompiledRoutes, Compilation};

/// A temporary routes tree.
pub struct RouteFixture {
    dir: TempDir,
}

impl RouteFixture {
    /// Create a tree containing an empty file at each relative path.
    pub fn new(files: &[&str]) -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };
        for file in files {
            fixture.touch(file);
        }
        fixture
    }

    pub fn touch(&self, rel: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn compile(&self) -> Compilation {
        compile_root(self.root()).unwrap()
    }

    pub fn routes(&self) -> CompiledRoutes {
        self.compile().routes
    }
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
