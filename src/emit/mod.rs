//! Build artifact emission.
//!
//! # Data Flow
//! ```text
//! CompiledRoutes
//!     → tree.json   (serde snapshot, reloadable via CompiledRoutes::from_json)
//!     → routes.json (table.rs: path-sorted introspection table)
//!     → routes.rs   (codegen.rs: param structs + path builders)
//! ```
//!
//! # Design Decisions
//! - Output is deterministic: the same routes always produce the same bytes
//! - decoders.rs and builders.rs are the runtime equivalents of the
//!   generated code, used by the dispatcher and the CLI
//! - Any write failure is fatal to the build

pub mod builders;
pub mod codegen;
pub mod decoders;
pub mod table;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::RouterConfig;
use crate::routing::compiler::{compile_dir, Compilation, CompileError};
use crate::routing::matcher::CompiledRoutes;

pub use builders::{build_path, BuildError};
pub use decoders::{decode_params, param_shapes, DecodeError, ParamShape, TypedParams, TypedValue};
pub use table::{RouteRow, RouteTable};

pub const TREE_FILE: &str = "tree.json";
pub const TABLE_FILE: &str = "routes.json";
pub const MODULE_FILE: &str = "routes.rs";

#[derive(Debug, Error)]
pub enum EmissionError {
    #[error("failed to write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render generated module")]
    Render(#[from] std::fmt::Error),
}

/// Which artifacts to write.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub emit_rust: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { emit_rust: true }
    }
}

/// Files written by one emission.
#[derive(Debug, Default)]
pub struct EmitSummary {
    pub files: Vec<PathBuf>,
}

/// Write every artifact for `compiled` into `out_dir`.
pub fn emit_all(
    compiled: &CompiledRoutes,
    out_dir: &Path,
    options: &EmitOptions,
) -> Result<EmitSummary, EmissionError> {
    fs::create_dir_all(out_dir).map_err(|source| EmissionError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut summary = EmitSummary::default();

    let tree = to_json(TREE_FILE, compiled)?;
    summary.files.push(write(out_dir, TREE_FILE, &tree)?);

    let table = to_json(TABLE_FILE, &RouteTable::from_compiled(compiled))?;
    summary.files.push(write(out_dir, TABLE_FILE, &table)?);

    if options.emit_rust {
        let module = codegen::render_module(compiled)?;
        summary.files.push(write(out_dir, MODULE_FILE, &module)?);
    }

    tracing::info!(
        out_dir = %out_dir.display(),
        files = summary.files.len(),
        routes = compiled.len(),
        "Artifacts written"
    );
    Ok(summary)
}

/// Compile the configured routes tree and emit its artifacts.
pub fn build(config: &RouterConfig) -> Result<(Compilation, EmitSummary), CompileError> {
    let compilation = compile_dir(config)?;
    let options = EmitOptions {
        emit_rust: config.build.emit_rust,
    };
    let summary = emit_all(&compilation.routes, &config.build.out_dir, &options)?;
    Ok((compilation, summary))
}

fn to_json<T: serde::Serialize>(artifact: &'static str, value: &T) -> Result<String, EmissionError> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|source| EmissionError::Serialize { artifact, source })
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, EmissionError> {
    let path = dir.join(name);
    fs::write(&path, contents).map_err(|source| EmissionError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
