//! Route compilation pipeline.
//!
//! # Responsibilities
//! - Parse every scanned declaration, setting malformed ones aside
//! - Insert parsed routes into the tree, collecting every conflict
//! - Compress the tree and attach wrapper chains to its leaves
//! - Freeze the result as `CompiledRoutes`
//!
//! # Design Decisions
//! - Scan and parse failures are reported but do not stop the pass
//! - Any structural conflict aborts the compile after all routes are tried,
//!   so one run reports every conflict
//! - Single synchronous pass; nothing here is shared across threads

use std::path::Path;
use std::time::Instant;
use thiserror::Error;

use crate::config::RouterConfig;
use crate::emit::EmissionError;
use crate::routing::compress::compress;
use crate::routing::definition::RouteDefinition;
use crate::routing::grammar::ParseError;
use crate::routing::matcher::CompiledRoutes;
use crate::routing::tree::{ConflictError, TreeBuilder};
use crate::routing::wrappers::resolve_chain;
use crate::scan::{scan_routes, ScanError, ScanOptions, ScanOutput};

/// Fatal compile failure.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{} route conflict(s): {}", .0.len(), join_conflicts(.0))]
    Conflicts(Vec<ConflictError>),

    #[error(transparent)]
    Emission(#[from] EmissionError),
}

fn join_conflicts(conflicts: &[ConflictError]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Compiler switches.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Collapse single-child static chains after building.
    pub compress: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { compress: true }
    }
}

/// Problems that were recovered from during a compile.
#[derive(Debug, Default)]
pub struct CompileReport {
    pub scan_errors: Vec<ScanError>,
    pub parse_errors: Vec<ParseError>,
    /// Number of routes in the compiled tree.
    pub routes: usize,
    /// Node merges performed by compression.
    pub merges: usize,
}

impl CompileReport {
    pub fn is_clean(&self) -> bool {
        self.scan_errors.is_empty() && self.parse_errors.is_empty()
    }
}

/// A frozen route tree plus its compile report.
#[derive(Debug)]
pub struct Compilation {
    pub routes: CompiledRoutes,
    pub report: CompileReport,
}

/// Scan the configured routes root and compile it.
pub fn compile_dir(config: &RouterConfig) -> Result<Compilation, CompileError> {
    let options = ScanOptions::from(&config.routes);
    let scan = scan_routes(&config.routes.root, &options)?;
    let compile_options = CompileOptions {
        compress: config.build.compress,
    };
    compile(scan, &compile_options)
}

/// Compile the routes found under `root` with default settings.
pub fn compile_root(root: &Path) -> Result<Compilation, CompileError> {
    let scan = scan_routes(root, &ScanOptions::default())?;
    compile(scan, &CompileOptions::default())
}

/// Compile an already-scanned route set.
pub fn compile(scan: ScanOutput, options: &CompileOptions) -> Result<Compilation, CompileError> {
    let started = Instant::now();
    let ScanOutput {
        declarations,
        providers,
        specials,
        errors: scan_errors,
    } = scan;

    let mut report = CompileReport {
        scan_errors,
        ..CompileReport::default()
    };
    for error in &report.scan_errors {
        tracing::warn!(error = %error, "Skipped part of the routes tree");
    }

    let mut builder = TreeBuilder::new();
    let mut conflicts = Vec::new();
    for declaration in declarations {
        let route = match RouteDefinition::parse(
            &declaration.pattern,
            declaration.source.clone(),
            declaration.dir,
            declaration.handler,
            declaration.kind,
        ) {
            Ok(route) => route,
            Err(error) => {
                tracing::warn!(source = %declaration.source, error = %error, "Skipping malformed route");
                report.parse_errors.push(error);
                continue;
            }
        };

        if let Err(conflict) = builder.insert(route) {
            tracing::error!(error = %conflict, "Route conflict");
            conflicts.push(conflict);
        }
    }

    if !conflicts.is_empty() {
        return Err(CompileError::Conflicts(conflicts));
    }

    let mut tree = builder.finish();
    if options.compress {
        report.merges = compress(&mut tree);
    }
    for (route, leaf) in tree.leaves_mut() {
        leaf.chain = resolve_chain(&route.dir, &providers);
    }
    report.routes = tree.routes().len();

    tracing::info!(
        routes = report.routes,
        nodes = tree.node_count(),
        merges = report.merges,
        parse_errors = report.parse_errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Routes compiled"
    );
    crate::observability::metrics::record_compile(&report);

    Ok(Compilation {
        routes: CompiledRoutes::new(tree, specials),
        report,
    })
}
