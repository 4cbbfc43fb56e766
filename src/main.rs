//! route-compiler
//!
//! Compiles a directory of route files into a matchable prefix tree and
//! its build artifacts, and serves a preview of the result.
//!
//! # Architecture Overview
//!
//! ```text
//!   routes/                ┌──────────┐    ┌──────────────────────────────┐
//!   ├── index.rs    ──────▶│   scan   │───▶│ routing::compiler            │
//!   ├── layout.rs          └──────────┘    │ grammar → tree → compress    │
//!   ├── blog/[slug].rs                     │ → wrappers → CompiledRoutes  │
//!   └── api/...                            └──────────────┬───────────────┘
//!                                                         │
//!                     ┌───────────────────────────────────┼──────────────────┐
//!                     ▼                                   ▼                  ▼
//!              ┌─────────────┐                    ┌──────────────┐    ┌─────────────┐
//!              │ emit        │                    │ match (CLI)  │    │ http        │
//!              │ tree.json   │                    │ one-off path │    │ Dispatcher  │
//!              │ routes.json │                    │ resolution   │    │ + axum      │
//!              │ routes.rs   │                    └──────────────┘    └─────────────┘
//!              └─────────────┘
//! ```

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use route_compiler::config::{load_or_default, RouterConfig};
use route_compiler::emit::{self, RouteTable};
use route_compiler::http::{Dispatcher, HandlerRegistry, RouteServer};
use route_compiler::lifecycle::{signals::shutdown_signal, startup};
use route_compiler::routing::{compile_dir, CompileReport, MatchOutcome, Miss};

#[derive(Parser)]
#[command(name = "route-compiler")]
#[command(about = "Compile file-declared routes into a prefix tree", long_about = None)]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Routes root, overriding the config.
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile routes and write tree.json, routes.json and routes.rs
    Build {
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Keep single-child static chains uncompressed
        #[arg(long)]
        no_compress: bool,

        /// Skip the generated Rust module
        #[arg(long)]
        no_rust: bool,
    },
    /// Print the compiled route table
    Routes {
        #[arg(long)]
        json: bool,
    },
    /// Resolve one path against the compiled routes
    Match { path: String },
    /// Serve compiled routes with echo handlers
    Serve {
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.routes.root = root;
    }
    startup::init_observability(&config.observability);

    tracing::debug!(
        root = %config.routes.root.display(),
        out_dir = %config.build.out_dir.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Build {
            out_dir,
            no_compress,
            no_rust,
        } => {
            if let Some(out_dir) = out_dir {
                config.build.out_dir = out_dir;
            }
            config.build.compress &= !no_compress;
            config.build.emit_rust &= !no_rust;

            let (compilation, summary) = emit::build(&config)?;
            print_report(&compilation.report);
            for file in &summary.files {
                println!("wrote {}", file.display());
            }
        }
        Commands::Routes { json } => {
            let compilation = compile_dir(&config)?;
            print_report(&compilation.report);
            let table = RouteTable::from_compiled(&compilation.routes);
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
        }
        Commands::Match { path } => {
            let compilation = compile_dir(&config)?;
            let outcome = match compilation.routes.match_path(&path) {
                MatchOutcome::Found(found) => json!({
                    "matched": true,
                    "path": found.route.pattern,
                    "handlerId": found.handler(),
                    "kind": found.route.kind,
                    "params": found.params,
                    "middlewareRefs": found.middleware(),
                    "layoutRefs": found.layouts(),
                }),
                MatchOutcome::NotFound(miss) => json!({
                    "matched": false,
                    "reason": miss_reason(&miss),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            serve(config).await?;
        }
    }

    Ok(())
}

async fn serve(config: RouterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let compilation = compile_dir(&config)?;
    print_report(&compilation.report);

    let routes = Arc::new(compilation.routes);
    let registry = HandlerRegistry::preview(&routes);
    let dispatcher = Dispatcher::new(routes, registry);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    RouteServer::new(dispatcher, &config.server)
        .run(listener, shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_report(report: &CompileReport) {
    for error in &report.scan_errors {
        eprintln!("warning: {}", error);
    }
    for error in &report.parse_errors {
        eprintln!("warning: {}", error);
    }
    eprintln!(
        "compiled {} route(s), {} node merge(s)",
        report.routes, report.merges
    );
}

fn print_table(table: &RouteTable) {
    let width = table.routes.iter().map(|r| r.path.len()).max().unwrap_or(0);
    for row in &table.routes {
        println!(
            "{:<width$}  {:<4}  {}",
            row.path,
            row.kind.as_str(),
            row.handler_id,
            width = width
        );
    }
    if let Some(id) = &table.not_found {
        println!("not_found: {}", id);
    }
    if let Some(id) = &table.server_error {
        println!("error: {}", id);
    }
}

fn miss_reason(miss: &Miss) -> serde_json::Value {
    match miss {
        Miss::NoRoute => json!("no_route"),
        Miss::NoHandler => json!("no_handler"),
        Miss::Invalid(e) => json!({
            "invalidParam": e.param,
            "expected": e.expected,
            "value": e.value,
        }),
    }
}
