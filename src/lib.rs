//! File-declared route compiler and matcher.
//!
//! Route files under a directory tree become path patterns
//! (`blog/[slug].rs` → `/blog/[slug]`). They are compiled into a compressed
//! prefix tree that resolves a request path to its handler, typed
//! parameters and middleware/layout chain in time bounded by the path length.
//!
//! ```text
//! routes/ ──▶ scan ──▶ routing::compiler ──▶ CompiledRoutes ──┬──▶ emit (tree.json, routes.json, routes.rs)
//!                                                             └──▶ http::Dispatcher (axum)
//! ```

pub mod config;
pub mod emit;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod scan;

pub use config::RouterConfig;
pub use http::{Dispatcher, HandlerRegistry, RouteServer};
pub use lifecycle::Shutdown;
pub use routing::{compile, compile_dir, CompiledRoutes, MatchOutcome, Miss};
