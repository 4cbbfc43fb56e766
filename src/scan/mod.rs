//! Route declaration scanning.
//!
//! # Data Flow
//! ```text
//! routes root (directory tree)
//!     → scanner.rs (recursive walk, sorted by file name)
//!     → conventions.rs (index / layout / middleware / special / test)
//!     → ScanOutput { declarations, providers, specials, errors }
//!     → routing::compiler (parse, build, compress, resolve wrappers)
//! ```
//!
//! # Conventions
//! - `blog/[slug].rs` declares `/blog/[slug]`
//! - `index.rs` declares its directory (`/` at the root)
//! - `layout.rs` and `middleware.rs` wrap every route at or below their directory
//! - `not_found.rs` and `error.rs` at the root fill the special slots
//! - Files ending in `_test` or starting with `test_` are ignored

pub mod conventions;
pub mod scanner;

pub use scanner::{scan_routes, RouteDeclaration, ScanError, ScanOptions, ScanOutput};
