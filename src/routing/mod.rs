//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (build time):
//!     RouteDeclaration[] + ProviderIndex
//!     → grammar.rs (parse patterns into segments)
//!     → tree.rs (insert, detect conflicts)
//!     → compress.rs (collapse single-child static chains)
//!     → wrappers.rs (attach middleware/layout chains)
//!     → Freeze as immutable CompiledRoutes
//!
//! Incoming Request (path):
//!     → matcher.rs (walk the tree, validate typed params)
//!     → Return: RouteMatch or Miss
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - No regex in hot path (segment comparison and byte checks only)
//! - Deterministic: static beats param beats catch-all at every level
//! - No backtracking once a static child commits

pub mod compiler;
pub mod compress;
pub mod definition;
pub mod grammar;
pub mod matcher;
pub mod tree;
pub mod wrappers;

pub use compiler::{compile, compile_dir, compile_root, CompileError, CompileOptions, CompileReport, Compilation};
pub use definition::{HandlerRef, ParamSpec, ParamType, RouteDefinition, RouteKind};
pub use grammar::{ParseError, Segment};
pub use matcher::{normalize_path, CompiledRoutes, MatchOutcome, Miss, Params, RouteMatch, SpecialRoutes, ValidationError};
pub use tree::{ConflictError, RouteTree, TreeBuilder};
pub use wrappers::{resolve_chain, ProviderIndex, WrapperChain};
