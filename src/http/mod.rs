//! HTTP dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, graceful shutdown)
//!     → tower-http layers (request id, trace, timeout)
//!     → dispatch.rs (match, middleware, handler, layouts)
//!     → registry.rs (reference → implementation)
//!     → context.rs (per-request state, handler contracts)
//! ```

pub mod context;
pub mod dispatch;
pub mod registry;
pub mod server;

pub use context::{
    FnHandler, FnLayout, Flow, Handler, HandlerError, HandlerOutput, Layout, Middleware,
    RequestContext,
};
pub use dispatch::Dispatcher;
pub use registry::{CommentLayout, EchoHandler, HandlerRegistry, TraceMiddleware};
pub use server::RouteServer;
