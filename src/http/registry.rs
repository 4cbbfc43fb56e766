//! Handler, middleware and layout registry.
//!
//! Compiled routes only carry opaque references (`blog/[slug]`,
//! `admin/middleware`). The registry maps those references to runnable
//! implementations; the dispatcher resolves them once at construction.

use async_trait::async_trait;
use axum::http::HeaderValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::http::context::{
    FnHandler, FnLayout, Flow, Handler, HandlerError, HandlerOutput, Layout, Middleware,
    RequestContext,
};
use crate::routing::definition::RouteKind;
use crate::routing::matcher::CompiledRoutes;

/// Header listing the preview middleware a request passed through.
pub const MIDDLEWARE_TRACE_HEADER: &str = "x-route-middleware";

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    pub(crate) handlers: HashMap<String, Arc<dyn Handler>>,
    pub(crate) middleware: HashMap<String, Arc<dyn Middleware>>,
    pub(crate) layouts: HashMap<String, Arc<dyn Layout>>,
    pub(crate) fallback: Option<Arc<dyn Handler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .field("middleware", &self.middleware.len())
            .field("layouts", &self.layouts.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(mut self, id: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handlers.insert(id.into(), Arc::new(handler));
        self
    }

    /// Register a synchronous closure as a handler.
    pub fn handler_fn<F>(self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<HandlerOutput, HandlerError> + Send + Sync + 'static,
    {
        self.handler(id, FnHandler(f))
    }

    pub fn middleware(mut self, id: impl Into<String>, middleware: impl Middleware + 'static) -> Self {
        self.middleware.insert(id.into(), Arc::new(middleware));
        self
    }

    pub fn layout(mut self, id: impl Into<String>, layout: impl Layout + 'static) -> Self {
        self.layouts.insert(id.into(), Arc::new(layout));
        self
    }

    pub fn layout_fn<F>(self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.layout(id, FnLayout(f))
    }

    /// Handler used for routes whose id has no registration.
    pub fn fallback_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Echo every compiled reference, for previewing a routes tree.
    pub fn preview(compiled: &CompiledRoutes) -> Self {
        let mut registry = Self::new().fallback_handler(EchoHandler);

        for (_, chain) in compiled.routes() {
            for id in &chain.middleware {
                if !registry.middleware.contains_key(id) {
                    registry = registry.middleware(id.clone(), TraceMiddleware::new(id.clone()));
                }
            }
            for id in &chain.layouts {
                if !registry.layouts.contains_key(id) {
                    registry = registry.layout(id.clone(), CommentLayout::new(id.clone()));
                }
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Responds with what was matched: handler id, path and captures.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn call(&self, ctx: &mut RequestContext) -> Result<HandlerOutput, HandlerError> {
        let body = serde_json::json!({
            "handler": ctx.handler,
            "method": ctx.method.as_str(),
            "path": ctx.path,
            "params": ctx.params,
            "requestId": ctx.request_id,
            "error": ctx.error,
        });
        match ctx.kind {
            RouteKind::Api => HandlerOutput::json(&body),
            RouteKind::Page => Ok(HandlerOutput::html(format!(
                "<pre>{}</pre>",
                serde_json::to_string_pretty(&body)?
            ))),
        }
    }
}

/// Logs entry and exit, and records itself in a response header.
#[derive(Debug, Clone)]
pub struct TraceMiddleware {
    id: String,
}

impl TraceMiddleware {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Middleware for TraceMiddleware {
    async fn before(&self, ctx: &mut RequestContext) -> Result<Flow, HandlerError> {
        tracing::debug!(request_id = %ctx.request_id, middleware = %self.id, "Middleware before");
        if let Ok(value) = HeaderValue::from_str(&self.id) {
            ctx.response_headers.append(MIDDLEWARE_TRACE_HEADER, value);
        }
        Ok(Flow::Continue)
    }

    async fn after(&self, ctx: &mut RequestContext) -> Result<(), HandlerError> {
        tracing::debug!(request_id = %ctx.request_id, middleware = %self.id, "Middleware after");
        Ok(())
    }
}

/// Marks the wrapped body with HTML comments naming the layout.
#[derive(Debug, Clone)]
pub struct CommentLayout {
    id: String,
}

impl CommentLayout {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Layout for CommentLayout {
    fn wrap(&self, body: String) -> String {
        format!("<!-- layout:{0} -->\n{1}\n<!-- /layout:{0} -->", self.id, body)
    }
}
