//! Request dispatch over compiled routes.
//!
//! # Data Flow
//! ```text
//! Request (path)
//!     → CompiledRoutes::match_path
//!     → Found: middleware.before (outer → inner)
//!             → handler
//!             → middleware.after (inner → outer, entered only)
//!             → layouts (innermost first, page routes only)
//!     → Miss: not_found slot, else 404 text
//!     → Err:  server_error slot, else 500 text
//! ```
//!
//! # Design Decisions
//! - References are resolved once at construction, never per request
//! - A route whose middleware cannot be resolved fails closed (500)
//! - Unresolved layouts are skipped with a warning
//! - A `Stop` response is returned as-is: no `after` hooks, no layouts

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::emit::decoders::ParamShape;
use crate::http::context::{Flow, Handler, HandlerError, HandlerOutput, Layout, Middleware, RequestContext};
use crate::http::registry::HandlerRegistry;
use crate::observability::metrics;
use crate::routing::definition::RouteKind;
use crate::routing::matcher::{CompiledRoutes, MatchOutcome, Miss, RouteMatch};

const GENERIC_NOT_FOUND: &str = "Not Found";
const GENERIC_SERVER_ERROR: &str = "Internal Server Error";

struct ResolvedRoute {
    handler: Option<Arc<dyn Handler>>,
    /// `Err` holds the first middleware reference with no registration.
    middleware: Result<Vec<Arc<dyn Middleware>>, String>,
    layouts: Vec<Arc<dyn Layout>>,
    shape: ParamShape,
}

/// Runs matched routes through their middleware, handler and layouts.
pub struct Dispatcher {
    routes: Arc<CompiledRoutes>,
    resolved: HashMap<String, ResolvedRoute>,
    not_found: Option<Arc<dyn Handler>>,
    server_error: Option<Arc<dyn Handler>>,
    unused_handlers: Vec<String>,
}

impl Dispatcher {
    pub fn new(routes: Arc<CompiledRoutes>, registry: HandlerRegistry) -> Self {
        let mut referenced = HashSet::new();
        let mut resolved = HashMap::new();

        for (route, chain) in routes.routes() {
            let id = route.handler.as_str();
            referenced.insert(id.to_string());

            let handler = registry
                .handlers
                .get(id)
                .or(registry.fallback.as_ref())
                .cloned();
            if handler.is_none() {
                tracing::warn!(route = %route.pattern, handler = %id, "No handler registered");
            }

            let middleware = chain
                .middleware
                .iter()
                .map(|m| registry.middleware.get(m).cloned().ok_or_else(|| m.clone()))
                .collect::<Result<Vec<_>, _>>();
            if let Err(missing) = &middleware {
                tracing::warn!(
                    route = %route.pattern,
                    middleware = %missing,
                    "No middleware registered; route will fail closed"
                );
            }

            let layouts = chain
                .layouts
                .iter()
                .filter_map(|l| {
                    let layout = registry.layouts.get(l).cloned();
                    if layout.is_none() {
                        tracing::warn!(route = %route.pattern, layout = %l, "No layout registered; skipping");
                    }
                    layout
                })
                .collect();

            resolved.insert(
                route.pattern.clone(),
                ResolvedRoute {
                    handler,
                    middleware,
                    layouts,
                    shape: ParamShape::of(route),
                },
            );
        }

        let specials = routes.specials();
        let mut slot = |id: &Option<String>| {
            id.as_ref().and_then(|id| {
                referenced.insert(id.clone());
                registry.handlers.get(id).or(registry.fallback.as_ref()).cloned()
            })
        };
        let not_found = slot(&specials.not_found);
        let server_error = slot(&specials.server_error);

        let mut unused_handlers: Vec<String> = registry
            .handlers
            .keys()
            .filter(|id| !referenced.contains(*id))
            .cloned()
            .collect();
        unused_handlers.sort();
        for id in &unused_handlers {
            tracing::warn!(handler = %id, "Registered handler matches no compiled route");
        }

        tracing::info!(
            routes = resolved.len(),
            not_found = not_found.is_some(),
            server_error = server_error.is_some(),
            "Dispatcher ready"
        );

        Self {
            routes,
            resolved,
            not_found,
            server_error,
            unused_handlers,
        }
    }

    /// Registered handler ids that no compiled route or slot refers to.
    pub fn unused_handlers(&self) -> &[String] {
        &self.unused_handlers
    }

    pub fn routes(&self) -> &CompiledRoutes {
        &self.routes
    }

    /// Dispatch one request.
    pub async fn dispatch(&self, mut ctx: RequestContext) -> Response {
        let start = Instant::now();
        let (kind, result) = match self.routes.match_path(&ctx.path) {
            MatchOutcome::Found(found) => {
                let kind = found.route.kind;
                (kind.as_str(), self.run_route(found, &mut ctx).await)
            }
            MatchOutcome::NotFound(miss) => {
                metrics::record_miss(&miss);
                ("miss", self.render_not_found(&mut ctx, &miss).await)
            }
        };

        let output = match result {
            Ok(output) => output,
            Err(error) => self.render_server_error(&mut ctx, error).await,
        };

        metrics::record_dispatch(kind, output.status.as_u16(), start);
        tracing::debug!(
            request_id = %ctx.request_id,
            path = %ctx.path,
            status = output.status.as_u16(),
            "Request dispatched"
        );

        let mut response = output.into_response();
        response.headers_mut().extend(ctx.response_headers);
        response
    }

    async fn run_route(
        &self,
        found: RouteMatch<'_>,
        ctx: &mut RequestContext,
    ) -> Result<HandlerOutput, HandlerError> {
        let route = found.route;
        let resolved = self
            .resolved
            .get(&route.pattern)
            .ok_or_else(|| HandlerError::Unresolved {
                kind: "route",
                id: route.pattern.clone(),
            })?;

        ctx.params = found.params;
        ctx.handler = Some(route.handler.to_string());
        ctx.kind = route.kind;
        ctx.shape = resolved.shape.clone();

        let middleware = resolved
            .middleware
            .as_ref()
            .map_err(|missing| HandlerError::Unresolved {
                kind: "middleware",
                id: missing.clone(),
            })?;
        let handler = resolved
            .handler
            .as_ref()
            .ok_or_else(|| HandlerError::Unresolved {
                kind: "handler",
                id: route.handler.to_string(),
            })?;

        let mut entered = 0;
        for m in middleware {
            match m.before(ctx).await? {
                Flow::Continue => entered += 1,
                Flow::Stop(output) => {
                    tracing::debug!(request_id = %ctx.request_id, depth = entered, "Middleware stopped request");
                    return Ok(output);
                }
            }
        }

        let mut output = handler.call(ctx).await?;

        for m in middleware[..entered].iter().rev() {
            m.after(ctx).await?;
        }

        if route.kind == RouteKind::Page {
            for layout in &resolved.layouts {
                output.body = layout.wrap(output.body);
            }
        }
        Ok(output)
    }

    async fn render_not_found(
        &self,
        ctx: &mut RequestContext,
        miss: &Miss,
    ) -> Result<HandlerOutput, HandlerError> {
        tracing::debug!(request_id = %ctx.request_id, path = %ctx.path, reason = ?miss, "No route matched");

        let Some(handler) = &self.not_found else {
            return Ok(HandlerOutput::text(GENERIC_NOT_FOUND).with_status(StatusCode::NOT_FOUND));
        };
        ctx.handler = self.routes.specials().not_found.clone();
        let output = handler.call(ctx).await?;
        Ok(force_status(output, StatusCode::NOT_FOUND))
    }

    async fn render_server_error(&self, ctx: &mut RequestContext, error: HandlerError) -> HandlerOutput {
        tracing::error!(
            request_id = %ctx.request_id,
            path = %ctx.path,
            handler = ?ctx.handler,
            error = %error,
            "Request failed"
        );
        let generic = || HandlerOutput::text(GENERIC_SERVER_ERROR).with_status(StatusCode::INTERNAL_SERVER_ERROR);

        let Some(handler) = &self.server_error else {
            return generic();
        };
        ctx.error = Some(error.to_string());
        ctx.handler = self.routes.specials().server_error.clone();
        match handler.call(ctx).await {
            Ok(output) => force_status(output, StatusCode::INTERNAL_SERVER_ERROR),
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id, error = %e, "Server error handler failed");
                generic()
            }
        }
    }

    /// Wrap the dispatcher in an axum router with tracing, request-id and
    /// timeout layers.
    #[allow(deprecated)]
    pub fn into_router(self, request_timeout: Duration) -> Router {
        Router::new()
            .fallback(dispatch_request)
            .with_state(Arc::new(self))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(request_timeout))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }
}

/// Slot handlers keep their own non-success status; a success becomes `status`.
fn force_status(output: HandlerOutput, status: StatusCode) -> HandlerOutput {
    if output.status.is_success() {
        output.with_status(status)
    } else {
        output
    }
}

async fn dispatch_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    let (parts, _body) = request.into_parts();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let ctx = RequestContext::new(parts.method, parts.uri.path(), parts.headers, request_id);
    dispatcher.dispatch(ctx).await
}
