//! Dispatch through the axum router: middleware, layouts and fallbacks.

use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use route_compiler::emit::TypedValue;
use route_compiler::http::{
    Dispatcher, Flow, HandlerError, HandlerOutput, HandlerRegistry, Middleware, RequestContext,
};
use route_compiler::routing::{compile, CompileOptions, CompiledRoutes};
use route_compiler::scan::{RouteDeclaration, ScanOutput};

mod common;
use common::{body_string, get};

type Log = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
    stop: bool,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            stop: false,
        }
    }

    fn stopping(name: &'static str, log: &Log) -> Self {
        Self {
            stop: true,
            ..Self::new(name, log)
        }
    }
}

#[async_trait]
impl Middleware for Recorder {
    async fn before(&self, _ctx: &mut RequestContext) -> Result<Flow, HandlerError> {
        self.log.lock().unwrap().push(format!("before {}", self.name));
        if self.stop {
            return Ok(Flow::Stop(
                HandlerOutput::text("stopped").with_status(StatusCode::FORBIDDEN),
            ));
        }
        Ok(Flow::Continue)
    }

    async fn after(&self, _ctx: &mut RequestContext) -> Result<(), HandlerError> {
        self.log.lock().unwrap().push(format!("after {}", self.name));
        Ok(())
    }
}

/// `/a/b/page` under middleware A (root), B (`a`) and C (`a/b`).
fn nested_routes() -> Arc<CompiledRoutes> {
    let scan = ScanOutput::default()
        .with_route(RouteDeclaration::page("/a/b/page", "a/b"))
        .with_middleware("", "A")
        .with_middleware("a", "B")
        .with_middleware("a/b", "C");
    Arc::new(compile(scan, &CompileOptions::default()).unwrap().routes)
}

fn page_handler(log: &Log) -> impl Fn(&RequestContext) -> Result<HandlerOutput, HandlerError> {
    let log = log.clone();
    move |_ctx: &RequestContext| {
        log.lock().unwrap().push("handler".to_string());
        Ok(HandlerOutput::html("page"))
    }
}

fn router(routes: Arc<CompiledRoutes>, registry: HandlerRegistry) -> axum::Router {
    Dispatcher::new(routes, registry).into_router(Duration::from_secs(5))
}

#[tokio::test]
async fn test_middleware_runs_outer_to_inner_then_unwinds() {
    let log = Log::default();
    let registry = HandlerRegistry::new()
        .handler_fn("a/b/page", page_handler(&log))
        .middleware("A", Recorder::new("A", &log))
        .middleware("B", Recorder::new("B", &log))
        .middleware("C", Recorder::new("C", &log));

    let response = router(nested_routes(), registry)
        .oneshot(get("/a/b/page"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        *log.lock().unwrap(),
        ["before A", "before B", "before C", "handler", "after C", "after B", "after A"]
    );
}

#[tokio::test]
async fn test_stop_short_circuits_remaining_chain() {
    let log = Log::default();
    let registry = HandlerRegistry::new()
        .handler_fn("a/b/page", page_handler(&log))
        .middleware("A", Recorder::stopping("A", &log))
        .middleware("B", Recorder::new("B", &log))
        .middleware("C", Recorder::new("C", &log));

    let response = router(nested_routes(), registry)
        .oneshot(get("/a/b/page"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response).await, "stopped");
    assert_eq!(*log.lock().unwrap(), ["before A"]);
}

#[tokio::test]
async fn test_unregistered_middleware_fails_closed() {
    let log = Log::default();
    let registry = HandlerRegistry::new()
        .handler_fn("a/b/page", page_handler(&log))
        .middleware("A", Recorder::new("A", &log));

    let response = router(nested_routes(), registry)
        .oneshot(get("/a/b/page"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_layouts_wrap_pages_innermost_first() {
    let scan = ScanOutput::default()
        .with_route(RouteDeclaration::page("/docs/intro", "docs"))
        .with_route(RouteDeclaration::api("/api/ping", "api"))
        .with_layout("", "root")
        .with_layout("docs", "docs")
        .with_layout("api", "api");
    let routes = Arc::new(compile(scan, &CompileOptions::default()).unwrap().routes);

    let registry = HandlerRegistry::new()
        .handler_fn("docs/intro", |_ctx: &RequestContext| Ok(HandlerOutput::html("intro")))
        .handler_fn("api/ping", |_ctx: &RequestContext| {
            HandlerOutput::json(&serde_json::json!({ "pong": true }))
        })
        .layout_fn("root", |body| format!("<html>{}</html>", body))
        .layout_fn("docs", |body| format!("<main>{}</main>", body))
        .layout_fn("api", |body| format!("<never>{}</never>", body));
    let app = router(routes, registry);

    let page = app.clone().oneshot(get("/docs/intro")).await.unwrap();
    assert_eq!(body_string(page).await, "<html><main>intro</main></html>");

    let api = app.oneshot(get("/api/ping")).await.unwrap();
    assert_eq!(body_string(api).await, r#"{"pong":true}"#);
}

#[tokio::test]
async fn test_not_found_slot_and_generic_fallback() {
    let mut scan = ScanOutput::default().with_route(RouteDeclaration::page("/home", ""));
    scan.specials.not_found = Some("not_found".into());
    let routes = Arc::new(compile(scan, &CompileOptions::default()).unwrap().routes);

    let with_slot = HandlerRegistry::new().handler_fn("not_found", |ctx: &RequestContext| {
        Ok(HandlerOutput::html(format!("nothing at {}", ctx.path)))
    });
    let response = router(routes.clone(), with_slot)
        .oneshot(get("/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "nothing at /missing");

    let response = router(routes, HandlerRegistry::new())
        .oneshot(get("/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Not Found");
}

#[tokio::test]
async fn test_handler_failure_renders_error_slot() {
    let mut scan = ScanOutput::default().with_route(RouteDeclaration::page("/boom", ""));
    scan.specials.server_error = Some("error".into());
    let routes = Arc::new(compile(scan, &CompileOptions::default()).unwrap().routes);

    let registry = HandlerRegistry::new()
        .handler_fn("boom", |_ctx: &RequestContext| Err(HandlerError::msg("kaboom")))
        .handler_fn("error", |ctx: &RequestContext| {
            Ok(HandlerOutput::text(format!(
                "failed: {}",
                ctx.error.as_deref().unwrap_or("?")
            )))
        });
    let response = router(routes.clone(), registry).oneshot(get("/boom")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "failed: kaboom");

    let registry = HandlerRegistry::new()
        .handler_fn("boom", |_ctx: &RequestContext| Err(HandlerError::msg("kaboom")));
    let response = router(routes, registry).oneshot(get("/boom")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "Internal Server Error");
}

#[tokio::test]
async fn test_handlers_receive_typed_params() {
    let scan = ScanOutput::default().with_route(RouteDeclaration::page("/item/[id:int]", "item"));
    let routes = Arc::new(compile(scan, &CompileOptions::default()).unwrap().routes);

    let registry = HandlerRegistry::new().handler_fn("item/[id:int]", |ctx: &RequestContext| {
        let params = ctx.typed_params()?;
        match &params["id"] {
            TypedValue::Int(id) => Ok(HandlerOutput::text(format!("item {}", id * 2))),
            other => Err(HandlerError::msg(format!("unexpected {:?}", other))),
        }
    });
    let app = router(routes, registry);

    let ok = app.clone().oneshot(get("/item/21")).await.unwrap();
    assert_eq!(body_string(ok).await, "item 42");

    let overflow = app.oneshot(get("/item/99999999999999999999999")).await.unwrap();
    assert_eq!(overflow.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let registry = HandlerRegistry::preview(&nested_routes());
    let response = router(nested_routes(), registry)
        .oneshot(get("/a/b/page"))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
    let trace: Vec<_> = response
        .headers()
        .get_all("x-route-middleware")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(trace, ["A", "B", "C"]);
}

#[test]
fn test_unknown_handler_ids_are_reported() {
    let registry = HandlerRegistry::new()
        .handler_fn("a/b/page", |_ctx: &RequestContext| Ok(HandlerOutput::text("")))
        .handler_fn("a/b/typo", |_ctx: &RequestContext| Ok(HandlerOutput::text("")));

    let dispatcher = Dispatcher::new(nested_routes(), registry);
    assert_eq!(dispatcher.unused_handlers(), ["a/b/typo"]);
}
