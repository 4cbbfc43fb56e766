//! Request context and the handler, middleware and layout contracts.

use async_trait::async_trait;
use axum::http::{header, Extensions, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::emit::decoders::{DecodeError, ParamShape, TypedParams};
use crate::routing::definition::RouteKind;
use crate::routing::matcher::Params;

/// Failure raised by a handler or middleware. Rendered as a server error.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no {kind} registered for '{id}'")]
    Unresolved { kind: &'static str, id: String },
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}

/// Per-request state shared by middleware, handler and special slots.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub request_id: String,
    /// Raw captures of the matched route.
    pub params: Params,
    /// Handler id being run (the matched route or a special slot).
    pub handler: Option<String>,
    pub kind: RouteKind,
    /// Set before the server-error slot runs.
    pub error: Option<String>,
    /// Headers merged into the final response.
    pub response_headers: HeaderMap,
    /// Values middleware hands to later middleware or the handler.
    pub extensions: Extensions,
    pub(crate) shape: ParamShape,
}

impl RequestContext {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            request_id: request_id.into(),
            params: Params::new(),
            handler: None,
            kind: RouteKind::Page,
            error: None,
            response_headers: HeaderMap::new(),
            extensions: Extensions::new(),
            shape: ParamShape::default(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Decode the captures into their declared types.
    pub fn typed_params(&self) -> Result<TypedParams, DecodeError> {
        self.shape.decode(&self.params)
    }
}

/// A rendered response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutput {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl HandlerOutput {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/html; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        Ok(Self {
            status: StatusCode::OK,
            content_type: "application/json",
            body: serde_json::to_string(value)?,
        })
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for HandlerOutput {
    fn into_response(self) -> Response {
        let content_type = HeaderValue::from_static(self.content_type);
        (self.status, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

/// What a middleware `before` hook decided.
#[derive(Debug)]
pub enum Flow {
    Continue,
    /// Skip the remaining middleware and the handler; respond with this.
    Stop(HandlerOutput),
}

/// A route handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> Result<HandlerOutput, HandlerError>;
}

/// A directory-level request interceptor.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn before(&self, _ctx: &mut RequestContext) -> Result<Flow, HandlerError> {
        Ok(Flow::Continue)
    }

    /// Runs only after the handler succeeded, and only if `before` ran.
    async fn after(&self, _ctx: &mut RequestContext) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// A directory-level page wrapper.
pub trait Layout: Send + Sync {
    fn wrap(&self, body: String) -> String;
}

/// Adapts a synchronous closure into a [`Handler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&RequestContext) -> Result<HandlerOutput, HandlerError> + Send + Sync,
{
    async fn call(&self, ctx: &mut RequestContext) -> Result<HandlerOutput, HandlerError> {
        (self.0)(&*ctx)
    }
}

/// Adapts a closure into a [`Layout`].
pub struct FnLayout<F>(pub F);

impl<F> Layout for FnLayout<F>
where
    F: Fn(String) -> String + Send + Sync,
{
    fn wrap(&self, body: String) -> String {
        (self.0)(body)
    }
}
