//! Data-driven request dispatch.
//!
//! Routes are plain values registered once at startup and scanned in
//! registration order; the first `(method, pattern)` match wins, so a more
//! specific pattern must be registered before an overlapping general one.

use std::{future::Future, pin::Pin};

use axum::{
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

pub mod pattern;

pub use pattern::{Params, PathPattern, PatternError};

use crate::{
    auth::{authenticate, Claims},
    db::Connection,
    error::ApiError,
    state::AppState,
};

/// What the dispatcher needs from an inbound HTTP request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Per-request handler context.
///
/// The datastore connection is checked out on first use and held until the
/// context is dropped, which happens on every exit path of the handler.
pub struct Ctx {
    pub state: AppState,
    pub params: Params,
    pub claims: Option<Claims>,
    pub body: Bytes,
    conn: Option<Box<dyn Connection>>,
}

impl Ctx {
    pub fn new(state: AppState, params: Params, claims: Option<Claims>, body: Bytes) -> Self {
        Self {
            state,
            params,
            claims,
            body,
            conn: None,
        }
    }

    pub async fn conn(&mut self) -> Result<&mut dyn Connection, ApiError> {
        if self.conn.is_none() {
            self.conn = Some(self.state.store.acquire().await?);
        }
        match self.conn.as_deref_mut() {
            Some(conn) => Ok(conn),
            None => Err(ApiError::Internal(anyhow::anyhow!("connection not acquired"))),
        }
    }

    /// The `:id` capture as an integer.
    pub fn id(&self) -> Result<i64, ApiError> {
        self.params
            .get("id")
            .or_else(|| self.params.positional(0))
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| ApiError::validation("Invalid id"))
    }

    /// The body as a JSON object; an empty body is an empty object.
    pub fn json_body(&self) -> Result<Map<String, Value>, ApiError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ApiError::validation("Invalid JSON body")),
        }
    }

    /// The authenticated user, for audit logging.
    pub fn user_id(&self) -> Option<i64> {
        self.claims.as_ref().map(|c| c.user_id)
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>>;
pub type Handler = fn(Ctx) -> HandlerFuture;

pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: Handler,
    pub protected: bool,
}

#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
        protected: bool,
    ) -> Result<Self, PatternError> {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern)?,
            handler,
            protected,
        });
        Ok(self)
    }

    pub fn public(
        self,
        method: Method,
        pattern: &str,
        handler: Handler,
    ) -> Result<Self, PatternError> {
        self.register(method, pattern, handler, false)
    }

    pub fn protected(
        self,
        method: Method,
        pattern: &str,
        handler: Handler,
    ) -> Result<Self, PatternError> {
        self.register(method, pattern, handler, true)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .filter(|r| r.method == *method)
            .find_map(|r| r.pattern.matches(path).map(|params| (r, params)))
    }

    /// Routes, authenticates and runs one request.
    ///
    /// Auth failures and unknown routes end here without running a handler.
    /// OPTIONS never goes through the auth gate.
    #[instrument(skip_all, fields(method = %req.method, path = %req.path))]
    pub async fn dispatch(&self, state: AppState, req: ApiRequest) -> Response {
        let Some((route, params)) = self.resolve(&req.method, &req.path) else {
            debug!("no route matched");
            return ApiError::RouteNotFound.into_response();
        };

        let claims = if route.protected && req.method != Method::OPTIONS {
            match authenticate(&req.headers, state.tokens.as_ref()) {
                Ok(claims) => Some(claims),
                Err(rejection) => return ApiError::from(rejection).into_response(),
            }
        } else {
            None
        };

        debug!(route = route.pattern.as_str(), "route matched");
        let ctx = Ctx::new(state, params, claims, req.body);
        match (route.handler)(ctx).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}
