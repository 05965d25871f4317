use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    db::{FieldMap, FieldValue},
    error::ApiError,
    routing::{PatternError, RouteTable},
};

pub mod auth;
pub mod categories;
pub mod docs;
pub mod products;

/// Every endpoint the API serves, in match order.
pub fn table() -> Result<RouteTable, PatternError> {
    RouteTable::new()
        .public(Method::POST, "/auth", auth::login)?
        .protected(Method::GET, "/category", categories::list)?
        .protected(Method::GET, "/category/:id", categories::get)?
        .protected(Method::POST, "/category", categories::create)?
        .protected(Method::PUT, "/category/:id", categories::update)?
        .protected(Method::DELETE, "/category/:id", categories::delete)?
        .protected(Method::GET, "/product", products::list)?
        .protected(Method::GET, "/product/:id", products::get)?
        .protected(Method::POST, "/product", products::create)?
        .protected(Method::PUT, "/product/:id", products::update)?
        .protected(Method::DELETE, "/product/:id", products::delete)?
        .public(Method::GET, "/openapi.yaml", docs::openapi)?
        .public(Method::GET, "/docs", docs::swagger_ui)?
        .public(Method::GET, "/", docs::swagger_ui)
}

pub(crate) fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

/// A create field that must be present and non-empty; `0`, `"0"` and `""`
/// count as missing.
pub(crate) fn required<'a>(fields: &'a FieldMap, name: &str) -> Result<&'a FieldValue, ApiError> {
    fields
        .get(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("Missing required field: {name}")))
}

pub(crate) fn integer(name: &str, value: &FieldValue) -> Result<i64, ApiError> {
    value
        .as_i64()
        .ok_or_else(|| ApiError::validation(format!("Invalid value for field: {name}")))
}

pub(crate) fn number(name: &str, value: &FieldValue) -> Result<f64, ApiError> {
    value
        .as_f64()
        .ok_or_else(|| ApiError::validation(format!("Invalid value for field: {name}")))
}

/// `active` on create: 1 when absent, otherwise the value read leniently as
/// an integer, so `"yes"` is 0 and `5` stays 5.
pub(crate) fn active_flag(fields: &FieldMap) -> i64 {
    fields.get("active").map_or(1, FieldValue::to_int_lossy)
}
