//! Canned responses produced by the server itself (not by the file handler).

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Rejection for denied requests. The body is fixed so nothing from the
/// requested file can leak into it.
pub fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        [(header::CACHE_CONTROL, "no-store")],
        "Forbidden",
    )
        .into_response()
}
