use std::any::Any;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::{middleware, response::Response};
use tracing::error;

use super::error::ApiError;

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";
const DEFAULT_ALLOWED_HEADERS: &str = "Content-Type,Authorization";

/// Outermost stage: hardening headers on every response, including short-circuited ones.
pub(super) async fn security_headers(
    req: axum::http::Request<Body>,
    next: middleware::Next,
) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    resp
}

fn insert_allow_origin(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
}

/// Open CORS. Preflight requests are answered here and never reach a route.
pub(super) async fn cors(req: axum::http::Request<Body>, next: middleware::Next) -> Response {
    if req.method() == Method::OPTIONS {
        let requested_headers = req
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS));

        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = StatusCode::NO_CONTENT;
        let headers = resp.headers_mut();
        insert_allow_origin(headers);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested_headers);
        headers.insert(header::VARY, HeaderValue::from_static("Access-Control-Request-Headers"));
        return resp;
    }

    let mut resp = next.run(req).await;
    insert_allow_origin(resp.headers_mut());
    resp
}

/// Turns a panicking handler into `500 internal server error`. Runs just inside
/// [`security_headers`] so the 500 is still hardened.
pub(super) fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %message, "request handler panicked");
    ApiError::Internal.into_response()
}
