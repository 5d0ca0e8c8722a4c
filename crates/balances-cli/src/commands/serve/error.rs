use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use balances_core::PayloadRejection;
use serde_json::json;

/// Every non-success outcome of the HTTP surface.
#[derive(Debug)]
pub(super) enum ApiError {
    InvalidPayload(PayloadRejection),
    Unauthorized,
    NoData,
    NotFound { path: String },
    TriggerFailed,
    Internal,
}

impl From<PayloadRejection> for ApiError {
    fn from(rejection: PayloadRejection) -> Self {
        Self::InvalidPayload(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidPayload(rejection) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid payload", "detail": rejection.to_string() }),
            ),
            ApiError::Unauthorized => {
                let mut resp =
                    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })))
                        .into_response();
                resp.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"balances\""),
                );
                return resp;
            }
            ApiError::NoData => (StatusCode::NOT_FOUND, json!({ "error": "no data yet" })),
            ApiError::NotFound { path } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not found", "path": path }),
            ),
            ApiError::TriggerFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "failed to trigger update" }),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal server error" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
