use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use balances_core::{check_credentials, Credentials, Environment};
use tracing::info;

use super::error::ApiError;

/// Credential check placed in front of the write route.
#[derive(Clone, Debug)]
pub(super) struct AuthGate {
    pub expected: Credentials,
    pub environment: Environment,
}

fn supplied_credentials(req: &Request<Body>) -> Option<Credentials> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(Credentials::from_basic_auth)
}

pub(super) async fn require_basic_auth(
    State(gate): State<AuthGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let supplied = supplied_credentials(&req);
    let diagnostics = gate.environment.verbose_diagnostics();

    if diagnostics {
        info!(
            received = ?supplied.as_ref().map(|c| c.name.as_str()),
            expected = %gate.expected.name,
            "auth attempt"
        );
    }

    if !check_credentials(supplied.as_ref(), &gate.expected) {
        if diagnostics {
            info!("auth failed");
        }
        // Do not leak whether credentials were missing vs incorrect.
        return ApiError::Unauthorized.into_response();
    }

    if diagnostics {
        info!("auth success");
    }
    next.run(req).await
}
