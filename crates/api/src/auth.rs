//! Bearer-token authentication
//!
//! A single static token from the configuration. No token configured
//! means an open admin surface (the deployment fronts it elsewhere).

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

/// Middleware rejecting requests without the configured bearer token.
pub(crate) async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ref token) = state.options.auth_token {
        let authorized = request
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|presented| presented == token);

        if !authorized {
            return ApiError::Unauthorized.into_response();
        }
    }

    next.run(request).await
}
