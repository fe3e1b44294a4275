//! Admin bearer-token middleware
//!
//! The administrative surface (raw storage listing, full reset) is gated by
//! a single bearer token from `ADMIN_TOKEN`. Admin routes are disabled
//! outright when no token is configured.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::types::{AppError, Environment};

/// Admin authentication middleware
///
/// 1. Requires `ADMIN_TOKEN` to be configured; 404 otherwise so the admin
///    surface stays invisible.
/// 2. Extracts the Bearer token from the Authorization header.
/// 3. Returns 401 for a missing or wrong token.
///
/// # Errors
///
/// - `AppError` with 404/401 as above
pub async fn admin_auth_middleware(
    Extension(environment): Extension<Environment>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = environment.admin_token() else {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "Not found",
            false,
        ));
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Invalid admin token",
            false,
        )),
        None => Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "Authorization header must contain a valid Bearer token",
            false,
        )),
    }
}
