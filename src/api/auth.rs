//! Auth endpoints and the bearer-token middleware guarding the
//! protected routes.

use axum::{
    Json,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use super::error::ApiError;
use super::types::{ApiResponse, LoginRequest, RegisterRequest};
use crate::entities::users::UserRole;
use crate::services::{LoginResult, RegisterResult};
use crate::state::SharedState;
use crate::token::Claims;

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .map(ToString::to_string)
}

/// Verifies the bearer token and stashes its claims for handlers.
pub async fn require_auth(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let claims = state.auth_service.verify_token(&token).await?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(AuthToken(token));

    Ok(next.run(request).await)
}

/// Rejects non-admin tokens. Layered after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    if claims.role != UserRole::Admin {
        return Err(ApiError::Forbidden("admin role required".to_string()));
    }

    Ok(next.run(request).await)
}

/// The raw token that authenticated the current request, for logout.
#[derive(Clone)]
pub struct AuthToken(pub String);

pub async fn register(
    State(state): State<SharedState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResult>>, ApiError> {
    let result = state
        .auth_service
        .register(&body.username, &body.password)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    let result = state
        .auth_service
        .login(&body.app_key, &body.username, &body.password, &body.device_id)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

pub async fn logout(
    State(state): State<SharedState>,
    axum::Extension(token): axum::Extension<AuthToken>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let revoked = state.auth_service.logout(&token.0).await?;
    Ok(Json(ApiResponse::success(revoked)))
}

pub async fn me(
    axum::Extension(claims): axum::Extension<Claims>,
) -> Json<ApiResponse<Claims>> {
    Json(ApiResponse::success(claims))
}
