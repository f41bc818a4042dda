//! Permission check endpoints, the hot path for client SDKs.

use std::collections::HashMap;

use axum::{Extension, Json, extract::State};

use super::error::ApiError;
use super::types::{ApiResponse, CheckPermissionRequest, CheckPermissionsRequest};
use crate::services::{PermissionDecision, UserPermissions};
use crate::state::SharedState;
use crate::token::Claims;

pub async fn check(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CheckPermissionRequest>,
) -> Result<Json<ApiResponse<PermissionDecision>>, ApiError> {
    let decision = state
        .permission_service
        .check_permission(
            claims.app_id,
            claims.user_id,
            &claims.device_id,
            &body.permission_key,
        )
        .await?;

    Ok(Json(ApiResponse::success(decision)))
}

pub async fn check_batch(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CheckPermissionsRequest>,
) -> Result<Json<ApiResponse<HashMap<String, PermissionDecision>>>, ApiError> {
    let decisions = state
        .permission_service
        .check_permissions(
            claims.app_id,
            claims.user_id,
            &claims.device_id,
            &body.permission_keys,
        )
        .await?;

    Ok(Json(ApiResponse::success(decisions)))
}

pub async fn mine(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<UserPermissions>>, ApiError> {
    let permissions = state
        .permission_service
        .get_user_permissions(claims.app_id, claims.user_id, &claims.device_id)
        .await?;

    Ok(Json(ApiResponse::success(permissions)))
}
