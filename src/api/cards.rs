//! Client-facing card endpoints. The app and user come from the login
//! token; the device defaults to the one the token was issued for.

use axum::{Extension, Json, extract::State};

use super::error::ApiError;
use super::types::{ApiResponse, BindCardRequest, UnbindCardRequest, VerifyCardRequest};
use crate::services::{BindResult, CardCheck, CardSummary};
use crate::state::SharedState;
use crate::token::Claims;

pub async fn bind(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<BindCardRequest>,
) -> Result<Json<ApiResponse<BindResult>>, ApiError> {
    let device_id = body.device_id.as_deref().unwrap_or(&claims.device_id);

    let result = state
        .card_service
        .bind_card(
            claims.app_id,
            claims.user_id,
            &body.card_key,
            device_id,
            body.device_name.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

pub async fn unbind(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<UnbindCardRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let device_id = body.device_id.as_deref().unwrap_or(&claims.device_id);

    state
        .card_service
        .unbind_card(claims.app_id, claims.user_id, body.card_id, device_id)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

pub async fn my_cards(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<CardSummary>>>, ApiError> {
    let cards = state
        .card_service
        .my_cards(claims.app_id, claims.user_id)
        .await?;

    Ok(Json(ApiResponse::success(cards)))
}

pub async fn verify(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<VerifyCardRequest>,
) -> Result<Json<ApiResponse<CardCheck>>, ApiError> {
    let check = state
        .card_service
        .verify_card(claims.app_id, &body.card_key)
        .await?;

    Ok(Json(ApiResponse::success(check)))
}
