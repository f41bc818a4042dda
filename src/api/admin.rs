//! Admin console endpoints. All routes here sit behind the admin
//! middleware layer.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::error::ApiError;
use super::types::{
    ApiResponse, CreateAppBody, CreateFeaturePermissionBody, DeleteCardsBody, GenerateCardsBody,
    PageQuery, SetEnabledBody, SetPermissionsBody,
};
use crate::db::{NewFeaturePermission, User};
use crate::entities::{apps, card_devices, cards::CardStatus, feature_permissions, users::UserStatus};
use crate::services::{CardRow, GenerateCardsRequest, Page, StatsSummary};
use crate::state::SharedState;

fn parse_card_status(raw: Option<&str>) -> Result<Option<CardStatus>, ApiError> {
    match raw {
        None => Ok(None),
        Some("unused") => Ok(Some(CardStatus::Unused)),
        Some("used") => Ok(Some(CardStatus::Used)),
        Some("disabled") => Ok(Some(CardStatus::Disabled)),
        Some(other) => Err(ApiError::ValidationError(format!(
            "unknown card status: {other}"
        ))),
    }
}

fn parse_user_status(raw: Option<&str>) -> Result<Option<UserStatus>, ApiError> {
    match raw {
        None => Ok(None),
        Some("normal") => Ok(Some(UserStatus::Normal)),
        Some("banned") => Ok(Some(UserStatus::Banned)),
        Some(other) => Err(ApiError::ValidationError(format!(
            "unknown user status: {other}"
        ))),
    }
}

// ---- cards ----

pub async fn generate_cards(
    State(state): State<SharedState>,
    Json(body): Json<GenerateCardsBody>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let cards = state
        .admin_service
        .generate_cards(GenerateCardsRequest {
            app_id: body.app_id,
            count: body.count,
            valid_days: body.valid_days,
            max_device_count: body.max_device_count,
            permissions: body.permissions,
            remark: body.remark,
        })
        .await?;

    let keys = cards.into_iter().map(|c| c.card_key).collect();

    Ok(Json(ApiResponse::success(keys)))
}

pub async fn list_cards(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<CardRow>>>, ApiError> {
    let status = parse_card_status(query.status.as_deref())?;

    let page = state
        .admin_service
        .list_cards(
            query.page,
            query.size,
            query.app_id,
            status,
            query.keyword.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(page)))
}

pub async fn get_card(
    State(state): State<SharedState>,
    Path(card_id): Path<i32>,
) -> Result<Json<ApiResponse<CardRow>>, ApiError> {
    let card = state.admin_service.get_card(card_id).await?;
    Ok(Json(ApiResponse::success(card)))
}

pub async fn set_card_status(
    State(state): State<SharedState>,
    Path(card_id): Path<i32>,
    Json(body): Json<SetEnabledBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .admin_service
        .set_card_enabled(card_id, body.enabled)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

pub async fn set_card_permissions(
    State(state): State<SharedState>,
    Path(card_id): Path<i32>,
    Json(body): Json<SetPermissionsBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .admin_service
        .update_card_permissions(card_id, body.permissions)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

pub async fn delete_cards(
    State(state): State<SharedState>,
    Json(body): Json<DeleteCardsBody>,
) -> Result<Json<ApiResponse<u64>>, ApiError> {
    let deleted = state.admin_service.delete_cards(&body.card_ids).await?;
    Ok(Json(ApiResponse::success(deleted)))
}

// ---- users ----

pub async fn list_users(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<UserDto>>>, ApiError> {
    let status = parse_user_status(query.status.as_deref())?;

    let page = state
        .admin_service
        .list_users(query.page, query.size, status, query.keyword.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(Page {
        items: page.items.into_iter().map(UserDto::from).collect(),
        total: page.total,
        page: page.page,
        size: page.size,
    })))
}

pub async fn set_user_status(
    State(state): State<SharedState>,
    Path(user_id): Path<i32>,
    Json(body): Json<SetEnabledBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    // enabled=false means banned
    state
        .admin_service
        .set_user_banned(user_id, !body.enabled)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

#[derive(Debug, serde::Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub status: UserStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            status: user.status,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

// ---- devices ----

pub async fn list_devices(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<card_devices::Model>>>, ApiError> {
    let page = state
        .admin_service
        .list_devices(
            query.page,
            query.size,
            query.card_id,
            query.device_id.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(page)))
}

pub async fn set_device_status(
    State(state): State<SharedState>,
    Path(device_row_id): Path<i32>,
    Json(body): Json<SetEnabledBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .admin_service
        .set_device_enabled(device_row_id, body.enabled)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

// ---- apps ----

pub async fn create_app(
    State(state): State<SharedState>,
    Json(body): Json<CreateAppBody>,
) -> Result<Json<ApiResponse<apps::Model>>, ApiError> {
    let app = state
        .app_service
        .create_app(&body.name, body.description.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(app)))
}

pub async fn list_apps(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<Vec<apps::Model>>>, ApiError> {
    let apps = state.app_service.list_apps().await?;
    Ok(Json(ApiResponse::success(apps)))
}

pub async fn set_app_status(
    State(state): State<SharedState>,
    Path(app_id): Path<i32>,
    Json(body): Json<SetEnabledBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .app_service
        .set_app_enabled(app_id, body.enabled)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

// ---- feature permission catalog ----

pub async fn list_feature_permissions(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<Vec<feature_permissions::Model>>>, ApiError> {
    let permissions = state.feature_permission_service.list().await?;
    Ok(Json(ApiResponse::success(permissions)))
}

pub async fn create_feature_permission(
    State(state): State<SharedState>,
    Json(body): Json<CreateFeaturePermissionBody>,
) -> Result<Json<ApiResponse<feature_permissions::Model>>, ApiError> {
    let created = state
        .feature_permission_service
        .create(NewFeaturePermission {
            permission_key: body.permission_key,
            permission_name: body.permission_name,
            description: body.description,
            category: body.category,
            icon: body.icon,
            sort_order: body.sort_order,
        })
        .await?;

    Ok(Json(ApiResponse::success(created)))
}

pub async fn set_feature_permission_status(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
    Json(body): Json<SetEnabledBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .feature_permission_service
        .set_enabled(id, body.enabled)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

pub async fn delete_feature_permission(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.feature_permission_service.delete(id).await?;
    Ok(Json(ApiResponse::success(())))
}

// ---- stats ----

pub async fn stats(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<StatsSummary>>, ApiError> {
    let summary = state.admin_service.stats().await?;
    Ok(Json(ApiResponse::success(summary)))
}
