use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod cards;
pub mod error;
pub mod permissions;
pub mod types;

pub use error::ApiError;
pub use types::ApiResponse;

use crate::state::SharedState;

async fn health(State(state): State<SharedState>) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    state
        .store
        .ping()
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(ApiResponse::success("ok")))
}

pub fn router(state: SharedState) -> Router {
    let admin_routes = Router::new()
        .route("/cards/generate", post(admin::generate_cards))
        .route("/cards", get(admin::list_cards))
        .route("/cards", delete(admin::delete_cards))
        .route("/cards/{id}", get(admin::get_card))
        .route("/cards/{id}/status", put(admin::set_card_status))
        .route("/cards/{id}/permissions", put(admin::set_card_permissions))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/status", put(admin::set_user_status))
        .route("/devices", get(admin::list_devices))
        .route("/devices/{id}/status", put(admin::set_device_status))
        .route("/apps", get(admin::list_apps))
        .route("/apps", post(admin::create_app))
        .route("/apps/{id}/status", put(admin::set_app_status))
        .route("/permissions", get(admin::list_feature_permissions))
        .route("/permissions", post(admin::create_feature_permission))
        .route(
            "/permissions/{id}/status",
            put(admin::set_feature_permission_status),
        )
        .route("/permissions/{id}", delete(admin::delete_feature_permission))
        .route("/stats", get(admin::stats))
        .layer(middleware::from_fn(auth::require_admin));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/card/bind", post(cards::bind))
        .route("/card/unbind", post(cards::unbind))
        .route("/card/verify", post(cards::verify))
        .route("/card/my", get(cards::my_cards))
        .route("/permission/check", post(permissions::check))
        .route("/permission/check-batch", post(permissions::check_batch))
        .route("/permission/my", get(permissions::mine))
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state);

    Router::new()
        .nest("/api", api_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
