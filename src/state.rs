use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AdminService, AppService, AuthService, CardService, FeaturePermissionService,
    PermissionService, SeaOrmAdminService, SeaOrmAppService, SeaOrmAuthService, SeaOrmCardService,
    SeaOrmFeaturePermissionService, SeaOrmPermissionService,
};
use crate::token::TokenService;

/// Everything the HTTP layer needs, cloned into each handler.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: TokenService,

    pub auth_service: Arc<dyn AuthService>,

    pub app_service: Arc<dyn AppService>,

    pub card_service: Arc<dyn CardService>,

    pub permission_service: Arc<dyn PermissionService>,

    pub admin_service: Arc<dyn AdminService>,

    pub feature_permission_service: Arc<dyn FeaturePermissionService>,
}

impl SharedState {
    #[must_use]
    pub fn new(config: Config, store: Store) -> Self {
        let tokens = TokenService::new(
            &config.auth.jwt_secret,
            config.auth.token_expire_minutes * 60,
        );

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            config.security.clone(),
        ));

        Self {
            config: Arc::new(config),
            store: store.clone(),
            tokens,
            auth_service,
            app_service: Arc::new(SeaOrmAppService::new(store.clone())),
            card_service: Arc::new(SeaOrmCardService::new(store.clone())),
            permission_service: Arc::new(SeaOrmPermissionService::new(store.clone())),
            admin_service: Arc::new(SeaOrmAdminService::new(store.clone())),
            feature_permission_service: Arc::new(SeaOrmFeaturePermissionService::new(store)),
        }
    }
}
