pub mod permission_service;
pub use permission_service::{
    PermissionDecision, PermissionError, PermissionService, UserPermissions,
};

pub mod permission_service_impl;
pub use permission_service_impl::SeaOrmPermissionService;

pub mod card_service;
pub use card_service::{BindResult, CardCheck, CardError, CardService, CardSummary};

pub mod card_service_impl;
pub use card_service_impl::SeaOrmCardService;

pub mod auth_service;
pub use auth_service::{AuthError, AuthService, LoginResult, RegisterResult};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod app_service;
pub use app_service::{AppError, AppService};

pub mod app_service_impl;
pub use app_service_impl::SeaOrmAppService;

pub mod admin_service;
pub use admin_service::{
    AdminError, AdminService, CardRow, GenerateCardsRequest, Page, StatsSummary,
};

pub mod admin_service_impl;
pub use admin_service_impl::SeaOrmAdminService;

pub mod feature_permission_service;
pub use feature_permission_service::{FeaturePermissionError, FeaturePermissionService};

pub mod feature_permission_service_impl;
pub use feature_permission_service_impl::SeaOrmFeaturePermissionService;
