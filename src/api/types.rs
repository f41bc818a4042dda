use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ---- auth ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub app_key: String,
    pub username: String,
    pub password: String,
    pub device_id: String,
}

// ---- cards ----

#[derive(Debug, Deserialize)]
pub struct BindCardRequest {
    pub card_key: String,
    /// Defaults to the device the login token was issued for.
    pub device_id: Option<String>,
    pub device_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnbindCardRequest {
    pub card_id: i32,
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCardRequest {
    pub card_key: String,
}

// ---- permissions ----

#[derive(Debug, Deserialize)]
pub struct CheckPermissionRequest {
    pub permission_key: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckPermissionsRequest {
    pub permission_keys: Vec<String>,
}

// ---- admin ----

#[derive(Debug, Deserialize)]
pub struct GenerateCardsBody {
    pub app_id: i32,
    pub count: u32,
    pub valid_days: i64,
    #[serde(default = "default_max_devices")]
    pub max_device_count: i32,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub remark: Option<String>,
}

const fn default_max_devices() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_size")]
    pub size: u64,
    pub app_id: Option<i32>,
    pub card_id: Option<i32>,
    pub status: Option<String>,
    pub keyword: Option<String>,
    pub device_id: Option<String>,
}

const fn default_page() -> u64 {
    1
}

const fn default_size() -> u64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct SetEnabledBody {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetPermissionsBody {
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCardsBody {
    pub card_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeaturePermissionBody {
    pub permission_key: String,
    pub permission_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}
