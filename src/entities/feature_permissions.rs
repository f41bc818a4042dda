use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum FeaturePermissionStatus {
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "disabled")]
    Disabled,
}

/// Catalog of grantable permission keys (e.g. "wechat", "ximalaya").
/// Cards reference these keys in their permission sets.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "feature_permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub permission_key: String,

    pub permission_name: String,

    pub description: Option<String>,

    pub category: Option<String>,

    pub icon: Option<String>,

    pub sort_order: i32,

    pub status: FeaturePermissionStatus,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
