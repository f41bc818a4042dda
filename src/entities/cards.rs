use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card lifecycle. `unused -> used` on the first successful device bind,
/// back to `unused` when the last device and last user binding are gone.
/// `disabled` is an admin action and is only reversed by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    #[sea_orm(string_value = "unused")]
    Unused,
    #[sea_orm(string_value = "used")]
    Used,
    #[sea_orm(string_value = "disabled")]
    Disabled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub app_id: i32,

    #[sea_orm(unique)]
    pub card_key: String,

    pub status: CardStatus,

    /// Absolute expiry. Enforced lazily at evaluation time; no background
    /// job ever flips status based on this.
    pub expire_time: DateTimeUtc,

    pub max_device_count: i32,

    /// Permission grant, stored as JSON: a list of keys, a key->bool map,
    /// or a JSON string wrapping either. Normalized once at read time by
    /// `models::permission::PermissionSpec`.
    pub permissions: Option<Json>,

    pub remark: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::apps::Entity",
        from = "Column::AppId",
        to = "super::apps::Column::Id"
    )]
    App,
    #[sea_orm(has_many = "super::user_cards::Entity")]
    UserCards,
    #[sea_orm(has_many = "super::card_devices::Entity")]
    CardDevices,
}

impl Related<super::apps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::App.def()
    }
}

impl Related<super::user_cards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserCards.def()
    }
}

impl Related<super::card_devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CardDevices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
