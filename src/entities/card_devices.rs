use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum CardDeviceStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "disabled")]
    Disabled,
}

/// Binding of a device identifier to a card, consuming one unit of the
/// card's device quota. (card_id, device_id) is unique. Rows are hard
/// deleted on unbind; a row left in `disabled` blocks rebinding of that
/// device until an admin clears it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "card_devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub card_id: i32,

    pub device_id: String,

    pub device_name: Option<String>,

    pub bind_time: DateTimeUtc,

    /// Device liveness heartbeat, bumped on every successful permission
    /// check against this binding.
    pub last_active_at: DateTimeUtc,

    pub status: CardDeviceStatus,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cards::Entity",
        from = "Column::CardId",
        to = "super::cards::Column::Id"
    )]
    Card,
}

impl Related<super::cards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Card.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
