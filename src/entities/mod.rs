pub mod prelude;

pub mod apps;
pub mod card_devices;
pub mod cards;
pub mod feature_permissions;
pub mod user_cards;
pub mod user_tokens;
pub mod users;
