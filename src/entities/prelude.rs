pub use super::apps::Entity as Apps;
pub use super::card_devices::Entity as CardDevices;
pub use super::cards::Entity as Cards;
pub use super::feature_permissions::Entity as FeaturePermissions;
pub use super::user_cards::Entity as UserCards;
pub use super::user_tokens::Entity as UserTokens;
pub use super::users::Entity as Users;
