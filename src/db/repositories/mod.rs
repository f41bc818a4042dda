pub mod app;
pub mod card;
pub mod device;
pub mod feature_permission;
pub mod token;
pub mod user;
