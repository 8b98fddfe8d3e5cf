pub mod auth;
pub mod inventory;
pub mod material_request;
