pub mod access;
pub mod auth;
pub mod material_request_service;
pub mod visibility;
