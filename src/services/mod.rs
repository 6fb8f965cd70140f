pub mod auth_service;
pub mod object_storage;
pub mod product_service;
