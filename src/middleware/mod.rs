pub mod auth;
pub mod cors;
pub mod rbac;

pub use auth::AuthUser;
pub use cors::cors;
pub use rbac::RequireAdmin;
