//! Business logic services layer

pub mod auth_service;
pub mod enforcer;
pub mod scope_service;

pub use auth_service::AuthService;
pub use enforcer::Enforcer;
pub use scope_service::ScopeService;
