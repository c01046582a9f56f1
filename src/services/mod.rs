pub mod auth_service;
pub mod resource_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use resource_service::CrudResource;
pub use user_service::UserService;
