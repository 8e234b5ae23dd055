pub mod auth;
pub mod health;

pub use auth::{login, logout, me, relogin, signup};
pub use health::{health_check, root};
