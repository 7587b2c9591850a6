//! API endpoint implementations.

mod auth;
mod users;

pub use auth::AuthApi;
pub use users::UsersApi;
