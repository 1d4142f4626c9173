pub mod auth;
pub mod response;

pub use auth::AuthSession;
pub use response::{ApiResponse, ApiResult};
