pub mod auth;
pub mod extract;
pub mod response;

pub use auth::{authorize, bearer_token, require_auth, Principal};
pub use extract::{ApiJson, ApiQuery};
pub use response::{ApiResponse, ApiResult};
