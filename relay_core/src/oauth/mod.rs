pub mod flow;
pub mod models;

pub use flow::AuthorizationFlow;
pub use models::{CallbackParams, TokenResponse};
