//! REST API module.
//!
//! List handlers are shared by the user-facing routes and `/internal/api`;
//! the gate in front of them decides whose lists they touch.

mod friends;
mod lists;
mod pages;
mod users;

pub use friends::*;
pub use lists::*;
pub use pages::*;
pub use users::*;

use serde::Serialize;

/// Body of successful mutations that report back.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Handler result; errors render as the JSON error envelope.
pub type ApiResult<T> = Result<T, crate::errors::AppError>;
