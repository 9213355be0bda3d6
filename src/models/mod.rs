//! Data models for the shopping list backend.
//!
//! Field names match the JSON the web client and service callers already speak.

mod item;
mod user;

pub use item::*;
pub use user::*;
