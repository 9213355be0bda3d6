//! Shopping list item model.

use serde::{Deserialize, Serialize};

pub const PRIORITY_LOW: i64 = 1;
pub const PRIORITY_MEDIUM: i64 = 2;
pub const PRIORITY_HIGH: i64 = 3;

/// One entry of a shopping list. Items are identified by `name` within a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bought: bool,
    #[serde(default)]
    pub category: String,
    /// 1 low, 2 medium, 3 high
    #[serde(default)]
    pub priority: i64,
}

impl ListItem {
    /// Map any priority outside `[1, 3]` (including the unset 0) to medium.
    pub fn normalize_priority(&mut self) {
        if !(PRIORITY_LOW..=PRIORITY_HIGH).contains(&self.priority) {
            self.priority = PRIORITY_MEDIUM;
        }
    }

    /// Copy of the item shown under another owner's name.
    pub fn prefixed(mut self, owner_name: &str) -> Self {
        self.name = format!("[{}] {}", owner_name, self.name);
        self
    }
}

/// Request body for `PUT /buy/{name}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyRequest {
    #[serde(default)]
    pub bought: bool,
    #[serde(default)]
    pub category: String,
}

/// Query for `GET /list`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub category: String,
}

/// Query for `PUT /edit/{name}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditQuery {
    #[serde(default)]
    pub old_category: String,
}
