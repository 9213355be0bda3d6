//! User, friendship and sharing models.

use serde::{Deserialize, Serialize};

/// A user known to the relationship store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// The value stored under `user:{id}`; the id is part of the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl StoredUser {
    pub fn into_record(self, id: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            name: self.name,
            email: self.email,
        }
    }
}

/// A list another user has shared with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedListInfo {
    pub owner_id: String,
    pub owner_name: String,
    pub category: String,
}

/// Request body for `POST /api/friends/add`.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendRequest {
    #[serde(default)]
    pub friend_id: String,
}

/// Query for `DELETE /api/friends/remove`.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendQuery {
    #[serde(default)]
    pub friend_id: String,
}

/// Request body for `POST /api/share-list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareListRequest {
    #[serde(default)]
    pub friend_id: String,
    #[serde(default)]
    pub category: String,
}

/// Query for `GET /api/users/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
