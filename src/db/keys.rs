//! Store key construction.

/// The only category that can be shared with friends.
pub const SHAREABLE_CATEGORY: &str = "купить";

/// Set of every user id that has logged in at least once.
pub const ALL_USERS: &str = "users:all";

const LIST_NAMESPACE: &str = "shoppingList";

/// Whose lists a key refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// The single list shared by every caller (basic auth and open modes)
    Global,
    /// One user's personal lists
    User(String),
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Owner::Global => f.write_str("global"),
            Owner::User(id) => f.write_str(id),
        }
    }
}

/// `shoppingList:{category}` or `shoppingList:{userID}:{category}`.
pub fn list_key(owner: &Owner, category: &str) -> String {
    match owner {
        Owner::Global => format!("{}:{}", LIST_NAMESPACE, category),
        Owner::User(id) => format!("{}:{}:{}", LIST_NAMESPACE, id, category),
    }
}

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn friends_key(user_id: &str) -> String {
    format!("friends:{}", user_id)
}

pub fn shared_lists_key(user_id: &str) -> String {
    format!("shared_lists:{}", user_id)
}

/// Member stored in a grantee's `shared_lists` set.
pub fn share_ref(owner_id: &str, category: &str) -> String {
    format!("{}:{}", owner_id, category)
}

/// Split a share ref into `(owner_id, category)` at the first `:`.
pub fn split_share_ref(share: &str) -> Option<(&str, &str)> {
    share.split_once(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_key_layouts() {
        assert_eq!(list_key(&Owner::Global, "купить"), "shoppingList:купить");
        assert_eq!(
            list_key(&Owner::User("42".into()), "не-забыть"),
            "shoppingList:42:не-забыть"
        );
    }

    #[test]
    fn test_relationship_keys() {
        assert_eq!(user_key("7"), "user:7");
        assert_eq!(friends_key("7"), "friends:7");
        assert_eq!(shared_lists_key("7"), "shared_lists:7");
    }

    #[test]
    fn test_share_ref_splits_on_first_colon() {
        let share = share_ref("owner", "купить");
        assert_eq!(share, "owner:купить");
        assert_eq!(split_share_ref(&share), Some(("owner", "купить")));
        assert_eq!(split_share_ref("a:b:c"), Some(("a", "b:c")));
        assert_eq!(split_share_ref("no-separator"), None);
    }
}
