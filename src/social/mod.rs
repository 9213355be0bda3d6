//! Relationship store: known users, friendships and shared lists.
//!
//! Friendship is symmetric and takes effect immediately: adding or removing
//! writes both `friends:{a}` and `friends:{b}`. A share is only a reference
//! `"{owner}:{category}"` in the grantee's `shared_lists` set; the grantee
//! always sees the owner's current list.

use std::collections::HashSet;
use std::sync::Arc;

use crate::db::keys::{self, Owner, SHAREABLE_CATEGORY};
use crate::db::KvStore;
use crate::errors::AppError;
use crate::lists::{codec, ListEngine};
use crate::models::{ListItem, SharedListInfo, StoredUser, UserRecord};

pub struct Relationships {
    store: Arc<KvStore>,
}

impl Relationships {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    // ==================== USERS ====================

    /// Record a user after login and make them discoverable.
    pub async fn save_user(&self, user: &UserRecord) -> Result<(), AppError> {
        let stored = StoredUser {
            name: user.name.clone(),
            email: user.email.clone(),
        };
        let value = serde_json::to_string(&stored)?;
        self.store.set(&keys::user_key(&user.id), &value).await?;
        self.store.set_add(keys::ALL_USERS, &user.id).await
    }

    /// Look up a user record. A record that does not decode counts as missing.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        let key = keys::user_key(user_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<StoredUser>(&raw) {
            Ok(stored) => Ok(Some(stored.into_record(user_id))),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Stored user record is not valid JSON");
                Ok(None)
            }
        }
    }

    /// Every known user except the caller and the caller's friends.
    pub async fn other_users(&self, user_id: &str) -> Result<Vec<UserRecord>, AppError> {
        let friends: HashSet<String> = self
            .store
            .set_members(&keys::friends_key(user_id))
            .await?
            .into_iter()
            .collect();

        let mut users = Vec::new();
        for id in self.store.set_members(keys::ALL_USERS).await? {
            if id == user_id || friends.contains(&id) {
                continue;
            }
            if let Some(user) = self.get_user(&id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    /// [`Self::other_users`] filtered by a case-insensitive substring of name or email.
    pub async fn search_users(&self, user_id: &str, query: &str) -> Result<Vec<UserRecord>, AppError> {
        let needle = query.trim().to_lowercase();
        let users = self.other_users(user_id).await?;
        if needle.is_empty() {
            return Ok(users);
        }
        Ok(users
            .into_iter()
            .filter(|u| {
                u.name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle)
            })
            .collect())
    }

    // ==================== FRIENDS ====================

    /// The caller's friends. Friends without a user record are skipped.
    pub async fn friends(&self, user_id: &str) -> Result<Vec<UserRecord>, AppError> {
        let mut friends = Vec::new();
        for id in self.store.set_members(&keys::friends_key(user_id)).await? {
            if let Some(user) = self.get_user(&id).await? {
                friends.push(user);
            }
        }
        Ok(friends)
    }

    pub async fn add_friend(&self, user_id: &str, friend_id: &str) -> Result<(), AppError> {
        validate_friend(user_id, friend_id)?;
        self.store
            .set_add(&keys::friends_key(user_id), friend_id)
            .await?;
        self.store
            .set_add(&keys::friends_key(friend_id), user_id)
            .await?;
        tracing::info!(user_id, friend_id, "Friend added");
        Ok(())
    }

    pub async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<(), AppError> {
        validate_friend(user_id, friend_id)?;
        self.store
            .set_remove(&keys::friends_key(user_id), friend_id)
            .await?;
        self.store
            .set_remove(&keys::friends_key(friend_id), user_id)
            .await?;
        tracing::info!(user_id, friend_id, "Friend removed");
        Ok(())
    }

    // ==================== SHARING ====================

    /// Let `grantee_id` see the owner's list in `category`.
    ///
    /// Only the shareable category is accepted. No copy of the list is made;
    /// the grantee reads the owner's list as it is at read time.
    pub async fn share_list(
        &self,
        owner_id: &str,
        grantee_id: &str,
        category: &str,
    ) -> Result<(), AppError> {
        if category != SHAREABLE_CATEGORY {
            return Err(AppError::Validation(format!(
                "only the '{}' list can be shared",
                SHAREABLE_CATEGORY
            )));
        }
        if grantee_id.trim().is_empty() {
            return Err(AppError::Validation("friend_id is required".to_string()));
        }
        if grantee_id == owner_id {
            return Err(AppError::Validation(
                "You cannot share a list with yourself".to_string(),
            ));
        }

        let list_key = keys::list_key(&Owner::User(owner_id.to_string()), category);
        let current = self.store.get(&list_key).await?;
        let items = codec::decode(&list_key, current.as_deref());

        self.store
            .set_add(
                &keys::shared_lists_key(grantee_id),
                &keys::share_ref(owner_id, category),
            )
            .await?;
        tracing::info!(owner_id, grantee_id, category, items = items.len(), "List shared");
        Ok(())
    }

    /// Lists shared with the caller, with the owners' display names.
    pub async fn shared_lists(&self, grantee_id: &str) -> Result<Vec<SharedListInfo>, AppError> {
        let mut lists = Vec::new();
        for share in self.store.set_members(&keys::shared_lists_key(grantee_id)).await? {
            let Some((owner_id, category)) = keys::split_share_ref(&share) else {
                tracing::warn!(grantee_id, share = %share, "Skipping malformed share reference");
                continue;
            };
            lists.push(SharedListInfo {
                owner_id: owner_id.to_string(),
                owner_name: self.display_name(owner_id).await?,
                category: category.to_string(),
            });
        }
        Ok(lists)
    }

    /// The caller's own shareable list followed by every list shared with them.
    ///
    /// Shared items are read live from the owners' lists and renamed
    /// `[ownerName] name`.
    pub async fn shared_view(
        &self,
        engine: &ListEngine,
        grantee_id: &str,
    ) -> Result<Vec<ListItem>, AppError> {
        let mut items = engine
            .list(&Owner::User(grantee_id.to_string()), SHAREABLE_CATEGORY)
            .await?;

        for share in self.store.set_members(&keys::shared_lists_key(grantee_id)).await? {
            let Some((owner_id, category)) = keys::split_share_ref(&share) else {
                continue;
            };
            if category != SHAREABLE_CATEGORY {
                continue;
            }

            let key = keys::list_key(&Owner::User(owner_id.to_string()), category);
            let raw = self.store.get(&key).await?;
            let shared = codec::decode(&key, raw.as_deref());
            if shared.is_empty() {
                continue;
            }

            let owner_name = self.display_name(owner_id).await?;
            items.extend(shared.into_iter().map(|item| item.prefixed(&owner_name)));
        }
        Ok(items)
    }

    /// Name shown for a user, falling back to the id.
    async fn display_name(&self, user_id: &str) -> Result<String, AppError> {
        Ok(self
            .get_user(user_id)
            .await?
            .map(|u| u.name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user_id.to_string()))
    }
}

fn validate_friend(user_id: &str, friend_id: &str) -> Result<(), AppError> {
    if friend_id.trim().is_empty() {
        return Err(AppError::Validation("friend_id is required".to_string()));
    }
    if friend_id == user_id {
        return Err(AppError::Validation(
            "You cannot add yourself as a friend".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    struct Fixture {
        social: Relationships,
        engine: ListEngine,
        store: Arc<KvStore>,
        _temp_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("social.sqlite"))
            .await
            .expect("Failed to init DB");
        let store = Arc::new(KvStore::new(pool));
        Fixture {
            social: Relationships::new(store.clone()),
            engine: ListEngine::new(store.clone()),
            store,
            _temp_dir: temp_dir,
        }
    }

    fn user(id: &str, name: &str, email: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    fn ids(users: &[UserRecord]) -> Vec<&str> {
        users.iter().map(|u| u.id.as_str()).collect()
    }

    async fn seed_users(f: &Fixture) {
        for u in [
            user("a", "Alice", "alice@example.com"),
            user("b", "Boris", "boris@yandex.ru"),
            user("c", "Clara", "CLARA@example.com"),
        ] {
            f.social.save_user(&u).await.unwrap();
        }
    }

    fn milk() -> ListItem {
        ListItem {
            name: "milk".into(),
            bought: false,
            category: SHAREABLE_CATEGORY.into(),
            priority: 2,
        }
    }

    #[tokio::test]
    async fn test_save_user_is_idempotent() {
        let f = fixture().await;
        let alice = user("a", "Alice", "alice@example.com");
        f.social.save_user(&alice).await.unwrap();
        f.social.save_user(&alice).await.unwrap();

        assert_eq!(f.store.set_members(keys::ALL_USERS).await.unwrap(), vec!["a"]);
        assert_eq!(f.social.get_user("a").await.unwrap(), Some(alice));
        assert_eq!(
            f.store.get("user:a").await.unwrap().as_deref(),
            Some(r#"{"name":"Alice","email":"alice@example.com"}"#)
        );
    }

    #[tokio::test]
    async fn test_friendship_is_symmetric() {
        let f = fixture().await;
        seed_users(&f).await;

        f.social.add_friend("a", "b").await.unwrap();
        assert_eq!(ids(&f.social.friends("a").await.unwrap()), ["b"]);
        assert_eq!(ids(&f.social.friends("b").await.unwrap()), ["a"]);

        f.social.remove_friend("b", "a").await.unwrap();
        assert!(f.social.friends("a").await.unwrap().is_empty());
        assert!(f.social.friends("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_friend_validation() {
        let f = fixture().await;
        assert!(matches!(
            f.social.add_friend("a", "").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.social.add_friend("a", "a").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_friends_without_record_are_skipped() {
        let f = fixture().await;
        seed_users(&f).await;
        f.social.add_friend("a", "ghost").await.unwrap();
        f.social.add_friend("a", "c").await.unwrap();

        assert_eq!(ids(&f.social.friends("a").await.unwrap()), ["c"]);
    }

    #[tokio::test]
    async fn test_other_users_excludes_self_and_friends() {
        let f = fixture().await;
        seed_users(&f).await;
        f.social.add_friend("a", "b").await.unwrap();

        assert_eq!(ids(&f.social.other_users("a").await.unwrap()), ["c"]);
        assert_eq!(ids(&f.social.other_users("c").await.unwrap()), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let f = fixture().await;
        seed_users(&f).await;

        assert_eq!(ids(&f.social.search_users("a", "clara@").await.unwrap()), ["c"]);
        assert_eq!(ids(&f.social.search_users("a", "YANDEX").await.unwrap()), ["b"]);
        assert_eq!(ids(&f.social.search_users("c", "").await.unwrap()), ["a", "b"]);
        assert!(f.social.search_users("a", "nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_buy_list_is_shareable() {
        let f = fixture().await;
        let err = f.social.share_list("a", "b", "не-забыть").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.social.shared_lists("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cannot_share_with_self() {
        let f = fixture().await;
        seed_users(&f).await;
        let owner = Owner::User("a".into());
        f.engine.add(&owner, milk()).await.unwrap();

        let err = f
            .social
            .share_list("a", "a", SHAREABLE_CATEGORY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.social.shared_lists("a").await.unwrap().is_empty());
        assert_eq!(f.social.shared_view(&f.engine, "a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_share_registers_reference_only() {
        let f = fixture().await;
        seed_users(&f).await;
        let owner = Owner::User("a".into());
        f.engine.add(&owner, milk()).await.unwrap();
        let before = f.store.get("shoppingList:a:купить").await.unwrap();

        f.social.share_list("a", "b", SHAREABLE_CATEGORY).await.unwrap();

        assert_eq!(
            f.store.set_members("shared_lists:b").await.unwrap(),
            vec!["a:купить"]
        );
        assert_eq!(f.store.get("shoppingList:a:купить").await.unwrap(), before);
        assert_eq!(
            f.social.shared_lists("b").await.unwrap(),
            vec![SharedListInfo {
                owner_id: "a".into(),
                owner_name: "Alice".into(),
                category: SHAREABLE_CATEGORY.into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_shared_view_is_live_and_prefixed() {
        let f = fixture().await;
        seed_users(&f).await;
        let alice = Owner::User("a".into());
        let boris = Owner::User("b".into());

        let mut bread = milk();
        bread.name = "bread".into();
        f.engine.add(&boris, bread).await.unwrap();
        f.social.share_list("a", "b", SHAREABLE_CATEGORY).await.unwrap();

        // added after sharing, still visible
        f.engine.add(&alice, milk()).await.unwrap();

        let view = f.social.shared_view(&f.engine, "b").await.unwrap();
        let names: Vec<_> = view.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["bread", "[Alice] milk"]);

        // the owner's own list is untouched by the prefixing
        assert_eq!(f.engine.list(&alice, SHAREABLE_CATEGORY).await.unwrap(), vec![milk()]);
    }

    #[tokio::test]
    async fn test_shared_view_falls_back_to_owner_id() {
        let f = fixture().await;
        let owner = Owner::User("anon".into());
        f.engine.add(&owner, milk()).await.unwrap();
        f.social
            .share_list("anon", "b", SHAREABLE_CATEGORY)
            .await
            .unwrap();

        let view = f.social.shared_view(&f.engine, "b").await.unwrap();
        assert_eq!(view[0].name, "[anon] milk");
    }

    #[tokio::test]
    async fn test_shared_view_skips_corrupt_owner_list() {
        let f = fixture().await;
        seed_users(&f).await;
        f.store.set("shoppingList:a:купить", "{broken").await.unwrap();
        f.social.share_list("a", "b", SHAREABLE_CATEGORY).await.unwrap();

        assert!(f.social.shared_view(&f.engine, "b").await.unwrap().is_empty());
    }
}
