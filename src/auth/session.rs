//! Session contents for logged-in users.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tower_sessions::{cookie::Key, Session};

use crate::errors::AppError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";
/// Session key holding the [`SessionUser`].
pub const SESSION_USER_KEY: &str = "user";
/// Session key holding the pending OAuth `state` value.
pub const OAUTH_STATE_KEY: &str = "oauth_state";

/// Identity stored in the session after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub provider: String,
}

/// The logged-in user, or `None` when the session carries no usable user id.
pub async fn current_user(session: &Session) -> Result<Option<SessionUser>, AppError> {
    let user: Option<SessionUser> = session.get(SESSION_USER_KEY).await?;
    Ok(user.filter(|u| !u.user_id.is_empty()))
}

/// Cookie signing key derived from the configured secret.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(&digest[..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user(id: &str) -> SessionUser {
        SessionUser {
            user_id: id.into(),
            name: "Anna".into(),
            email: "anna@yandex.ru".into(),
            provider: "yandex".into(),
        }
    }

    #[tokio::test]
    async fn test_empty_session_is_anonymous() {
        assert_eq!(current_user(&session()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_user_id_is_anonymous() {
        let session = session();
        session.insert(SESSION_USER_KEY, user("")).await.unwrap();
        assert_eq!(current_user(&session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stored_user_is_returned() {
        let session = session();
        session.insert(SESSION_USER_KEY, user("42")).await.unwrap();
        assert_eq!(current_user(&session).await.unwrap(), Some(user("42")));
    }

    #[test]
    fn test_signing_key_is_stable() {
        assert_eq!(
            signing_key("secret").signing(),
            signing_key("secret").signing()
        );
        assert_ne!(
            signing_key("secret").signing(),
            signing_key("other").signing()
        );
    }
}
