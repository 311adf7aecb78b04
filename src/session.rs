//! Signed-in user lookup, used by consumers to gate wishlist views
//!
//! The wishlist store itself never consults the session.

use crate::core::{Result, WishlistError};
use crate::storage::DurableStore;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

/// Durable key the signed-in user is stored under.
pub const USER_STORAGE_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

/// Session read once from durable storage.
#[derive(Debug, Clone, Default)]
pub struct StoredSession {
    user: Option<User>,
}

impl StoredSession {
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Reads the stored user. Absent, unreadable or malformed data all mean
    /// signed out.
    pub async fn load(store: &dyn DurableStore) -> Self {
        let bytes = match store.get(USER_STORAGE_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Self::signed_out(),
            Err(err) => {
                event!(Level::WARN, error = %err, "failed to read stored session");
                return Self::signed_out();
            }
        };

        match serde_json::from_slice::<User>(&bytes) {
            Ok(user) => Self::signed_in(user),
            Err(err) => {
                event!(Level::WARN, error = %err, "stored session is malformed");
                Self::signed_out()
            }
        }
    }
}

impl SessionProvider for StoredSession {
    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}

/// Gate for views that need a signed-in user.
pub fn require_user(session: &dyn SessionProvider) -> Result<User> {
    session.current_user().ok_or(WishlistError::Unauthenticated)
}
