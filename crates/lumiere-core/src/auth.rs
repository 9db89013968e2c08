//! Authenticated session handle
//!
//! A `Session` is the capability object passed to every operation that writes
//! on behalf of a user. Holding one is what makes a call authorized.

use crate::error::{CoreError, Result};
use crate::models::UserId;
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Storage key for the persisted session
pub const SESSION_KEY: &str = "auth_session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Load the persisted session, dropping it when unreadable or expired
    pub fn load(store: &impl KeyValueStore, now: DateTime<Utc>) -> Option<Self> {
        let raw = store.get(SESSION_KEY).ok()??;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if !session.is_expired(now) => Some(session),
            Ok(_) => {
                debug!("Stored session expired");
                if let Err(e) = store.remove(SESSION_KEY) {
                    warn!(error = %e, "Failed to remove expired session");
                }
                None
            }
            Err(e) => {
                debug!(error = %e, "Stored session unreadable");
                None
            }
        }
    }

    pub fn save(&self, store: &impl KeyValueStore) -> Result<()> {
        let json = serde_json::to_string(self).map_err(CoreError::Serialize)?;
        store.set(SESSION_KEY, &json)?;
        info!(user_id = %self.user_id, "Session saved");
        Ok(())
    }

    pub fn forget(store: &impl KeyValueStore) -> Result<()> {
        store.remove(SESSION_KEY)
    }
}

/// Require a session for a write, mapping absence to `Unauthenticated`
pub fn require(session: Option<&Session>) -> Result<&Session> {
    session.ok_or(CoreError::Unauthenticated)
}

/// Translate raw auth-provider messages into user-facing ones
pub fn friendly_auth_message(raw: &str) -> String {
    if raw.contains("Invalid login credentials") {
        "Invalid email or password".to_string()
    } else if raw.contains("User already registered") {
        "An account with this email already exists. Try signing in instead.".to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    fn session(expires_at: Option<DateTime<Utc>>) -> Session {
        Session {
            user_id: UserId::new("user-1"),
            email: "neo@zion.org".to_string(),
            access_token: "token".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_session_persistence() {
        let store = MemoryStore::new();
        let now = Utc::now();
        session(Some(now + Duration::hours(1))).save(&store).unwrap();

        let loaded = Session::load(&store, now).unwrap();
        assert_eq!(loaded.user_id, UserId::new("user-1"));

        Session::forget(&store).unwrap();
        assert!(Session::load(&store, now).is_none());
    }

    #[test]
    fn test_expired_session_is_dropped() {
        let store = MemoryStore::new();
        let now = Utc::now();
        session(Some(now - Duration::seconds(1))).save(&store).unwrap();

        assert!(Session::load(&store, now).is_none());
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }

    struct StickyStore(MemoryStore);

    impl KeyValueStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            Err(CoreError::Storage {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            })
        }

        fn clear(&self) -> Result<()> {
            self.0.clear()
        }
    }

    #[test]
    fn test_expired_session_unremovable_still_absent() {
        let store = StickyStore(MemoryStore::new());
        let now = Utc::now();
        session(Some(now - Duration::seconds(1))).save(&store).unwrap();

        assert!(Session::load(&store, now).is_none());
        assert!(store.get(SESSION_KEY).unwrap().is_some());
    }

    #[test]
    fn test_require() {
        assert!(matches!(require(None), Err(CoreError::Unauthenticated)));
        let s = session(None);
        assert!(require(Some(&s)).is_ok());
    }

    #[test]
    fn test_friendly_auth_message() {
        assert_eq!(
            friendly_auth_message("Invalid login credentials"),
            "Invalid email or password"
        );
        assert!(friendly_auth_message("User already registered").starts_with("An account"));
        assert_eq!(friendly_auth_message("rate limited"), "rate limited");
    }
}
