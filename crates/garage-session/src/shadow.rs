//! Shadow session store: one JSON record under a fixed key of a
//! session-scoped medium.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use garage_domain::profile::ShadowRecord;

use crate::error::SessionError;
use crate::port::ShadowStore;

/// Key the shadow record is stored under.
pub const SHADOW_SESSION_KEY: &str = "garage.shadow_session";

/// String key/value storage scoped to one browsing session.
///
/// Must not outlive the session: shadow-authenticated staff re-authenticate
/// on every new session.
pub trait SessionMedium: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
    fn remove_item(&self, key: &str);
}

/// Process-memory medium. Its lifetime is the lifetime of the console process.
#[derive(Default)]
pub struct MemoryMedium {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        self.items().insert(key.to_owned(), value);
    }

    fn remove_item(&self, key: &str) {
        self.items().remove(key);
    }
}

/// [`ShadowStore`] over any [`SessionMedium`].
pub struct KeyedShadowStore<M> {
    medium: M,
    key: String,
}

impl<M: SessionMedium> KeyedShadowStore<M> {
    pub fn new(medium: M) -> Self {
        Self::with_key(medium, SHADOW_SESSION_KEY)
    }

    pub fn with_key(medium: M, key: impl Into<String>) -> Self {
        Self {
            medium,
            key: key.into(),
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }
}

impl<M: SessionMedium> ShadowStore for KeyedShadowStore<M> {
    fn save(&self, record: &ShadowRecord) -> Result<(), SessionError> {
        let encoded = serde_json::to_string(record)?;
        self.medium.set_item(&self.key, encoded);
        Ok(())
    }

    fn load(&self) -> Option<ShadowRecord> {
        let raw = self.medium.get_item(&self.key)?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding unreadable shadow session");
                self.medium.remove_item(&self.key);
                None
            }
        }
    }

    fn clear(&self) {
        debug!(key = %self.key, "clearing shadow session");
        self.medium.remove_item(&self.key);
    }
}
