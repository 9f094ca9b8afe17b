use std::fmt::{self, Debug, Formatter};

use crate::store::{KeyValueStore, StoreError};

/// The store slot holding the generation API key.
pub const API_KEY_SLOT: &str = "gemini_api_key";

/// The API key for the generation service, plus whether it should be kept
/// in the local store.
///
/// Changing a credential never touches the store by itself; call
/// [`Credential::persist`] after a change that should be saved.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    api_key: String,
    remember: bool,
}

impl Default for Credential {
    #[inline]
    fn default() -> Self {
        Self {
            api_key: String::new(),
            remember: true,
        }
    }
}

impl Credential {
    /// Creates a credential with the given key, remembered by default.
    #[inline]
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Returns the API key.
    #[inline]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns whether the key should be kept in the local store.
    #[inline]
    pub fn remember(&self) -> bool {
        self.remember
    }

    /// Returns `true` if there is a key to send requests with.
    #[inline]
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Replaces the API key.
    #[inline]
    pub fn set_api_key<S: Into<String>>(&mut self, api_key: S) {
        self.api_key = api_key.into();
    }

    /// Turns remembering on or off.
    #[inline]
    pub fn set_remember(&mut self, remember: bool) {
        self.remember = remember;
    }

    /// Loads a previously saved key, if there is one.
    ///
    /// Returns `true` if the key was replaced.
    pub fn restore(&mut self, store: &dyn KeyValueStore) -> bool {
        match store.get(API_KEY_SLOT) {
            Some(saved) if !saved.is_empty() => {
                self.api_key = saved;
                true
            }
            _ => false,
        }
    }

    /// Mirrors this credential into `store`.
    ///
    /// The key is written when remembering is on and there is a key,
    /// otherwise the slot is cleared.
    pub fn persist(
        &self,
        store: &mut dyn KeyValueStore,
    ) -> Result<(), StoreError> {
        if self.remember && !self.api_key.is_empty() {
            debug!("saving api key to the local store");
            store.set(API_KEY_SLOT, &self.api_key)
        } else {
            debug!("removing api key from the local store");
            store.remove(API_KEY_SLOT)
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Credential")
            .field("api_key", &api_key)
            .field("remember", &self.remember)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_persist_follows_remember() {
        let mut store = MemoryStore::default();
        let mut credential = Credential::new("abc");

        credential.persist(&mut store).unwrap();
        assert_eq!(store.get(API_KEY_SLOT).as_deref(), Some("abc"));

        credential.set_remember(false);
        credential.persist(&mut store).unwrap();
        assert_eq!(store.get(API_KEY_SLOT), None);

        // Turning it back on saves the key that is already there.
        credential.set_remember(true);
        credential.persist(&mut store).unwrap();
        assert_eq!(store.get(API_KEY_SLOT).as_deref(), Some("abc"));

        credential.set_api_key("");
        credential.persist(&mut store).unwrap();
        assert_eq!(store.get(API_KEY_SLOT), None);
    }

    #[test]
    fn test_update_does_not_persist() {
        let mut store = MemoryStore::default();
        let mut credential = Credential::default();
        credential.set_api_key("abc");
        assert_eq!(store.get(API_KEY_SLOT), None);

        credential.persist(&mut store).unwrap();
        let mut restored = Credential::default();
        assert!(restored.restore(&store));
        assert_eq!(restored.api_key(), "abc");
    }

    #[test]
    fn test_restore_ignores_empty() {
        let mut store = MemoryStore::default();
        store.set(API_KEY_SLOT, "").unwrap();
        let mut credential = Credential::new("env-key");
        assert!(!credential.restore(&store));
        assert_eq!(credential.api_key(), "env-key");
    }

    #[test]
    fn test_configured_and_debug() {
        assert!(!Credential::default().is_configured());
        assert!(!Credential::new("   ").is_configured());

        let credential = Credential::new("secret");
        assert!(credential.is_configured());
        assert!(!format!("{credential:?}").contains("secret"));
    }
}
