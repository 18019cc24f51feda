//! In-memory token storage implementation.

use parking_lot::RwLock;

use super::TokenStore;
use crate::token::ExtendedToken;

/// In-memory token store.
///
/// Not persistent; the token is lost when the process exits.
///
/// # Thread Safety
///
/// Interior mutability via `RwLock`; safe to share across tasks behind an `Arc`.
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<ExtendedToken>>,
}

impl InMemoryTokenStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a token.
    pub fn with_token(token: ExtendedToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl std::fmt::Debug for InMemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let expires_at = self.token.read().as_ref().map(|t| t.expires_at());
        f.debug_struct("InMemoryTokenStore")
            .field("expires_at", &expires_at)
            .finish()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self) -> Option<ExtendedToken> {
        self.token.read().clone()
    }

    fn set(&self, token: ExtendedToken) {
        *self.token.write() = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::AccessToken;
    use chrono::Utc;

    fn token(value: &str) -> ExtendedToken {
        ExtendedToken::issued_at(AccessToken::new(value, 3600), Utc::now())
    }

    #[test]
    fn test_memory_store_starts_empty() {
        let store = InMemoryTokenStore::new();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_memory_store_set_get() {
        let store = InMemoryTokenStore::new();
        store.set(token("first"));

        let retrieved = store.get().unwrap();
        assert_eq!(retrieved.access_token().expose(), "first");
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = InMemoryTokenStore::with_token(token("first"));
        store.set(token("second"));

        assert_eq!(store.get().unwrap().access_token().expose(), "second");
    }

    #[test]
    fn test_memory_store_debug_hides_token() {
        let store = InMemoryTokenStore::with_token(token("hidden-value"));
        let debug = format!("{:?}", store);
        assert!(!debug.contains("hidden-value"));
    }
}
