//! Token storage abstraction.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`TokenStore`] - Trait for holding the most recent [`ExtendedToken`]
//! - [`InMemoryTokenStore`] - In-memory implementation
//!
//! Each client owns its own store; there is no process-wide token cache.
//!
//! # Example
//!
//! ```rust
//! use aps_core::store::{InMemoryTokenStore, TokenStore};
//!
//! let store = InMemoryTokenStore::new();
//! assert!(store.get().is_none());
//! ```

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::token::ExtendedToken;

mod memory;

pub use memory::InMemoryTokenStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value.
/// The backing buffer is zeroed on drop.
#[derive(Clone, Serialize, Deserialize)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret holds an empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the secret and return the inner value.
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Holder of the most recent token for one client.
///
/// `set` replaces the stored token wholesale; `get` returns a copy of the
/// current value or `None` while the store is still empty. Implementations
/// must never expose a partially written token.
///
/// No locking is performed across a `get`/`set` pair: two callers that both
/// observe an expired token will both refresh and the last `set` wins.
pub trait TokenStore: Send + Sync {
    /// Current token, if any.
    fn get(&self) -> Option<ExtendedToken>;

    /// Replace the current token.
    fn set(&self, token: ExtendedToken);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_secret_into_inner() {
        let secret = Secret::from("value");
        assert_eq!(secret.into_inner(), "value");
    }
}
