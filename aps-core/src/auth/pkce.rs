//! PKCE (Proof Key for Code Exchange) helpers for the authorization code flow.
//!
//! 1. Generate a [`PkcePair`]
//! 2. Put `challenge` in the authorization URL
//! 3. Send `verifier` with the code exchange

use oauth2::{PkceCodeChallenge, PkceCodeVerifier};
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::store::Secret;

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Kept by the client until the code exchange.
    pub verifier: Secret,

    /// `BASE64URL(SHA256(verifier))`, sent in the authorization URL.
    pub challenge: String,
}

impl PkcePair {
    /// Generate a random verifier and its challenge.
    pub fn generate() -> Self {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        Self {
            verifier: Secret::new(verifier.secret().as_str()),
            challenge: challenge.as_str().to_string(),
        }
    }

    /// Derive the challenge for a known verifier.
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = PkceCodeVerifier::new(verifier.into());
        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&verifier);
        Self {
            verifier: Secret::new(verifier.secret().as_str()),
            challenge: challenge.as_str().to_string(),
        }
    }
}

/// Random alphanumeric value of `length` characters, for the `state` and
/// `nonce` parameters of the authorization URL.
pub fn generate_random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
