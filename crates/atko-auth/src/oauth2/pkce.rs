//! Proof key for code exchange (RFC 7636)

use oauth2::PkceCodeChallenge;
use secrecy::{ExposeSecret, SecretString};

/// Verifier/challenge pair for one authorization attempt
///
/// The challenge travels in the authorization URL; the verifier stays in memory until the
/// code is exchanged and is never persisted.
pub struct PkceChallenge {
    verifier: SecretString,
    challenge: String,
}

impl PkceChallenge {
    /// Generate a random 32-byte verifier and its S256 challenge
    pub fn generate() -> Self {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        Self {
            verifier: SecretString::new(verifier.secret().clone()),
            challenge: challenge.as_str().to_string(),
        }
    }

    pub fn code_challenge(&self) -> &str {
        &self.challenge
    }

    pub fn code_verifier(&self) -> &str {
        self.verifier.expose_secret()
    }

    /// Always `S256`
    pub fn method(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.challenge)
            .finish()
    }
}
