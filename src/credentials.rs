//! Password checks used by `Gateway::verify_login`.
//!
//! The store keeps passwords as given. Swapping the verifier is how a hashed
//! scheme gets introduced without touching the gateway contract.

pub trait CredentialVerifier: Send + Sync {
    /// Whether `supplied` is accepted for a user whose stored secret is `stored`.
    fn verify(&self, stored: &str, supplied: &str) -> bool;
}

/// Exact comparison against the stored value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn verify(&self, stored: &str, supplied: &str) -> bool {
        stored == supplied
    }
}
