//! Target adapters.
//!
//! A target adapter knows how to apply and validate a credential against one
//! concrete external system. The coordinator is agnostic to which; concrete
//! variants are selected by configuration, not subclassing.
//!
//! ## Adding a New Adapter
//!
//! 1. Implement the `TargetAdapter` trait
//! 2. Add the implementation in a new file (e.g., `postgres.rs`)
//! 3. Wire the variant into [`crate::core::config::AdapterKind`]
//!
//! The one contract every adapter must honor: `apply` makes a credential
//! valid *without* invalidating any other currently valid credential, and
//! applying the same credential twice is a no-op. That dual-validity window
//! is what makes the rotation zero-downtime.

use std::time::Duration;

use crate::core::version::Credential;
use crate::error::Result;

mod api_key;
mod scram;

pub use api_key::ApiKeyRegister;
pub use scram::ScramBroker;

/// Capability set for one external system family.
pub trait TargetAdapter: Send + Sync {
    /// Adapter name for display/config.
    fn kind(&self) -> &'static str;

    /// Produce a new credential value meeting the target's constraints.
    fn generate(&self) -> Result<Credential>;

    /// Make the credential valid on the target without revoking any other
    /// currently valid credential. Idempotent: re-applying the same
    /// credential succeeds identically.
    ///
    /// # Errors
    ///
    /// `AdapterError::Unavailable` if the target times out or cannot be
    /// reached (retryable).
    fn apply(&self, credential: &Credential, timeout: Duration) -> Result<()>;

    /// Perform a minimal live operation proving the credential works
    /// end-to-end (e.g., authenticate).
    ///
    /// # Errors
    ///
    /// `AdapterError::Rejected` if the target refuses the credential,
    /// `AdapterError::Unavailable` on timeout (retryable).
    fn test(&self, credential: &Credential, timeout: Duration) -> Result<()>;

    /// Invalidate a credential that is no longer needed. Called only on
    /// `Previous`/`Deprecated` versions, never on `Current` or `Pending`.
    /// Revoking an already-revoked credential is a no-op.
    fn revoke(&self, credential: &Credential, timeout: Duration) -> Result<()>;
}

// Lets the CLI pick an adapter variant at runtime while the coordinator
// stays generic.
impl TargetAdapter for Box<dyn TargetAdapter> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn generate(&self) -> Result<Credential> {
        (**self).generate()
    }

    fn apply(&self, credential: &Credential, timeout: Duration) -> Result<()> {
        (**self).apply(credential, timeout)
    }

    fn test(&self, credential: &Credential, timeout: Duration) -> Result<()> {
        (**self).test(credential, timeout)
    }

    fn revoke(&self, credential: &Credential, timeout: Duration) -> Result<()> {
        (**self).revoke(credential, timeout)
    }
}

/// Random secret material in the target's allowed alphabet.
///
/// Shared by the built-in adapters; length and charset vary per target.
pub(crate) fn random_secret(len: usize) -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                              abcdefghijklmnopqrstuvwxyz\
                              0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
