//! Error types for keyturn.
//!
//! Errors are layered: each subsystem (store, adapter, rotation protocol,
//! config) has its own enum, aggregated into the top-level [`Error`] so
//! callers can use `?` across subsystem boundaries.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Rotation(#[from] RotationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Secret store errors.
///
/// `Conflict` and `AlreadyPending` carry the store's optimistic-concurrency
/// semantics: a losing writer must re-read and re-decide, never overwrite.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("no version in stage {stage} for secret {secret_id}")]
    NoVersionInStage { secret_id: String, stage: String },

    #[error("concurrent mutation detected for secret {0}: re-read and retry")]
    Conflict(String),

    #[error("a pending version already exists for secret {0}")]
    AlreadyPending(String),

    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("store read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("store write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("corrupt secret record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Target adapter errors.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The target timed out or could not be reached. Retryable; the
    /// coordinator preserves the pending version so a retry resumes cleanly.
    #[error("target unavailable: {0}")]
    Unavailable(String),

    /// The target rejected the credential outright (authentication failed).
    #[error("credential rejected by target: {0}")]
    Rejected(String),

    /// The adapter's own durable state could not be read or written.
    #[error("adapter state error: {0}")]
    State(String),
}

/// Rotation protocol errors.
#[derive(Error, Debug)]
pub enum RotationError {
    /// A different token already holds the pending slot. The caller must
    /// wait or investigate, not retry blindly.
    #[error("rotation already in progress for secret {secret_id} (held by token {holder})")]
    InProgress { secret_id: String, holder: String },

    /// Phase invoked before its precondition state was reached.
    #[error("phase {phase} invoked out of order for secret {secret_id}: {detail}")]
    InvalidPhaseOrder {
        secret_id: String,
        phase: String,
        detail: String,
    },

    /// The new credential failed its live validation test. The rotation is
    /// paused, not rolled back: the old credential stays current.
    #[error("validation failed for secret {secret_id}: {detail}")]
    ValidationFailed { secret_id: String, detail: String },

    #[error("unknown phase: {0} (expected createSecret, setSecret, testSecret or finishSecret)")]
    UnknownPhase(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("not initialized: no .keyturn.toml found (run `keyturn init`)")]
    NotInitialized,

    #[error("already initialized: .keyturn.toml exists")]
    AlreadyInitialized,

    #[error("config read failed: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize failed: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unknown adapter kind: {0} (expected api-key or scram)")]
    UnknownAdapter(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a retry of the same phase with the same token can succeed.
    ///
    /// `Conflict` and `TargetUnavailable` are transient; phase-order and
    /// validation failures need operator attention first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(StoreError::Conflict(_)) => true,
            Error::Adapter(AdapterError::Unavailable(_)) => true,
            Error::Io(_) => true,
            _ => false,
        }
    }
}
