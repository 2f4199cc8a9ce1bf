//! Keyturn - zero-downtime credential rotation coordinator.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Operator trigger (phase invocation, status)
//! │   ├── init          # Write a starter .keyturn.toml
//! │   ├── run           # Invoke one phase with a token
//! │   ├── rotate        # Drive all four phases in order
//! │   ├── retire        # Revoke previous versions past the grace period
//! │   ├── status        # Show stage layout per secret
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── coordinator   # Four-phase rotation state machine
//!     ├── phase         # Phase names and ordering
//!     ├── stage         # Pending/Current/Previous/Deprecated labels
//!     ├── version       # Credential payloads, versioned secret records
//!     ├── store/        # Versioned secret storage
//!     │   ├── mod       # SecretStore trait
//!     │   ├── fs        # Filesystem backend (JSON records, atomic rename)
//!     │   └── memory    # In-memory backend
//!     ├── adapter/      # Target adapters
//!     │   ├── mod       # TargetAdapter trait
//!     │   ├── api_key   # API-token register target
//!     │   └── scram     # Message-broker SASL/SCRAM target
//!     ├── audit         # Append-only phase-transition log
//!     └── config        # .keyturn.toml management
//! ```
//!
//! # Protocol
//!
//! A rotation is four independently invoked, idempotent phases:
//! `createSecret` stages a fresh credential as pending, `setSecret` makes it
//! valid on the target *alongside* the old one, `testSecret` proves it
//! authenticates, and `finishSecret` atomically promotes it to current while
//! demoting the old credential to previous. The old credential stays valid
//! until a separately scheduled cleanup revokes it after a grace period, so
//! there is no instant at which authentication against the target can fail.

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::coordinator::{Coordinator, Invocation};
pub use crate::core::phase::Phase;
pub use crate::core::stage::Stage;
pub use crate::core::types::{RotationToken, SecretId, VersionId};
