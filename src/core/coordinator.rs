//! Rotation coordinator.
//!
//! Drives the four-phase protocol against a [`SecretStore`] and a
//! [`TargetAdapter`]. Every phase is a pure function of (durable secret
//! state, token) plus at most one external call, so any phase can be
//! retried after a crash and any process instance can resume a rotation
//! another instance started.
//!
//! Ordering is durable state, not caller convention: each phase checks the
//! recorded progress of the pending version and rejects calls whose
//! precondition has not been reached.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::adapter::TargetAdapter;
use crate::core::audit::{AuditEvent, AuditSink, Outcome, TracingSink};
use crate::core::phase::Phase;
use crate::core::stage::Stage;
use crate::core::store::SecretStore;
use crate::core::types::{RotationToken, SecretId, VersionId};
use crate::core::version::SecretVersion;
use crate::error::{AdapterError, Error, Result, RotationError, StoreError};

/// Default timeout for adapter calls.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay before a displaced credential may be revoked.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of one trigger invocation, per the external call contract.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub status: Outcome,
    pub detail: String,
}

/// What a later phase found to act on: the live pending version, or the
/// already-promoted version when the rotation completed earlier.
enum Owned {
    Pending(SecretVersion),
    Finished(SecretVersion),
}

/// The rotation coordinator.
pub struct Coordinator<S, A> {
    store: S,
    adapter: A,
    audit: Box<dyn AuditSink>,
    adapter_timeout: Duration,
    grace_period: Duration,
}

impl<S: SecretStore, A: TargetAdapter> Coordinator<S, A> {
    pub fn new(store: S, adapter: A) -> Self {
        Self {
            store,
            adapter,
            audit: Box::new(TracingSink),
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute one phase under the trigger call contract.
    ///
    /// Never returns an error: failures are folded into the invocation
    /// status (`failed`, or `in_progress` when a different token holds the
    /// rotation) and recorded in the audit trail either way.
    pub fn invoke(&self, secret_id: &SecretId, phase: Phase, token: &RotationToken) -> Invocation {
        let result = self.execute(secret_id, phase, token);
        let (status, detail) = match result {
            Ok(detail) => (Outcome::Success, detail),
            Err(Error::Rotation(RotationError::InProgress { ref holder, .. })) => (
                Outcome::InProgress,
                format!("rotation held by token {holder}"),
            ),
            Err(e) => (Outcome::Failed, e.to_string()),
        };

        self.audit
            .record(&AuditEvent::new(secret_id, phase, token, status, &detail));
        Invocation { status, detail }
    }

    /// Execute one phase, propagating structured errors.
    pub fn execute(
        &self,
        secret_id: &SecretId,
        phase: Phase,
        token: &RotationToken,
    ) -> Result<String> {
        debug!(secret = %secret_id, phase = %phase, token = %token, "phase invoked");
        match phase {
            Phase::CreateSecret => self.create_secret(secret_id, token),
            Phase::SetSecret => self.set_secret(secret_id, token),
            Phase::TestSecret => self.test_secret(secret_id, token),
            Phase::FinishSecret => self.finish_secret(secret_id, token),
        }
    }

    /// Run all four phases in order with one token.
    ///
    /// This is also how a brand-new secret is bootstrapped: the first
    /// promotion simply has no predecessor to demote.
    pub fn rotate(&self, secret_id: &SecretId, token: &RotationToken) -> Result<()> {
        for phase in Phase::ALL {
            let detail = self.execute(secret_id, phase, token)?;
            self.audit.record(&AuditEvent::new(
                secret_id,
                phase,
                token,
                Outcome::Success,
                &detail,
            ));
        }
        Ok(())
    }

    /// Phase 1: stage a freshly generated credential as pending.
    ///
    /// Idempotent per token. A pending version held by a different token
    /// fails with `RotationError::InProgress`; only one rotation may be in
    /// flight per secret.
    fn create_secret(&self, secret_id: &SecretId, token: &RotationToken) -> Result<String> {
        if let Some(pending) = self.pending(secret_id)? {
            if &pending.token == token {
                debug!(secret = %secret_id, version = %pending.version_id, "pending version reused");
                return Ok(format!("pending version {} already staged", pending.version_id));
            }
            return Err(self.in_progress(secret_id, &pending));
        }

        let credential = self.adapter.generate()?;
        let version = SecretVersion::pending(credential, token.clone());
        let version_id = match self.store.put(secret_id, version) {
            Ok(id) => id,
            // Lost a create race; re-read and re-decide.
            Err(Error::Store(StoreError::AlreadyPending(_)))
            | Err(Error::Store(StoreError::Conflict(_))) => {
                let pending = self
                    .pending(secret_id)?
                    .ok_or_else(|| StoreError::Conflict(secret_id.to_string()))?;
                if &pending.token != token {
                    return Err(self.in_progress(secret_id, &pending));
                }
                pending.version_id
            }
            Err(e) => return Err(e),
        };

        info!(secret = %secret_id, version = %version_id, "pending version staged");
        Ok(format!("pending version {version_id} staged"))
    }

    /// Phase 2: make the pending credential valid on the target alongside
    /// the old one. The old credential is untouched.
    fn set_secret(&self, secret_id: &SecretId, token: &RotationToken) -> Result<String> {
        let mut pending = match self.owned_pending(secret_id, token, Phase::SetSecret)? {
            Owned::Pending(p) => p,
            Owned::Finished(v) => {
                return Ok(format!("rotation already finished as version {}", v.version_id))
            }
        };

        if pending.is_applied() {
            return Ok("credential already applied to target".to_string());
        }

        self.adapter
            .apply(&pending.credential, self.adapter_timeout)?;
        pending.applied_at = Some(chrono::Utc::now());
        self.store.put(secret_id, pending)?;

        info!(secret = %secret_id, "credential applied to target");
        Ok("credential applied to target".to_string())
    }

    /// Phase 3: prove the pending credential authenticates end-to-end.
    ///
    /// On rejection the rotation pauses: the pending version stays in place
    /// for diagnosis and the old credential remains fully valid.
    fn test_secret(&self, secret_id: &SecretId, token: &RotationToken) -> Result<String> {
        let mut pending = match self.owned_pending(secret_id, token, Phase::TestSecret)? {
            Owned::Pending(p) => p,
            Owned::Finished(v) => {
                return Ok(format!("rotation already finished as version {}", v.version_id))
            }
        };

        if !pending.is_applied() {
            return Err(self.phase_order(secret_id, Phase::TestSecret, "setSecret has not completed"));
        }
        if pending.is_validated() {
            return Ok("credential already validated".to_string());
        }

        match self.adapter.test(&pending.credential, self.adapter_timeout) {
            Ok(()) => {}
            Err(Error::Adapter(AdapterError::Rejected(detail))) => {
                warn!(secret = %secret_id, %detail, "validation failed; rotation paused");
                return Err(RotationError::ValidationFailed {
                    secret_id: secret_id.to_string(),
                    detail,
                }
                .into());
            }
            Err(e) => return Err(e),
        }

        pending.validated_at = Some(chrono::Utc::now());
        self.store.put(secret_id, pending)?;

        info!(secret = %secret_id, "credential validated against target");
        Ok("credential validated".to_string())
    }

    /// Phase 4: atomically promote pending to current. The only phase that
    /// changes which credential is live from the caller's perspective.
    fn finish_secret(&self, secret_id: &SecretId, token: &RotationToken) -> Result<String> {
        let pending = match self.owned_pending(secret_id, token, Phase::FinishSecret)? {
            Owned::Pending(p) => p,
            Owned::Finished(v) => {
                return Ok(format!("version {} is already current", v.version_id))
            }
        };

        if !pending.is_validated() {
            return Err(self.phase_order(
                secret_id,
                Phase::FinishSecret,
                "testSecret has not completed",
            ));
        }

        match self.store.promote_and_demote(secret_id, &pending.version_id) {
            Ok(()) => {}
            Err(Error::Store(StoreError::Conflict(_))) => {
                // Raced another finisher. If our version won, this call is a
                // successful retry; otherwise surface the conflict.
                let current = self.store.get(secret_id, Stage::Current)?;
                if current.version_id != pending.version_id {
                    return Err(StoreError::Conflict(secret_id.to_string()).into());
                }
            }
            Err(e) => return Err(e),
        }

        info!(secret = %secret_id, version = %pending.version_id, "version promoted to current");
        Ok(format!("version {} promoted to current", pending.version_id))
    }

    /// Revoke and deprecate `Previous` versions that were displaced longer
    /// ago than the grace period. Returns the retired version ids.
    ///
    /// Runs separately from rotation (a scheduled cleanup); never touches
    /// `Current` or `Pending`.
    pub fn retire_previous(&self, secret_id: &SecretId) -> Result<Vec<VersionId>> {
        let Ok(grace) = chrono::Duration::from_std(self.grace_period) else {
            // Grace period too large to ever elapse; nothing retires.
            return Ok(Vec::new());
        };
        let cutoff = chrono::Utc::now() - grace;

        let mut retired = Vec::new();
        for version in self.store.list_by_stage(secret_id, Stage::Previous)? {
            let displaced_at = version.demoted_at.unwrap_or(version.created_at);
            if displaced_at > cutoff {
                debug!(
                    secret = %secret_id,
                    version = %version.version_id,
                    "still within grace period"
                );
                continue;
            }
            self.adapter
                .revoke(&version.credential, self.adapter_timeout)?;
            self.store.retire(secret_id, &version.version_id)?;
            info!(secret = %secret_id, version = %version.version_id, "previous version retired");
            retired.push(version.version_id);
        }
        Ok(retired)
    }

    fn pending(&self, secret_id: &SecretId) -> Result<Option<SecretVersion>> {
        match self.store.get(secret_id, Stage::Pending) {
            Ok(version) => Ok(Some(version)),
            Err(Error::Store(StoreError::NotFound(_)))
            | Err(Error::Store(StoreError::NoVersionInStage { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve the pending version a later phase may act on.
    ///
    /// With no pending version, a token that matches the current version
    /// means the rotation already completed (idempotent replay); anything
    /// else is a phase-order violation. A pending version held by a
    /// different token belongs to someone else's rotation.
    fn owned_pending(
        &self,
        secret_id: &SecretId,
        token: &RotationToken,
        phase: Phase,
    ) -> Result<Owned> {
        match self.pending(secret_id)? {
            Some(pending) if &pending.token == token => Ok(Owned::Pending(pending)),
            Some(pending) => Err(self.in_progress(secret_id, &pending)),
            None => {
                if let Ok(current) = self.store.get(secret_id, Stage::Current) {
                    if &current.token == token {
                        return Ok(Owned::Finished(current));
                    }
                }
                Err(self.phase_order(secret_id, phase, "no rotation is pending"))
            }
        }
    }

    fn in_progress(&self, secret_id: &SecretId, holder: &SecretVersion) -> Error {
        RotationError::InProgress {
            secret_id: secret_id.to_string(),
            holder: holder.token.to_string(),
        }
        .into()
    }

    fn phase_order(&self, secret_id: &SecretId, phase: Phase, detail: &str) -> Error {
        RotationError::InvalidPhaseOrder {
            secret_id: secret_id.to_string(),
            phase: phase.to_string(),
            detail: detail.to_string(),
        }
        .into()
    }
}
