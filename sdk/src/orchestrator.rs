// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Executes [`ValidationOperation`]s with retry and audit.

use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    audit::{AuditOutcome, AuditRecord, AuditSink},
    certificate::{Certificate, CertificateId},
    certificate_manager::CertificateManager,
    clock::Clock,
    operation::{OperationKind, ValidationOperation},
    settings::Retry,
    signature::{Signature, SignatureId, ValidityState},
    signature_validator::SignatureValidator,
    store::{Store, WriteBatch},
    transitions::{signature_transition, validity_cap, Effect, SignatureEvent},
    Error, Result,
};

const MAX_CONFLICT_RETRIES: usize = 5;

/// How often and how patiently an operation is attempted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per operation, the first one included.
    pub max_attempts: u32,

    /// Delay before each retry. The last entry is reused when there are
    /// more retries than entries.
    pub backoff: Vec<Duration>,

    /// Time limit for one attempt. An attempt that exceeds it has failed.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Build a policy from the `[retry]` settings.
    pub fn from_settings(retry: &Retry) -> Self {
        Self {
            max_attempts: retry.max_attempts.max(1),
            backoff: retry
                .backoff_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            attempt_timeout: Duration::from_secs(retry.attempt_timeout_secs),
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let index = (attempt.max(1) - 1) as usize;
        self.backoff
            .get(index)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&Retry::default())
    }
}

/// The result of [`SignatureProcessingOrchestrator::run`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    /// The signature the operation ran on.
    pub signature_id: SignatureId,

    /// What ran.
    pub kind: OperationKind,

    /// How it ended.
    pub outcome: AuditOutcome,

    /// Number of attempts made.
    pub attempts: u32,

    /// Validity of the signature after the operation, if it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<ValidityState>,

    /// Error message when the operation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationReport {
    /// Returns `true` if the operation succeeded.
    pub fn succeeded(&self) -> bool {
        matches!(
            self.outcome,
            AuditOutcome::Changed | AuditOutcome::Unchanged
        )
    }
}

/// Runs one [`ValidationOperation`] at a time against the store.
///
/// Each attempt marks the signature as validating, dispatches to the
/// [`SignatureValidator`] or [`CertificateManager`], and persists the
/// outcome. A failed attempt is persisted as an error and retried according
/// to the [`RetryPolicy`]. Errors never escape [`run`](Self::run).
pub struct SignatureProcessingOrchestrator {
    store: Arc<dyn Store>,
    certificates: Arc<CertificateManager>,
    validator: Arc<SignatureValidator>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl SignatureProcessingOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        store: Arc<dyn Store>,
        certificates: Arc<CertificateManager>,
        validator: Arc<SignatureValidator>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            certificates,
            validator,
            audit,
            clock,
            policy,
        }
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation`, retrying failed attempts.
    ///
    /// Exactly one audit record is written per call.
    pub async fn run(&self, operation: &ValidationOperation) -> OperationReport {
        let started = Instant::now();
        let id = &operation.signature_id;
        let before = self.snapshot(id).await;

        let mut attempt = 0;
        let result = loop {
            attempt += 1;

            let result =
                match tokio::time::timeout(self.policy.attempt_timeout, self.attempt(operation, attempt))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(self.policy.attempt_timeout)),
                };

            let err = match result {
                Ok(()) => break Ok(()),
                Err(err) => err,
            };

            if !err.is_retryable() {
                self.record_failure(id, err.to_string()).await;
                break Err((AuditOutcome::Failed, err));
            }

            if attempt >= self.policy.max_attempts {
                let terminal = Error::TerminalFailure {
                    attempts: attempt,
                    message: err.to_string(),
                };
                error!("{} on signature {id}: {terminal}", operation.kind);
                self.record_failure(id, terminal.to_string()).await;
                break Err((AuditOutcome::TerminalFailure, terminal));
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                "{} on signature {id} failed (attempt {attempt} of {}): {err}; retrying in {delay:?}",
                operation.kind, self.policy.max_attempts
            );
            self.record_failure(id, err.to_string()).await;
            tokio::time::sleep(delay).await;
        };

        let after = self.snapshot(id).await;
        let certificate_id = after
            .as_ref()
            .or(before.as_ref())
            .map(|(signature, _)| signature.certificate_id.clone());
        let validity = after.as_ref().map(|(signature, _)| signature.validity_state);

        let (outcome, detail, error) = match result {
            Ok(()) => {
                let outcome = if before == after {
                    AuditOutcome::Unchanged
                } else {
                    AuditOutcome::Changed
                };
                let detail = validity
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "completed".to_string());
                (outcome, detail, None)
            }
            Err((outcome, err)) => (outcome, err.to_string(), Some(err.to_string())),
        };

        self.audit.record(AuditRecord {
            operation: operation.kind,
            signature_id: id.clone(),
            certificate_id,
            outcome,
            detail,
            attempts: attempt,
            duration: started.elapsed(),
            recorded_at: self.clock.now(),
        });

        OperationReport {
            signature_id: id.clone(),
            kind: operation.kind,
            outcome,
            attempts: attempt,
            validity,
            error,
        }
    }

    async fn attempt(&self, operation: &ValidationOperation, attempt: u32) -> Result<()> {
        let id = &operation.signature_id;
        debug!("{} on signature {id}, attempt {attempt}", operation.kind);

        let signature = self
            .apply(
                id,
                SignatureEvent::ProcessingStarted {
                    operation: operation.kind,
                    attempt,
                },
            )
            .await?;

        match operation.kind {
            OperationKind::ValidateSignature => self.validate_signature(id).await,

            OperationKind::VerifyCertificate => {
                let summary = self
                    .certificates
                    .verify_certificate(&signature.certificate_id)
                    .await?;
                if summary.incomplete {
                    return Err(Error::TransientServiceFailure(format!(
                        "no check produced a definitive answer for certificate {}",
                        summary.certificate_id
                    )));
                }
                self.apply(id, SignatureEvent::OperationCompleted).await?;
                Ok(())
            }

            OperationKind::VerifyTrustChain => {
                self.certificates
                    .verify_trust_chain(&signature.certificate_id)
                    .await?;
                self.apply(id, SignatureEvent::OperationCompleted).await?;
                Ok(())
            }

            OperationKind::RefreshTimestamp => {
                let refresh = self
                    .validator
                    .refresh_time_stamp(&signature, operation.options.force_time_stamp_refresh)
                    .await?;
                self.apply(
                    id,
                    SignatureEvent::TimeStampRefreshed {
                        token: refresh.token,
                        validation: refresh.validation,
                    },
                )
                .await?;
                Ok(())
            }
        }
    }

    /// Validate and persist, guarded by the certificate version that was
    /// read so that a concurrent certificate update forces a re-run with
    /// the fresher state.
    async fn validate_signature(&self, id: &SignatureId) -> Result<()> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let signature = self.store.get_signature(id).await?;
            let certificate = self
                .store
                .get_certificate(&signature.certificate_id)
                .await?;

            let report = self.validator.validate(&signature, &certificate);
            let cap = validity_cap(&certificate);
            let (next, effects) = signature_transition(
                &signature,
                SignatureEvent::Validated { report, cap },
                self.clock.now(),
            );

            let batch = WriteBatch::new()
                .put_signature(next)
                .guard_certificate(certificate.id.clone(), certificate.version);

            match self.store.commit(batch).await {
                Ok(()) => {
                    log_effects(&effects);
                    return Ok(());
                }
                Err(Error::Conflict { entity, id: conflict_id }) => {
                    debug!("{entity} {conflict_id} changed during validation; re-running");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict {
            entity: "signature",
            id: id.to_string(),
        })
    }

    /// Load the signature, apply `event`, and write it back, reloading on
    /// version conflicts.
    async fn apply(&self, id: &SignatureId, event: SignatureEvent) -> Result<Signature> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let current = self.store.get_signature(id).await?;
            let (next, effects) = signature_transition(&current, event.clone(), self.clock.now());

            match self
                .store
                .commit(WriteBatch::new().put_signature(next.clone()))
                .await
            {
                Ok(()) => {
                    log_effects(&effects);
                    return Ok(next);
                }
                Err(Error::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict {
            entity: "signature",
            id: id.to_string(),
        })
    }

    async fn record_failure(&self, id: &SignatureId, message: String) {
        match self.apply(id, SignatureEvent::Failed { message }).await {
            Ok(_) | Err(Error::NotFound { .. }) => {}
            Err(e) => warn!("could not record failure on signature {id}: {e}"),
        }
    }

    /// The signature and its certificate with versions cleared, for
    /// detecting whether a run changed anything.
    async fn snapshot(&self, id: &SignatureId) -> Option<(Signature, Option<Certificate>)> {
        let mut signature = self.store.get_signature(id).await.ok()?;
        signature.version = 0;

        let certificate = self.certificate(&signature.certificate_id).await;
        Some((signature, certificate))
    }

    async fn certificate(&self, id: &CertificateId) -> Option<Certificate> {
        let mut certificate = self.store.get_certificate(id).await.ok()?;
        certificate.version = 0;
        Some(certificate)
    }
}

fn log_effects(effects: &[Effect]) {
    for effect in effects {
        if let Effect::ValidityChanged {
            signature_id,
            from,
            to,
        } = effect
        {
            info!("signature {signature_id} changed from {from} to {to}");
        }
    }
}
