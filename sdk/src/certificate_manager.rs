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

//! Certificate verification and the cascade into dependent signatures.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, info, warn};
use sigtrust_crypto::ocsp::OcspCertStatus;
use tokio::sync::OwnedMutexGuard;

use crate::{
    certificate::{
        Certificate, CertificateId, CertificateState, ChainStatus, CheckOutcome, CheckResult,
        CrlStatus, RevocationOverride, VerificationResult,
    },
    chain_validator::ChainCheck,
    clock::Clock,
    revocation::RevocationCheck,
    settings::Settings,
    signature::SignatureId,
    store::{Store, WriteBatch},
    transitions::{
        certificate_transition, signature_transition, CertificateEvent, Effect, SignatureEvent,
    },
    Error, Result,
};

// Bound on reload-and-reapply rounds when a concurrent writer wins.
const MAX_CONFLICT_RETRIES: usize = 5;

/// What a certificate verification changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationSummary {
    /// The certificate.
    pub certificate_id: CertificateId,

    /// State before the verification.
    pub previous_state: CertificateState,

    /// State after the verification.
    pub state: CertificateState,

    /// `true` if the state changed.
    pub changed: bool,

    /// `true` if every applicable check was unavailable.
    pub incomplete: bool,

    /// The verification result that was persisted.
    pub result: Option<VerificationResult>,

    /// Signatures whose validity was downgraded by the state change.
    pub cascaded: Vec<SignatureId>,
}

/// Runs the CRL, OCSP and chain checks on certificates, derives their state
/// and pushes state changes into the signatures made with them.
///
/// Only one verification per certificate runs at a time.
pub struct CertificateManager {
    store: Arc<dyn Store>,
    revocation: Arc<dyn RevocationCheck>,
    chain: Arc<dyn ChainCheck>,
    clock: Arc<dyn Clock>,
    crl_timeout: Duration,
    ocsp_timeout: Duration,
    chain_timeout: Duration,
    locks: Arc<LockTable>,
}

type LockTable = Mutex<HashMap<CertificateId, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive access to one certificate. The table entry is removed when the
/// last holder or waiter lets go.
struct CertificateLock {
    table: Arc<LockTable>,
    id: CertificateId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CertificateLock {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = match self.table.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Clones are only handed out under the table lock, so a count of one
        // means nobody else holds or awaits this mutex.
        if locks
            .get(&self.id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

impl CertificateManager {
    /// Create a manager.
    pub fn new(
        settings: &Settings,
        store: Arc<dyn Store>,
        revocation: Arc<dyn RevocationCheck>,
        chain: Arc<dyn ChainCheck>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            revocation,
            chain,
            clock,
            crl_timeout: settings.revocation.crl_timeout(),
            ocsp_timeout: settings.revocation.ocsp_timeout(),
            chain_timeout: settings.trust.chain_timeout(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run all three checks concurrently, derive the certificate's state,
    /// and persist it together with any cascaded signature updates.
    ///
    /// A check that fails or times out is recorded as unavailable; it never
    /// aborts the others.
    pub async fn verify_certificate(&self, id: &CertificateId) -> Result<VerificationSummary> {
        let _lock = self.lock(id).await;

        let certificate = self.store.get_certificate(id).await?;
        debug!("verifying certificate {id} ({})", certificate.info.subject);

        let (crl, ocsp, chain) = tokio::join!(
            self.crl_check(&certificate),
            self.ocsp_check(&certificate),
            self.chain_check(&certificate),
        );

        let result = VerificationResult::new(crl, ocsp, chain, self.clock.now());
        self.persist(certificate, CertificateEvent::Verified(result))
            .await
    }

    /// Re-validate the chain only.
    ///
    /// The previous CRL and OCSP results are carried forward with their
    /// original timestamps.
    pub async fn verify_trust_chain(&self, id: &CertificateId) -> Result<VerificationSummary> {
        let _lock = self.lock(id).await;

        let certificate = self.store.get_certificate(id).await?;
        let chain = self.chain_check(&certificate).await;

        let now = self.clock.now();
        let (crl, ocsp) = match &certificate.last_verification {
            Some(previous) => (previous.crl.clone(), previous.ocsp.clone()),
            None => (
                CheckResult::new(CheckOutcome::unavailable("not yet checked"), now),
                CheckResult::new(CheckOutcome::unavailable("not yet checked"), now),
            ),
        };

        let result = VerificationResult::new(crl, ocsp, chain, now);
        self.persist(certificate, CertificateEvent::Verified(result))
            .await
    }

    /// Lift a sticky revocation. The certificate moves to
    /// [`Unknown`](CertificateState::Unknown) until it is verified again.
    pub async fn override_revocation(
        &self,
        id: &CertificateId,
        revocation_override: RevocationOverride,
    ) -> Result<VerificationSummary> {
        let _lock = self.lock(id).await;

        let certificate = self.store.get_certificate(id).await?;
        if certificate.state != CertificateState::Revoked {
            warn!("certificate {id} is not revoked; override ignored");
        }

        self.persist(
            certificate,
            CertificateEvent::RevocationOverridden(revocation_override),
        )
        .await
    }

    async fn lock(&self, id: &CertificateId) -> CertificateLock {
        let mutex = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.entry(id.clone()).or_default().clone()
        };

        let mut lock = CertificateLock {
            table: self.locks.clone(),
            id: id.clone(),
            guard: None,
        };
        lock.guard = Some(mutex.lock_owned().await);
        lock
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        match self.locks.lock() {
            Ok(locks) => locks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    async fn crl_check(&self, certificate: &Certificate) -> CheckResult<CrlStatus> {
        let outcome = within(self.crl_timeout, "CRL", self.revocation.check_crl(certificate)).await;
        CheckResult::new(outcome, self.clock.now())
    }

    async fn ocsp_check(&self, certificate: &Certificate) -> CheckResult<OcspCertStatus> {
        let outcome =
            within(self.ocsp_timeout, "OCSP", self.revocation.check_ocsp(certificate)).await;
        CheckResult::new(outcome, self.clock.now())
    }

    async fn chain_check(&self, certificate: &Certificate) -> CheckResult<ChainStatus> {
        let at = self.clock.now();
        let outcome = within(
            self.chain_timeout,
            "chain",
            self.chain.validate_chain(certificate, at),
        )
        .await;
        CheckResult::new(outcome, self.clock.now())
    }

    /// Apply `event` and write the certificate and its cascaded signatures
    /// in one batch. On a version conflict everything is reloaded and the
    /// same event is applied again.
    async fn persist(
        &self,
        mut certificate: Certificate,
        event: CertificateEvent,
    ) -> Result<VerificationSummary> {
        let id = certificate.id.clone();

        for _ in 0..MAX_CONFLICT_RETRIES {
            let at = self.clock.now();
            let (next, effects) = certificate_transition(&certificate, event.clone(), at);

            let mut batch = WriteBatch::new().put_certificate(next.clone());
            let mut cascaded = vec![];

            if next.state != certificate.state {
                let dependent = self.store.signatures_for_certificate(&id).await?;
                for signature in dependent {
                    let (updated, signature_effects) = signature_transition(
                        &signature,
                        SignatureEvent::CertificateStateChanged { state: next.state },
                        at,
                    );

                    if !signature_effects.is_empty() {
                        cascaded.push(signature.id.clone());
                        batch = batch.put_signature(updated);
                    }
                }
            }

            match self.store.commit(batch).await {
                Ok(()) => {
                    log_effects(&effects);
                    if !cascaded.is_empty() {
                        info!(
                            "certificate {id} is {}: downgraded {} signature(s)",
                            next.state,
                            cascaded.len()
                        );
                    }

                    let incomplete = next
                        .last_verification
                        .as_ref()
                        .is_some_and(|r| r.incomplete);
                    if incomplete {
                        warn!("certificate {id}: no check produced a definitive answer");
                    }

                    return Ok(VerificationSummary {
                        certificate_id: id,
                        previous_state: certificate.state,
                        state: next.state,
                        changed: next.state != certificate.state,
                        incomplete,
                        result: next.last_verification,
                        cascaded,
                    });
                }
                Err(Error::Conflict { entity, id: conflict_id }) => {
                    debug!("{entity} {conflict_id} changed concurrently; reapplying");
                    certificate = self.store.get_certificate(&id).await?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict {
            entity: "certificate",
            id: id.to_string(),
        })
    }
}

async fn within<T>(
    limit: Duration,
    check: &str,
    future: impl Future<Output = CheckOutcome<T>>,
) -> CheckOutcome<T> {
    match tokio::time::timeout(limit, future).await {
        Ok(outcome) => outcome,
        Err(_) => CheckOutcome::unavailable(format!("{check} check timed out after {limit:?}")),
    }
}

fn log_effects(effects: &[Effect]) {
    for effect in effects {
        if let Effect::CertificateStateChanged {
            certificate_id,
            from,
            to,
        } = effect
        {
            info!("certificate {certificate_id} changed from {from} to {to}");
        }
    }
}
