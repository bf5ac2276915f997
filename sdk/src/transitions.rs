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

//! State transitions for signatures and certificates.
//!
//! Each entity has a single transition function `(current, event) ->
//! (next, effects)`. They do no I/O and read no clock, so every rule about
//! how verdicts move can be tested without a store.

use chrono::{DateTime, Utc};

use crate::{
    certificate::{Certificate, CertificateId, CertificateState, RevocationOverride, VerificationResult},
    operation::OperationKind,
    signature::{ProcessingState, Signature, SignatureId, ValidityState},
    validation_report::{TimeStampValidation, ValidationReport},
};

/// Something that happened as a result of a transition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    /// A certificate's state changed. Dependent signatures must be
    /// re-derived.
    CertificateStateChanged {
        /// The certificate.
        certificate_id: CertificateId,

        /// State before the transition.
        from: CertificateState,

        /// State after the transition.
        to: CertificateState,
    },

    /// A signature's validity changed.
    ValidityChanged {
        /// The signature.
        signature_id: SignatureId,

        /// Validity before the transition.
        from: ValidityState,

        /// Validity after the transition.
        to: ValidityState,
    },
}

/// Events applied to a [`Certificate`].
#[derive(Clone, Debug)]
pub enum CertificateEvent {
    /// The CRL, OCSP and chain checks ran.
    Verified(VerificationResult),

    /// A sticky revocation was lifted.
    RevocationOverridden(RevocationOverride),
}

/// Events applied to a [`Signature`].
#[derive(Clone, Debug)]
pub enum SignatureEvent {
    /// An attempt of `operation` began.
    ProcessingStarted {
        /// The operation.
        operation: OperationKind,

        /// Attempt number, starting at 1.
        attempt: u32,
    },

    /// The signature was validated.
    Validated {
        /// The validation report.
        report: ValidationReport,

        /// Upper bound on validity imposed by the signer certificate's state
        /// at the time of persisting. See [`validity_cap`].
        cap: Option<ValidityState>,
    },

    /// The time-stamp evidence was verified, and possibly replaced.
    TimeStampRefreshed {
        /// A newly obtained token.
        token: Option<Vec<u8>>,

        /// Result of verifying the evidence, if there is any.
        validation: Option<TimeStampValidation>,
    },

    /// The signer certificate's state changed.
    CertificateStateChanged {
        /// The new state.
        state: CertificateState,
    },

    /// An operation finished without producing a new verdict.
    OperationCompleted,

    /// An attempt failed.
    Failed {
        /// Error message.
        message: String,
    },
}

/// Derive a certificate's state from one verification.
///
/// Revocation by CRL or OCSP dominates; an explicit OCSP hold comes next;
/// a chain that is not known to be trusted leaves the certificate
/// [`Unknown`](CertificateState::Unknown).
pub fn derive_certificate_state(result: &VerificationResult) -> CertificateState {
    if result.is_revoked() {
        CertificateState::Revoked
    } else if result.is_suspended() {
        CertificateState::Suspended
    } else if !result.is_chain_trusted() {
        CertificateState::Unknown
    } else {
        CertificateState::Valid
    }
}

/// The validity a dependent signature falls to when its certificate enters
/// `state`. `None` means no change.
pub fn cascade_target(state: CertificateState) -> Option<ValidityState> {
    match state {
        CertificateState::Revoked => Some(ValidityState::Invalid),
        CertificateState::Suspended => Some(ValidityState::Suspended),
        CertificateState::Unknown => Some(ValidityState::Indeterminate),
        CertificateState::Valid => None,
    }
}

/// Upper bound on the validity of a signature made with `certificate`.
///
/// A certificate that was never verified imposes no bound; the missing
/// chain evidence already shows up in the validation report.
pub fn validity_cap(certificate: &Certificate) -> Option<ValidityState> {
    certificate
        .last_verification
        .as_ref()
        .and_then(|_| cascade_target(certificate.state))
}

/// Apply `event` to `current`.
pub fn certificate_transition(
    current: &Certificate,
    event: CertificateEvent,
    at: DateTime<Utc>,
) -> (Certificate, Vec<Effect>) {
    let mut next = current.clone();

    match event {
        CertificateEvent::Verified(result) => {
            let derived = derive_certificate_state(&result);

            // Revocation is sticky until explicitly overridden.
            next.state = if current.state == CertificateState::Revoked {
                CertificateState::Revoked
            } else {
                derived
            };

            next.last_verification = Some(result);
        }

        CertificateEvent::RevocationOverridden(revocation_override) => {
            if current.state != CertificateState::Revoked {
                return (next, vec![]);
            }

            next.state = CertificateState::Unknown;
            next.revocation_override = Some(revocation_override);
        }
    }

    let mut effects = vec![];
    if next.state != current.state {
        next.state_changed_at = Some(at);
        effects.push(Effect::CertificateStateChanged {
            certificate_id: current.id.clone(),
            from: current.state,
            to: next.state,
        });
    }

    (next, effects)
}

/// Apply `event` to `current`.
pub fn signature_transition(
    current: &Signature,
    event: SignatureEvent,
    at: DateTime<Utc>,
) -> (Signature, Vec<Effect>) {
    let mut next = current.clone();

    match event {
        SignatureEvent::ProcessingStarted { operation, attempt } => {
            set_processing(&mut next, ProcessingState::Validating, at);
            next.last_operation = Some(operation);
            next.attempt = attempt;
        }

        SignatureEvent::Validated { report, cap } => {
            let mut validity: ValidityState = report.status.into();
            let mut reason = format!("signature validated: {validity}");

            if let Some(cap) = cap {
                if cap.rank() < validity.rank() {
                    validity = cap;
                    reason = format!("signature validated, capped to {cap} by certificate state");
                }
            }

            set_validity(&mut next, validity, reason, at);
            set_processing(&mut next, ProcessingState::Completed, at);
            next.time_stamp_validation = report.time_stamp.clone();
            next.report = Some(report);
            next.validated_at = Some(at);
            next.last_error = None;
        }

        SignatureEvent::TimeStampRefreshed { token, validation } => {
            if let Some(token) = token {
                next.time_stamp_token = Some(token);
                next.has_time_stamp = true;
            }

            if let Some(validation) = validation {
                // Failing evidence may downgrade a valid verdict, never
                // upgrade one.
                if !validation.is_valid() && next.validity_state == ValidityState::Valid {
                    set_validity(
                        &mut next,
                        ValidityState::Warning,
                        format!("time-stamp evidence failed: {}", validation.code),
                        at,
                    );
                }
                next.time_stamp_validation = Some(validation);
            }

            set_processing(&mut next, ProcessingState::Completed, at);
            next.last_error = None;
        }

        SignatureEvent::CertificateStateChanged { state } => {
            if let Some(target) = cascade_target(state) {
                if target.rank() < next.validity_state.rank() {
                    set_validity(
                        &mut next,
                        target,
                        format!("certificate state changed to {state}"),
                        at,
                    );
                }
            }
        }

        SignatureEvent::OperationCompleted => {
            set_processing(&mut next, ProcessingState::Completed, at);
            next.last_error = None;
        }

        SignatureEvent::Failed { message } => {
            set_processing(&mut next, ProcessingState::Error, at);
            next.last_error = Some(message);
        }
    }

    let mut effects = vec![];
    if next.validity_state != current.validity_state {
        effects.push(Effect::ValidityChanged {
            signature_id: current.id.clone(),
            from: current.validity_state,
            to: next.validity_state,
        });
    }

    (next, effects)
}

fn set_processing(signature: &mut Signature, state: ProcessingState, at: DateTime<Utc>) {
    if signature.processing_state != state {
        signature.processing_state = state;
        signature.processing_changed_at = Some(at);
    }
}

fn set_validity(signature: &mut Signature, state: ValidityState, reason: String, at: DateTime<Utc>) {
    if signature.validity_state != state {
        signature.validity_state = state;
        signature.validity_changed_at = Some(at);
        signature.state_change_reason = Some(reason);
    }
}
