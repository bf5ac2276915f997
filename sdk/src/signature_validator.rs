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

//! Validation of a signature against its signer certificate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use sigtrust_crypto::{
    raw_signature::validator_for_signing_alg,
    time_stamp::{verify_time_stamp, TimeStampError},
    x509::CertificateInfo,
};
use sigtrust_status_tracker::{log_item, validation_codes::*, StatusTracker};

use crate::{
    certificate::{Certificate, CertificateState, ChainStatus, CheckOutcome},
    chain_validator::ChainValidator,
    clock::Clock,
    settings::Settings,
    signature::Signature,
    tsa::TsaClient,
    validation_report::{
        OverallStatus, SigningTimeSource, TimeStampStatus, TimeStampValidation, ValidationReport,
        ValidationStatus,
    },
    Result,
};

/// Outcome of refreshing a signature's time-stamp evidence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeStampRefresh {
    /// A newly obtained token, to be stored on the signature.
    pub token: Option<Vec<u8>>,

    /// Verdict on the evidence. `None` if the signature carries none.
    pub validation: Option<TimeStampValidation>,
}

/// Checks signatures and their time-stamp evidence.
pub struct SignatureValidator {
    chain: Arc<ChainValidator>,
    tsa: TsaClient,
    clock: Arc<dyn Clock>,
    require_time_stamp: bool,
}

impl SignatureValidator {
    /// Create a validator. `chain` is used to check the time-stamp
    /// authority's certificate.
    pub fn new(
        settings: &Settings,
        chain: Arc<ChainValidator>,
        tsa: TsaClient,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chain,
            tsa,
            clock,
            require_time_stamp: settings.time_stamp.require_time_stamp,
        }
    }

    /// Validate `signature` against `certificate`.
    ///
    /// The certificate's validity window is checked at the signing time:
    /// the `genTime` of a verified time-stamp token, else the signing time
    /// claimed by the signer, else now. Missing chain or time-stamp
    /// evidence yields [`OverallStatus::Warning`], not
    /// [`OverallStatus::Invalid`].
    pub fn validate(&self, signature: &Signature, certificate: &Certificate) -> ValidationReport {
        let now = self.clock.now();
        let mut tracker = StatusTracker::default();

        let mut invalid = false;
        let mut indeterminate = false;
        let mut missing_evidence = false;

        let time_stamp = self.time_stamp_evidence(signature, now);
        if let Some(ts) = &time_stamp {
            let mut item = log_item!("timeStamp", "time-stamp evidence", "validate")
                .validation_status(status_code(&ts.code));
            if let Some(reason) = &ts.reason {
                item = item.error(reason);
            }
            tracker.add_non_error(item);

            if !ts.is_valid() {
                missing_evidence = true;
            }
        }

        let (signing_time, signing_time_source) = match (&time_stamp, signature.signed_at) {
            (Some(ts), _) if ts.is_valid() => (
                ts.gen_time.unwrap_or(now),
                SigningTimeSource::TimeStamp,
            ),
            (_, Some(claimed)) => (claimed, SigningTimeSource::Claimed),
            _ => (now, SigningTimeSource::ValidationTime),
        };

        let info = &certificate.info;
        match validator_for_signing_alg(signature.alg) {
            Some(validator) => {
                match validator.validate(
                    &signature.signature_value,
                    &signature.signed_data,
                    &info.public_key,
                ) {
                    Ok(()) => log_item!("signature", "signature verified", "validate")
                        .validation_status(SIGNATURE_VALIDATED)
                        .success(&mut tracker),
                    Err(e) => {
                        invalid = true;
                        tracker.add_non_error(
                            log_item!("signature", "signature does not verify", "validate")
                                .validation_status(SIGNATURE_MISMATCH)
                                .error(e),
                        );
                    }
                }
            }
            None => {
                invalid = true;
                tracker.add_non_error(
                    log_item!("signature", "signature algorithm not supported", "validate")
                        .validation_status(SIGNATURE_ALGORITHM_UNSUPPORTED)
                        .error(signature.alg),
                );
            }
        }

        if info.is_valid_at(signing_time) {
            log_item!(
                "signingCredential",
                "certificate valid at signing time",
                "validate"
            )
            .validation_status(SIGNING_CREDENTIAL_INSIDE_VALIDITY)
            .success(&mut tracker);
        } else {
            invalid = true;
            tracker.add_non_error(
                log_item!(
                    "signingCredential",
                    format!("certificate not valid at {signing_time}"),
                    "validate"
                )
                .validation_status(SIGNING_CREDENTIAL_OUTSIDE_VALIDITY),
            );
        }

        if !info.key_usage.permits_document_signing() {
            invalid = true;
            tracker.add_non_error(
                log_item!(
                    "signingCredential",
                    "key usage does not permit signing",
                    "validate"
                )
                .validation_status(SIGNING_CREDENTIAL_INVALID_KEY_USAGE),
            );
        }

        if certificate.last_verification.is_none() {
            missing_evidence = true;
            tracker.add_non_error(
                log_item!(
                    "signingCredential",
                    "certificate has not been verified",
                    "validate"
                )
                .validation_status(SIGNING_CREDENTIAL_CHAIN_MISSING),
            );
        } else {
            let (code, description) = match certificate.state {
                CertificateState::Valid => (SIGNING_CREDENTIAL_TRUSTED, "certificate is trusted"),
                CertificateState::Revoked => {
                    invalid = true;
                    (SIGNING_CREDENTIAL_REVOKED, "certificate is revoked")
                }
                CertificateState::Suspended => {
                    indeterminate = true;
                    (SIGNING_CREDENTIAL_SUSPENDED, "certificate is on hold")
                }
                CertificateState::Unknown => {
                    indeterminate = true;
                    (SIGNING_CREDENTIAL_UNKNOWN, "certificate state is unknown")
                }
            };

            tracker.add_non_error(
                log_item!("signingCredential", description, "validate").validation_status(code),
            );
        }

        let status = if invalid {
            OverallStatus::Invalid
        } else if indeterminate {
            OverallStatus::Indeterminate
        } else if missing_evidence {
            OverallStatus::Warning
        } else {
            OverallStatus::Valid
        };

        debug!("signature {} is {status:?}", signature.id);

        ValidationReport {
            status,
            statuses: ValidationStatus::from_tracker(&tracker),
            signing_time,
            signing_time_source,
            validated_at: now,
            time_stamp,
        }
    }

    /// Verify the signature's time-stamp evidence and obtain a new token
    /// when it is missing or does not verify, or when `force` is set.
    ///
    /// A signature without time-stamp evidence is left alone.
    pub async fn refresh_time_stamp(
        &self,
        signature: &Signature,
        force: bool,
    ) -> Result<TimeStampRefresh> {
        let now = self.clock.now();

        if !signature.has_time_stamp && signature.time_stamp_token.is_none() {
            return Ok(TimeStampRefresh::default());
        }

        let current = self.time_stamp_evidence(signature, now);
        if current.as_ref().is_some_and(|ts| ts.is_valid()) && !force {
            return Ok(TimeStampRefresh {
                token: None,
                validation: current,
            });
        }

        if !self.tsa.is_configured() {
            let validation = match current {
                Some(ts) if ts.is_valid() => ts,
                _ => TimeStampValidation {
                    status: TimeStampStatus::Unavailable,
                    code: TIMESTAMP_UNAVAILABLE.to_string(),
                    reason: Some("no time-stamp authority configured".to_string()),
                    ..empty_validation(now)
                },
            };

            return Ok(TimeStampRefresh {
                token: None,
                validation: Some(validation),
            });
        }

        let token = self.tsa.request_token(&signature.signature_value).await?;

        let mut validation = self.verify_token(&token, &signature.signature_value, now);
        if !validation.is_valid() {
            return Ok(TimeStampRefresh {
                token: None,
                validation: Some(validation),
            });
        }

        validation.refreshed = true;
        validation.code = TIMESTAMP_REFRESHED.to_string();

        Ok(TimeStampRefresh {
            token: Some(token),
            validation: Some(validation),
        })
    }

    fn time_stamp_evidence(
        &self,
        signature: &Signature,
        now: DateTime<Utc>,
    ) -> Option<TimeStampValidation> {
        match &signature.time_stamp_token {
            Some(token) => Some(self.verify_token(token, &signature.signature_value, now)),
            None if signature.has_time_stamp || self.require_time_stamp => {
                Some(TimeStampValidation {
                    status: TimeStampStatus::Missing,
                    code: TIMESTAMP_MISSING.to_string(),
                    reason: Some("no time-stamp token attached".to_string()),
                    ..empty_validation(now)
                })
            }
            None => None,
        }
    }

    fn verify_token(&self, token: &[u8], message: &[u8], now: DateTime<Utc>) -> TimeStampValidation {
        let info = match verify_time_stamp(token, message) {
            Ok(info) => info,
            Err(e) => {
                let code = match e {
                    TimeStampError::InvalidData => TIMESTAMP_MISMATCH,
                    _ => TIMESTAMP_MALFORMED,
                };

                return TimeStampValidation {
                    status: TimeStampStatus::Invalid,
                    code: code.to_string(),
                    reason: Some(e.to_string()),
                    ..empty_validation(now)
                };
            }
        };

        let tsa_subject = CertificateInfo::from_der(&info.signer_cert)
            .map(|i| i.subject)
            .ok();

        let chain = self
            .chain
            .validate_offline(&info.signer_cert, &info.certs, info.gen_time);

        let (status, code, reason) = match chain {
            CheckOutcome::Completed(ChainStatus::Trusted { .. }) => {
                (TimeStampStatus::Valid, TIMESTAMP_VALIDATED, None)
            }
            CheckOutcome::Completed(ChainStatus::Untrusted { reason, .. }) => {
                (TimeStampStatus::Invalid, TIMESTAMP_UNTRUSTED, Some(reason))
            }
            other => (
                TimeStampStatus::Invalid,
                TIMESTAMP_UNTRUSTED,
                Some(format!("{other:?}")),
            ),
        };

        TimeStampValidation {
            status,
            code: code.to_string(),
            gen_time: Some(info.gen_time),
            tsa_subject,
            serial_number: Some(info.serial_number),
            policy: Some(info.policy),
            reason,
            refreshed: false,
            validated_at: now,
        }
    }
}

fn empty_validation(now: DateTime<Utc>) -> TimeStampValidation {
    TimeStampValidation {
        status: TimeStampStatus::Missing,
        code: String::new(),
        gen_time: None,
        tsa_subject: None,
        serial_number: None,
        policy: None,
        reason: None,
        refreshed: false,
        validated_at: now,
    }
}

// Map a stored code back to its `'static` constant for the status tracker.
fn status_code(code: &str) -> &'static str {
    [
        TIMESTAMP_VALIDATED,
        TIMESTAMP_MISMATCH,
        TIMESTAMP_MALFORMED,
        TIMESTAMP_UNTRUSTED,
        TIMESTAMP_MISSING,
        TIMESTAMP_REFRESHED,
    ]
    .into_iter()
    .find(|c| *c == code)
    .unwrap_or(TIMESTAMP_UNAVAILABLE)
}

#[cfg(test)]
#[allow(missing_docs)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;
    use httpmock::MockServer;
    use sigtrust_crypto::{ocsp::OcspCertStatus, raw_signature::SigningAlg};

    use super::*;
    use crate::{
        certificate::{CheckResult, CrlStatus, VerificationResult},
        clock::FixedClock,
        http::NoopResolver,
        tests::fixtures,
    };

    fn settings(extra: &str) -> Settings {
        Settings::new()
            .with_toml(&format!(
                "[trust]\ntrust_anchors = '''\n{}'''\nintermediates = '''\n{}'''\n{extra}",
                String::from_utf8_lossy(fixtures::ROOT),
                String::from_utf8_lossy(fixtures::INTERMEDIATE),
            ))
            .unwrap()
    }

    fn validator_with(settings: &Settings) -> SignatureValidator {
        let http: Arc<dyn crate::http::AsyncHttpResolver> = Arc::new(reqwest::Client::new());
        SignatureValidator::new(
            settings,
            Arc::new(ChainValidator::new(settings, Arc::new(NoopResolver)).unwrap()),
            TsaClient::new(settings, http),
            Arc::new(FixedClock::new(fixtures::now())),
        )
    }

    fn validator() -> SignatureValidator {
        validator_with(&settings(""))
    }

    fn signature() -> Signature {
        Signature::new(
            "s1".into(),
            "doc",
            "c1".into(),
            SigningAlg::Es256,
            fixtures::SIGNED_DATA.to_vec(),
            fixtures::LEAF_GOOD_SIG.to_vec(),
        )
    }

    fn verified(state: CertificateState) -> Certificate {
        let mut cert = Certificate::import("c1".into(), fixtures::LEAF_GOOD, None).unwrap();
        cert.state = state;
        cert.last_verification = Some(VerificationResult::new(
            CheckResult::new(CheckOutcome::Completed(CrlStatus::NotRevoked), fixtures::now()),
            CheckResult::new(CheckOutcome::Completed(OcspCertStatus::Good), fixtures::now()),
            CheckResult::new(
                CheckOutcome::Completed(ChainStatus::Trusted { chain: vec![] }),
                fixtures::now(),
            ),
            fixtures::now(),
        ));
        cert
    }

    #[test]
    fn valid_without_time_stamp() {
        let report = validator().validate(&signature(), &verified(CertificateState::Valid));

        assert_eq!(report.status, OverallStatus::Valid);
        assert!(report.has_status(SIGNATURE_VALIDATED));
        assert!(report.has_status(SIGNING_CREDENTIAL_TRUSTED));
        assert_eq!(report.signing_time_source, SigningTimeSource::ValidationTime);
        assert!(report.time_stamp.is_none());
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let mut signature = signature();
        signature.signed_data.push(0);

        let report = validator().validate(&signature, &verified(CertificateState::Valid));
        assert_eq!(report.status, OverallStatus::Invalid);
        assert!(report.has_status(SIGNATURE_MISMATCH));
    }

    #[test]
    fn rsa_signature() {
        let mut cert = verified(CertificateState::Valid);
        cert.info = CertificateInfo::from_der(&fixtures::der(fixtures::LEAF_RSA)).unwrap();

        let mut signature = signature();
        signature.alg = SigningAlg::Rs256;
        signature.signature_value = fixtures::LEAF_RSA_SIG.to_vec();

        let report = validator().validate(&signature, &cert);
        assert_eq!(report.status, OverallStatus::Valid);
    }

    #[test]
    fn certificate_state_drives_verdict() {
        let v = validator();

        let report = v.validate(&signature(), &verified(CertificateState::Revoked));
        assert_eq!(report.status, OverallStatus::Invalid);
        assert!(report.has_status(SIGNING_CREDENTIAL_REVOKED));

        let report = v.validate(&signature(), &verified(CertificateState::Suspended));
        assert_eq!(report.status, OverallStatus::Indeterminate);

        let report = v.validate(&signature(), &verified(CertificateState::Unknown));
        assert_eq!(report.status, OverallStatus::Indeterminate);
    }

    #[test]
    fn unverified_certificate_is_a_warning() {
        let cert = Certificate::import("c1".into(), fixtures::LEAF_GOOD, None).unwrap();

        let report = validator().validate(&signature(), &cert);
        assert_eq!(report.status, OverallStatus::Warning);
        assert!(report.has_status(SIGNING_CREDENTIAL_CHAIN_MISSING));
    }

    #[test]
    fn claimed_signing_time_outside_validity() {
        let signature =
            signature().with_signed_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let report = validator().validate(&signature, &verified(CertificateState::Valid));
        assert_eq!(report.status, OverallStatus::Invalid);
        assert_eq!(report.signing_time_source, SigningTimeSource::Claimed);
        assert!(report.has_status(SIGNING_CREDENTIAL_OUTSIDE_VALIDITY));
    }

    #[test]
    fn valid_time_stamp_sets_signing_time() {
        let signature = signature().with_time_stamp(fixtures::TS_TOKEN.to_vec());

        let report = validator().validate(&signature, &verified(CertificateState::Valid));
        assert_eq!(report.status, OverallStatus::Valid);
        assert_eq!(report.signing_time_source, SigningTimeSource::TimeStamp);
        assert!(report.has_status(TIMESTAMP_VALIDATED));

        let ts = report.time_stamp.unwrap();
        assert!(ts.is_valid());
        assert_eq!(ts.gen_time, Some(report.signing_time));
        assert_eq!(ts.serial_number.as_deref(), Some("2"));
        assert!(ts.tsa_subject.unwrap().ends_with("CN=tsa"));
    }

    #[test]
    fn time_stamp_over_other_data_is_a_warning() {
        let mut signature = signature().with_time_stamp(fixtures::TS_TOKEN.to_vec());
        signature.signature_value = fixtures::LEAF_RSA_SIG.to_vec();
        signature.alg = SigningAlg::Rs256;

        let mut cert = verified(CertificateState::Valid);
        cert.info = CertificateInfo::from_der(&fixtures::der(fixtures::LEAF_RSA)).unwrap();

        let report = validator().validate(&signature, &cert);
        assert_eq!(report.status, OverallStatus::Warning);
        assert!(report.has_status(TIMESTAMP_MISMATCH));
    }

    #[test]
    fn untrusted_time_stamp_authority() {
        let settings = Settings::new()
            .with_toml(&format!(
                "[trust]\ntrust_anchors = '''\n{}'''\n",
                String::from_utf8_lossy(fixtures::SELF_SIGNED)
            ))
            .unwrap();
        let signature = signature().with_time_stamp(fixtures::TS_TOKEN.to_vec());

        let report =
            validator_with(&settings).validate(&signature, &verified(CertificateState::Valid));
        assert_eq!(report.status, OverallStatus::Warning);
        assert!(report.has_status(TIMESTAMP_UNTRUSTED));
    }

    #[test]
    fn required_time_stamp_missing() {
        let settings = settings("[time_stamp]\nrequire_time_stamp = true\n");

        let report =
            validator_with(&settings).validate(&signature(), &verified(CertificateState::Valid));
        assert_eq!(report.status, OverallStatus::Warning);
        assert!(report.has_status(TIMESTAMP_MISSING));
    }

    #[tokio::test]
    async fn refresh_without_evidence_is_a_no_op() {
        let refresh = validator()
            .refresh_time_stamp(&signature(), true)
            .await
            .unwrap();

        assert_eq!(refresh, TimeStampRefresh::default());
    }

    #[tokio::test]
    async fn refresh_keeps_valid_token() {
        let signature = signature().with_time_stamp(fixtures::TS_TOKEN.to_vec());

        let refresh = validator()
            .refresh_time_stamp(&signature, false)
            .await
            .unwrap();

        assert!(refresh.token.is_none());
        assert!(refresh.validation.unwrap().is_valid());
    }

    #[tokio::test]
    async fn refresh_failure_is_transient() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/tsa");
                then.status(200).body(fixtures::TS_RESPONSE);
            })
            .await;

        let settings = settings(&format!("[time_stamp]\ntsa_url = \"{}\"\n", server.url("/tsa")));
        let mut signature = signature();
        signature.has_time_stamp = true;

        // The canned response echoes a fixed nonce, which a random request
        // nonce will not match, so every attempt is rejected.
        let err = validator_with(&settings)
            .refresh_time_stamp(&signature, false)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn refresh_without_authority() {
        let mut signature = signature();
        signature.has_time_stamp = true;

        let refresh = validator()
            .refresh_time_stamp(&signature, false)
            .await
            .unwrap();

        let validation = refresh.validation.unwrap();
        assert_eq!(validation.status, TimeStampStatus::Unavailable);
        assert_eq!(validation.code, TIMESTAMP_UNAVAILABLE);
    }
}
