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

//! The signer certificate record and the outcome of its verification.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sigtrust_crypto::{
    crl::{CrlEntryStatus, RevocationReason},
    ocsp::OcspCertStatus,
    x509::{cert_der_from_bytes, certs_from_pem, CertificateInfo},
};
use uuid::Uuid;

use crate::{Error, Result};

/// Opaque identifier of a [`Certificate`].
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct CertificateId(String);

impl CertificateId {
    /// Wrap an identifier assigned by the host application.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CertificateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Derived trust state of a certificate.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CertificateState {
    /// Chains to a trust anchor and is not revoked or suspended.
    Valid,

    /// Revoked according to a CRL or an OCSP responder.
    Revoked,

    /// Put on hold according to an OCSP responder.
    Suspended,

    /// Not yet verified, or the chain could not be validated.
    #[default]
    Unknown,
}

impl fmt::Display for CertificateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Revoked => "revoked",
            Self::Suspended => "suspended",
            Self::Unknown => "unknown",
        })
    }
}

/// Result of one check that may depend on an external service.
///
/// `T` must serialize as a map; its fields are merged with the `outcome`
/// tag.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum CheckOutcome<T> {
    /// The check produced a definitive answer.
    Completed(T),

    /// The service could not be reached or gave no usable answer in time.
    Unavailable {
        /// Why the check could not complete.
        reason: String,
    },

    /// The service answered with data that could not be decoded or
    /// authenticated.
    Malformed {
        /// What was wrong with the data.
        reason: String,
    },

    /// The certificate does not name a source for this check, or the check
    /// is disabled.
    NotApplicable,
}

impl<T> CheckOutcome<T> {
    /// Returns `true` for [`CheckOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Returns `true` if the check settled the question, either with an
    /// answer or with data that will not decode however often it is fetched.
    pub fn is_definitive(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Malformed { .. })
    }

    /// Returns `true` for [`CheckOutcome::Unavailable`].
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// The definitive answer, if there is one.
    pub fn completed(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn unavailable(reason: impl ToString) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(reason: impl ToString) -> Self {
        Self::Malformed {
            reason: reason.to_string(),
        }
    }
}

/// A [`CheckOutcome`] and the time it was obtained.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult<T> {
    /// The outcome.
    #[serde(flatten)]
    pub outcome: CheckOutcome<T>,

    /// When the check ran.
    pub checked_at: DateTime<Utc>,
}

impl<T> CheckResult<T> {
    /// Pair `outcome` with the time it was obtained.
    pub fn new(outcome: CheckOutcome<T>, checked_at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            checked_at,
        }
    }
}

/// Status of a certificate according to its issuer's CRL.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum CrlStatus {
    /// Not listed, or listed with `removeFromCRL`.
    NotRevoked,

    /// Listed as revoked.
    Revoked {
        /// `revocationDate`
        revoked_at: DateTime<Utc>,

        /// Reason code, when present.
        reason: Option<RevocationReason>,
    },

    /// Listed with `certificateHold`. Not treated as a revocation.
    OnHold {
        /// `revocationDate`
        since: DateTime<Utc>,
    },
}

impl From<CrlEntryStatus> for CrlStatus {
    fn from(status: CrlEntryStatus) -> Self {
        match status {
            CrlEntryStatus::NotRevoked => Self::NotRevoked,
            CrlEntryStatus::Revoked { revoked_at, reason } => Self::Revoked { revoked_at, reason },
            CrlEntryStatus::OnHold { since } => Self::OnHold { since },
        }
    }
}

/// Result of validating the issuance chain.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ChainStatus {
    /// The chain terminates at a trust anchor.
    Trusted {
        /// Subjects from the leaf up to the trust anchor.
        chain: Vec<String>,
    },

    /// The chain does not terminate at a trust anchor, or a link is invalid.
    Untrusted {
        /// Validation status code describing the failure.
        code: String,

        /// Human-readable reason.
        reason: String,
    },
}

/// The combined result of the CRL, OCSP and chain checks.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// CRL check.
    pub crl: CheckResult<CrlStatus>,

    /// OCSP check.
    pub ocsp: CheckResult<OcspCertStatus>,

    /// Chain validation.
    pub chain: CheckResult<ChainStatus>,

    /// When the verification ran.
    pub verified_at: DateTime<Utc>,

    /// `true` if every applicable check was unavailable. Malformed data is a
    /// definitive (if unhelpful) answer and does not make a result
    /// incomplete.
    pub incomplete: bool,
}

impl VerificationResult {
    /// Combine the individual check results.
    pub fn new(
        crl: CheckResult<CrlStatus>,
        ocsp: CheckResult<OcspCertStatus>,
        chain: CheckResult<ChainStatus>,
        verified_at: DateTime<Utc>,
    ) -> Self {
        let answered = crl.outcome.is_definitive()
            || ocsp.outcome.is_definitive()
            || chain.outcome.is_definitive();
        let incomplete = !answered
            && (crl.outcome.is_unavailable()
                || ocsp.outcome.is_unavailable()
                || chain.outcome.is_unavailable());

        Self {
            crl,
            ocsp,
            chain,
            verified_at,
            incomplete,
        }
    }

    /// Returns `true` if the CRL or the OCSP responder reports the
    /// certificate as revoked.
    pub fn is_revoked(&self) -> bool {
        matches!(
            self.crl.outcome,
            CheckOutcome::Completed(CrlStatus::Revoked { .. })
        ) || matches!(
            self.ocsp.outcome,
            CheckOutcome::Completed(OcspCertStatus::Revoked { .. })
        )
    }

    /// Returns `true` if the OCSP responder reports the certificate as on
    /// hold.
    pub fn is_suspended(&self) -> bool {
        matches!(
            self.ocsp.outcome,
            CheckOutcome::Completed(OcspCertStatus::Suspended { .. })
        )
    }

    /// Returns `true` if the chain terminates at a trust anchor.
    pub fn is_chain_trusted(&self) -> bool {
        matches!(
            self.chain.outcome,
            CheckOutcome::Completed(ChainStatus::Trusted { .. })
        )
    }
}

/// An explicit decision to lift a sticky revocation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationOverride {
    /// Who authorized the override.
    pub by: String,

    /// Why the revocation is lifted.
    pub reason: String,

    /// When the override was applied.
    pub at: DateTime<Utc>,
}

/// A signer certificate and its derived trust state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Identifier.
    pub id: CertificateId,

    /// DER encoding.
    pub der: Vec<u8>,

    /// Parsed fields.
    pub info: CertificateInfo,

    /// Issuer certificates (DER) supplied with the certificate.
    pub intermediates: Vec<Vec<u8>>,

    /// Derived state.
    pub state: CertificateState,

    /// Result of the most recent verification.
    pub last_verification: Option<VerificationResult>,

    /// When [`Certificate::state`] last changed.
    pub state_changed_at: Option<DateTime<Utc>>,

    /// Override applied to lift the most recent revocation.
    pub revocation_override: Option<RevocationOverride>,

    /// Optimistic concurrency token, incremented by the store on every
    /// write.
    pub version: u64,
}

impl Certificate {
    /// Import a certificate from DER or PEM along with the issuer
    /// certificates found in `intermediates_pem`.
    pub fn import(id: CertificateId, cert: &[u8], intermediates_pem: Option<&[u8]>) -> Result<Self> {
        let der = cert_der_from_bytes(cert).map_err(|e| Error::MalformedData(e.to_string()))?;

        let intermediates = match intermediates_pem {
            Some(pem) => certs_from_pem(pem).map_err(|e| Error::MalformedData(e.to_string()))?,
            None => vec![],
        };

        Self::from_der(id, der, intermediates)
    }

    /// Create a certificate record from DER-encoded certificates.
    pub fn from_der(id: CertificateId, der: Vec<u8>, intermediates: Vec<Vec<u8>>) -> Result<Self> {
        let info = CertificateInfo::from_der(&der).map_err(|e| Error::MalformedData(e.to_string()))?;

        Ok(Self {
            id,
            der,
            info,
            intermediates,
            state: CertificateState::Unknown,
            last_verification: None,
            state_changed_at: None,
            revocation_override: None,
            version: 0,
        })
    }
}
