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

//! Certificate revocation list (RFC 5280 §5) parsing and lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x509_parser::{
    certificate::X509Certificate, prelude::FromDer, revocation_list::CertificateRevocationList,
};

use crate::{
    raw_signature::{validator_for_sig_and_hash_algs, RawSignatureValidationError},
    x509::{asn1_time_to_utc, serial_hex, CertificateInfo},
};

/// The reason a certificate was revoked, as carried in a CRL entry's
/// `reasonCode` extension or an OCSP `RevokedInfo`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RevocationReason {
    #[allow(missing_docs)]
    Unspecified,
    #[allow(missing_docs)]
    KeyCompromise,
    #[allow(missing_docs)]
    CaCompromise,
    #[allow(missing_docs)]
    AffiliationChanged,
    #[allow(missing_docs)]
    Superseded,
    #[allow(missing_docs)]
    CessationOfOperation,
    /// The certificate is temporarily on hold.
    CertificateHold,
    /// A previous hold was released.
    RemoveFromCrl,
    #[allow(missing_docs)]
    PrivilegeWithdrawn,
    #[allow(missing_docs)]
    AaCompromise,
}

impl RevocationReason {
    /// Map a numeric `CRLReason` code. Unassigned values map to
    /// `Unspecified`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::KeyCompromise,
            2 => Self::CaCompromise,
            3 => Self::AffiliationChanged,
            4 => Self::Superseded,
            5 => Self::CessationOfOperation,
            6 => Self::CertificateHold,
            8 => Self::RemoveFromCrl,
            9 => Self::PrivilegeWithdrawn,
            10 => Self::AaCompromise,
            _ => Self::Unspecified,
        }
    }
}

impl From<rasn_pkix::CrlReason> for RevocationReason {
    fn from(reason: rasn_pkix::CrlReason) -> Self {
        Self::from_code(reason as u8)
    }
}

/// Status of one serial number according to a CRL.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CrlEntryStatus {
    /// The serial is not listed, or its entry is `removeFromCRL`.
    NotRevoked,

    /// The serial is listed as revoked.
    Revoked {
        /// `revocationDate` of the entry.
        revoked_at: DateTime<Utc>,

        /// Reason code, when present.
        reason: Option<RevocationReason>,
    },

    /// The serial is listed with `certificateHold`.
    OnHold {
        /// `revocationDate` of the entry.
        since: DateTime<Utc>,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct CrlEntry {
    serial: String,
    revoked_at: DateTime<Utc>,
    reason: Option<RevocationReason>,
}

/// A parsed, owned certificate revocation list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Crl {
    der: Vec<u8>,
    issuer: String,
    this_update: DateTime<Utc>,
    next_update: Option<DateTime<Utc>>,
    entries: Vec<CrlEntry>,
}

impl Crl {
    /// Parse a DER-encoded CRL.
    pub fn from_der(der: &[u8]) -> Result<Self, CrlError> {
        let (_, crl) = CertificateRevocationList::from_der(der)
            .map_err(|e| CrlError::InvalidCrl(e.to_string()))?;

        let mut entries = vec![];
        for revoked in crl.iter_revoked_certificates() {
            entries.push(CrlEntry {
                serial: serial_hex(revoked.raw_serial()),
                revoked_at: asn1_time_to_utc(&revoked.revocation_date)
                    .map_err(|e| CrlError::InvalidCrl(e.to_string()))?,
                reason: revoked
                    .reason_code()
                    .map(|(_critical, code)| RevocationReason::from_code(code.0)),
            });
        }

        let next_update = match crl.next_update() {
            Some(t) => {
                Some(asn1_time_to_utc(&t).map_err(|e| CrlError::InvalidCrl(e.to_string()))?)
            }
            None => None,
        };

        Ok(Self {
            der: der.to_vec(),
            issuer: crl.issuer().to_string(),
            this_update: asn1_time_to_utc(&crl.last_update())
                .map_err(|e| CrlError::InvalidCrl(e.to_string()))?,
            next_update,
            entries,
        })
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// `thisUpdate`
    pub fn this_update(&self) -> DateTime<Utc> {
        self.this_update
    }

    /// `nextUpdate`, if the CRL carries one.
    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }

    /// Number of entries in the list.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no certificates are listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that the CRL was issued and signed by `issuer_der`.
    pub fn verify_signature(&self, issuer_der: &[u8]) -> Result<(), CrlError> {
        let (_, crl) = CertificateRevocationList::from_der(&self.der)
            .map_err(|e| CrlError::InvalidCrl(e.to_string()))?;

        let (_, issuer) = X509Certificate::from_der(issuer_der)
            .map_err(|e| CrlError::InvalidIssuer(e.to_string()))?;

        if crl.issuer().as_raw() != issuer.subject().as_raw() {
            return Err(CrlError::IssuerMismatch);
        }

        let issuer_info = CertificateInfo::from_der(issuer_der)
            .map_err(|e| CrlError::InvalidIssuer(e.to_string()))?;
        if issuer_info.key_usage.present && !issuer_info.key_usage.crl_sign {
            return Err(CrlError::IssuerNotPermitted);
        }

        let sig_alg = &crl.signature_algorithm.algorithm;
        let validator = validator_for_sig_and_hash_algs(sig_alg, None)
            .ok_or_else(|| CrlError::UnsupportedAlgorithm(sig_alg.to_id_string()))?;

        validator
            .validate(
                &crl.signature_value.data,
                crl.tbs_cert_list.as_ref(),
                issuer.public_key().raw,
            )
            .map_err(CrlError::SignatureInvalid)
    }

    /// Returns `true` if the CRL's `nextUpdate` is before `at`.
    pub fn is_stale_at(&self, at: DateTime<Utc>) -> bool {
        self.next_update.is_some_and(|next| next < at)
    }

    /// Look up a serial number (lowercase hex, see
    /// [`CertificateInfo::serial`]).
    pub fn status_of(&self, serial: &str) -> CrlEntryStatus {
        let serial = serial.trim_start_matches('0').to_ascii_lowercase();

        let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.serial.trim_start_matches('0') == serial)
        else {
            return CrlEntryStatus::NotRevoked;
        };

        match entry.reason {
            Some(RevocationReason::RemoveFromCrl) => CrlEntryStatus::NotRevoked,
            Some(RevocationReason::CertificateHold) => CrlEntryStatus::OnHold {
                since: entry.revoked_at,
            },
            reason => CrlEntryStatus::Revoked {
                revoked_at: entry.revoked_at,
                reason,
            },
        }
    }
}

/// Describes errors that can occur when parsing or checking a CRL.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CrlError {
    /// The CRL could not be parsed.
    #[error("invalid CRL: {0}")]
    InvalidCrl(String),

    /// The issuer certificate could not be parsed.
    #[error("invalid CRL issuer certificate: {0}")]
    InvalidIssuer(String),

    /// The CRL names a different issuer.
    #[error("CRL issuer does not match certificate issuer")]
    IssuerMismatch,

    /// The issuer's key usage does not include `cRLSign`.
    #[error("CRL issuer may not sign CRLs")]
    IssuerNotPermitted,

    /// The CRL is signed with an unsupported algorithm.
    #[error("unsupported CRL signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The CRL signature does not verify.
    #[error("CRL signature invalid: {0}")]
    SignatureInvalid(RawSignatureValidationError),
}
