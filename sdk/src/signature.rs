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

//! The document signature record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sigtrust_crypto::raw_signature::SigningAlg;
use uuid::Uuid;

use crate::{
    certificate::CertificateId,
    operation::OperationKind,
    validation_report::{TimeStampValidation, ValidationReport},
};

/// Opaque identifier of a [`Signature`].
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SignatureId(String);

impl SignatureId {
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

impl fmt::Display for SignatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignatureId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where a signature is in its processing lifecycle.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessingState {
    /// No operation has run yet.
    #[default]
    Pending,

    /// An operation is running.
    Validating,

    /// The last operation finished.
    Completed,

    /// The last operation failed.
    Error,
}

/// Verdict on a signature.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidityState {
    /// No verdict could be reached.
    #[default]
    Indeterminate,

    /// The signature is valid.
    Valid,

    /// The signature is not valid.
    Invalid,

    /// The signature verifies, but some evidence is missing.
    Warning,

    /// The signer certificate is on hold.
    Suspended,
}

impl ValidityState {
    /// Position in the trust order `Valid > Warning > Indeterminate >
    /// Suspended > Invalid`.
    pub fn rank(self) -> u8 {
        match self {
            Self::Valid => 4,
            Self::Warning => 3,
            Self::Indeterminate => 2,
            Self::Suspended => 1,
            Self::Invalid => 0,
        }
    }

    /// The less trusted of `self` and `other`.
    pub fn min(self, other: Self) -> Self {
        if other.rank() < self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for ValidityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Indeterminate => "indeterminate",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Warning => "warning",
            Self::Suspended => "suspended",
        })
    }
}

/// A digital signature over a document and everything the engine knows
/// about it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Identifier.
    pub id: SignatureId,

    /// The signed document, as known to the host application.
    pub document_id: String,

    /// The signer certificate.
    pub certificate_id: CertificateId,

    /// Signature algorithm.
    pub alg: SigningAlg,

    /// The exact bytes covered by the signature.
    pub signed_data: Vec<u8>,

    /// The raw signature value.
    pub signature_value: Vec<u8>,

    /// Signing time claimed by the signer.
    pub signed_at: Option<DateTime<Utc>>,

    /// The signature is expected to carry time-stamp evidence.
    pub has_time_stamp: bool,

    /// DER RFC 3161 time-stamp token over [`Signature::signature_value`].
    pub time_stamp_token: Option<Vec<u8>>,

    /// Processing lifecycle.
    pub processing_state: ProcessingState,

    /// Verdict.
    pub validity_state: ValidityState,

    /// Report of the last signature validation.
    pub report: Option<ValidationReport>,

    /// Result of the last time-stamp verification.
    pub time_stamp_validation: Option<TimeStampValidation>,

    /// Error message of the last failed operation.
    pub last_error: Option<String>,

    /// Why [`Signature::validity_state`] last changed.
    pub state_change_reason: Option<String>,

    /// When [`Signature::processing_state`] last changed.
    pub processing_changed_at: Option<DateTime<Utc>>,

    /// When [`Signature::validity_state`] last changed.
    pub validity_changed_at: Option<DateTime<Utc>>,

    /// When the signature was last validated.
    pub validated_at: Option<DateTime<Utc>>,

    /// The operation that ran last.
    pub last_operation: Option<OperationKind>,

    /// Attempt number of that operation, starting at 1.
    pub attempt: u32,

    /// Optimistic concurrency token, incremented by the store on every
    /// write.
    pub version: u64,
}

impl Signature {
    /// Create a pending signature record.
    pub fn new(
        id: SignatureId,
        document_id: impl Into<String>,
        certificate_id: CertificateId,
        alg: SigningAlg,
        signed_data: Vec<u8>,
        signature_value: Vec<u8>,
    ) -> Self {
        Self {
            id,
            document_id: document_id.into(),
            certificate_id,
            alg,
            signed_data,
            signature_value,
            signed_at: None,
            has_time_stamp: false,
            time_stamp_token: None,
            processing_state: ProcessingState::Pending,
            validity_state: ValidityState::Indeterminate,
            report: None,
            time_stamp_validation: None,
            last_error: None,
            state_change_reason: None,
            processing_changed_at: None,
            validity_changed_at: None,
            validated_at: None,
            last_operation: None,
            attempt: 0,
            version: 0,
        }
    }

    /// Attach an RFC 3161 time-stamp token.
    pub fn with_time_stamp(mut self, token: Vec<u8>) -> Self {
        self.has_time_stamp = true;
        self.time_stamp_token = Some(token);
        self
    }

    /// Record the signing time claimed by the signer.
    pub fn with_signed_at(mut self, signed_at: DateTime<Utc>) -> Self {
        self.signed_at = Some(signed_at);
        self
    }
}
