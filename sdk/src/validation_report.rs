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

//! The outcome of validating a signature, as persisted on the
//! [`Signature`](crate::Signature) record.

#![deny(missing_docs)]

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sigtrust_status_tracker::{validation_codes::is_success, LogItem, LogKind, StatusTracker};

use crate::signature::ValidityState;

/// A `ValidationStatus` struct describes the outcome of one check performed
/// while validating a signature or verifying a certificate.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatus {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,

    kind: LogKind,
}

impl ValidationStatus {
    /// Returns the validation status code.
    ///
    /// These are defined as constants in
    /// [`validation_codes`](crate::validation_codes).
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns a human-readable description of the check that was
    /// performed.
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Returns the [`LogKind`] of this status.
    pub fn kind(&self) -> LogKind {
        self.kind
    }

    /// Returns `true` if this has a successful validation code.
    pub fn passed(&self) -> bool {
        is_success(&self.code)
    }

    /// Convert a [`LogItem`] that carries a status code.
    ///
    /// Items without a code are diagnostic only and yield `None`.
    pub(crate) fn from_log_item(item: &LogItem) -> Option<Self> {
        let code = item.validation_status.as_ref()?;

        let mut explanation = item.description.to_string();
        if let Some(err) = &item.err_val {
            explanation = format!("{explanation}: {err}");
        }

        Some(Self {
            code: code.to_string(),
            explanation: Some(explanation),
            kind: item.kind,
        })
    }

    /// Collect the statuses recorded in `tracker`, in order.
    pub(crate) fn from_tracker(tracker: &StatusTracker) -> Vec<Self> {
        let statuses: Vec<Self> = tracker
            .logged_items()
            .iter()
            .filter_map(Self::from_log_item)
            .collect();

        debug!("collected {} validation statuses", statuses.len());
        statuses
    }
}

/// Overall verdict of a signature validation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverallStatus {
    /// Every check passed.
    Valid,

    /// A check failed.
    Invalid,

    /// No check failed, but chain or time-stamp evidence is missing.
    Warning,

    /// The signer certificate's state does not allow a verdict.
    Indeterminate,
}

impl From<OverallStatus> for ValidityState {
    fn from(status: OverallStatus) -> Self {
        match status {
            OverallStatus::Valid => Self::Valid,
            OverallStatus::Invalid => Self::Invalid,
            OverallStatus::Warning => Self::Warning,
            OverallStatus::Indeterminate => Self::Indeterminate,
        }
    }
}

/// Where the time the signature was made at comes from.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SigningTimeSource {
    /// `genTime` of a verified time-stamp token.
    TimeStamp,

    /// The signing time claimed by the signer.
    Claimed,

    /// Neither was available; the validation time was used.
    ValidationTime,
}

/// Report of one signature validation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Overall verdict.
    pub status: OverallStatus,

    /// Individual check outcomes.
    pub statuses: Vec<ValidationStatus>,

    /// Time at which the certificate's validity window was checked.
    pub signing_time: DateTime<Utc>,

    /// Where [`ValidationReport::signing_time`] comes from.
    pub signing_time_source: SigningTimeSource,

    /// When the validation ran.
    pub validated_at: DateTime<Utc>,

    /// Result of verifying the time-stamp evidence, if there is any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<TimeStampValidation>,
}

impl ValidationReport {
    /// Returns `true` if a status with `code` was recorded.
    pub fn has_status(&self, code: &str) -> bool {
        self.statuses.iter().any(|s| s.code() == code)
    }

    /// Statuses of failed checks.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationStatus> {
        self.statuses
            .iter()
            .filter(|s| s.kind() == LogKind::Failure)
    }
}

/// Verdict on time-stamp evidence.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeStampStatus {
    /// The token verifies over the signature value and its signer is
    /// trusted.
    Valid,

    /// The token does not verify, or its signer is not trusted.
    Invalid,

    /// The signature should carry a token but does not.
    Missing,

    /// A new token was needed but could not be obtained.
    Unavailable,
}

/// Result of verifying a signature's time-stamp evidence.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStampValidation {
    /// Verdict.
    pub status: TimeStampStatus,

    /// Validation status code.
    pub code: String,

    /// `genTime` of the token.
    pub gen_time: Option<DateTime<Utc>>,

    /// Subject of the time-stamp authority certificate.
    pub tsa_subject: Option<String>,

    /// Serial number of the token (decimal).
    pub serial_number: Option<String>,

    /// Time-stamp policy (dotted OID).
    pub policy: Option<String>,

    /// Why the token was rejected.
    pub reason: Option<String>,

    /// `true` if the token was obtained during this verification.
    pub refreshed: bool,

    /// When the verification ran.
    pub validated_at: DateTime<Utc>,
}

impl TimeStampValidation {
    /// Returns `true` if the token was accepted.
    pub fn is_valid(&self) -> bool {
        self.status == TimeStampStatus::Valid
    }
}
