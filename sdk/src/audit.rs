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

//! Audit trail of verifications, validations and failures.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{certificate::CertificateId, operation::OperationKind, signature::SignatureId};

/// Log target of audit records written by [`LogAuditSink`].
pub const AUDIT_TARGET: &str = "sigtrust::audit";

/// How an operation ended.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditOutcome {
    /// Persisted state changed.
    Changed,

    /// The operation succeeded without changing persisted state.
    Unchanged,

    /// The operation failed with an error that is not retried.
    Failed,

    /// The operation failed on every attempt.
    TerminalFailure,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Failed => "failed",
            Self::TerminalFailure => "terminalFailure",
        })
    }
}

/// One entry in the audit trail.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// The operation that ran.
    pub operation: OperationKind,

    /// The signature it ran on.
    pub signature_id: SignatureId,

    /// The signer certificate, when it was loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<CertificateId>,

    /// How it ended.
    pub outcome: AuditOutcome,

    /// Verdict or error message.
    pub detail: String,

    /// Number of attempts made.
    pub attempts: u32,

    /// Time spent across all attempts, backoff included.
    pub duration: Duration,

    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

/// Receives audit records.
pub trait AuditSink: Send + Sync {
    /// Record one entry.
    fn record(&self, record: AuditRecord);
}

/// Writes audit records to the [`log`] facade at `info` level under
/// [`AUDIT_TARGET`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, record: AuditRecord) {
        info!(
            target: AUDIT_TARGET,
            "{} signature={} certificate={} outcome={} attempts={} duration_ms={} detail={}",
            record.operation,
            record.signature_id,
            record
                .certificate_id
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or("-"),
            record.outcome,
            record.attempts,
            record.duration.as_millis(),
            record.detail,
        );
    }
}

/// Keeps audit records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    /// Returns a copy of the records written so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[cfg(test)]
#[allow(missing_docs)]
pub mod tests {
    use super::*;

    fn record(outcome: AuditOutcome) -> AuditRecord {
        AuditRecord {
            operation: OperationKind::VerifyCertificate,
            signature_id: SignatureId::new("s1"),
            certificate_id: Some(CertificateId::new("c1")),
            outcome,
            detail: "valid".to_string(),
            attempts: 1,
            duration: Duration::from_millis(12),
            recorded_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryAuditSink::default();
        sink.record(record(AuditOutcome::Changed));
        sink.record(record(AuditOutcome::Unchanged));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, AuditOutcome::Changed);
        assert_eq!(records[1].outcome, AuditOutcome::Unchanged);
    }

    #[test]
    fn log_sink_accepts_records() {
        LogAuditSink.record(record(AuditOutcome::TerminalFailure));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(AuditOutcome::TerminalFailure.to_string(), "terminalFailure");
    }
}
