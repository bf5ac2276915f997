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

#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![deny(warnings)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]

pub mod audit;
pub use audit::{AuditOutcome, AuditRecord, AuditSink, LogAuditSink, MemoryAuditSink};

pub mod certificate;
pub use certificate::{
    Certificate, CertificateId, CertificateState, ChainStatus, CheckOutcome, CheckResult,
    CrlStatus, RevocationOverride, VerificationResult,
};

pub mod certificate_manager;
pub use certificate_manager::{CertificateManager, VerificationSummary};

pub mod chain_validator;
pub use chain_validator::{ChainCheck, ChainValidator};

pub mod clock;
pub use clock::{Clock, FixedClock, SystemClock};

mod engine;
pub use engine::{Engine, EngineBuilder};

mod error;
pub use error::{Error, Result};

pub mod http;

pub mod operation;
pub use operation::{OperationKind, OperationOptions, Trigger, ValidationOperation};

pub mod orchestrator;
pub use orchestrator::{OperationReport, RetryPolicy, SignatureProcessingOrchestrator};

pub mod revocation;
pub use revocation::{RevocationCheck, RevocationChecker};

pub mod scheduler;
pub use scheduler::Scheduler;

pub mod settings;
pub use settings::Settings;

pub mod signature;
pub use signature::{ProcessingState, Signature, SignatureId, ValidityState};

pub mod signature_validator;
pub use signature_validator::{SignatureValidator, TimeStampRefresh};

pub mod store;
pub use store::{CertificateStore, MemoryStore, SignatureStore, Store, WriteBatch};

pub mod transitions;

pub mod tsa;
pub use tsa::TsaClient;

pub mod validation_report;
pub use validation_report::{
    OverallStatus, SigningTimeSource, TimeStampStatus, TimeStampValidation, ValidationReport,
    ValidationStatus,
};

pub mod worker;
pub use worker::WorkerPool;

pub use sigtrust_crypto::raw_signature::SigningAlg;
pub use sigtrust_status_tracker::{validation_codes, LogKind};

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
pub(crate) mod tests;
