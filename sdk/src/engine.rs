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

//! Wiring of the validation components.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;

use crate::{
    audit::{AuditSink, LogAuditSink},
    certificate::Certificate,
    certificate_manager::CertificateManager,
    chain_validator::ChainValidator,
    clock::{Clock, SystemClock},
    http::AsyncHttpResolver,
    operation::ValidationOperation,
    orchestrator::{OperationReport, RetryPolicy, SignatureProcessingOrchestrator},
    revocation::RevocationChecker,
    scheduler::Scheduler,
    settings::Settings,
    signature::Signature,
    signature_validator::SignatureValidator,
    store::{MemoryStore, Store},
    tsa::TsaClient,
    worker::WorkerPool,
    Result,
};

/// All validation components built from one [`Settings`] value.
///
/// ```no_run
/// # async fn run() -> sigtrust::Result<()> {
/// use sigtrust::{Engine, OperationKind, Settings, ValidationOperation};
///
/// let engine = Engine::new(Settings::new().with_file("sigtrust.toml")?)?;
/// let report = engine
///     .run(&ValidationOperation::new("sig-1".into(), OperationKind::VerifyCertificate))
///     .await;
/// println!("{:?}", report.outcome);
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    settings: Settings,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    chain: Arc<ChainValidator>,
    certificates: Arc<CertificateManager>,
    validator: Arc<SignatureValidator>,
    orchestrator: Arc<SignatureProcessingOrchestrator>,
}

/// Overrides for the parts of an [`Engine`] that talk to the outside world.
pub struct EngineBuilder {
    settings: Settings,
    store: Option<Arc<dyn Store>>,
    http: Option<Arc<dyn AsyncHttpResolver>>,
    clock: Option<Arc<dyn Clock>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl EngineBuilder {
    /// Use `store` instead of a fresh [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `http` instead of a `reqwest` client.
    pub fn http(mut self, http: Arc<dyn AsyncHttpResolver>) -> Self {
        self.http = Some(http);
        self
    }

    /// Use `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use `audit` instead of [`LogAuditSink`].
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<Engine> {
        let settings = self.settings;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(reqwest::Client::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let audit = self.audit.unwrap_or_else(|| Arc::new(LogAuditSink));

        let chain = Arc::new(ChainValidator::new(&settings, http.clone())?);
        let revocation = Arc::new(RevocationChecker::new(
            &settings,
            http.clone(),
            clock.clone(),
        )?);

        let certificates = Arc::new(CertificateManager::new(
            &settings,
            store.clone(),
            revocation,
            chain.clone(),
            clock.clone(),
        ));

        let validator = Arc::new(SignatureValidator::new(
            &settings,
            chain.clone(),
            TsaClient::new(&settings, http),
            clock.clone(),
        ));

        let orchestrator = Arc::new(SignatureProcessingOrchestrator::new(
            store.clone(),
            certificates.clone(),
            validator.clone(),
            audit,
            clock.clone(),
            RetryPolicy::from_settings(&settings.retry),
        ));

        debug!("validation engine ready");

        Ok(Engine {
            settings,
            store,
            clock,
            chain,
            certificates,
            validator,
            orchestrator,
        })
    }
}

impl Engine {
    /// Build an engine with an in-memory store, a `reqwest` client, the
    /// system clock and the log audit sink.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Start building an engine with custom components.
    pub fn builder(settings: Settings) -> EngineBuilder {
        EngineBuilder {
            settings,
            store: None,
            http: None,
            clock: None,
            audit: None,
        }
    }

    /// The settings the engine was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The chain validator.
    pub fn chain_validator(&self) -> &ChainValidator {
        &self.chain
    }

    /// The certificate manager.
    pub fn certificates(&self) -> &CertificateManager {
        &self.certificates
    }

    /// The signature validator.
    pub fn signature_validator(&self) -> &SignatureValidator {
        &self.validator
    }

    /// The orchestrator.
    pub fn orchestrator(&self) -> &Arc<SignatureProcessingOrchestrator> {
        &self.orchestrator
    }

    /// Store a new certificate.
    pub async fn add_certificate(&self, certificate: Certificate) -> Result<()> {
        self.store.insert_certificate(certificate).await
    }

    /// Store a new signature.
    pub async fn add_signature(&self, signature: Signature) -> Result<()> {
        self.store.insert_signature(signature).await
    }

    /// Run one operation in place.
    pub async fn run(&self, operation: &ValidationOperation) -> OperationReport {
        self.orchestrator.run(operation).await
    }

    /// Start a worker pool sized by the `[workers]` settings.
    pub fn start_workers(&self) -> (WorkerPool, mpsc::UnboundedReceiver<OperationReport>) {
        WorkerPool::start(self.orchestrator.clone(), &self.settings.workers)
    }

    /// Create the daily scheduler.
    pub fn scheduler(&self) -> Result<Scheduler> {
        Scheduler::new(
            &self.settings.schedule,
            self.store.clone(),
            self.clock.clone(),
        )
    }
}
