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

//! A pool of tasks that run queued operations.

use std::sync::Arc;

use log::{debug, info};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use crate::{
    operation::ValidationOperation,
    orchestrator::{OperationReport, SignatureProcessingOrchestrator},
    settings::Workers,
    Error, Result,
};

/// Runs [`ValidationOperation`]s on a fixed number of tokio tasks that
/// share one bounded queue.
///
/// Operations run independently of each other and in no particular order.
/// Every finished operation produces an [`OperationReport`] on the channel
/// returned by [`start`](Self::start).
pub struct WorkerPool {
    sender: mpsc::Sender<ValidationOperation>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the workers. Must be called within a tokio runtime.
    pub fn start(
        orchestrator: Arc<SignatureProcessingOrchestrator>,
        settings: &Workers,
    ) -> (Self, mpsc::UnboundedReceiver<OperationReport>) {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let worker_count = settings.worker_count.max(1);
        let workers = (0..worker_count)
            .map(|index| {
                tokio::spawn(work(
                    index,
                    receiver.clone(),
                    orchestrator.clone(),
                    report_tx.clone(),
                ))
            })
            .collect();

        info!("started {worker_count} validation workers");
        (Self { sender, workers }, report_rx)
    }

    /// Enqueue `operation` without waiting.
    ///
    /// Fails with [`Error::QueueFull`] when the queue has no capacity.
    pub fn submit(&self, operation: ValidationOperation) -> Result<()> {
        self.sender.try_send(operation).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Error::PoolClosed,
        })
    }

    /// Enqueue `operation`, waiting for queue capacity.
    pub async fn queue(&self, operation: ValidationOperation) -> Result<()> {
        self.sender
            .send(operation)
            .await
            .map_err(|_| Error::PoolClosed)
    }

    /// Stop accepting operations, let the workers drain the queue, and wait
    /// for them to exit.
    pub async fn shutdown(self) {
        let Self { sender, workers } = self;
        drop(sender);

        for worker in workers {
            if let Err(e) = worker.await {
                log::error!("validation worker failed: {e}");
            }
        }

        info!("validation workers stopped");
    }
}

async fn work(
    index: usize,
    queue: Arc<Mutex<mpsc::Receiver<ValidationOperation>>>,
    orchestrator: Arc<SignatureProcessingOrchestrator>,
    reports: mpsc::UnboundedSender<OperationReport>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(operation) = next else {
            break;
        };

        debug!(
            "worker {index}: {} on signature {}",
            operation.kind, operation.signature_id
        );
        let report = orchestrator.run(&operation).await;

        // Nobody may be listening for reports.
        let _ = reports.send(report);
    }

    debug!("worker {index} exiting");
}

#[cfg(test)]
#[allow(missing_docs)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{
        audit::AuditOutcome,
        operation::OperationKind,
        orchestrator::tests::{fixture, FlakyChecks},
    };

    fn settings(worker_count: usize, queue_capacity: usize) -> Workers {
        Workers {
            worker_count,
            queue_capacity,
        }
    }

    #[tokio::test]
    async fn runs_submitted_operations() {
        let f = fixture(FlakyChecks::default()).await;
        let (pool, mut reports) = WorkerPool::start(Arc::new(f.orchestrator), &settings(2, 8));

        pool.submit(ValidationOperation::new(
            "s1".into(),
            OperationKind::VerifyCertificate,
        ))
        .unwrap();
        pool.queue(ValidationOperation::new(
            "missing".into(),
            OperationKind::ValidateSignature,
        ))
        .await
        .unwrap();

        let mut received = vec![reports.recv().await.unwrap(), reports.recv().await.unwrap()];
        received.sort_by(|a, b| a.signature_id.cmp(&b.signature_id));

        assert_eq!(received[0].signature_id.as_str(), "missing");
        assert_eq!(received[0].outcome, AuditOutcome::Failed);
        assert_eq!(received[1].signature_id.as_str(), "s1");
        assert!(received[1].succeeded());

        pool.shutdown().await;
        assert!(reports.recv().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_drains_queue() {
        let f = fixture(FlakyChecks::default()).await;
        let audit = f.audit.clone();
        let (pool, _reports) = WorkerPool::start(Arc::new(f.orchestrator), &settings(1, 16));

        for _ in 0..5 {
            pool.submit(ValidationOperation::new(
                "s1".into(),
                OperationKind::ValidateSignature,
            ))
            .unwrap();
        }
        pool.shutdown().await;

        assert_eq!(audit.records().len(), 5);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn full_queue_is_reported() {
        let f = fixture(FlakyChecks::default()).await;
        let (pool, _reports) = WorkerPool::start(Arc::new(f.orchestrator), &settings(1, 1));

        // The worker task has not been polled yet, so nothing is consumed.
        let op = ValidationOperation::new("s1".into(), OperationKind::ValidateSignature);
        pool.submit(op.clone()).unwrap();
        assert!(matches!(pool.submit(op), Err(Error::QueueFull)));

        pool.shutdown().await;
    }
}
