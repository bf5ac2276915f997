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

//! Daily re-verification of every certificate in the store.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};
use log::{debug, error, info};

use crate::{
    certificate::CertificateState,
    clock::Clock,
    operation::{OperationKind, Trigger, ValidationOperation},
    settings::Schedule,
    store::Store,
    worker::WorkerPool,
    Result,
};

/// Enqueues [`VerifyCertificate`](OperationKind::VerifyCertificate) and
/// [`VerifyTrustChain`](OperationKind::VerifyTrustChain) for every
/// certificate that is not revoked, once a day.
///
/// Operations address a certificate through one of its signatures; a
/// certificate without signatures is skipped.
pub struct Scheduler {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    daily_at: NaiveTime,
}

impl Scheduler {
    /// Create a scheduler from the `[schedule]` settings.
    pub fn new(settings: &Schedule, store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            store,
            clock,
            daily_at: settings.daily_time()?,
        })
    }

    /// The operations one scheduled run enqueues.
    pub async fn plan(&self) -> Result<Vec<ValidationOperation>> {
        let mut operations = vec![];

        for certificate in self.store.list_certificates().await? {
            if certificate.state == CertificateState::Revoked {
                debug!("skipping revoked certificate {}", certificate.id);
                continue;
            }

            let signatures = self.store.signatures_for_certificate(&certificate.id).await?;
            let Some(signature) = signatures.first() else {
                debug!("certificate {} has no signatures", certificate.id);
                continue;
            };

            for kind in [OperationKind::VerifyCertificate, OperationKind::VerifyTrustChain] {
                operations.push(
                    ValidationOperation::new(signature.id.clone(), kind)
                        .with_trigger(Trigger::Scheduled),
                );
            }
        }

        Ok(operations)
    }

    /// Enqueue one run's operations now. Returns how many were enqueued.
    pub async fn run_once(&self, pool: &WorkerPool) -> Result<usize> {
        let operations = self.plan().await?;
        let count = operations.len();

        for operation in operations {
            pool.queue(operation).await?;
        }

        info!("scheduled {count} certificate verifications");
        Ok(count)
    }

    /// The first scheduled time strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.daily_at).and_utc();
        if today > now {
            return today;
        }

        now.date_naive()
            .checked_add_days(Days::new(1))
            .map(|tomorrow| tomorrow.and_time(self.daily_at).and_utc())
            .unwrap_or(today)
    }

    /// Run forever, enqueueing at the configured time each day.
    pub async fn run(&self, pool: &WorkerPool) {
        loop {
            let now = self.clock.now();
            let next = self.next_run_after(now);
            let wait = (next - now).to_std().unwrap_or_default();

            debug!("next scheduled verification at {next}");
            tokio::time::sleep(wait).await;

            if let Err(e) = self.run_once(pool).await {
                error!("scheduled verification failed: {e}");
            }
        }
    }
}
