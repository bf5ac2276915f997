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

use chrono::{DateTime, Utc};
use http::Request;
use log::{debug, warn};
use sigtrust_crypto::crl::Crl;

use super::{cache::expiry, Failure, RevocationChecker};
use crate::{
    certificate::{Certificate, CheckOutcome, CrlStatus},
    http::fetch,
};

impl RevocationChecker {
    pub(super) async fn crl_status(&self, certificate: &Certificate) -> CheckOutcome<CrlStatus> {
        let points = &certificate.info.crl_distribution_points;
        if !self.settings.enable_crl || points.is_empty() {
            return CheckOutcome::NotApplicable;
        }

        let Some(issuer) = self.find_issuer(certificate) else {
            return CheckOutcome::unavailable("issuer certificate not available");
        };

        let now = self.clock.now();
        let mut outcome = CheckOutcome::unavailable("no CRL distribution point answered");

        for url in points {
            match self.current_crl(url, &issuer, now).await {
                Ok(crl) => {
                    let status = crl.status_of(&certificate.info.serial);
                    debug!(
                        "CRL {url}: serial {} is {status:?}",
                        certificate.info.serial
                    );
                    return CheckOutcome::Completed(status.into());
                }
                Err(failure) => {
                    warn!("CRL {url}: {failure:?}");
                    outcome = failure.into();
                }
            }
        }

        outcome
    }

    /// A CRL from `url` that `issuer` signed and that is current at `now`.
    async fn current_crl(
        &self,
        url: &str,
        issuer: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Crl, Failure> {
        if let Some(crl) = self.crls.get(url, now) {
            crl.verify_signature(issuer)
                .map_err(|e| Failure::Malformed(e.to_string()))?;
            return Ok(crl);
        }

        let request = Request::get(url)
            .body(vec![])
            .map_err(|e| Failure::Unavailable(e.to_string()))?;

        let der = fetch(
            self.http.as_ref(),
            request,
            self.settings.crl_max_size,
            self.settings.crl_timeout(),
        )
        .await
        .map_err(|e| Failure::Unavailable(e.to_string()))?;

        let crl = Crl::from_der(&der).map_err(|e| Failure::Malformed(e.to_string()))?;

        if crl.is_stale_at(now) {
            return Err(Failure::Unavailable(format!(
                "CRL is stale since {:?}",
                crl.next_update()
            )));
        }

        crl.verify_signature(issuer)
            .map_err(|e| Failure::Malformed(e.to_string()))?;

        // Cache lifetime runs from the download, not from the last read.
        self.crls.insert(
            url,
            crl.clone(),
            expiry(now, self.settings.crl_cache_ttl_secs, crl.next_update()),
        );

        Ok(crl)
    }
}
