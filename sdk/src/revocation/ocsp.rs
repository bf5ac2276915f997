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
use http::{header, Request};
use log::{debug, warn};
use sigtrust_crypto::ocsp::{
    build_request, OcspCertStatus, OcspError, OcspResponse, OCSP_REQUEST_CONTENT_TYPE,
    OCSP_RESPONSE_CONTENT_TYPE,
};

use super::{cache::expiry, Failure, RevocationChecker};
use crate::{
    certificate::{Certificate, CheckOutcome},
    http::fetch,
};

impl RevocationChecker {
    pub(super) async fn ocsp_status(
        &self,
        certificate: &Certificate,
    ) -> CheckOutcome<OcspCertStatus> {
        let responders = &certificate.info.ocsp_responders;
        if !self.settings.enable_ocsp || responders.is_empty() {
            return CheckOutcome::NotApplicable;
        }

        let now = self.clock.now();
        let key = &certificate.info.fingerprint;
        if let Some(status) = self.ocsp_responses.get(key, now) {
            return CheckOutcome::Completed(status);
        }

        let Some(issuer) = self.find_issuer(certificate) else {
            return CheckOutcome::unavailable("issuer certificate not available");
        };

        let request = match build_request(&certificate.der, &issuer) {
            Ok(request) => request,
            Err(e) => return CheckOutcome::malformed(e),
        };

        let mut outcome = CheckOutcome::unavailable("no OCSP responder answered");

        for url in responders {
            match self
                .query_responder(url, request.clone(), certificate, &issuer, now)
                .await
            {
                Ok(response) => {
                    debug!(
                        "OCSP {url}: {} is {:?}",
                        certificate.info.subject, response.cert_status
                    );

                    self.ocsp_responses.insert(
                        key,
                        response.cert_status.clone(),
                        expiry(now, self.settings.ocsp_cache_ttl_secs, response.next_update),
                    );
                    return CheckOutcome::Completed(response.cert_status);
                }
                Err(failure) => {
                    warn!("OCSP {url}: {failure:?}");
                    outcome = failure.into();
                }
            }
        }

        outcome
    }

    async fn query_responder(
        &self,
        url: &str,
        body: Vec<u8>,
        certificate: &Certificate,
        issuer: &[u8],
        now: DateTime<Utc>,
    ) -> Result<OcspResponse, Failure> {
        let request = Request::post(url)
            .header(header::CONTENT_TYPE, OCSP_REQUEST_CONTENT_TYPE)
            .header(header::ACCEPT, OCSP_RESPONSE_CONTENT_TYPE)
            .body(body)
            .map_err(|e| Failure::Unavailable(e.to_string()))?;

        let der = fetch(
            self.http.as_ref(),
            request,
            self.settings.ocsp_max_size,
            self.settings.ocsp_timeout(),
        )
        .await
        .map_err(|e| Failure::Unavailable(e.to_string()))?;

        OcspResponse::from_der_checked(&der, &certificate.der, issuer, now).map_err(|e| match e {
            OcspError::Stale | OcspError::NotYetValid | OcspError::Unsuccessful(_) => {
                Failure::Unavailable(e.to_string())
            }
            _ => Failure::Malformed(e.to_string()),
        })
    }
}
