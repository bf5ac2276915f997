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

//! Validation of a certificate's issuance chain up to a trust anchor.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::Request;
use log::{debug, info};
use sigtrust_crypto::{
    chain::{validate_chain, ChainError, ChainOptions, TrustAnchors},
    x509::{cert_der_from_bytes, CertificateInfo},
};
use sigtrust_status_tracker::validation_codes::{
    CHAIN_OUTSIDE_VALIDITY, CHAIN_SELF_SIGNED, CHAIN_TOO_LONG, CHAIN_UNTRUSTED,
};

use crate::{
    certificate::{Certificate, ChainStatus, CheckOutcome},
    http::{fetch, AsyncHttpResolver},
    settings::Settings,
    Result,
};

// Issuer certificates are small; anything bigger is not a certificate.
const MAX_ISSUER_CERT_SIZE: usize = 64 * 1024;

/// The chain check run on a certificate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainCheck: Send + Sync {
    /// Validate the chain of `certificate` as of `at`.
    async fn validate_chain(
        &self,
        certificate: &Certificate,
        at: DateTime<Utc>,
    ) -> CheckOutcome<ChainStatus>;
}

/// Builds and checks issuance chains against the configured trust anchors.
///
/// Issuers are taken from the certificate's own intermediates and the
/// configured intermediates. When enabled, a missing issuer is downloaded
/// from the AIA `caIssuers` URL named by the certificate that needs it.
pub struct ChainValidator {
    anchors: TrustAnchors,
    intermediates: Vec<Vec<u8>>,
    max_depth: usize,
    fetch_aia_issuers: bool,
    timeout: Duration,
    http: Arc<dyn AsyncHttpResolver>,
}

impl ChainValidator {
    /// Create a validator from the `[trust]` settings.
    pub fn new(settings: &Settings, http: Arc<dyn AsyncHttpResolver>) -> Result<Self> {
        Ok(Self {
            anchors: settings.trust.trust_anchors()?,
            intermediates: settings.trust.intermediate_ders()?,
            max_depth: settings.trust.max_chain_depth,
            fetch_aia_issuers: settings.trust.fetch_aia_issuers,
            timeout: settings.trust.chain_timeout(),
            http,
        })
    }

    /// Validate a chain without fetching anything.
    ///
    /// Used for certificates that arrive with all their issuers, such as the
    /// signer of a time-stamp token.
    pub fn validate_offline(
        &self,
        leaf: &[u8],
        intermediates: &[Vec<u8>],
        at: DateTime<Utc>,
    ) -> CheckOutcome<ChainStatus> {
        let mut pool = intermediates.to_vec();
        pool.extend(self.intermediates.iter().cloned());

        let validation = validate_chain(leaf, &pool, &self.anchors, self.options(at));
        match validation.result {
            Ok(()) => CheckOutcome::Completed(trusted(&validation.chain)),
            Err(err) => chain_error_outcome(err),
        }
    }

    fn options(&self, at: DateTime<Utc>) -> ChainOptions {
        ChainOptions {
            max_depth: self.max_depth,
            validation_time: at,
        }
    }

    async fn fetch_issuer(&self, urls: &[String]) -> std::result::Result<Vec<u8>, String> {
        let mut last_error = "no caIssuers URL".to_string();

        for url in urls {
            let request = Request::get(url.as_str())
                .body(vec![])
                .map_err(|e| e.to_string())?;

            match fetch(self.http.as_ref(), request, MAX_ISSUER_CERT_SIZE, self.timeout).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    debug!("caIssuers {url}: {e}");
                    last_error = e.to_string();
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl ChainCheck for ChainValidator {
    async fn validate_chain(
        &self,
        certificate: &Certificate,
        at: DateTime<Utc>,
    ) -> CheckOutcome<ChainStatus> {
        let mut pool = certificate.intermediates.clone();
        pool.extend(self.intermediates.iter().cloned());

        let mut fetched = 0;
        loop {
            let validation = validate_chain(&certificate.der, &pool, &self.anchors, self.options(at));

            let err = match validation.result {
                Ok(()) => return CheckOutcome::Completed(trusted(&validation.chain)),
                Err(err) => err,
            };

            let ChainError::IssuerNotFound { issuer, ca_issuers } = &err else {
                return chain_error_outcome(err);
            };

            if !self.fetch_aia_issuers || ca_issuers.is_empty() || fetched >= self.max_depth {
                return chain_error_outcome(err);
            }

            let body = match self.fetch_issuer(ca_issuers).await {
                Ok(body) => body,
                Err(reason) => {
                    return CheckOutcome::unavailable(format!(
                        "could not fetch issuer {issuer}: {reason}"
                    ))
                }
            };

            let issuer_der = match cert_der_from_bytes(&body) {
                Ok(der) => der,
                Err(e) => return CheckOutcome::malformed(format!("issuer {issuer}: {e}")),
            };

            if pool.contains(&issuer_der) {
                return chain_error_outcome(err);
            }

            info!("fetched issuer {issuer} via caIssuers");
            pool.push(issuer_der);
            fetched += 1;
        }
    }
}

fn trusted(chain: &[Vec<u8>]) -> ChainStatus {
    ChainStatus::Trusted {
        chain: chain
            .iter()
            .filter_map(|der| CertificateInfo::from_der(der).ok())
            .map(|info| info.subject)
            .collect(),
    }
}

fn chain_error_outcome(err: ChainError) -> CheckOutcome<ChainStatus> {
    let code = match &err {
        ChainError::InvalidCertificate(_) | ChainError::InvalidTrustList(_) => {
            return CheckOutcome::malformed(err)
        }
        ChainError::TooLong { .. } => CHAIN_TOO_LONG,
        ChainError::SelfSigned { .. } => CHAIN_SELF_SIGNED,
        ChainError::OutsideValidity { .. } => CHAIN_OUTSIDE_VALIDITY,
        _ => CHAIN_UNTRUSTED,
    };

    CheckOutcome::Completed(ChainStatus::Untrusted {
        code: code.to_string(),
        reason: err.to_string(),
    })
}
