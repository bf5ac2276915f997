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

//! Revocation checks against CRL distribution points and OCSP responders.
//!
//! Network and decoding problems never raise: they are reported as
//! [`CheckOutcome::Unavailable`] or [`CheckOutcome::Malformed`] so that one
//! failing source does not abort a certificate verification.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sigtrust_crypto::{
    chain::TrustAnchors, crl::Crl, ocsp::OcspCertStatus, x509::verify_issued_by,
};

use crate::{
    certificate::{Certificate, CheckOutcome, CrlStatus},
    clock::Clock,
    http::AsyncHttpResolver,
    settings::{Revocation, Settings},
    Result,
};

mod cache;
mod crl;
mod ocsp;

use cache::TtlCache;

/// The revocation checks run on a certificate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    /// Look the certificate up in its issuer's CRL.
    async fn check_crl(&self, certificate: &Certificate) -> CheckOutcome<CrlStatus>;

    /// Ask the certificate's OCSP responders for its status.
    async fn check_ocsp(&self, certificate: &Certificate) -> CheckOutcome<OcspCertStatus>;
}

/// Why a single source did not produce an answer.
#[derive(Debug)]
enum Failure {
    Unavailable(String),
    Malformed(String),
}

impl<T> From<Failure> for CheckOutcome<T> {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Unavailable(reason) => CheckOutcome::unavailable(reason),
            Failure::Malformed(reason) => CheckOutcome::malformed(reason),
        }
    }
}

/// Fetches, authenticates and caches CRLs and OCSP responses.
pub struct RevocationChecker {
    settings: Revocation,
    anchors: TrustAnchors,
    intermediates: Vec<Vec<u8>>,
    http: Arc<dyn AsyncHttpResolver>,
    clock: Arc<dyn Clock>,
    crls: TtlCache<Crl>,
    ocsp_responses: TtlCache<OcspCertStatus>,
}

impl RevocationChecker {
    /// Create a checker. Issuer certificates are looked up among the
    /// certificate's own intermediates, the configured intermediates and the
    /// trust anchors.
    pub fn new(
        settings: &Settings,
        http: Arc<dyn AsyncHttpResolver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            settings: settings.revocation.clone(),
            anchors: settings.trust.trust_anchors()?,
            intermediates: settings.trust.intermediate_ders()?,
            http,
            clock,
            crls: TtlCache::new(),
            ocsp_responses: TtlCache::new(),
        })
    }

    /// The certificate that issued `certificate`, if it is known.
    fn find_issuer(&self, certificate: &Certificate) -> Option<Vec<u8>> {
        let issuer = certificate
            .intermediates
            .iter()
            .chain(self.intermediates.iter())
            .chain(self.anchors.trust_anchor_ders())
            .find(|candidate| verify_issued_by(&certificate.der, candidate).is_ok())
            .cloned();

        if issuer.is_none() {
            debug!("issuer of {} not found", certificate.info.subject);
        }
        issuer
    }
}

#[async_trait]
impl RevocationCheck for RevocationChecker {
    async fn check_crl(&self, certificate: &Certificate) -> CheckOutcome<CrlStatus> {
        self.crl_status(certificate).await
    }

    async fn check_ocsp(&self, certificate: &Certificate) -> CheckOutcome<OcspCertStatus> {
        self.ocsp_status(certificate).await
    }
}
