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

#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

/// Test PKI shared with `sigtrust-crypto`: a root, an intermediate that
/// issues the leaves and the TSA, and a deliberately over-long chain.
/// Revocation data is current until 2126.
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use sigtrust_crypto::x509::certs_from_pem;

    pub(crate) const ROOT: &[u8] = include_bytes!("../../tests/fixtures/pki/root.pem");
    pub(crate) const INTERMEDIATE: &[u8] = include_bytes!("../../tests/fixtures/pki/int.pem");
    pub(crate) const INTERMEDIATE_DER: &[u8] = include_bytes!("../../tests/fixtures/pki/int.der");
    pub(crate) const LEAF_GOOD: &[u8] = include_bytes!("../../tests/fixtures/pki/leaf_good.pem");
    pub(crate) const LEAF_REVOKED: &[u8] =
        include_bytes!("../../tests/fixtures/pki/leaf_revoked.pem");
    pub(crate) const LEAF_HOLD: &[u8] = include_bytes!("../../tests/fixtures/pki/leaf_hold.pem");
    pub(crate) const LEAF_RSA: &[u8] = include_bytes!("../../tests/fixtures/pki/leaf_rsa.pem");
    pub(crate) const TSA: &[u8] = include_bytes!("../../tests/fixtures/pki/tsa.pem");
    pub(crate) const SELF_SIGNED: &[u8] =
        include_bytes!("../../tests/fixtures/pki/self_signed.pem");
    pub(crate) const DEEP_ANCHOR: &[u8] = include_bytes!("../../tests/fixtures/pki/deep0.pem");
    pub(crate) const DEEP_LEAF: &[u8] = include_bytes!("../../tests/fixtures/pki/deep_leaf.pem");
    pub(crate) const DEEP_INTERMEDIATES: &[u8] =
        include_bytes!("../../tests/fixtures/pki/deep_intermediates.pem");

    pub(crate) const CRL: &[u8] = include_bytes!("../../tests/fixtures/pki/intermediate.crl");

    pub(crate) const OCSP_GOOD: &[u8] =
        include_bytes!("../../tests/fixtures/pki/leaf_good.ocsp.der");
    pub(crate) const OCSP_REVOKED: &[u8] =
        include_bytes!("../../tests/fixtures/pki/leaf_revoked.ocsp.der");
    pub(crate) const OCSP_HOLD: &[u8] =
        include_bytes!("../../tests/fixtures/pki/leaf_hold.ocsp.der");

    /// The bytes covered by `LEAF_GOOD_SIG` (ES256) and `LEAF_RSA_SIG`
    /// (RS256).
    pub(crate) const SIGNED_DATA: &[u8] =
        include_bytes!("../../tests/fixtures/pki/signed_data.bin");
    pub(crate) const LEAF_GOOD_SIG: &[u8] =
        include_bytes!("../../tests/fixtures/pki/leaf_good.sig");
    pub(crate) const LEAF_RSA_SIG: &[u8] = include_bytes!("../../tests/fixtures/pki/leaf_rsa.sig");

    /// Full `TimeStampResp` and bare token over `LEAF_GOOD_SIG`.
    pub(crate) const TS_RESPONSE: &[u8] = include_bytes!("../../tests/fixtures/pki/ts.tsr");
    pub(crate) const TS_TOKEN: &[u8] = include_bytes!("../../tests/fixtures/pki/ts_token.der");
    pub(crate) const TS_NONCE: u64 = 0xF39D_798F_73BF_D455;

    pub(crate) fn der(pem: &[u8]) -> Vec<u8> {
        certs_from_pem(pem).unwrap().remove(0)
    }

    /// A validation time at which the whole test PKI is current.
    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
    }
}

/// Store wrappers that simulate other writers.
pub(crate) mod stores {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    };

    use async_trait::async_trait;

    use crate::{
        certificate::{Certificate, CertificateId},
        signature::{Signature, SignatureId},
        store::{CertificateStore, MemoryStore, SignatureStore, Store, WriteBatch},
        Result,
    };

    /// Commits `pending` to the inner store just before the first commit
    /// that `trigger` selects, so that commit loses the race.
    pub(crate) struct InterleavingStore {
        pub(crate) inner: Arc<MemoryStore>,
        pending: Mutex<Option<WriteBatch>>,
        trigger: fn(&WriteBatch) -> bool,
        pub(crate) commits: AtomicU32,
    }

    impl InterleavingStore {
        pub(crate) fn new(
            inner: Arc<MemoryStore>,
            pending: WriteBatch,
            trigger: fn(&WriteBatch) -> bool,
        ) -> Self {
            Self {
                inner,
                pending: Mutex::new(Some(pending)),
                trigger,
                commits: AtomicU32::new(0),
            }
        }

        pub(crate) fn interleaved(&self) -> bool {
            self.pending.lock().unwrap().is_none()
        }
    }

    #[async_trait]
    impl SignatureStore for InterleavingStore {
        async fn get_signature(&self, id: &SignatureId) -> Result<Signature> {
            self.inner.get_signature(id).await
        }

        async fn insert_signature(&self, signature: Signature) -> Result<()> {
            self.inner.insert_signature(signature).await
        }

        async fn signatures_for_certificate(&self, id: &CertificateId) -> Result<Vec<Signature>> {
            self.inner.signatures_for_certificate(id).await
        }
    }

    #[async_trait]
    impl CertificateStore for InterleavingStore {
        async fn get_certificate(&self, id: &CertificateId) -> Result<Certificate> {
            self.inner.get_certificate(id).await
        }

        async fn insert_certificate(&self, certificate: Certificate) -> Result<()> {
            self.inner.insert_certificate(certificate).await
        }

        async fn list_certificates(&self) -> Result<Vec<Certificate>> {
            self.inner.list_certificates().await
        }
    }

    #[async_trait]
    impl Store for InterleavingStore {
        async fn commit(&self, batch: WriteBatch) -> Result<()> {
            let pending = if (self.trigger)(&batch) {
                self.pending.lock().unwrap().take()
            } else {
                None
            };

            if let Some(pending) = pending {
                self.inner.commit(pending).await?;
            }

            self.commits.fetch_add(1, Ordering::SeqCst);
            self.inner.commit(batch).await
        }
    }
}
