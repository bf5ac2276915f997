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

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    certificate::{Certificate, CertificateId},
    signature::{Signature, SignatureId},
    store::{CertificateStore, SignatureStore, Store, WriteBatch},
    Error, Result,
};

#[derive(Default)]
struct Records {
    signatures: HashMap<SignatureId, Signature>,
    certificates: HashMap<CertificateId, Certificate>,
}

/// In-process [`Store`] backed by hash maps.
///
/// Nothing is persisted across restarts. Used by the command-line tool and
/// in tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignatureStore for MemoryStore {
    async fn get_signature(&self, id: &SignatureId) -> Result<Signature> {
        self.records
            .lock()
            .await
            .signatures
            .get(id)
            .cloned()
            .ok_or_else(|| Error::signature_not_found(id))
    }

    async fn insert_signature(&self, signature: Signature) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.signatures.contains_key(&signature.id) {
            return Err(Error::Conflict {
                entity: "signature",
                id: signature.id.to_string(),
            });
        }

        records.signatures.insert(signature.id.clone(), signature);
        Ok(())
    }

    async fn signatures_for_certificate(&self, id: &CertificateId) -> Result<Vec<Signature>> {
        let records = self.records.lock().await;

        let mut signatures: Vec<Signature> = records
            .signatures
            .values()
            .filter(|s| &s.certificate_id == id)
            .cloned()
            .collect();
        signatures.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(signatures)
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn get_certificate(&self, id: &CertificateId) -> Result<Certificate> {
        self.records
            .lock()
            .await
            .certificates
            .get(id)
            .cloned()
            .ok_or_else(|| Error::certificate_not_found(id))
    }

    async fn insert_certificate(&self, certificate: Certificate) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.certificates.contains_key(&certificate.id) {
            return Err(Error::Conflict {
                entity: "certificate",
                id: certificate.id.to_string(),
            });
        }

        records
            .certificates
            .insert(certificate.id.clone(), certificate);
        Ok(())
    }

    async fn list_certificates(&self) -> Result<Vec<Certificate>> {
        let records = self.records.lock().await;

        let mut certificates: Vec<Certificate> = records.certificates.values().cloned().collect();
        certificates.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(certificates)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut records = self.records.lock().await;

        // Check every expectation before touching anything.
        for signature in &batch.signatures {
            let stored = records
                .signatures
                .get(&signature.id)
                .ok_or_else(|| Error::signature_not_found(&signature.id))?;

            if stored.version != signature.version {
                return Err(Error::Conflict {
                    entity: "signature",
                    id: signature.id.to_string(),
                });
            }
        }

        let guards = batch
            .certificates
            .iter()
            .map(|c| (&c.id, c.version))
            .chain(batch.certificate_guards.iter().map(|(id, v)| (id, *v)));

        for (id, version) in guards {
            let stored = records
                .certificates
                .get(id)
                .ok_or_else(|| Error::certificate_not_found(id))?;

            if stored.version != version {
                return Err(Error::Conflict {
                    entity: "certificate",
                    id: id.to_string(),
                });
            }
        }

        for mut signature in batch.signatures {
            signature.version += 1;
            records.signatures.insert(signature.id.clone(), signature);
        }

        for mut certificate in batch.certificates {
            certificate.version += 1;
            records
                .certificates
                .insert(certificate.id.clone(), certificate);
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(missing_docs)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use sigtrust_crypto::raw_signature::SigningAlg;

    use super::*;
    use crate::{certificate::CertificateState, tests::fixtures};

    fn certificate(id: &str) -> Certificate {
        Certificate::import(id.into(), fixtures::LEAF_GOOD, None).unwrap()
    }

    fn signature(id: &str, certificate_id: &str) -> Signature {
        Signature::new(
            id.into(),
            "doc",
            certificate_id.into(),
            SigningAlg::Es256,
            vec![],
            vec![],
        )
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = MemoryStore::new();
        store.insert_certificate(certificate("c1")).await.unwrap();
        store.insert_signature(signature("s1", "c1")).await.unwrap();
        store.insert_signature(signature("s2", "c1")).await.unwrap();
        store.insert_signature(signature("s3", "c2")).await.unwrap();

        assert_eq!(store.get_signature(&"s1".into()).await.unwrap().version, 0);

        let dependent = store
            .signatures_for_certificate(&"c1".into())
            .await
            .unwrap();
        let ids: Vec<&str> = dependent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        assert!(matches!(
            store.get_certificate(&"c9".into()).await,
            Err(Error::NotFound {
                entity: "certificate",
                ..
            })
        ));

        assert!(matches!(
            store.insert_signature(signature("s1", "c1")).await,
            Err(Error::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn commit_increments_versions() {
        let store = MemoryStore::new();
        store.insert_certificate(certificate("c1")).await.unwrap();
        store.insert_signature(signature("s1", "c1")).await.unwrap();

        let mut cert = store.get_certificate(&"c1".into()).await.unwrap();
        cert.state = CertificateState::Revoked;
        let sig = store.get_signature(&"s1".into()).await.unwrap();

        store
            .commit(WriteBatch::new().put_certificate(cert).put_signature(sig))
            .await
            .unwrap();

        let cert = store.get_certificate(&"c1".into()).await.unwrap();
        assert_eq!(cert.state, CertificateState::Revoked);
        assert_eq!(cert.version, 1);
        assert_eq!(store.get_signature(&"s1".into()).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn stale_write_is_rejected_atomically() {
        let store = MemoryStore::new();
        store.insert_certificate(certificate("c1")).await.unwrap();
        store.insert_signature(signature("s1", "c1")).await.unwrap();

        let stale_cert = store.get_certificate(&"c1".into()).await.unwrap();
        store
            .commit(WriteBatch::new().put_certificate(stale_cert.clone()))
            .await
            .unwrap();

        let mut sig = store.get_signature(&"s1".into()).await.unwrap();
        sig.last_error = Some("should not be written".into());

        let err = store
            .commit(
                WriteBatch::new()
                    .put_signature(sig)
                    .put_certificate(stale_cert),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Conflict {
                entity: "certificate",
                ..
            }
        ));

        let sig = store.get_signature(&"s1".into()).await.unwrap();
        assert_eq!(sig.version, 0);
        assert!(sig.last_error.is_none());
    }

    #[tokio::test]
    async fn certificate_guard() {
        let store = MemoryStore::new();
        store.insert_certificate(certificate("c1")).await.unwrap();
        store.insert_signature(signature("s1", "c1")).await.unwrap();

        let sig = store.get_signature(&"s1".into()).await.unwrap();
        let batch = WriteBatch::new()
            .put_signature(sig.clone())
            .guard_certificate("c1".into(), 7);

        assert!(matches!(
            store.commit(batch).await,
            Err(Error::Conflict { .. })
        ));

        let batch = WriteBatch::new()
            .put_signature(sig)
            .guard_certificate("c1".into(), 0);
        store.commit(batch).await.unwrap();

        // Guards do not write the certificate.
        assert_eq!(store.get_certificate(&"c1".into()).await.unwrap().version, 0);
    }
}
