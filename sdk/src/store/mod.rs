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

//! Persistence boundary for signatures and certificates.
//!
//! Every write goes through [`Store::commit`], which applies a
//! [`WriteBatch`] atomically. Each record in a batch carries the version it
//! was read at; the store rejects the whole batch with
//! [`Error::Conflict`](crate::Error::Conflict) if any record was written in
//! the meantime, and otherwise stores every record with its version
//! incremented.

use async_trait::async_trait;

use crate::{
    certificate::{Certificate, CertificateId},
    signature::{Signature, SignatureId},
    Result,
};

mod memory;
pub use memory::MemoryStore;

/// Read access to signature records.
#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// Load a signature. Fails with `NotFound` if it does not exist.
    async fn get_signature(&self, id: &SignatureId) -> Result<Signature>;

    /// Add a new signature record.
    ///
    /// Fails with `Conflict` if a signature with the same id exists.
    async fn insert_signature(&self, signature: Signature) -> Result<()>;

    /// All signatures made with the given certificate.
    async fn signatures_for_certificate(&self, id: &CertificateId) -> Result<Vec<Signature>>;
}

/// Read access to certificate records.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Load a certificate. Fails with `NotFound` if it does not exist.
    async fn get_certificate(&self, id: &CertificateId) -> Result<Certificate>;

    /// Add a new certificate record.
    ///
    /// Fails with `Conflict` if a certificate with the same id exists.
    async fn insert_certificate(&self, certificate: Certificate) -> Result<()>;

    /// All certificates.
    async fn list_certificates(&self) -> Result<Vec<Certificate>>;
}

/// A store for both record types with atomic, version-checked writes.
#[async_trait]
pub trait Store: SignatureStore + CertificateStore {
    /// Apply every write in `batch`, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// A set of writes applied together by [`Store::commit`].
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    pub(crate) signatures: Vec<Signature>,
    pub(crate) certificates: Vec<Certificate>,
    pub(crate) certificate_guards: Vec<(CertificateId, u64)>,
}

impl WriteBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `signature`, expecting the stored record to be at
    /// `signature.version`.
    pub fn put_signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }

    /// Write `certificate`, expecting the stored record to be at
    /// `certificate.version`.
    pub fn put_certificate(mut self, certificate: Certificate) -> Self {
        self.certificates.push(certificate);
        self
    }

    /// Require the stored certificate `id` to still be at `version` without
    /// writing it.
    pub fn guard_certificate(mut self, id: CertificateId, version: u64) -> Self {
        self.certificate_guards.push((id, version));
        self
    }

    /// Returns `true` if the batch writes nothing.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty() && self.certificates.is_empty()
    }
}
