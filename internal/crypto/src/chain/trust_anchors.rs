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

use std::{collections::HashSet, io::BufRead};

use x509_parser::pem::Pem;

use crate::{base64, chain::ChainError, hash::sha256_fingerprint};

/// A `TrustAnchors` set is configured with the root certificates a chain must
/// terminate at and with the self-signed end-entity certificates that are
/// accepted without a chain.
#[derive(Clone, Debug, Default)]
pub struct TrustAnchors {
    /// Trust anchors (root X.509 certificates) in DER format.
    trust_anchor_ders: Vec<Vec<u8>>,

    /// Base-64 encoded SHA-256 hash of allow-listed self-signed certificates
    /// in DER format.
    self_signed_set: HashSet<String>,
}

impl TrustAnchors {
    /// Create an empty trust-anchor set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add trust anchors from a buffer containing one or more PEM
    /// `CERTIFICATE` blocks.
    pub fn add_trust_anchors(&mut self, trust_anchor_pems: &[u8]) -> Result<(), ChainError> {
        for maybe_pem in Pem::iter_from_buffer(trust_anchor_pems) {
            // `contents` holds the decoded DER.
            match maybe_pem {
                Ok(pem) => self.add_trust_anchor_der(pem.contents),
                Err(e) => {
                    return Err(ChainError::InvalidTrustList(e.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Add a single DER-encoded trust anchor.
    pub fn add_trust_anchor_der(&mut self, der: Vec<u8>) {
        if !self.trust_anchor_ders.contains(&der) {
            self.trust_anchor_ders.push(der);
        }
    }

    /// Allow-list self-signed end-entity certificates.
    ///
    /// The buffer may contain PEM `CERTIFICATE` blocks and, outside of PEM
    /// blocks, lines holding the Base64 SHA-256 hash of a certificate's DER
    /// encoding.
    pub fn add_allowed_self_signed(&mut self, cert_pems: &[u8]) -> Result<(), ChainError> {
        let mut inside_pem_block = false;

        for line in cert_pems.lines().map_while(Result::ok) {
            let line = line.trim();
            if line.contains("-----BEGIN") {
                inside_pem_block = true;
            }
            if line.contains("-----END") {
                inside_pem_block = false;
                continue;
            }
            if !inside_pem_block && line.len() == 44 && base64::decode(line).is_ok() {
                self.self_signed_set.insert(line.to_string());
            }
        }

        for maybe_pem in Pem::iter_from_buffer(cert_pems) {
            match maybe_pem {
                Ok(pem) => {
                    self.self_signed_set
                        .insert(sha256_fingerprint(&pem.contents));
                }
                Err(e) => {
                    return Err(ChainError::InvalidTrustList(e.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Return `true` if no trust anchor has been configured.
    pub fn is_empty(&self) -> bool {
        self.trust_anchor_ders.is_empty()
    }

    /// Return `true` if `der` is one of the configured trust anchors.
    pub fn is_trust_anchor(&self, der: &[u8]) -> bool {
        self.trust_anchor_ders.iter().any(|anchor| anchor == der)
    }

    /// Return `true` if the self-signed certificate `der` was allow-listed.
    pub fn is_allowed_self_signed(&self, der: &[u8]) -> bool {
        self.self_signed_set.contains(&sha256_fingerprint(der))
    }

    /// Return an iterator over the trust anchors.
    ///
    /// Each anchor will be returned in DER format.
    pub fn trust_anchor_ders(&self) -> impl Iterator<Item = &'_ Vec<u8>> {
        self.trust_anchor_ders.iter()
    }
}
