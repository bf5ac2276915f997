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

//! Issuance-chain building and validation against a set of trust anchors.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::x509::{verify_issued_by, CertificateError, CertificateInfo};

mod trust_anchors;
pub use trust_anchors::TrustAnchors;

/// Default upper bound on the number of certificates in a path, leaf and
/// trust anchor included.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 10;

/// The outcome of a chain validation.
///
/// `chain` always holds the path that was resolved, starting with the leaf,
/// even when validation failed, so that it can be recorded for audit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainValidation {
    /// DER certificates from the leaf up to (and including) the trust anchor
    /// when one was reached.
    pub chain: Vec<Vec<u8>>,

    /// `Ok(())` if the chain terminates at a trust anchor.
    pub result: Result<(), ChainError>,
}

impl ChainValidation {
    /// Returns `true` if the chain terminates at a trust anchor.
    pub fn is_trusted(&self) -> bool {
        self.result.is_ok()
    }
}

/// Options controlling chain validation.
#[derive(Clone, Copy, Debug)]
pub struct ChainOptions {
    /// Maximum certificates in a path, leaf and trust anchor included.
    pub max_depth: usize,

    /// Time at which every certificate in the path must be valid.
    pub validation_time: DateTime<Utc>,
}

/// Validate the issuance chain of `leaf_der`.
///
/// Issuers are looked up first among the trust anchors, then among
/// `intermediates`. Every link's signature is verified, every certificate
/// must be inside its validity window at `options.validation_time`, and every
/// issuer must be a CA permitted to sign certificates.
pub fn validate_chain(
    leaf_der: &[u8],
    intermediates: &[Vec<u8>],
    anchors: &TrustAnchors,
    options: ChainOptions,
) -> ChainValidation {
    let mut chain = vec![leaf_der.to_vec()];
    let result = build_path(&mut chain, intermediates, anchors, options);
    ChainValidation { chain, result }
}

fn build_path(
    chain: &mut Vec<Vec<u8>>,
    intermediates: &[Vec<u8>],
    anchors: &TrustAnchors,
    options: ChainOptions,
) -> Result<(), ChainError> {
    let leaf = CertificateInfo::from_der(&chain[0])?;
    check_validity(&leaf, options.validation_time)?;

    if anchors.is_trust_anchor(&chain[0]) {
        return Ok(());
    }

    if leaf.self_issued && verify_issued_by(&chain[0], &chain[0]).is_ok() {
        return if anchors.is_allowed_self_signed(&chain[0]) {
            Ok(())
        } else {
            Err(ChainError::SelfSigned {
                subject: leaf.subject,
            })
        };
    }

    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    seen.insert(chain[0].clone());

    loop {
        let current = chain[chain.len() - 1].clone();

        if let Some(anchor) = anchors
            .trust_anchor_ders()
            .find(|anchor| verify_issued_by(&current, anchor).is_ok())
        {
            if chain.len() + 1 > options.max_depth {
                return Err(ChainError::TooLong {
                    max_depth: options.max_depth,
                });
            }

            let anchor_info = CertificateInfo::from_der(anchor)?;
            check_validity(&anchor_info, options.validation_time)?;
            check_issuer(&anchor_info, chain.len() - 1)?;

            chain.push(anchor.clone());
            return Ok(());
        }

        if chain.len() >= options.max_depth {
            return Err(ChainError::TooLong {
                max_depth: options.max_depth,
            });
        }

        let candidates: Vec<&Vec<u8>> = intermediates
            .iter()
            .filter(|candidate| verify_issued_by(&current, candidate).is_ok())
            .collect();

        let Some(issuer) = candidates.iter().find(|c| !seen.contains(c.as_slice())) else {
            if !candidates.is_empty() {
                return Err(ChainError::Cycle);
            }

            let current_info = CertificateInfo::from_der(&current)?;
            return Err(ChainError::IssuerNotFound {
                issuer: current_info.issuer,
                ca_issuers: current_info.ca_issuers,
            });
        };

        let issuer_info = CertificateInfo::from_der(issuer)?;
        check_validity(&issuer_info, options.validation_time)?;
        check_issuer(&issuer_info, chain.len() - 1)?;

        seen.insert(issuer.to_vec());
        chain.push(issuer.to_vec());
    }
}

fn check_validity(cert: &CertificateInfo, at: DateTime<Utc>) -> Result<(), ChainError> {
    if cert.is_valid_at(at) {
        Ok(())
    } else {
        Err(ChainError::OutsideValidity {
            subject: cert.subject.clone(),
        })
    }
}

// `intermediates_below` counts the CA certificates between this issuer and
// the leaf.
fn check_issuer(cert: &CertificateInfo, intermediates_below: usize) -> Result<(), ChainError> {
    if !cert.is_ca || (cert.key_usage.present && !cert.key_usage.key_cert_sign) {
        return Err(ChainError::NotCa {
            subject: cert.subject.clone(),
        });
    }

    if let Some(path_len) = cert.path_len_constraint {
        if intermediates_below > path_len as usize {
            return Err(ChainError::PathLenExceeded {
                subject: cert.subject.clone(),
            });
        }
    }

    Ok(())
}

/// Describes why a chain could not be validated.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ChainError {
    /// A certificate in the path could not be parsed.
    #[error("invalid certificate in chain: {0}")]
    InvalidCertificate(String),

    /// The trust list could not be parsed.
    #[error("invalid trust list: {0}")]
    InvalidTrustList(String),

    /// The path to a trust anchor is longer than allowed.
    #[error("chain exceeds maximum depth of {max_depth}")]
    TooLong {
        /// The configured maximum depth.
        max_depth: usize,
    },

    /// The certificates supplied form an issuance loop.
    #[error("chain contains a cycle")]
    Cycle,

    /// The certificate is self-signed and not allow-listed.
    #[error("self-signed certificate {subject} is not allow-listed")]
    SelfSigned {
        /// Subject of the offending certificate.
        subject: String,
    },

    /// A certificate in the path is outside its validity window.
    #[error("certificate {subject} is outside its validity window")]
    OutsideValidity {
        /// Subject of the offending certificate.
        subject: String,
    },

    /// An issuer in the path is not a CA or may not sign certificates.
    #[error("certificate {subject} is not a certificate authority")]
    NotCa {
        /// Subject of the offending certificate.
        subject: String,
    },

    /// An issuer's path length constraint is exceeded.
    #[error("path length constraint of {subject} exceeded")]
    PathLenExceeded {
        /// Subject of the offending certificate.
        subject: String,
    },

    /// No issuer for a certificate in the path is known.
    #[error("issuer {issuer} not found")]
    IssuerNotFound {
        /// Issuer name that could not be resolved.
        issuer: String,

        /// AIA `caIssuers` URIs where the issuer may be fetched.
        ca_issuers: Vec<String>,
    },
}

impl From<CertificateError> for ChainError {
    fn from(err: CertificateError) -> Self {
        Self::InvalidCertificate(err.to_string())
    }
}
