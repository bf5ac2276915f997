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

//! Parsed views of X.509 certificates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x509_parser::{
    certificate::X509Certificate,
    extensions::{DistributionPointName, GeneralName, ParsedExtension},
    pem::Pem,
    prelude::FromDer,
    time::ASN1Time,
};

use crate::{
    hash::sha256_fingerprint,
    raw_signature::{
        oids::{AD_CA_ISSUERS_OID, AD_OCSP_OID},
        validator_for_sig_and_hash_algs, RawSignatureValidationError,
    },
};

/// Key usage bits relevant to signature validation.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeyUsageFlags {
    /// `digitalSignature`
    pub digital_signature: bool,

    /// `nonRepudiation` (a.k.a. `contentCommitment`)
    pub non_repudiation: bool,

    /// `keyCertSign`
    pub key_cert_sign: bool,

    /// `cRLSign`
    pub crl_sign: bool,

    /// Whether the certificate carried a key usage extension at all.
    pub present: bool,
}

impl KeyUsageFlags {
    /// Returns `true` if the key may be used to sign documents.
    ///
    /// A certificate without a key usage extension is unrestricted.
    pub fn permits_document_signing(&self) -> bool {
        !self.present || self.digital_signature || self.non_repudiation
    }
}

/// The fields of an X.509 certificate that the validation engine persists
/// and reasons about.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CertificateInfo {
    /// Subject distinguished name (RFC 4514 string form).
    pub subject: String,

    /// Issuer distinguished name (RFC 4514 string form).
    pub issuer: String,

    /// Serial number as lowercase hex without leading zero bytes.
    pub serial: String,

    /// DER-encoded `SubjectPublicKeyInfo`.
    pub public_key: Vec<u8>,

    /// Start of the validity window.
    pub not_before: DateTime<Utc>,

    /// End of the validity window.
    pub not_after: DateTime<Utc>,

    /// Key usage flags.
    pub key_usage: KeyUsageFlags,

    /// `true` if basic constraints mark this certificate as a CA.
    pub is_ca: bool,

    /// Maximum number of intermediate CAs that may follow this one.
    pub path_len_constraint: Option<u32>,

    /// `true` if the extended key usage includes `id-kp-timeStamping`.
    pub time_stamping: bool,

    /// `true` if the extended key usage includes `id-kp-OCSPSigning`.
    pub ocsp_signing: bool,

    /// `true` if subject and issuer names are identical.
    pub self_issued: bool,

    /// Base64 SHA-256 of the DER encoding.
    pub fingerprint: String,

    /// HTTP(S) URIs from the CRL distribution points extension.
    pub crl_distribution_points: Vec<String>,

    /// HTTP(S) URIs of OCSP responders from the authority information access
    /// extension.
    pub ocsp_responders: Vec<String>,

    /// HTTP(S) URIs of issuer certificates from the authority information
    /// access extension.
    pub ca_issuers: Vec<String>,
}

impl CertificateInfo {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?;

        let mut key_usage = KeyUsageFlags::default();
        if let Some(ku) = cert
            .key_usage()
            .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?
        {
            key_usage = KeyUsageFlags {
                digital_signature: ku.value.digital_signature(),
                non_repudiation: ku.value.non_repudiation(),
                key_cert_sign: ku.value.key_cert_sign(),
                crl_sign: ku.value.crl_sign(),
                present: true,
            };
        }

        let (is_ca, path_len_constraint) = match cert
            .basic_constraints()
            .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?
        {
            Some(bc) => (bc.value.ca, bc.value.path_len_constraint),
            None => (false, None),
        };

        let (time_stamping, ocsp_signing) = match cert
            .extended_key_usage()
            .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?
        {
            Some(eku) => (eku.value.time_stamping, eku.value.ocsp_signing),
            None => (false, false),
        };

        let mut crl_distribution_points = vec![];
        let mut ocsp_responders = vec![];
        let mut ca_issuers = vec![];

        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::CRLDistributionPoints(points) => {
                    for point in points.iter() {
                        if let Some(DistributionPointName::FullName(names)) =
                            &point.distribution_point
                        {
                            crl_distribution_points.extend(http_uris(names));
                        }
                    }
                }
                ParsedExtension::AuthorityInfoAccess(aia) => {
                    for desc in &aia.accessdescs {
                        let uris = http_uris(std::slice::from_ref(&desc.access_location));
                        if desc.access_method == AD_OCSP_OID {
                            ocsp_responders.extend(uris);
                        } else if desc.access_method == AD_CA_ISSUERS_OID {
                            ca_issuers.extend(uris);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: serial_hex(cert.raw_serial()),
            public_key: cert.public_key().raw.to_vec(),
            not_before: asn1_time_to_utc(&cert.validity().not_before)?,
            not_after: asn1_time_to_utc(&cert.validity().not_after)?,
            key_usage,
            is_ca,
            path_len_constraint,
            time_stamping,
            ocsp_signing,
            self_issued: cert.subject().as_raw() == cert.issuer().as_raw(),
            fingerprint: sha256_fingerprint(der),
            crl_distribution_points,
            ocsp_responders,
            ca_issuers,
        })
    }

    /// Returns `true` if `at` falls inside the certificate's validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Verify that `subject_der` names `issuer_der` as its issuer and carries a
/// signature that verifies against the issuer's public key.
pub fn verify_issued_by(subject_der: &[u8], issuer_der: &[u8]) -> Result<(), CertificateError> {
    let (_, subject) = X509Certificate::from_der(subject_der)
        .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?;

    let (_, issuer) = X509Certificate::from_der(issuer_der)
        .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?;

    if subject.issuer().as_raw() != issuer.subject().as_raw() {
        return Err(CertificateError::IssuerMismatch);
    }

    let sig_alg = &subject.signature_algorithm.algorithm;
    let validator = validator_for_sig_and_hash_algs(sig_alg, None)
        .ok_or_else(|| CertificateError::UnsupportedAlgorithm(sig_alg.to_id_string()))?;

    validator
        .validate(
            &subject.signature_value.data,
            subject.tbs_certificate.as_ref(),
            issuer.public_key().raw,
        )
        .map_err(CertificateError::SignatureInvalid)
}

/// Split a buffer of one or more PEM `CERTIFICATE` blocks into DER
/// certificates.
///
/// Blocks with other labels are skipped.
pub fn certs_from_pem(pem: &[u8]) -> Result<Vec<Vec<u8>>, CertificateError> {
    let mut certs = vec![];

    for maybe_pem in Pem::iter_from_buffer(pem) {
        let pem = maybe_pem.map_err(|e| CertificateError::InvalidPem(e.to_string()))?;
        if pem.label == "CERTIFICATE" {
            certs.push(pem.contents);
        }
    }

    Ok(certs)
}

/// Accept a single certificate in either DER or PEM form and return its DER
/// encoding.
pub fn cert_der_from_bytes(bytes: &[u8]) -> Result<Vec<u8>, CertificateError> {
    if X509Certificate::from_der(bytes).is_ok() {
        return Ok(bytes.to_vec());
    }

    certs_from_pem(bytes)?
        .into_iter()
        .next()
        .ok_or_else(|| CertificateError::InvalidPem("no certificate found".to_string()))
}

pub(crate) fn asn1_time_to_utc(time: &ASN1Time) -> Result<DateTime<Utc>, CertificateError> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| CertificateError::InvalidCertificate("time out of range".to_string()))
}

/// Canonical lowercase hex for a DER integer's content octets.
pub(crate) fn serial_hex(raw: &[u8]) -> String {
    let first_non_zero = raw
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(raw.len().saturating_sub(1));

    hex::encode(&raw[first_non_zero..])
}

fn http_uris(names: &[GeneralName]) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| match name {
            GeneralName::URI(uri) if uri.starts_with("http://") || uri.starts_with("https://") => {
                Some(uri.to_string())
            }
            _ => None,
        })
        .collect()
}

/// Describes errors that can occur when parsing or checking a certificate.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// The certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The PEM input could not be parsed.
    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    /// The certificate's issuer name does not match the candidate issuer's
    /// subject name.
    #[error("issuer name does not match")]
    IssuerMismatch,

    /// The certificate is signed with an algorithm that is not supported.
    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The certificate signature does not verify against the issuer key.
    #[error("certificate signature invalid: {0}")]
    SignatureInvalid(RawSignatureValidationError),
}
