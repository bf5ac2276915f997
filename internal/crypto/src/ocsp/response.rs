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

use asn1_rs::Any as DerAny;
use chrono::{DateTime, Duration, Utc};
use rasn_ocsp::{BasicOcspResponse, CertStatus, OcspResponseStatus, ResponderId};
use rasn_pkix::Certificate;
use serde::{Deserialize, Serialize};
use x509_parser::{certificate::X509Certificate, prelude::FromDer};

use super::OcspError;
use crate::{
    crl::RevocationReason,
    hash::{sha1, DigestAlgorithm},
    raw_signature::validator_for_dotted_oids,
    x509::{verify_issued_by, CertificateInfo},
};

const ID_PKIX_OCSP_BASIC: &str = "1.3.6.1.5.5.7.48.1.1";

// Tolerance for responders whose clock runs slightly ahead.
const ALLOWED_CLOCK_SKEW_MINUTES: i64 = 5;

/// Certificate status reported by an OCSP responder.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum OcspCertStatus {
    /// The certificate is not revoked.
    Good,

    /// The certificate is permanently revoked.
    Revoked {
        /// `revocationTime`
        revoked_at: DateTime<Utc>,

        /// `revocationReason`, when present.
        reason: Option<RevocationReason>,
    },

    /// The certificate is revoked with reason `certificateHold`.
    Suspended {
        /// `revocationTime`
        since: DateTime<Utc>,
    },

    /// The responder does not know the certificate.
    Unknown,
}

/// A verified OCSP response for one certificate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspResponse {
    /// Status of the requested certificate.
    pub cert_status: OcspCertStatus,

    /// `producedAt`
    pub produced_at: DateTime<Utc>,

    /// `thisUpdate` of the matching single response.
    pub this_update: DateTime<Utc>,

    /// `nextUpdate` of the matching single response.
    pub next_update: Option<DateTime<Utc>>,

    /// DER of the certificate whose key signed the response (the issuer or a
    /// delegated responder).
    pub responder_cert: Vec<u8>,
}

impl OcspResponse {
    /// Decode an OCSP response and check it for `subject_der` issued by
    /// `issuer_der` as of `at`.
    ///
    /// The response must be successful, signed by the issuer or by a
    /// delegated OCSP signer the issuer certified, contain a single response
    /// matching the certificate, and be current at `at`.
    pub fn from_der_checked(
        der: &[u8],
        subject_der: &[u8],
        issuer_der: &[u8],
        at: DateTime<Utc>,
    ) -> Result<Self, OcspError> {
        let ocsp_response = rasn::der::decode::<rasn_ocsp::OcspResponse>(der)
            .map_err(|e| OcspError::InvalidResponse(e.to_string()))?;

        if ocsp_response.status != OcspResponseStatus::Successful {
            return Err(OcspError::Unsuccessful(format!(
                "{:?}",
                ocsp_response.status
            )));
        }

        let response_bytes = ocsp_response
            .bytes
            .ok_or_else(|| OcspError::InvalidResponse("missing response bytes".to_string()))?;

        if response_bytes.r#type.to_string() != ID_PKIX_OCSP_BASIC {
            return Err(OcspError::InvalidResponse(format!(
                "unsupported response type {}",
                response_bytes.r#type
            )));
        }

        let basic_response = rasn::der::decode::<BasicOcspResponse>(&response_bytes.response)
            .map_err(|e| OcspError::InvalidResponse(e.to_string()))?;

        let (_, issuer) = X509Certificate::from_der(issuer_der)
            .map_err(|e| OcspError::InvalidCertificate(e.to_string()))?;

        let response_data = &basic_response.tbs_response_data;
        let responder_cert = find_responder(
            &response_data.responder_id,
            basic_response.certs.as_deref().unwrap_or_default(),
            issuer_der,
            &issuer,
            at,
        )?;

        let (_, responder) = X509Certificate::from_der(&responder_cert)
            .map_err(|e| OcspError::InvalidCertificate(e.to_string()))?;

        let sig_alg = basic_response.signature_algorithm.algorithm.to_string();
        let validator = validator_for_dotted_oids(&sig_alg, None)
            .ok_or(OcspError::UnsupportedAlgorithm(sig_alg))?;

        validator
            .validate(
                basic_response.signature.as_raw_slice(),
                tbs_response_data_raw(&response_bytes.response)?,
                responder.public_key().raw,
            )
            .map_err(OcspError::SignatureInvalid)?;

        let subject: Certificate = rasn::der::decode(subject_der)
            .map_err(|e| OcspError::InvalidCertificate(e.to_string()))?;
        let issuer_name_raw = issuer.subject().as_raw();
        let issuer_key_raw = issuer.public_key().subject_public_key.data.as_ref();

        let single_response = response_data
            .responses
            .iter()
            .find(|single| {
                let cert_id = &single.cert_id;
                let Some(alg) =
                    DigestAlgorithm::from_oid(&cert_id.hash_algorithm.algorithm.to_string())
                else {
                    return false;
                };

                cert_id.serial_number == subject.tbs_certificate.serial_number
                    && cert_id.issuer_name_hash.as_ref() == alg.digest(issuer_name_raw).as_slice()
                    && cert_id.issuer_key_hash.as_ref() == alg.digest(issuer_key_raw).as_slice()
            })
            .ok_or(OcspError::CertificateNotCovered)?;

        let this_update = single_response.this_update.with_timezone(&Utc);
        let next_update = single_response
            .next_update
            .map(|next| next.with_timezone(&Utc));

        if this_update > at + Duration::minutes(ALLOWED_CLOCK_SKEW_MINUTES) {
            return Err(OcspError::NotYetValid);
        }

        if next_update.is_some_and(|next| next < at) {
            return Err(OcspError::Stale);
        }

        let cert_status = match &single_response.cert_status {
            CertStatus::Good => OcspCertStatus::Good,
            CertStatus::Revoked(revoked_info) => {
                let revoked_at = revoked_info.revocation_time.with_timezone(&Utc);
                match revoked_info.revocation_reason.map(RevocationReason::from) {
                    Some(RevocationReason::CertificateHold) => {
                        OcspCertStatus::Suspended { since: revoked_at }
                    }
                    Some(RevocationReason::RemoveFromCrl) => OcspCertStatus::Good,
                    reason => OcspCertStatus::Revoked { revoked_at, reason },
                }
            }
            CertStatus::Unknown(_) => OcspCertStatus::Unknown,
        };

        Ok(Self {
            cert_status,
            produced_at: response_data.produced_at.with_timezone(&Utc),
            this_update,
            next_update,
            responder_cert,
        })
    }
}

fn responder_matches(responder_id: &ResponderId, cert: &X509Certificate) -> bool {
    match responder_id {
        ResponderId::ByName(name) => rasn::der::encode(name)
            .map(|raw| raw == cert.subject().as_raw())
            .unwrap_or(false),
        ResponderId::ByKey(key_hash) => {
            key_hash.as_ref() == sha1(&cert.public_key().subject_public_key.data).as_slice()
        }
    }
}

// The issuer may sign its own responses; otherwise a certificate from the
// response must be issued by it and carry id-kp-OCSPSigning.
fn find_responder(
    responder_id: &ResponderId,
    certs: &[Certificate],
    issuer_der: &[u8],
    issuer: &X509Certificate,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, OcspError> {
    if responder_matches(responder_id, issuer) {
        return Ok(issuer_der.to_vec());
    }

    for cert in certs {
        let Ok(der) = rasn::der::encode(cert) else {
            continue;
        };

        let Ok((_, candidate)) = X509Certificate::from_der(&der) else {
            continue;
        };

        if !responder_matches(responder_id, &candidate) {
            continue;
        }

        let Ok(info) = CertificateInfo::from_der(&der) else {
            continue;
        };

        if info.ocsp_signing && info.is_valid_at(at) && verify_issued_by(&der, issuer_der).is_ok()
        {
            return Ok(der);
        }
    }

    Err(OcspError::UnauthorizedResponder)
}

// Signatures cover the DER of `tbsResponseData` exactly as received, so it is
// sliced from the input rather than re-encoded.
fn tbs_response_data_raw(basic_response_der: &[u8]) -> Result<&[u8], OcspError> {
    let (_, outer) = DerAny::from_der(basic_response_der)
        .map_err(|e| OcspError::InvalidResponse(e.to_string()))?;

    let contents = outer.data;
    let (rest, _) =
        DerAny::from_der(contents).map_err(|e| OcspError::InvalidResponse(e.to_string()))?;

    Ok(&contents[..contents.len() - rest.len()])
}
