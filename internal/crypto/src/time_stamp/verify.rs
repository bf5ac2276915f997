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
use rasn::prelude::*;
use rasn_cms::{CertificateChoices, SignedData, SignerIdentifier, SignerInfo};
use rasn_pkix::Certificate;
use x509_parser::{certificate::X509Certificate, prelude::FromDer};

use crate::{
    hash::DigestAlgorithm,
    raw_signature::validator_for_dotted_oids,
    time_stamp::{
        response::{signed_data_from_time_stamp, tst_info},
        TimeStampError,
    },
    x509::CertificateInfo,
};

const SUBJECT_KEY_IDENTIFIER_OID: &str = "2.5.29.14";

/// The verified content of a time stamp token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampInfo {
    /// `genTime`: when the TSA attests the message existed.
    pub gen_time: DateTime<Utc>,

    /// `serialNumber` of the token, in decimal.
    pub serial_number: String,

    /// TSA policy under which the token was issued (dotted OID).
    pub policy: String,

    /// Nonce echoed from the request, in decimal.
    pub nonce: Option<String>,

    /// DER of the TSA certificate that signed the token.
    pub signer_cert: Vec<u8>,

    /// DER of every certificate carried in the token, for chain building.
    pub certs: Vec<Vec<u8>>,
}

/// Decode a time stamp token (or a full `TimeStampResp`) and verify it
/// against `message`.
///
/// The CMS signature must verify with the key of a certificate carried in
/// the token, that certificate must be valid at `genTime` and carry the
/// `id-kp-timeStamping` extended key usage, and the message imprint must
/// match `message`. Trust in the TSA certificate itself is left to the
/// caller.
pub fn verify_time_stamp(ts: &[u8], message: &[u8]) -> Result<TimeStampInfo, TimeStampError> {
    let signed_data = signed_data_from_time_stamp(ts)?;
    let tst = tst_info(&signed_data)?;

    let certs: Vec<&Certificate> = signed_data
        .certificates
        .as_ref()
        .map(|set| set.to_vec())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(c) => Some(c.as_ref()),
            _ => None,
        })
        .collect();

    if certs.is_empty() {
        return Err(TimeStampError::DecodeError(
            "time stamp contains no certificates".to_string(),
        ));
    }

    let gen_time = tst.gen_time.with_timezone(&Utc);

    let mut last_err = TimeStampError::DecodeError("time stamp has no signer".to_string());

    // Look for any valid signer.
    for signer_info in signed_data.signer_infos.to_vec() {
        let Some(cert) = certs
            .iter()
            .find(|c| signer_matches(&signer_info.sid, c))
            .copied()
        else {
            continue;
        };

        let signer_cert =
            rasn::der::encode(cert).map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

        match check_signer(&signed_data, signer_info, &signer_cert, gen_time) {
            Ok(()) => {}
            Err(err) => {
                last_err = err;
                continue;
            }
        }

        // Make sure the time stamp is valid for the specified data.
        let imprint = &tst.message_imprint;
        let Some(digest_algorithm) =
            DigestAlgorithm::from_oid(&imprint.hash_algorithm.algorithm.to_string())
        else {
            last_err = TimeStampError::UnsupportedAlgorithm;
            continue;
        };

        if digest_algorithm.digest(message).as_slice() != imprint.hashed_message.as_ref() {
            last_err = TimeStampError::InvalidData;
            continue;
        }

        let all_certs = certs
            .iter()
            .map(|c| rasn::der::encode(*c))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

        return Ok(TimeStampInfo {
            gen_time,
            serial_number: tst.serial_number.to_string(),
            policy: tst.policy.to_string(),
            nonce: tst.nonce.as_ref().map(|n| n.to_string()),
            signer_cert,
            certs: all_certs,
        });
    }

    Err(last_err)
}

fn signer_matches(sid: &SignerIdentifier, cert: &Certificate) -> bool {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(sn) => {
            sn.issuer == cert.tbs_certificate.issuer
                && sn.serial_number == cert.tbs_certificate.serial_number
        }

        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            cert.tbs_certificate.extensions.as_ref().is_some_and(|exts| {
                exts.iter()
                    .filter(|ext| ext.extn_id.to_string() == SUBJECT_KEY_IDENTIFIER_OID)
                    .any(|ext| {
                        rasn::der::decode::<OctetString>(&ext.extn_value)
                            .map(|key_id| key_id == *ski)
                            .unwrap_or(false)
                    })
            })
        }
    }
}

fn check_signer(
    signed_data: &SignedData,
    signer_info: &SignerInfo,
    signer_cert: &[u8],
    gen_time: DateTime<Utc>,
) -> Result<(), TimeStampError> {
    let info = CertificateInfo::from_der(signer_cert)
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

    if !info.time_stamping {
        return Err(TimeStampError::InvalidSigner(info.subject));
    }

    // The TSA certificate must have been valid when the token was issued.
    if !info.is_valid_at(gen_time) {
        return Err(TimeStampError::ExpiredCertificate);
    }

    let content = signed_data
        .encap_content_info
        .content
        .as_ref()
        .ok_or_else(|| TimeStampError::DecodeError("TSTInfo is missing".to_string()))?;

    let digest_oid = signer_info.digest_algorithm.algorithm.to_string();
    let digest_algorithm =
        DigestAlgorithm::from_oid(&digest_oid).ok_or(TimeStampError::UnsupportedAlgorithm)?;

    let tbs = match &signer_info.signed_attrs {
        Some(attributes) => {
            // The mandatory message digest attribute must match the content.
            let message_digest = attributes
                .to_vec()
                .into_iter()
                .find(|attr| attr.r#type == Oid::ISO_MEMBER_BODY_US_RSADSI_PKCS9_MESSAGE_DIGEST)
                .ok_or(TimeStampError::InvalidData)?;

            let values = message_digest.values.to_vec();
            let [value] = values.as_slice() else {
                return Err(TimeStampError::DecodeError(format!(
                    "message digest attribute has {n} values, should have one",
                    n = values.len()
                )));
            };

            let signed_message_digest = rasn::der::decode::<OctetString>(value.as_bytes())
                .map_err(|_| {
                    TimeStampError::DecodeError("unable to decode message digest".to_string())
                })?;

            if signed_message_digest.as_ref() != digest_algorithm.digest(content).as_slice() {
                return Err(TimeStampError::InvalidData);
            }

            // The signature covers the DER SET OF the signed attributes.
            rasn::der::encode(attributes)
                .map_err(|e| TimeStampError::InternalError(e.to_string()))?
        }
        None => content.to_vec(),
    };

    let sig_alg = signer_info.signature_algorithm.algorithm.to_string();
    let validator = validator_for_dotted_oids(&sig_alg, Some(&digest_oid))
        .ok_or(TimeStampError::UnsupportedAlgorithm)?;

    let (_, cert) = X509Certificate::from_der(signer_cert)
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

    validator
        .validate(signer_info.signature.as_ref(), &tbs, cert.public_key().raw)
        .map_err(|_| TimeStampError::InvalidData)
}
