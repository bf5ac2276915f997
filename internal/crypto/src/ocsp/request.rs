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

use rasn::prelude::*;
use rasn_ocsp::{CertId, OcspRequest, Request, TbsRequest};
use rasn_pkix::{AlgorithmIdentifier, Certificate};

use super::OcspError;
use crate::hash::sha1;

/// MIME type of a DER OCSP request body.
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// MIME type of a DER OCSP response body.
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// Build a DER-encoded, unsigned OCSP request for `subject_der` issued by
/// `issuer_der`. The `CertID` uses SHA-1, which every responder supports.
pub fn build_request(subject_der: &[u8], issuer_der: &[u8]) -> Result<Vec<u8>, OcspError> {
    let req_cert = cert_id(subject_der, issuer_der)?;

    let ocsp_request = OcspRequest {
        tbs_request: TbsRequest {
            version: rasn_ocsp::Version::from(0u8),
            requestor_name: None,
            request_list: vec![Request {
                req_cert,
                single_request_extensions: None,
            }],
            request_extensions: None,
        },
        optional_signature: None,
    };

    rasn::der::encode(&ocsp_request).map_err(|e| OcspError::Encoding(e.to_string()))
}

pub(super) fn cert_id(subject_der: &[u8], issuer_der: &[u8]) -> Result<CertId, OcspError> {
    let subject: Certificate = rasn::der::decode(subject_der)
        .map_err(|e| OcspError::InvalidCertificate(e.to_string()))?;
    let issuer: Certificate = rasn::der::decode(issuer_der)
        .map_err(|e| OcspError::InvalidCertificate(e.to_string()))?;

    let issuer_name_raw = rasn::der::encode(&issuer.tbs_certificate.subject)
        .map_err(|e| OcspError::Encoding(e.to_string()))?;

    let issuer_key_raw = issuer
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_raw_slice();

    // Many OCSP responders expect NULL parameters rather than none.
    let sha1_ai = AlgorithmIdentifier {
        algorithm: ObjectIdentifier::from(Oid::ISO_IDENTIFIED_ORGANISATION_OIW_SECSIG_ALGORITHM_SHA1),
        parameters: Some(Any::new(
            rasn::der::encode(&()).map_err(|e| OcspError::Encoding(e.to_string()))?,
        )),
    };

    Ok(CertId {
        hash_algorithm: sha1_ai,
        issuer_name_hash: OctetString::from(sha1(&issuer_name_raw)),
        issuer_key_hash: OctetString::from(sha1(issuer_key_raw)),
        serial_number: subject.tbs_certificate.serial_number,
    })
}
