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

use rand::{thread_rng, Rng};
use rasn::prelude::*;
use rasn_pkix::AlgorithmIdentifier;

use crate::{
    asn1::rfc3161::{MessageImprint, TimeStampReq},
    hash::DigestAlgorithm,
    time_stamp::TimeStampError,
};

/// MIME type of a DER `TimeStampReq` body.
pub const TIME_STAMP_QUERY_CONTENT_TYPE: &str = "application/timestamp-query";

/// MIME type of a DER `TimeStampResp` body.
pub const TIME_STAMP_REPLY_CONTENT_TYPE: &str = "application/timestamp-reply";

/// An encoded time stamp request and the nonce it carries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampRequest {
    /// DER-encoded `TimeStampReq`.
    pub der: Vec<u8>,

    /// Nonce the service must echo in its `TSTInfo`.
    pub nonce: u64,
}

/// Build a request for a time stamp over `message` (SHA-256 imprint, signer
/// certificate requested, random nonce).
pub fn time_stamp_request(message: &[u8]) -> Result<TimeStampRequest, TimeStampError> {
    let nonce: u64 = thread_rng().gen();
    time_stamp_request_with_nonce(message, nonce)
}

/// Same as [`time_stamp_request`] with a caller-chosen nonce.
pub fn time_stamp_request_with_nonce(
    message: &[u8],
    nonce: u64,
) -> Result<TimeStampRequest, TimeStampError> {
    let digest_algorithm = DigestAlgorithm::Sha256;

    let algorithm = digest_algorithm
        .oid()
        .split('.')
        .map(str::parse::<u32>)
        .collect::<Result<Vec<u32>, _>>()
        .ok()
        .and_then(ObjectIdentifier::new)
        .ok_or_else(|| TimeStampError::InternalError("invalid digest OID".to_string()))?;

    let request = TimeStampReq {
        version: Integer::from(1u8),
        message_imprint: MessageImprint {
            hash_algorithm: AlgorithmIdentifier {
                algorithm,
                parameters: None,
            },
            hashed_message: OctetString::from(digest_algorithm.digest(message)),
        },
        req_policy: None,
        nonce: Some(Integer::from(nonce)),
        cert_req: true,
        extensions: None,
    };

    let der =
        rasn::der::encode(&request).map_err(|e| TimeStampError::InternalError(e.to_string()))?;

    Ok(TimeStampRequest { der, nonce })
}
