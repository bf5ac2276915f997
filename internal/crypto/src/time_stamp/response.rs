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
use rasn_cms::{ContentInfo, SignedData, CONTENT_SIGNED_DATA};

use crate::{
    asn1::rfc3161::{TimeStampResp, TstInfo, TST_INFO_OID},
    time_stamp::TimeStampError,
};

/// Check a DER `TimeStampResp` from a time stamp service and return the DER
/// time stamp token it carries.
///
/// When `expected_nonce` is given, the token's `TSTInfo` must echo it.
pub fn token_from_response(
    response_der: &[u8],
    expected_nonce: Option<u64>,
) -> Result<Vec<u8>, TimeStampError> {
    let response = rasn::der::decode::<TimeStampResp>(response_der)
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

    // granted (0) or grantedWithMods (1)
    let status = &response.status.status;
    if *status != Integer::from(0u8) && *status != Integer::from(1u8) {
        let text = response
            .status
            .status_string
            .as_ref()
            .map(|strings| strings.join("; "))
            .unwrap_or_default();

        return Err(TimeStampError::Rejected(format!("status {status}: {text}")));
    }

    let token = response
        .time_stamp_token
        .ok_or_else(|| TimeStampError::DecodeError("response has no token".to_string()))?;

    if let Some(expected) = expected_nonce {
        let tst_info = tst_info(&signed_data(&token)?)?;
        if tst_info.nonce != Some(Integer::from(expected)) {
            return Err(TimeStampError::NonceMismatch);
        }
    }

    rasn::der::encode(&token).map_err(|e| TimeStampError::InternalError(e.to_string()))
}

/// Accepts either a full `TimeStampResp` or a bare token (`ContentInfo`).
pub(super) fn signed_data_from_time_stamp(ts: &[u8]) -> Result<SignedData, TimeStampError> {
    let token = match rasn::der::decode::<TimeStampResp>(ts) {
        Ok(response) => response
            .time_stamp_token
            .ok_or_else(|| TimeStampError::DecodeError("response has no token".to_string()))?,
        Err(_) => rasn::der::decode::<ContentInfo>(ts)
            .map_err(|e| TimeStampError::DecodeError(e.to_string()))?,
    };

    signed_data(&token)
}

fn signed_data(token: &ContentInfo) -> Result<SignedData, TimeStampError> {
    if token.content_type != CONTENT_SIGNED_DATA {
        return Err(TimeStampError::DecodeError(
            "time stamp has invalid OID".to_string(),
        ));
    }

    rasn::der::decode::<SignedData>(token.content.as_bytes())
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))
}

pub(super) fn tst_info(signed_data: &SignedData) -> Result<TstInfo, TimeStampError> {
    let encap = &signed_data.encap_content_info;
    if encap.content_type.to_string() != TST_INFO_OID {
        return Err(TimeStampError::DecodeError(
            "signed data does not contain TSTInfo".to_string(),
        ));
    }

    let content = encap
        .content
        .as_ref()
        .ok_or_else(|| TimeStampError::DecodeError("TSTInfo is missing".to_string()))?;

    rasn::der::decode::<TstInfo>(content).map_err(|e| TimeStampError::DecodeError(e.to_string()))
}
