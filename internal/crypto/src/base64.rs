// Copyright 2022 Adobe. All rights reserved.
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

//! Base64 and PEM convenience functions.

use ::base64::{engine::general_purpose, DecodeError, Engine as _};

const PEM_LINE_LEN: usize = 64;

/// Encode a byte slice to a padded Base64 string.
pub fn encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

/// Decode a padded Base64 string.
pub fn decode(data: &str) -> Result<Vec<u8>, DecodeError> {
    general_purpose::STANDARD.decode(data.trim())
}

/// Wrap DER bytes in a PEM block with the given label (e.g. `CERTIFICATE`).
pub fn encode_pem(label: &str, der: &[u8]) -> String {
    let body = encode(der);

    let mut pem = format!("-----BEGIN {label}-----\n");
    for line in body.as_bytes().chunks(PEM_LINE_LEN) {
        // Base64 output is ASCII.
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}
