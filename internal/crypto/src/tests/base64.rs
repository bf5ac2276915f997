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

use crate::base64;

#[test]
fn encode() {
    assert_eq!(base64::encode(b"Hello, world"), "SGVsbG8sIHdvcmxk");
}

#[test]
fn decode() {
    assert_eq!(
        base64::decode("SGVsbG8sIHdvcmxk"),
        Ok(b"Hello, world".to_vec())
    );
}

#[test]
fn decode_trims_whitespace() {
    assert_eq!(
        base64::decode("  SGVsbG8sIHdvcmxk\n"),
        Ok(b"Hello, world".to_vec())
    );
}

#[test]
fn encode_pem_wraps_lines() {
    let der = vec![0xAB; 100];
    let pem = base64::encode_pem("CERTIFICATE", &der);

    let lines: Vec<&str> = pem.lines().collect();
    assert_eq!(lines.first(), Some(&"-----BEGIN CERTIFICATE-----"));
    assert_eq!(lines.last(), Some(&"-----END CERTIFICATE-----"));
    assert!(lines[1..lines.len() - 1].iter().all(|l| l.len() <= 64));

    let body: String = lines[1..lines.len() - 1].concat();
    assert_eq!(base64::decode(&body).unwrap(), der);
}
