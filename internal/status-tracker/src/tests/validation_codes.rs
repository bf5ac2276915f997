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

use crate::{validation_codes::*, LogKind};

#[test]
fn unavailable_checks_are_not_failures() {
    for code in [CRL_UNAVAILABLE, OCSP_UNAVAILABLE, CHAIN_UNAVAILABLE, TIMESTAMP_UNAVAILABLE] {
        assert_eq!(log_kind(code), LogKind::Informational, "{code}");
    }
}

#[test]
fn revocation_codes_are_failures() {
    for code in [CRL_REVOKED, OCSP_REVOKED, OCSP_SUSPENDED, SIGNING_CREDENTIAL_REVOKED] {
        assert_eq!(log_kind(code), LogKind::Failure, "{code}");
        assert!(!is_success(code));
    }
}

#[test]
fn success_codes() {
    assert!(is_success(CHAIN_TRUSTED));
    assert!(is_success(SIGNATURE_VALIDATED));
    assert!(is_success(TIMESTAMP_VALIDATED));
}
