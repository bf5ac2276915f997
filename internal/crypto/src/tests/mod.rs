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

#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

mod base64;
mod raw_signature;
mod x509;

/// Test PKI: a root, an intermediate that issues the leaves, a TSA and a
/// deliberately over-long chain. All certificates are valid from
/// 2026-10-18 for 100 years.
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::x509::certs_from_pem;

    pub(crate) const ROOT: &[u8] = include_bytes!("fixtures/pki/root.pem");
    pub(crate) const INTERMEDIATE: &[u8] = include_bytes!("fixtures/pki/int.pem");
    pub(crate) const LEAF_GOOD: &[u8] = include_bytes!("fixtures/pki/leaf_good.pem");
    pub(crate) const LEAF_REVOKED: &[u8] = include_bytes!("fixtures/pki/leaf_revoked.pem");
    pub(crate) const LEAF_HOLD: &[u8] = include_bytes!("fixtures/pki/leaf_hold.pem");
    pub(crate) const LEAF_RSA: &[u8] = include_bytes!("fixtures/pki/leaf_rsa.pem");
    pub(crate) const TSA: &[u8] = include_bytes!("fixtures/pki/tsa.pem");
    pub(crate) const SELF_SIGNED: &[u8] = include_bytes!("fixtures/pki/self_signed.pem");
    pub(crate) const DEEP_ANCHOR: &[u8] = include_bytes!("fixtures/pki/deep0.pem");
    pub(crate) const DEEP_LEAF: &[u8] = include_bytes!("fixtures/pki/deep_leaf.pem");
    pub(crate) const DEEP_INTERMEDIATES: &[u8] =
        include_bytes!("fixtures/pki/deep_intermediates.pem");

    pub(crate) const CRL: &[u8] = include_bytes!("fixtures/pki/intermediate.crl");

    pub(crate) const OCSP_GOOD: &[u8] = include_bytes!("fixtures/pki/leaf_good.ocsp.der");
    pub(crate) const OCSP_REVOKED: &[u8] = include_bytes!("fixtures/pki/leaf_revoked.ocsp.der");
    pub(crate) const OCSP_HOLD: &[u8] = include_bytes!("fixtures/pki/leaf_hold.ocsp.der");
    pub(crate) const OCSP_GOOD_REQUEST: &[u8] =
        include_bytes!("fixtures/pki/leaf_good.ocsp_req.der");

    /// The bytes covered by `LEAF_GOOD_SIG` and `LEAF_RSA_SIG`.
    pub(crate) const SIGNED_DATA: &[u8] = include_bytes!("fixtures/pki/signed_data.bin");
    pub(crate) const LEAF_GOOD_SIG: &[u8] = include_bytes!("fixtures/pki/leaf_good.sig");
    pub(crate) const LEAF_RSA_SIG: &[u8] = include_bytes!("fixtures/pki/leaf_rsa.sig");
    pub(crate) const ED25519_SIG: &[u8] = include_bytes!("fixtures/pki/ed25519.sig");
    pub(crate) const ED25519_PUB_KEY: &[u8] = include_bytes!("fixtures/pki/ed25519.pub_key");

    /// Full `TimeStampResp` and bare token over `LEAF_GOOD_SIG`.
    pub(crate) const TS_RESPONSE: &[u8] = include_bytes!("fixtures/pki/ts.tsr");
    pub(crate) const TS_TOKEN: &[u8] = include_bytes!("fixtures/pki/ts_token.der");
    pub(crate) const TS_NONCE: u64 = 0xF39D_798F_73BF_D455;

    pub(crate) fn der(pem: &[u8]) -> Vec<u8> {
        certs_from_pem(pem).unwrap().remove(0)
    }

    pub(crate) fn ders(pem: &[u8]) -> Vec<Vec<u8>> {
        certs_from_pem(pem).unwrap()
    }

    /// A validation time at which the whole test PKI is current.
    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
    }
}
