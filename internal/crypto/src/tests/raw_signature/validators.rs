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

use std::str::FromStr;

use x509_parser::oid_registry::Oid;

use crate::{
    raw_signature::{
        validator_for_sig_and_hash_algs, validator_for_signing_alg, RawSignatureValidationError,
        SigningAlg,
    },
    tests::fixtures::{self, *},
    x509::CertificateInfo,
};

fn public_key(pem: &[u8]) -> Vec<u8> {
    CertificateInfo::from_der(&fixtures::der(pem))
        .unwrap()
        .public_key
}

#[test]
fn es256() {
    let validator = validator_for_signing_alg(SigningAlg::Es256).unwrap();

    validator
        .validate(LEAF_GOOD_SIG, SIGNED_DATA, &public_key(LEAF_GOOD))
        .unwrap();
}

#[test]
fn es256_bad_signature() {
    let mut signature = LEAF_GOOD_SIG.to_vec();
    let last = signature.len() - 1;
    signature[last] ^= 0x01;

    let validator = validator_for_signing_alg(SigningAlg::Es256).unwrap();

    assert_eq!(
        validator
            .validate(&signature, SIGNED_DATA, &public_key(LEAF_GOOD))
            .unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn es256_bad_data() {
    let mut data = SIGNED_DATA.to_vec();
    data[10] = b'X';

    let validator = validator_for_signing_alg(SigningAlg::Es256).unwrap();

    assert_eq!(
        validator
            .validate(LEAF_GOOD_SIG, &data, &public_key(LEAF_GOOD))
            .unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn es256_wrong_key() {
    let validator = validator_for_signing_alg(SigningAlg::Es256).unwrap();

    assert_eq!(
        validator
            .validate(LEAF_GOOD_SIG, SIGNED_DATA, &public_key(LEAF_REVOKED))
            .unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn es256_with_rsa_key() {
    let validator = validator_for_signing_alg(SigningAlg::Es256).unwrap();

    assert_eq!(
        validator
            .validate(LEAF_GOOD_SIG, SIGNED_DATA, &public_key(LEAF_RSA))
            .unwrap_err(),
        RawSignatureValidationError::InvalidPublicKey
    );
}

#[test]
fn rs256() {
    let validator = validator_for_signing_alg(SigningAlg::Rs256).unwrap();

    validator
        .validate(LEAF_RSA_SIG, SIGNED_DATA, &public_key(LEAF_RSA))
        .unwrap();
}

#[test]
fn rs256_bad_data() {
    let validator = validator_for_signing_alg(SigningAlg::Rs256).unwrap();

    assert_eq!(
        validator
            .validate(LEAF_RSA_SIG, b"something else", &public_key(LEAF_RSA))
            .unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn pkcs1_signature_is_not_pss() {
    let validator = validator_for_signing_alg(SigningAlg::Ps256).unwrap();

    assert_eq!(
        validator
            .validate(LEAF_RSA_SIG, SIGNED_DATA, &public_key(LEAF_RSA))
            .unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn rs256_with_ec_key() {
    let validator = validator_for_signing_alg(SigningAlg::Rs256).unwrap();

    assert_eq!(
        validator
            .validate(LEAF_RSA_SIG, SIGNED_DATA, &public_key(LEAF_GOOD))
            .unwrap_err(),
        RawSignatureValidationError::InvalidPublicKey
    );
}

#[test]
fn ed25519() {
    let validator = validator_for_signing_alg(SigningAlg::Ed25519).unwrap();

    validator
        .validate(ED25519_SIG, SIGNED_DATA, ED25519_PUB_KEY)
        .unwrap();
}

#[test]
fn ed25519_bad_data() {
    let validator = validator_for_signing_alg(SigningAlg::Ed25519).unwrap();

    assert_eq!(
        validator
            .validate(ED25519_SIG, b"tampered", ED25519_PUB_KEY)
            .unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn ed25519_truncated_signature() {
    let validator = validator_for_signing_alg(SigningAlg::Ed25519).unwrap();

    assert_eq!(
        validator
            .validate(&ED25519_SIG[..32], SIGNED_DATA, ED25519_PUB_KEY)
            .unwrap_err(),
        RawSignatureValidationError::InvalidSignature
    );
}

#[test]
fn validator_by_oid() {
    let ecdsa_with_sha256 = Oid::from_str("1.2.840.10045.4.3.2").unwrap();
    let validator = validator_for_sig_and_hash_algs(&ecdsa_with_sha256, None).unwrap();
    validator
        .validate(LEAF_GOOD_SIG, SIGNED_DATA, &public_key(LEAF_GOOD))
        .unwrap();

    let sha256_with_rsa = Oid::from_str("1.2.840.113549.1.1.11").unwrap();
    let validator = validator_for_sig_and_hash_algs(&sha256_with_rsa, None).unwrap();
    validator
        .validate(LEAF_RSA_SIG, SIGNED_DATA, &public_key(LEAF_RSA))
        .unwrap();
}

#[test]
fn key_type_oid_needs_hash() {
    let rsa_encryption = Oid::from_str("1.2.840.113549.1.1.1").unwrap();
    let sha256 = Oid::from_str("2.16.840.1.101.3.4.2.1").unwrap();

    assert!(validator_for_sig_and_hash_algs(&rsa_encryption, None).is_none());

    let validator = validator_for_sig_and_hash_algs(&rsa_encryption, Some(&sha256)).unwrap();
    validator
        .validate(LEAF_RSA_SIG, SIGNED_DATA, &public_key(LEAF_RSA))
        .unwrap();
}

#[test]
fn unknown_oid() {
    let md5_with_rsa = Oid::from_str("1.2.840.113549.1.1.4").unwrap();
    assert!(validator_for_sig_and_hash_algs(&md5_with_rsa, None).is_none());
}
