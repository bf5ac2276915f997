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

use chrono::{TimeZone, Utc};

use crate::{
    tests::fixtures::{self, *},
    x509::{cert_der_from_bytes, certs_from_pem, verify_issued_by, CertificateError, CertificateInfo},
};

#[test]
fn leaf_fields() {
    let info = CertificateInfo::from_der(&fixtures::der(LEAF_GOOD)).unwrap();

    assert!(info.subject.contains("CN=leaf_good"));
    assert!(info.issuer.contains("CN=Sigtrust Test Intermediate"));
    assert_eq!(info.serial, "2001");
    assert!(!info.is_ca);
    assert!(!info.self_issued);
    assert!(!info.time_stamping);

    assert!(info.key_usage.present);
    assert!(info.key_usage.digital_signature);
    assert!(info.key_usage.non_repudiation);
    assert!(!info.key_usage.key_cert_sign);
    assert!(info.key_usage.permits_document_signing());

    assert_eq!(
        info.crl_distribution_points,
        vec!["http://pki.sigtrust.test/crl/intermediate.crl".to_string()]
    );
    assert_eq!(
        info.ocsp_responders,
        vec!["http://ocsp.sigtrust.test/".to_string()]
    );
    assert_eq!(
        info.ca_issuers,
        vec!["http://pki.sigtrust.test/certs/intermediate.der".to_string()]
    );
}

#[test]
fn intermediate_fields() {
    let info = CertificateInfo::from_der(&fixtures::der(INTERMEDIATE)).unwrap();

    assert!(info.is_ca);
    assert_eq!(info.serial, "1001");
    assert!(info.key_usage.key_cert_sign);
    assert!(info.key_usage.crl_sign);
    assert!(info.crl_distribution_points.is_empty());
    assert!(info.ocsp_responders.is_empty());
}

#[test]
fn tsa_has_time_stamping_usage() {
    let info = CertificateInfo::from_der(&fixtures::der(TSA)).unwrap();
    assert!(info.time_stamping);
    assert!(!info.ocsp_signing);
}

#[test]
fn self_signed_is_self_issued() {
    let info = CertificateInfo::from_der(&fixtures::der(SELF_SIGNED)).unwrap();
    assert!(info.self_issued);
    assert_eq!(info.subject, info.issuer);
}

#[test]
fn validity_window() {
    let info = CertificateInfo::from_der(&fixtures::der(LEAF_GOOD)).unwrap();

    assert!(info.is_valid_at(fixtures::now()));
    assert!(!info.is_valid_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    assert!(!info.is_valid_at(Utc.with_ymd_and_hms(2130, 1, 1, 0, 0, 0).unwrap()));
}

#[test]
fn fingerprint_matches_der() {
    let der = fixtures::der(LEAF_GOOD);
    let info = CertificateInfo::from_der(&der).unwrap();
    assert_eq!(info.fingerprint, crate::hash::sha256_fingerprint(&der));
}

#[test]
fn issued_by() {
    let leaf = fixtures::der(LEAF_GOOD);
    let int = fixtures::der(INTERMEDIATE);
    let root = fixtures::der(ROOT);

    verify_issued_by(&leaf, &int).unwrap();
    verify_issued_by(&int, &root).unwrap();
    verify_issued_by(&root, &root).unwrap();

    assert_eq!(
        verify_issued_by(&leaf, &root).unwrap_err(),
        CertificateError::IssuerMismatch
    );
}

#[test]
fn rsa_leaf_issued_by_ec_intermediate() {
    verify_issued_by(&fixtures::der(LEAF_RSA), &fixtures::der(INTERMEDIATE)).unwrap();
}

#[test]
fn garbage_is_not_a_certificate() {
    assert!(matches!(
        CertificateInfo::from_der(b"not a certificate"),
        Err(CertificateError::InvalidCertificate(_))
    ));
}

#[test]
fn pem_bundle() {
    let certs = certs_from_pem(DEEP_INTERMEDIATES).unwrap();
    assert_eq!(certs.len(), 10);

    let empty = certs_from_pem(b"").unwrap();
    assert!(empty.is_empty());
}

#[test]
fn der_or_pem() {
    let der = fixtures::der(LEAF_GOOD);

    assert_eq!(cert_der_from_bytes(LEAF_GOOD).unwrap(), der);
    assert_eq!(cert_der_from_bytes(&der).unwrap(), der);
    assert!(cert_der_from_bytes(b"junk").is_err());
}
