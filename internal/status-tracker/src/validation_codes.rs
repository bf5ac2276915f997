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

//! Status codes attached to [`LogItem`]s.
//!
//! Codes are grouped by the check that produces them. Each code maps to a
//! [`LogKind`] via [`log_kind`].
//!
//! [`LogItem`]: crate::LogItem

use crate::LogKind;

// -- CRL --

/// The certificate's serial number is not listed on the issuer's CRL.
pub const CRL_NOT_REVOKED: &str = "certificate.crl.notRevoked";

/// The certificate is listed on the issuer's CRL as revoked.
pub const CRL_REVOKED: &str = "certificate.crl.revoked";

/// The certificate is listed on the issuer's CRL with reason
/// `certificateHold`.
pub const CRL_ON_HOLD: &str = "certificate.crl.onHold";

/// No CRL could be retrieved (network failure, timeout, size cap).
pub const CRL_UNAVAILABLE: &str = "certificate.crl.unavailable";

/// A CRL was retrieved but could not be parsed or its signature did not
/// verify.
pub const CRL_MALFORMED: &str = "certificate.crl.malformed";

/// The certificate names no CRL distribution point.
pub const CRL_NOT_APPLICABLE: &str = "certificate.crl.notApplicable";

// -- OCSP --

/// The OCSP responder reported the certificate as good.
pub const OCSP_GOOD: &str = "certificate.ocsp.good";

/// The OCSP responder reported the certificate as revoked.
pub const OCSP_REVOKED: &str = "certificate.ocsp.revoked";

/// The OCSP responder reported the certificate as revoked with reason
/// `certificateHold`.
pub const OCSP_SUSPENDED: &str = "certificate.ocsp.suspended";

/// The OCSP responder does not know the certificate.
pub const OCSP_UNKNOWN: &str = "certificate.ocsp.unknown";

/// No usable OCSP response could be obtained.
pub const OCSP_UNAVAILABLE: &str = "certificate.ocsp.unavailable";

/// An OCSP response was received but could not be parsed or verified.
pub const OCSP_MALFORMED: &str = "certificate.ocsp.malformed";

/// The certificate names no OCSP responder.
pub const OCSP_NOT_APPLICABLE: &str = "certificate.ocsp.notApplicable";

// -- chain --

/// The certificate chains to a configured trust anchor.
pub const CHAIN_TRUSTED: &str = "certificate.chain.trusted";

/// No path to a configured trust anchor could be built.
pub const CHAIN_UNTRUSTED: &str = "certificate.chain.untrusted";

/// The path to a trust anchor exceeds the maximum chain depth.
pub const CHAIN_TOO_LONG: &str = "certificate.chain.tooLong";

/// The certificate is self-signed and not on the allowed list.
pub const CHAIN_SELF_SIGNED: &str = "certificate.chain.selfSigned";

/// A certificate in the path is outside its validity window.
pub const CHAIN_OUTSIDE_VALIDITY: &str = "certificate.chain.outsideValidity";

/// An issuer needed to build the path could not be fetched.
pub const CHAIN_UNAVAILABLE: &str = "certificate.chain.unavailable";

/// A certificate in the path could not be parsed.
pub const CHAIN_MALFORMED: &str = "certificate.chain.malformed";

// -- signature --

/// The cryptographic signature matches the signed data and public key.
pub const SIGNATURE_VALIDATED: &str = "signature.validated";

/// The cryptographic signature does not match.
pub const SIGNATURE_MISMATCH: &str = "signature.mismatch";

/// The signature uses an algorithm this engine cannot verify.
pub const SIGNATURE_ALGORITHM_UNSUPPORTED: &str = "signature.algorithmUnsupported";

/// The signing certificate was inside its validity window at signing time.
pub const SIGNING_CREDENTIAL_INSIDE_VALIDITY: &str = "signingCredential.insideValidity";

/// The signing certificate was outside its validity window at signing time.
pub const SIGNING_CREDENTIAL_OUTSIDE_VALIDITY: &str = "signingCredential.outsideValidity";

/// The signing certificate's key usage does not permit document signing.
pub const SIGNING_CREDENTIAL_INVALID_KEY_USAGE: &str = "signingCredential.invalidKeyUsage";

/// The signing certificate is currently trusted (state Valid).
pub const SIGNING_CREDENTIAL_TRUSTED: &str = "signingCredential.trusted";

/// The signing certificate is revoked.
pub const SIGNING_CREDENTIAL_REVOKED: &str = "signingCredential.revoked";

/// The signing certificate is suspended.
pub const SIGNING_CREDENTIAL_SUSPENDED: &str = "signingCredential.suspended";

/// The signing certificate's trust status is unknown.
pub const SIGNING_CREDENTIAL_UNKNOWN: &str = "signingCredential.unknown";

/// No resolved issuance chain is on record for the signing certificate.
pub const SIGNING_CREDENTIAL_CHAIN_MISSING: &str = "signingCredential.chainMissing";

// -- time-stamp --

/// The time-stamp token is well formed and its message imprint matches.
pub const TIMESTAMP_VALIDATED: &str = "timeStamp.validated";

/// The time-stamp token's message imprint does not match the signature.
pub const TIMESTAMP_MISMATCH: &str = "timeStamp.mismatch";

/// The time-stamp token could not be parsed or its signature did not verify.
pub const TIMESTAMP_MALFORMED: &str = "timeStamp.malformed";

/// The time-stamp authority's certificate does not chain to a trust anchor.
pub const TIMESTAMP_UNTRUSTED: &str = "timeStamp.untrusted";

/// The signature declares time-stamp evidence but none is attached, or a
/// time-stamp is required and absent.
pub const TIMESTAMP_MISSING: &str = "timeStamp.missing";

/// A fresh time-stamp token was obtained from the time-stamp authority.
pub const TIMESTAMP_REFRESHED: &str = "timeStamp.refreshed";

/// The time-stamp authority could not be reached.
pub const TIMESTAMP_UNAVAILABLE: &str = "timeStamp.unavailable";

/// Returns `true` if the status code is a success code.
pub fn is_success(status_code: &str) -> bool {
    matches!(log_kind(status_code), LogKind::Success)
}

/// Returns the [`LogKind`] for a given status code.
pub fn log_kind(status_code: &str) -> LogKind {
    match status_code {
        CRL_NOT_REVOKED
        | OCSP_GOOD
        | CHAIN_TRUSTED
        | SIGNATURE_VALIDATED
        | SIGNING_CREDENTIAL_INSIDE_VALIDITY
        | SIGNING_CREDENTIAL_TRUSTED
        | TIMESTAMP_VALIDATED
        | TIMESTAMP_REFRESHED => LogKind::Success,

        CRL_UNAVAILABLE
        | CRL_NOT_APPLICABLE
        | CRL_ON_HOLD
        | OCSP_UNKNOWN
        | OCSP_UNAVAILABLE
        | OCSP_NOT_APPLICABLE
        | CHAIN_UNAVAILABLE
        | SIGNING_CREDENTIAL_CHAIN_MISSING
        | SIGNING_CREDENTIAL_UNKNOWN
        | TIMESTAMP_MISSING
        | TIMESTAMP_UNAVAILABLE => LogKind::Informational,

        _ => LogKind::Failure,
    }
}
