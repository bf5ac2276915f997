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

//! Tools for building OCSP requests and checking OCSP responses
//! (RFC 6960).

use thiserror::Error;

mod request;
pub use request::{build_request, OCSP_REQUEST_CONTENT_TYPE, OCSP_RESPONSE_CONTENT_TYPE};

mod response;
pub use response::{OcspCertStatus, OcspResponse};

use crate::raw_signature::RawSignatureValidationError;

/// Describes errors that can occur when building an OCSP request or checking
/// an OCSP response.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum OcspError {
    /// The subject or issuer certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The response could not be decoded.
    #[error("invalid OCSP response: {0}")]
    InvalidResponse(String),

    /// The responder reported a non-successful status.
    #[error("OCSP responder returned status {0}")]
    Unsuccessful(String),

    /// The response does not contain a status for the requested certificate.
    #[error("OCSP response does not cover the certificate")]
    CertificateNotCovered,

    /// No certificate authorized to sign for the issuer signed the response.
    #[error("OCSP responder not authorized for the issuer")]
    UnauthorizedResponder,

    /// The response is signed with an unsupported algorithm.
    #[error("unsupported OCSP signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The response signature does not verify.
    #[error("OCSP signature invalid: {0}")]
    SignatureInvalid(RawSignatureValidationError),

    /// The response's `nextUpdate` has passed.
    #[error("OCSP response is stale")]
    Stale,

    /// The response's `thisUpdate` is in the future.
    #[error("OCSP response is not yet valid")]
    NotYetValid,

    /// The request could not be encoded.
    #[error("could not encode OCSP request: {0}")]
    Encoding(String),
}
