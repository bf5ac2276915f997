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

use rsa::{
    pkcs1::DecodeRsaPublicKey,
    pss::Signature,
    sha2::{Sha256, Sha384, Sha512},
    signature::Verifier,
    RsaPublicKey,
};
use spki::SubjectPublicKeyInfoRef;

use crate::raw_signature::{RawSignatureValidationError, RawSignatureValidator};

/// An `RsaValidator` can validate raw signatures with one of the RSA-PSS
/// signature algorithms.
#[non_exhaustive]
pub enum RsaValidator {
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
    Ps256,

    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384
    Ps384,

    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512
    Ps512,
}

impl RawSignatureValidator for RsaValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let signature = Signature::try_from(sig)
            .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

        let public_key = rsa_public_key_from_spki(public_key)?;

        let result = match self {
            Self::Ps256 => {
                let vk = rsa::pss::VerifyingKey::<Sha256>::new(public_key);
                vk.verify(data, &signature)
            }
            Self::Ps384 => {
                let vk = rsa::pss::VerifyingKey::<Sha384>::new(public_key);
                vk.verify(data, &signature)
            }
            Self::Ps512 => {
                let vk = rsa::pss::VerifyingKey::<Sha512>::new(public_key);
                vk.verify(data, &signature)
            }
        };

        result.map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}

/// Extract the PKCS#1 RSA public key from a DER `SubjectPublicKeyInfo`.
pub(crate) fn rsa_public_key_from_spki(
    public_key: &[u8],
) -> Result<RsaPublicKey, RawSignatureValidationError> {
    let spki = SubjectPublicKeyInfoRef::try_from(public_key)
        .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

    let key_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or(RawSignatureValidationError::InvalidPublicKey)?;

    RsaPublicKey::from_pkcs1_der(key_bytes)
        .map_err(|_| RawSignatureValidationError::InvalidPublicKey)
}
