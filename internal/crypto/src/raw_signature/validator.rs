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

use thiserror::Error;
use x509_parser::oid_registry::Oid;

use crate::raw_signature::{oids::*, validators::*, SigningAlg};

/// A `RawSignatureValidator` implementation checks a signature encoded using a
/// specific signature algorithm and a private/public key pair.
///
/// IMPORTANT: This signature is typically embedded in a wrapper provided by
/// another signature mechanism (an X.509 certificate, a CRL, an OCSP
/// response, a CMS `SignerInfo`). `RawSignatureValidator` only checks the
/// signature bytes themselves.
pub trait RawSignatureValidator {
    /// Return `Ok(())` if the signature `sig` is valid for the raw content
    /// `data` and the public key `public_key`.
    ///
    /// `public_key` is a DER-encoded `SubjectPublicKeyInfo`.
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError>;
}

/// Return a built-in signature validator for the requested signature
/// algorithm.
pub fn validator_for_signing_alg(alg: SigningAlg) -> Option<Box<dyn RawSignatureValidator>> {
    match alg {
        SigningAlg::Ed25519 => Some(Box::new(Ed25519Validator {})),
        SigningAlg::Ps256 => Some(Box::new(RsaValidator::Ps256)),
        SigningAlg::Ps384 => Some(Box::new(RsaValidator::Ps384)),
        SigningAlg::Ps512 => Some(Box::new(RsaValidator::Ps512)),
        SigningAlg::Rs256 => Some(Box::new(RsaLegacyValidator::Rsa256)),
        SigningAlg::Rs384 => Some(Box::new(RsaLegacyValidator::Rsa384)),
        SigningAlg::Rs512 => Some(Box::new(RsaLegacyValidator::Rsa512)),
        SigningAlg::Es256 => Some(Box::new(EcdsaValidator::Es256)),
        SigningAlg::Es384 => Some(Box::new(EcdsaValidator::Es384)),
        SigningAlg::Es512 => Some(Box::new(EcdsaValidator::Es512)),
    }
}

/// Return a built-in signature validator for a signature algorithm as
/// identified by OID.
///
/// `hash_alg` is consulted only when `sig_alg` names a key type rather than a
/// full signature scheme (`rsaEncryption` or `id-ecPublicKey`), which is how
/// some CMS signer infos describe their signature.
///
/// RSASSA-PSS signatures on certificates carry their hash in algorithm
/// parameters and are not supported here.
pub fn validator_for_sig_and_hash_algs(
    sig_alg: &Oid,
    hash_alg: Option<&Oid>,
) -> Option<Box<dyn RawSignatureValidator>> {
    if *sig_alg == SHA256_WITH_RSAENCRYPTION_OID {
        return validator_for_signing_alg(SigningAlg::Rs256);
    } else if *sig_alg == SHA384_WITH_RSAENCRYPTION_OID {
        return validator_for_signing_alg(SigningAlg::Rs384);
    } else if *sig_alg == SHA512_WITH_RSAENCRYPTION_OID {
        return validator_for_signing_alg(SigningAlg::Rs512);
    }

    if *sig_alg == ECDSA_WITH_SHA256_OID {
        return validator_for_signing_alg(SigningAlg::Es256);
    } else if *sig_alg == ECDSA_WITH_SHA384_OID {
        return validator_for_signing_alg(SigningAlg::Es384);
    } else if *sig_alg == ECDSA_WITH_SHA512_OID {
        return validator_for_signing_alg(SigningAlg::Es512);
    }

    if *sig_alg == ED25519_OID {
        return validator_for_signing_alg(SigningAlg::Ed25519);
    }

    // Key-type OIDs: the digest algorithm decides.
    let hash_alg = hash_alg?;
    if *sig_alg == RSA_OID {
        if *hash_alg == SHA256_OID {
            return validator_for_signing_alg(SigningAlg::Rs256);
        } else if *hash_alg == SHA384_OID {
            return validator_for_signing_alg(SigningAlg::Rs384);
        } else if *hash_alg == SHA512_OID {
            return validator_for_signing_alg(SigningAlg::Rs512);
        }
    } else if *sig_alg == EC_PUBLICKEY_OID {
        if *hash_alg == SHA256_OID {
            return validator_for_signing_alg(SigningAlg::Es256);
        } else if *hash_alg == SHA384_OID {
            return validator_for_signing_alg(SigningAlg::Es384);
        } else if *hash_alg == SHA512_OID {
            return validator_for_signing_alg(SigningAlg::Es512);
        }
    }

    None
}

/// Same as [`validator_for_sig_and_hash_algs`], for OIDs in dotted string
/// form (as produced by `rasn` types).
pub(crate) fn validator_for_dotted_oids(
    sig_alg: &str,
    hash_alg: Option<&str>,
) -> Option<Box<dyn RawSignatureValidator>> {
    let sig_alg = Oid::from_str(sig_alg).ok()?;
    let hash_alg = match hash_alg {
        Some(hash_alg) => Some(Oid::from_str(hash_alg).ok()?),
        None => None,
    };

    validator_for_sig_and_hash_algs(&sig_alg, hash_alg.as_ref())
}

/// Describes errors that can be identified when validating a raw signature.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum RawSignatureValidationError {
    /// The signature does not match the provided data or public key.
    #[error("the signature does not match the provided data or public key")]
    SignatureMismatch,

    /// An error was reported by the underlying cryptography implementation.
    #[error("an error was reported by the cryptography library: {0}")]
    CryptoLibraryError(String),

    /// An invalid public key was provided.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// An invalid signature value was provided.
    #[error("invalid signature value")]
    InvalidSignature,

    /// The signature uses an unsupported signing or hash algorithm.
    #[error("signature uses an unsupported algorithm")]
    UnsupportedAlgorithm,

    /// An unexpected internal error occured while validating the signature.
    #[error("internal error ({0})")]
    InternalError(String),
}
