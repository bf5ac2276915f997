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

use std::time::Duration;

use thiserror::Error;

use crate::http::HttpResolverError;

/// `Error` enumerates errors returned by validation engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The referenced entity does not exist. Never retried.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity (`"signature"` or `"certificate"`).
        entity: &'static str,

        /// Identifier that was looked up.
        id: String,
    },

    /// An external dependency (revocation service, time-stamp authority)
    /// could not be used. Retried.
    #[error("transient service failure: {0}")]
    TransientServiceFailure(String),

    /// Stored or fetched data could not be decoded. Never retried.
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// An operation failed on every attempt allowed by the retry policy.
    #[error("operation failed after {attempts} attempts: {message}")]
    TerminalFailure {
        /// Number of attempts that were made.
        attempts: u32,

        /// Error message of the last attempt.
        message: String,
    },

    /// The operation did not finish in time. Retried.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A concurrent writer changed the entity since it was read.
    #[error("{entity} {id} was modified concurrently")]
    Conflict {
        /// Kind of entity (`"signature"` or `"certificate"`).
        entity: &'static str,

        /// Identifier of the entity.
        id: String,
    },

    /// The worker pool's queue has no free capacity.
    #[error("operation queue is full")]
    QueueFull,

    /// The worker pool no longer accepts operations.
    #[error("worker pool is shut down")]
    PoolClosed,

    /// The settings could not be parsed or are invalid.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// An HTTP request could not be completed.
    #[error(transparent)]
    Http(#[from] HttpResolverError),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),

    // --- third-party errors ---
    #[allow(missing_docs)]
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[allow(missing_docs)]
    #[error(transparent)]
    TomlSerializationError(#[from] toml::ser::Error),
}

impl Error {
    /// Returns `true` if a later attempt of the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientServiceFailure(_)
            | Self::Timeout(_)
            | Self::Conflict { .. }
            | Self::QueueFull
            | Self::Http(_)
            | Self::Store(_) => true,

            Self::NotFound { .. }
            | Self::MalformedData(_)
            | Self::TerminalFailure { .. }
            | Self::PoolClosed
            | Self::Settings(_)
            | Self::IoError(_)
            | Self::TomlSerializationError(_) => false,
        }
    }

    pub(crate) fn signature_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "signature",
            id: id.to_string(),
        }
    }

    pub(crate) fn certificate_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "certificate",
            id: id.to_string(),
        }
    }
}

/// A specialized `Result` type for validation engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(missing_docs)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(Error::TransientServiceFailure("ocsp down".into()).is_retryable());
        assert!(Error::Timeout(Duration::from_secs(300)).is_retryable());
        assert!(Error::Conflict {
            entity: "signature",
            id: "s1".into()
        }
        .is_retryable());

        assert!(!Error::signature_not_found("s1").is_retryable());
        assert!(!Error::MalformedData("bad DER".into()).is_retryable());
        assert!(!Error::TerminalFailure {
            attempts: 3,
            message: "gone".into()
        }
        .is_retryable());
    }

    #[test]
    fn not_found_message() {
        assert_eq!(
            Error::certificate_not_found("c42").to_string(),
            "certificate not found: c42"
        );
    }
}
