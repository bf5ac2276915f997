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

//! HTTP abstraction layer.
//!
//! This module defines the trait through which the engine performs HTTP
//! requests without hard-wiring a specific HTTP client. Host applications
//! may plug in their own implementation, for instance to route requests
//! through a proxy or to disable networking entirely.
//!
//! # When do outbound network requests occur?
//!
//! - Fetching CRLs from a certificate's CRL distribution points
//! - Posting OCSP requests to a certificate's OCSP responders
//! - Fetching missing issuer certificates from AIA `caIssuers` URIs, when
//!   enabled in [`Trust`](crate::settings::Trust)
//! - Requesting time-stamp tokens from the configured time-stamp authority

use std::{
    io::{self, Read},
    time::Duration,
};

use async_trait::async_trait;
use http::{Request, Response};
use log::debug;

mod reqwest;

// Since we use `http::Request` and `http::Response` we also expose the `http` crate.
pub use http;

/// A resolver for non-blocking (async) HTTP requests.
#[async_trait]
pub trait AsyncHttpResolver: Send + Sync {
    /// Resolve a [`Request`] into a [`Response`] with a streaming body.
    ///
    /// [`Request`]: http::Request
    /// [`Response`]: http::Response
    async fn http_resolve_async(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<Response<Box<dyn Read>>, HttpResolverError>;
}

/// A resolver that refuses every request.
///
/// Use it to run the engine fully offline: every network-backed check then
/// reports itself as unavailable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopResolver;

#[async_trait]
impl AsyncHttpResolver for NoopResolver {
    async fn http_resolve_async(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<Response<Box<dyn Read>>, HttpResolverError> {
        Err(HttpResolverError::NetworkDisabled {
            uri: request.uri().to_string(),
        })
    }
}

/// An error that occurs during HTTP resolution.
#[derive(Debug, thiserror::Error)]
pub enum HttpResolverError {
    /// An error occured in the [`http`] crate.
    #[error(transparent)]
    Http(#[from] http::Error),

    /// An error occured in during I/O.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Networking is disabled for this resolver.
    #[error("network access to \"{uri}\" is disabled")]
    NetworkDisabled {
        /// The URI that was requested.
        uri: String,
    },

    /// The server answered with a non-success status.
    #[error("\"{uri}\" returned HTTP status {status}")]
    Status {
        /// The URI that was requested.
        uri: String,

        /// HTTP status code.
        status: u16,
    },

    /// The response body exceeded the allowed size.
    #[error("response from \"{uri}\" exceeds {max_size} bytes")]
    TooLarge {
        /// The URI that was requested.
        uri: String,

        /// Maximum number of bytes allowed.
        max_size: usize,
    },

    /// The request did not complete in time.
    #[error("request to \"{uri}\" timed out after {timeout:?}")]
    Timeout {
        /// The URI that was requested.
        uri: String,

        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// An error occured from the underlying HTTP resolver.
    #[error("an error occurred from the underlying http resolver: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Send `request` and return the response body.
///
/// Fails on a non-2xx status, when the body is larger than `max_size` bytes,
/// or when no response arrives within `timeout`.
pub(crate) async fn fetch(
    resolver: &dyn AsyncHttpResolver,
    request: Request<Vec<u8>>,
    max_size: usize,
    timeout: Duration,
) -> Result<Vec<u8>, HttpResolverError> {
    let uri = request.uri().to_string();
    debug!("{} {uri}", request.method());

    let response = tokio::time::timeout(timeout, resolver.http_resolve_async(request))
        .await
        .map_err(|_| HttpResolverError::Timeout {
            uri: uri.clone(),
            timeout,
        })??;

    if !response.status().is_success() {
        return Err(HttpResolverError::Status {
            uri,
            status: response.status().as_u16(),
        });
    }

    let mut body = Vec::new();
    response
        .into_body()
        .take(max_size as u64 + 1)
        .read_to_end(&mut body)?;

    if body.len() > max_size {
        return Err(HttpResolverError::TooLarge { uri, max_size });
    }

    Ok(body)
}
