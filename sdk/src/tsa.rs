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

//! Client for an [RFC 3161] time-stamp authority.
//!
//! [RFC 3161]: https://www.ietf.org/rfc/rfc3161.txt

use std::{sync::Arc, time::Duration};

use http::{header, Request};
use log::{debug, warn};
use sigtrust_crypto::time_stamp::{
    time_stamp_request, token_from_response, TimeStampRequest, TIME_STAMP_QUERY_CONTENT_TYPE,
    TIME_STAMP_REPLY_CONTENT_TYPE,
};

use crate::{
    http::{fetch, AsyncHttpResolver},
    settings::Settings,
    Error, Result,
};

const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Requests time-stamp tokens from the configured authority.
pub struct TsaClient {
    url: Option<String>,
    timeout: Duration,
    attempts: u32,
    http: Arc<dyn AsyncHttpResolver>,
}

impl TsaClient {
    /// Create a client from the `[time_stamp]` settings.
    pub fn new(settings: &Settings, http: Arc<dyn AsyncHttpResolver>) -> Self {
        Self {
            url: settings.time_stamp.tsa_url.clone(),
            timeout: settings.time_stamp.timeout(),
            attempts: settings.time_stamp.attempts,
            http,
        }
    }

    /// Returns `true` if a time-stamp authority URL is configured.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Obtain a DER time-stamp token over `message`.
    ///
    /// The request is sent up to the configured number of attempts, each
    /// with its own timeout. Fails with
    /// [`Error::TransientServiceFailure`] when every attempt failed.
    pub async fn request_token(&self, message: &[u8]) -> Result<Vec<u8>> {
        let request =
            time_stamp_request(message).map_err(|e| Error::MalformedData(e.to_string()))?;
        self.send(request).await
    }

    #[cfg(test)]
    pub(crate) async fn request_token_with_nonce(
        &self,
        message: &[u8],
        nonce: u64,
    ) -> Result<Vec<u8>> {
        let request = sigtrust_crypto::time_stamp::time_stamp_request_with_nonce(message, nonce)
            .map_err(|e| Error::MalformedData(e.to_string()))?;
        self.send(request).await
    }

    async fn send(&self, request: TimeStampRequest) -> Result<Vec<u8>> {
        let Some(url) = &self.url else {
            return Err(Error::TransientServiceFailure(
                "no time-stamp authority configured".to_string(),
            ));
        };

        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            let http_request = Request::post(url.as_str())
                .header(header::CONTENT_TYPE, TIME_STAMP_QUERY_CONTENT_TYPE)
                .header(header::ACCEPT, TIME_STAMP_REPLY_CONTENT_TYPE)
                .body(request.der.clone())
                .map_err(|e| Error::Settings(format!("time_stamp.tsa_url: {e}")))?;

            let response = fetch(
                self.http.as_ref(),
                http_request,
                MAX_RESPONSE_SIZE,
                self.timeout,
            )
            .await;

            match response.map(|body| token_from_response(&body, Some(request.nonce))) {
                Ok(Ok(token)) => {
                    debug!("time-stamp token from {url} on attempt {attempt}");
                    return Ok(token);
                }
                Ok(Err(e)) => {
                    warn!("time-stamp authority {url} attempt {attempt}: {e}");
                    last_error = e.to_string();
                }
                Err(e) => {
                    warn!("time-stamp authority {url} attempt {attempt}: {e}");
                    last_error = e.to_string();
                }
            }
        }

        Err(Error::TransientServiceFailure(format!(
            "time-stamp authority {url} failed after {} attempts: {last_error}",
            self.attempts
        )))
    }
}

#[cfg(test)]
#[allow(missing_docs)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use httpmock::MockServer;
    use sigtrust_crypto::time_stamp::verify_time_stamp;

    use super::*;
    use crate::tests::fixtures;

    fn client(url: &str) -> TsaClient {
        let settings = Settings::new()
            .with_toml(&format!("[time_stamp]\ntsa_url = \"{url}\"\ntimeout_secs = 5\n"))
            .unwrap();
        TsaClient::new(&settings, Arc::new(reqwest::Client::new()))
    }

    #[tokio::test]
    async fn token_from_authority() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/tsa")
                    .header("content-type", TIME_STAMP_QUERY_CONTENT_TYPE);
                then.status(200)
                    .header("content-type", TIME_STAMP_REPLY_CONTENT_TYPE)
                    .body(fixtures::TS_RESPONSE);
            })
            .await;

        let client = client(&server.url("/tsa"));
        assert!(client.is_configured());

        let token = client
            .request_token_with_nonce(fixtures::LEAF_GOOD_SIG, fixtures::TS_NONCE)
            .await
            .unwrap();

        let info = verify_time_stamp(&token, fixtures::LEAF_GOOD_SIG).unwrap();
        assert_eq!(info.signer_cert, fixtures::der(fixtures::TSA));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_then_gives_up() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/tsa");
                then.status(503);
            })
            .await;

        let client = client(&server.url("/tsa"));
        let err = client
            .request_token(fixtures::LEAF_GOOD_SIG)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransientServiceFailure(_)));
        assert!(err.to_string().contains("after 3 attempts"));
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn nonce_mismatch_is_not_accepted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/tsa");
                then.status(200).body(fixtures::TS_RESPONSE);
            })
            .await;

        let client = client(&server.url("/tsa"));
        assert!(client
            .request_token_with_nonce(fixtures::LEAF_GOOD_SIG, fixtures::TS_NONCE + 1)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn not_configured() {
        let client = TsaClient::new(&Settings::default(), Arc::new(reqwest::Client::new()));

        assert!(!client.is_configured());
        assert!(matches!(
            client.request_token(b"message").await,
            Err(Error::TransientServiceFailure(_))
        ));
    }
}
