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

use std::io::{Cursor, Read};

use async_trait::async_trait;
use http::{
    header::{HeaderValue, USER_AGENT},
    Request, Response,
};
use log::debug;

use crate::http::{AsyncHttpResolver, HttpResolverError};

const SIGTRUST_USER_AGENT: &str = concat!("sigtrust/", env!("CARGO_PKG_VERSION"));

/// The body is buffered in full; size limits are applied by the caller.
#[async_trait]
impl AsyncHttpResolver for reqwest::Client {
    async fn http_resolve_async(
        &self,
        mut request: Request<Vec<u8>>,
    ) -> Result<Response<Box<dyn Read>>, HttpResolverError> {
        request
            .headers_mut()
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(SIGTRUST_USER_AGENT));

        let uri = request.uri().to_string();
        let response = self.execute(request.try_into()?).await.map_err(|e| {
            debug!("request to {uri} failed: {e}");
            HttpResolverError::from(e)
        })?;

        let mut builder = Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            *headers = response.headers().clone();
        }

        let body = response.bytes().await?;
        Ok(builder.body(Box::new(Cursor::new(body)) as Box<dyn Read>)?)
    }
}

impl From<reqwest::Error> for HttpResolverError {
    fn from(value: reqwest::Error) -> Self {
        Self::Other(Box::new(value))
    }
}

#[cfg(test)]
#[allow(missing_docs)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use httpmock::{Method::POST, MockServer};

    use super::*;

    #[tokio::test]
    async fn posts_and_reads_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/ocsp")
                    .header("content-type", "application/ocsp-request")
                    .header("user-agent", SIGTRUST_USER_AGENT)
                    .body("request");
                then.status(200)
                    .header("content-type", "application/ocsp-response")
                    .body("response");
            })
            .await;

        let request = Request::post(server.url("/ocsp"))
            .header("content-type", "application/ocsp-request")
            .body(b"request".to_vec())
            .unwrap();

        let response = reqwest::Client::new()
            .http_resolve_async(request)
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"],
            "application/ocsp-response"
        );

        let mut body = vec![];
        response.into_body().read_to_end(&mut body).unwrap();
        assert_eq!(body, b"response");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn keeps_caller_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.header("user-agent", "host-app/1.0");
                then.status(404);
            })
            .await;

        let request = Request::get(server.url("/crl"))
            .header(USER_AGENT, "host-app/1.0")
            .body(vec![])
            .unwrap();

        let response = reqwest::Client::new()
            .http_resolve_async(request)
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let request = Request::get("http://127.0.0.1:1/crl")
            .body(vec![])
            .unwrap();

        assert!(matches!(
            reqwest::Client::new().http_resolve_async(request).await,
            Err(HttpResolverError::Other(_))
        ));
    }
}
