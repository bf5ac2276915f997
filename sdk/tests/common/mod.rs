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

#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::{Cursor, Read},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use http::{Request, Response};
use sigtrust::{
    http::{AsyncHttpResolver, HttpResolverError},
    Certificate, Engine, FixedClock, MemoryAuditSink, MemoryStore, Settings, Signature,
    SigningAlg,
};

pub const ROOT: &[u8] = include_bytes!("../fixtures/pki/root.pem");
pub const INTERMEDIATE: &[u8] = include_bytes!("../fixtures/pki/int.pem");
pub const INTERMEDIATE_DER: &[u8] = include_bytes!("../fixtures/pki/int.der");
pub const LEAF_GOOD: &[u8] = include_bytes!("../fixtures/pki/leaf_good.pem");
pub const LEAF_REVOKED: &[u8] = include_bytes!("../fixtures/pki/leaf_revoked.pem");
pub const DEEP_ANCHOR: &[u8] = include_bytes!("../fixtures/pki/deep0.pem");
pub const DEEP_LEAF: &[u8] = include_bytes!("../fixtures/pki/deep_leaf.pem");
pub const DEEP_INTERMEDIATES: &[u8] = include_bytes!("../fixtures/pki/deep_intermediates.pem");
pub const CRL: &[u8] = include_bytes!("../fixtures/pki/intermediate.crl");
pub const OCSP_GOOD: &[u8] = include_bytes!("../fixtures/pki/leaf_good.ocsp.der");
pub const OCSP_REVOKED: &[u8] = include_bytes!("../fixtures/pki/leaf_revoked.ocsp.der");
pub const SIGNED_DATA: &[u8] = include_bytes!("../fixtures/pki/signed_data.bin");
pub const LEAF_GOOD_SIG: &[u8] = include_bytes!("../fixtures/pki/leaf_good.sig");

pub const CRL_URL: &str = "http://pki.sigtrust.test/crl/intermediate.crl";
pub const OCSP_URL: &str = "http://ocsp.sigtrust.test/";
pub const AIA_URL: &str = "http://pki.sigtrust.test/certs/intermediate.der";

#[allow(unused_macros)]
macro_rules! assert_err {
    ($expression:expr, $($pattern:tt)+) => {
        match $expression {
            $($pattern)+ => (),
            ref e => panic!("expected `{}` but got `{:?}`", stringify!($($pattern)+), e),
        }
    }
}
#[allow(unused_imports)]
pub(super) use assert_err;

/// A validation time at which the whole test PKI is current.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
}

#[derive(Default)]
struct Route {
    status: u16,
    body: Vec<u8>,
    failures: u32,
    calls: u32,
}

/// Serves canned responses by URI. Unknown URIs fail as if the host were
/// unreachable.
#[derive(Clone, Default)]
pub struct FakeResolver {
    routes: Arc<Mutex<HashMap<String, Route>>>,
}

impl FakeResolver {
    /// Serve `body` with `status` at `uri`.
    pub fn with(self, uri: &str, status: u16, body: &[u8]) -> Self {
        self.set(uri, status, body);
        self
    }

    /// Serve `body` at `uri`, but answer 503 to the first `failures`
    /// requests.
    pub fn flaky(self, uri: &str, failures: u32, body: &[u8]) -> Self {
        self.set(uri, 200, body);
        self.routes.lock().unwrap().entry(uri.to_string()).or_default().failures = failures;
        self
    }

    /// Replace the response at `uri`.
    pub fn set(&self, uri: &str, status: u16, body: &[u8]) {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.entry(uri.to_string()).or_default();
        route.status = status;
        route.body = body.to_vec();
    }

    /// Number of requests made to `uri`.
    pub fn calls(&self, uri: &str) -> u32 {
        self.routes
            .lock()
            .unwrap()
            .get(uri)
            .map(|r| r.calls)
            .unwrap_or(0)
    }
}

#[async_trait]
impl AsyncHttpResolver for FakeResolver {
    async fn http_resolve_async(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<Response<Box<dyn Read>>, HttpResolverError> {
        let uri = request.uri().to_string();
        let mut routes = self.routes.lock().unwrap();

        let Some(route) = routes.get_mut(&uri) else {
            return Err(HttpResolverError::Other(
                format!("connection refused: {uri}").into(),
            ));
        };

        route.calls += 1;
        let (status, body) = if route.calls <= route.failures {
            (503, vec![])
        } else {
            (route.status, route.body.clone())
        };

        Ok(Response::builder()
            .status(status)
            .body(Box::new(Cursor::new(body)) as Box<dyn Read>)?)
    }
}

pub struct TestEngine {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub clock: Arc<FixedClock>,
    pub http: FakeResolver,
}

/// An engine trusting `anchor`, with `extra` TOML appended to the settings.
pub fn engine(http: FakeResolver, anchor: &[u8], extra: &str) -> TestEngine {
    let settings = Settings::new()
        .with_toml(&format!(
            "[trust]\ntrust_anchors = '''\n{}'''\n{extra}",
            String::from_utf8_lossy(anchor)
        ))
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(MemoryAuditSink::default());
    let clock = Arc::new(FixedClock::new(now()));

    let engine = Engine::builder(settings)
        .store(store.clone())
        .http(Arc::new(http.clone()))
        .clock(clock.clone())
        .audit(audit.clone())
        .build()
        .unwrap();

    TestEngine {
        engine,
        store,
        audit,
        clock,
        http,
    }
}

/// Add certificate `c1` and a signature `s1` made with it.
pub async fn add_signer(test: &TestEngine, cert: &[u8], intermediates: Option<&[u8]>) {
    test.engine
        .add_certificate(Certificate::import("c1".into(), cert, intermediates).unwrap())
        .await
        .unwrap();

    test.engine
        .add_signature(Signature::new(
            "s1".into(),
            "contract-1",
            "c1".into(),
            SigningAlg::Es256,
            SIGNED_DATA.to_vec(),
            LEAF_GOOD_SIG.to_vec(),
        ))
        .await
        .unwrap();
}
