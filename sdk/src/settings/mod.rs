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

//! Engine configuration.
//!
//! [`Settings`] is an immutable value passed into every component at
//! construction. It is loaded from TOML or JSON, overlaying the defaults, so
//! a configuration file only needs to name the values it changes.

use std::{path::Path, time::Duration};

use chrono::NaiveTime;
use config::{Config, FileFormat};
use serde_derive::{Deserialize, Serialize};
use sigtrust_crypto::{
    chain::{TrustAnchors, DEFAULT_MAX_CHAIN_DEPTH},
    x509::certs_from_pem,
};

use crate::{Error, Result};

const VERSION: u32 = 1;

// trait used to validate user input to make sure user supplied configurations are valid
pub(crate) trait SettingsValidate {
    // returns error if settings are invalid
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Settings to configure trust anchors and chain validation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Trust {
    /// Trust anchor root certificates as a PEM bundle.
    pub trust_anchors: Option<String>,

    /// Self-signed signing certificates that are accepted without a chain.
    ///
    /// PEM `CERTIFICATE` blocks and, one per line outside of PEM blocks, the
    /// Base64 SHA-256 hash of a certificate's DER encoding.
    pub allowed_list: Option<String>,

    /// Additional intermediate certificates as a PEM bundle, consulted for
    /// every certificate in addition to the intermediates it was imported
    /// with.
    pub intermediates: Option<String>,

    /// Maximum number of certificates in a path, leaf and trust anchor
    /// included.
    pub max_chain_depth: usize,

    /// Fetch missing issuer certificates from AIA `caIssuers` URIs.
    pub fetch_aia_issuers: bool,

    /// Timeout for the chain check, in seconds.
    pub chain_timeout_secs: u64,
}

impl Trust {
    /// Build the trust-anchor set described by these settings.
    pub fn trust_anchors(&self) -> Result<TrustAnchors> {
        let mut anchors = TrustAnchors::new();

        if let Some(pems) = &self.trust_anchors {
            anchors
                .add_trust_anchors(&normalize_pem(pems))
                .map_err(|e| Error::Settings(e.to_string()))?;
        }

        if let Some(allowed) = &self.allowed_list {
            anchors
                .add_allowed_self_signed(&normalize_pem(allowed))
                .map_err(|e| Error::Settings(e.to_string()))?;
        }

        Ok(anchors)
    }

    /// Intermediate certificates from [`Trust::intermediates`], in DER form.
    pub fn intermediate_ders(&self) -> Result<Vec<Vec<u8>>> {
        match &self.intermediates {
            Some(pems) => {
                certs_from_pem(&normalize_pem(pems)).map_err(|e| Error::Settings(e.to_string()))
            }
            None => Ok(vec![]),
        }
    }

    /// Chain check timeout.
    pub fn chain_timeout(&self) -> Duration {
        Duration::from_secs(self.chain_timeout_secs)
    }
}

impl Default for Trust {
    fn default() -> Self {
        Self {
            trust_anchors: None,
            allowed_list: None,
            intermediates: None,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            fetch_aia_issuers: false,
            chain_timeout_secs: 30,
        }
    }
}

impl SettingsValidate for Trust {
    fn validate(&self) -> Result<()> {
        if self.max_chain_depth < 2 {
            return Err(Error::Settings(
                "trust.max_chain_depth must be at least 2".into(),
            ));
        }

        if let Some(pems) = &self.trust_anchors {
            if certs_from_pem(&normalize_pem(pems))
                .map_err(|e| Error::Settings(e.to_string()))?
                .is_empty()
            {
                return Err(Error::Settings(
                    "trust.trust_anchors contains no certificates".into(),
                ));
            }
        }

        self.trust_anchors()?;
        self.intermediate_ders()?;

        Ok(())
    }
}

/// Settings to configure CRL and OCSP checking.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Revocation {
    /// Check certificate revocation lists.
    pub enable_crl: bool,

    /// Query OCSP responders.
    pub enable_ocsp: bool,

    /// Timeout for the CRL check, in seconds.
    pub crl_timeout_secs: u64,

    /// Largest CRL that will be downloaded, in bytes.
    pub crl_max_size: usize,

    /// How long a fetched CRL is reused, in seconds. A CRL is never reused
    /// past its `nextUpdate`.
    pub crl_cache_ttl_secs: u64,

    /// Timeout for the OCSP check, in seconds.
    pub ocsp_timeout_secs: u64,

    /// Largest OCSP response that will be accepted, in bytes.
    pub ocsp_max_size: usize,

    /// How long an OCSP response is reused, in seconds. A response is never
    /// reused past its `nextUpdate`.
    pub ocsp_cache_ttl_secs: u64,
}

impl Revocation {
    /// CRL check timeout.
    pub fn crl_timeout(&self) -> Duration {
        Duration::from_secs(self.crl_timeout_secs)
    }

    /// OCSP check timeout.
    pub fn ocsp_timeout(&self) -> Duration {
        Duration::from_secs(self.ocsp_timeout_secs)
    }
}

impl Default for Revocation {
    fn default() -> Self {
        Self {
            enable_crl: true,
            enable_ocsp: true,
            crl_timeout_secs: 30,
            crl_max_size: 5 * 1024 * 1024,
            crl_cache_ttl_secs: 2 * 60 * 60,
            ocsp_timeout_secs: 15,
            ocsp_max_size: 1024 * 1024,
            ocsp_cache_ttl_secs: 30 * 60,
        }
    }
}

impl SettingsValidate for Revocation {
    fn validate(&self) -> Result<()> {
        if self.crl_timeout_secs == 0 || self.ocsp_timeout_secs == 0 {
            return Err(Error::Settings(
                "revocation timeouts must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Settings to configure time-stamp verification and refresh.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TimeStamp {
    /// URL of the RFC 3161 time-stamp authority used to refresh tokens.
    pub tsa_url: Option<String>,

    /// Timeout of a single time-stamp request, in seconds.
    pub timeout_secs: u64,

    /// Number of attempts made against the time-stamp authority.
    pub attempts: u32,

    /// Report signatures without time-stamp evidence as warnings.
    pub require_time_stamp: bool,
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self {
            tsa_url: None,
            timeout_secs: 30,
            attempts: 3,
            require_time_stamp: false,
        }
    }
}

impl TimeStamp {
    /// Time-stamp request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SettingsValidate for TimeStamp {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.tsa_url {
            url.parse::<http::Uri>()
                .map_err(|e| Error::Settings(format!("time_stamp.tsa_url: {e}")))?;
        }
        if self.attempts == 0 {
            return Err(Error::Settings(
                "time_stamp.attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the orchestrator's retry policy.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Retry {
    /// Attempts per operation, the first one included.
    pub max_attempts: u32,

    /// Delay before each retry, in seconds. The last value is reused when
    /// there are more retries than entries.
    pub backoff_secs: Vec<u64>,

    /// Time limit for one attempt, in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: vec![60, 120, 300],
            attempt_timeout_secs: 300,
        }
    }
}

impl SettingsValidate for Retry {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Settings("retry.max_attempts must be at least 1".into()));
        }
        if self.backoff_secs.is_empty() {
            return Err(Error::Settings("retry.backoff_secs must not be empty".into()));
        }
        Ok(())
    }
}

/// Settings for the worker pool.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Workers {
    /// Number of operations processed concurrently.
    pub worker_count: usize,

    /// Operations that may wait in the queue before submission blocks.
    pub queue_capacity: usize,
}

impl Default for Workers {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 1024,
        }
    }
}

impl SettingsValidate for Workers {
    fn validate(&self) -> Result<()> {
        if self.worker_count == 0 || self.queue_capacity == 0 {
            return Err(Error::Settings(
                "workers.worker_count and workers.queue_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the periodic re-verification.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Schedule {
    /// Time of day (UTC, `HH:MM`) at which all certificates are re-verified.
    pub daily_at: String,
}

impl Schedule {
    /// Parsed [`Schedule::daily_at`].
    pub fn daily_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.daily_at, "%H:%M")
            .map_err(|e| Error::Settings(format!("schedule.daily_at: {e}")))
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            daily_at: "02:00".to_string(),
        }
    }
}

impl SettingsValidate for Schedule {
    fn validate(&self) -> Result<()> {
        self.daily_time().map(|_| ())
    }
}

/// Settings for configuring all aspects of the validation engine.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Version of the configuration.
    pub version: u32,

    /// Trust anchors and chain validation.
    pub trust: Trust,

    /// CRL and OCSP checking.
    pub revocation: Revocation,

    /// Time-stamp verification and refresh.
    pub time_stamp: TimeStamp,

    /// Orchestrator retry policy.
    pub retry: Retry,

    /// Worker pool.
    pub workers: Workers,

    /// Periodic re-verification.
    pub schedule: Schedule,
}

impl Settings {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay a JSON configuration on top of these settings.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sigtrust::settings::Settings;
    /// # fn main() -> sigtrust::Result<()> {
    /// let settings = Settings::new().with_json(r#"{"revocation": {"enable_ocsp": false}}"#)?;
    /// assert!(!settings.revocation.enable_ocsp);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_json(self, json: &str) -> Result<Self> {
        self.with_string(json, "json")
    }

    /// Overlay a TOML configuration on top of these settings.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sigtrust::settings::Settings;
    /// # fn main() -> sigtrust::Result<()> {
    /// let settings = Settings::new().with_toml(
    ///     r#"
    ///         [trust]
    ///         max_chain_depth = 12
    ///     "#,
    /// )?;
    /// assert_eq!(settings.trust.max_chain_depth, 12);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_toml(self, toml: &str) -> Result<Self> {
        self.with_string(toml, "toml")
    }

    /// Overlay a configuration file on top of these settings.
    ///
    /// The file format (JSON or TOML) is inferred from the file extension.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                Error::Settings("settings file must have json or toml extension".into())
            })?;

        let setting_buf = std::fs::read(path)?;
        self.with_string(&String::from_utf8_lossy(&setting_buf), ext)
    }

    // Overlays the parsed configuration on top of the current instance.
    fn with_string(self, settings_str: &str, format: &str) -> Result<Self> {
        let f = match format.to_lowercase().as_str() {
            "json" => FileFormat::Json,
            "toml" => FileFormat::Toml,
            _ => return Err(Error::Settings(format!("unsupported format {format}"))),
        };

        let current_config = Config::try_from(&self).map_err(|e| Error::Settings(e.to_string()))?;

        let updated_config = Config::builder()
            .add_source(current_config)
            .add_source(config::File::from_str(settings_str, f))
            .build()
            .map_err(|e| Error::Settings(format!("could not parse configuration: {e}")))?;

        let settings = updated_config
            .try_deserialize::<Settings>()
            .map_err(|e| Error::Settings(e.to_string()))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Serializes these settings into a pretty (formatted) TOML string.
    pub fn to_pretty_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: VERSION,
            trust: Default::default(),
            revocation: Default::default(),
            time_stamp: Default::default(),
            retry: Default::default(),
            workers: Default::default(),
            schedule: Default::default(),
        }
    }
}

impl SettingsValidate for Settings {
    fn validate(&self) -> Result<()> {
        if self.version > VERSION {
            return Err(Error::Settings("settings version too new".into()));
        }
        self.trust.validate()?;
        self.revocation.validate()?;
        self.time_stamp.validate()?;
        self.retry.validate()?;
        self.workers.validate()?;
        self.schedule.validate()
    }
}

// allow for JSON-encoded PEMs with \n
fn normalize_pem(pem: &str) -> Vec<u8> {
    pem.replace("\\n", "\n").into_bytes()
}
