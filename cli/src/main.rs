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

//! Command line front end for the sigtrust validation engine.
//!
//! Every command prints its result as JSON on stdout. Certificates live in
//! an in-memory store for the duration of one invocation.

use std::{fs, path::Path, process::exit};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, LevelFilter};
use serde::Serialize;
use sigtrust::{
    Certificate, CertificateId, CertificateState, CertificateStore, ChainCheck, ChainStatus,
    Clock, Engine, OverallStatus, Settings, Signature, SignatureId,
};

mod commands;
use commands::{CliArgs, Commands, Config};

// Exit status when --fail-on-invalid is set and the verdict is not valid.
const INVALID_EXIT_CODE: i32 = 2;

fn load_settings(config: &Config) -> Result<Settings> {
    let mut settings = match &config.settings {
        Some(path) => Settings::new()
            .with_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::new(),
    };

    if let Some(path) = &config.trust_anchors {
        let anchors = fs::read_to_string(path)
            .with_context(|| format!("Failed to read trust anchors from {}", path.display()))?;
        settings.trust.trust_anchors = Some(anchors);
    }

    if config.offline {
        settings.revocation.enable_crl = false;
        settings.revocation.enable_ocsp = false;
        settings.trust.fetch_aia_issuers = false;
    }

    Ok(settings)
}

fn load_certificate(path: &Path, chain: Option<&Path>) -> Result<Certificate> {
    let cert = fs::read(path)
        .with_context(|| format!("Failed to read certificate from {}", path.display()))?;

    let intermediates = chain
        .map(|chain| {
            fs::read(chain)
                .with_context(|| format!("Failed to read chain from {}", chain.display()))
        })
        .transpose()?;

    let id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "certificate".to_owned());

    Certificate::import(CertificateId::new(id), &cert, intermediates.as_deref())
        .with_context(|| format!("Failed to import certificate {}", path.display()))
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {what} from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificateReport<'a> {
    certificate_id: &'a CertificateId,
    subject: &'a str,
    issuer: &'a str,
    state: CertificateState,
    changed: bool,
    incomplete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<&'a sigtrust::VerificationResult>,
}

// Returns `true` if the verdict is valid.
async fn run(args: CliArgs) -> Result<bool> {
    let settings = load_settings(&args.config)?;

    match args.command {
        Commands::VerifyCert { cert, chain } => {
            let certificate = load_certificate(&cert, chain.as_deref())?;
            let engine = Engine::new(settings)?;

            let id = certificate.id.clone();
            let subject = certificate.info.subject.clone();
            let issuer = certificate.info.issuer.clone();
            engine.add_certificate(certificate).await?;

            let summary = engine.certificates().verify_certificate(&id).await?;
            print_json(&CertificateReport {
                certificate_id: &id,
                subject: &subject,
                issuer: &issuer,
                state: summary.state,
                changed: summary.changed,
                incomplete: summary.incomplete,
                verification: summary.result.as_ref(),
            })?;

            Ok(summary.state == CertificateState::Valid)
        }

        Commands::Validate {
            cert,
            chain,
            data,
            signature,
            alg,
            time_stamp,
            signed_at,
            no_verify,
        } => {
            let certificate = load_certificate(&cert, chain.as_deref())?;
            let engine = Engine::new(settings)?;

            let mut record = Signature::new(
                SignatureId::generate(),
                data.display().to_string(),
                certificate.id.clone(),
                alg,
                read_file(&data, "signed data")?,
                read_file(&signature, "signature")?,
            );
            if let Some(path) = &time_stamp {
                record = record.with_time_stamp(read_file(path, "time-stamp token")?);
            }
            if let Some(at) = signed_at {
                record = record.with_signed_at(at);
            }

            let id = certificate.id.clone();
            engine.add_certificate(certificate).await?;

            if !no_verify {
                let summary = engine.certificates().verify_certificate(&id).await?;
                debug!("certificate {id} is {}", summary.state);
            }

            let certificate = engine.store().get_certificate(&id).await?;
            let report = engine.signature_validator().validate(&record, &certificate);
            print_json(&report)?;

            Ok(report.status == OverallStatus::Valid)
        }

        Commands::Chain { cert, chain } => {
            let certificate = load_certificate(&cert, chain.as_deref())?;
            let engine = Engine::new(settings)?;

            let outcome = engine
                .chain_validator()
                .validate_chain(&certificate, engine.clock().now())
                .await;
            print_json(&outcome)?;

            Ok(matches!(
                outcome.completed(),
                Some(ChainStatus::Trusted { .. })
            ))
        }

        Commands::Settings => {
            print!("{}", settings.to_pretty_toml()?);
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // RUST_LOG takes precedence over -v.
    let level = match args.verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let fail_on_invalid = args.fail_on_invalid;
    let valid = run(args).await?;

    if fail_on_invalid && !valid {
        exit(INVALID_EXIT_CODE);
    }

    Ok(())
}
