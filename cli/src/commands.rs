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

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use sigtrust::SigningAlg;

/// Tool for checking signer certificates and validating digital signatures.
#[derive(Debug, Parser)]
#[command(author, version, about, arg_required_else_help = true)]
pub struct CliArgs {
    #[clap(flatten)]
    pub config: Config,

    /// Exit with status 2 when the verdict is anything other than valid.
    #[clap(long, global = true)]
    pub fail_on_invalid: bool,

    /// Log more (-v warnings, -vv info, -vvv debug).
    #[clap(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the CRL, OCSP and trust chain checks on a certificate and print
    /// the derived state.
    VerifyCert {
        /// Path to the certificate (DER or PEM).
        cert: PathBuf,

        /// Path to a PEM bundle of intermediate certificates.
        #[clap(long)]
        chain: Option<PathBuf>,
    },

    /// Validate a signature made with a certificate and print the report.
    Validate {
        /// Path to the signer certificate (DER or PEM).
        cert: PathBuf,

        /// Path to a PEM bundle of intermediate certificates.
        #[clap(long)]
        chain: Option<PathBuf>,

        /// Path to the signed bytes.
        #[clap(long)]
        data: PathBuf,

        /// Path to the raw signature value.
        #[clap(long)]
        signature: PathBuf,

        /// Signature algorithm.
        #[clap(long, default_value = "es256")]
        alg: SigningAlg,

        /// Path to a DER RFC 3161 time-stamp token over the signature value.
        #[clap(long)]
        time_stamp: Option<PathBuf>,

        /// Signing time claimed by the signer (RFC 3339).
        #[clap(long)]
        signed_at: Option<DateTime<Utc>>,

        /// Skip verifying the certificate before validating the signature.
        #[clap(long)]
        no_verify: bool,
    },

    /// Build and check the issuance chain of a certificate.
    Chain {
        /// Path to the certificate (DER or PEM).
        cert: PathBuf,

        /// Path to a PEM bundle of intermediate certificates.
        #[clap(long)]
        chain: Option<PathBuf>,
    },

    /// Print the effective settings as TOML.
    Settings,
}

#[derive(Debug, Args)]
pub struct Config {
    /// Path to a TOML or JSON settings file.
    #[clap(long, global = true, env = "SIGTRUST_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Path to a PEM bundle of trust anchors. Replaces the configured
    /// anchors.
    #[clap(long, global = true, env = "SIGTRUST_TRUST_ANCHORS")]
    pub trust_anchors: Option<PathBuf>,

    /// Do not fetch CRLs, OCSP responses or issuer certificates.
    #[clap(long, global = true)]
    pub offline: bool,
}
