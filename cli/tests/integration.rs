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

use std::{error::Error, fs, path::PathBuf, process::Command};

use assert_cmd::prelude::*;
use predicate::str;
use predicates::prelude::*;
use serde_json::Value;

const TOOL: &str = "sigtrust-tool";

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../sdk/tests/fixtures/pki");
    path.push(name);
    fs::canonicalize(path).expect("canonicalize")
}

// Offline, trusting the test root.
fn tool() -> Command {
    let mut cmd = Command::cargo_bin(TOOL).expect("binary");
    cmd.env_remove("SIGTRUST_SETTINGS")
        .env_remove("SIGTRUST_TRUST_ANCHORS")
        .arg("--offline")
        .arg("--trust-anchors")
        .arg(fixture_path("root.pem"));
    cmd
}

fn json_stdout(cmd: &mut Command) -> Result<Value, Box<dyn Error>> {
    let output = cmd.output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn tool_requires_command() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin(TOOL)?
        .assert()
        .failure()
        .stderr(str::contains("Usage"));
    Ok(())
}

#[test]
fn tool_cert_not_found() -> Result<(), Box<dyn Error>> {
    tool()
        .arg("chain")
        .arg("test/file/notfound.pem")
        .assert()
        .failure()
        .stderr(str::contains("Failed to read certificate"));
    Ok(())
}

#[test]
fn tool_unknown_alg() -> Result<(), Box<dyn Error>> {
    tool()
        .arg("validate")
        .arg(fixture_path("leaf_good.pem"))
        .arg("--data")
        .arg(fixture_path("signed_data.bin"))
        .arg("--signature")
        .arg(fixture_path("leaf_good.sig"))
        .arg("--alg")
        .arg("md5")
        .assert()
        .failure()
        .stderr(str::contains("invalid value"));
    Ok(())
}

#[test]
fn tool_settings_defaults() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin(TOOL)?
        .env_remove("SIGTRUST_SETTINGS")
        .arg("settings")
        .assert()
        .success()
        .stdout(str::contains("[trust]"))
        .stdout(str::contains("max_chain_depth = 10"));
    Ok(())
}

#[test]
fn tool_settings_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sigtrust.toml");
    fs::write(&path, "[trust]\nmax_chain_depth = 4\n")?;

    Command::cargo_bin(TOOL)?
        .arg("settings")
        .arg("--settings")
        .arg(&path)
        .assert()
        .success()
        .stdout(str::contains("max_chain_depth = 4"));
    Ok(())
}

#[test]
fn tool_settings_from_env() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sigtrust.json");
    fs::write(&path, r#"{"revocation": {"enable_ocsp": false}}"#)?;

    Command::cargo_bin(TOOL)?
        .env("SIGTRUST_SETTINGS", &path)
        .arg("settings")
        .assert()
        .success()
        .stdout(str::contains("enable_ocsp = false"));
    Ok(())
}

#[test]
fn tool_bad_settings_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sigtrust.yaml");
    fs::write(&path, "trust: {}\n")?;

    Command::cargo_bin(TOOL)?
        .arg("settings")
        .arg("--settings")
        .arg(&path)
        .assert()
        .failure()
        .stderr(str::contains("Failed to load settings"));
    Ok(())
}

#[test]
fn tool_chain_trusted() -> Result<(), Box<dyn Error>> {
    let report = json_stdout(
        tool()
            .arg("chain")
            .arg(fixture_path("leaf_good.pem"))
            .arg("--chain")
            .arg(fixture_path("int.pem"))
            .arg("--fail-on-invalid"),
    )?;

    assert_eq!(report["outcome"], "completed");
    assert_eq!(report["status"], "trusted");
    assert_eq!(report["chain"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[test]
fn tool_chain_missing_intermediate() -> Result<(), Box<dyn Error>> {
    tool()
        .arg("chain")
        .arg(fixture_path("leaf_good.pem"))
        .arg("--fail-on-invalid")
        .assert()
        .code(2)
        .stdout(str::contains("\"status\": \"untrusted\"").or(str::contains("unavailable")));
    Ok(())
}

#[test]
fn tool_verify_cert() -> Result<(), Box<dyn Error>> {
    let report = json_stdout(
        tool()
            .arg("verify-cert")
            .arg(fixture_path("leaf_good.pem"))
            .arg("--chain")
            .arg(fixture_path("int.pem"))
            .arg("--fail-on-invalid"),
    )?;

    assert_eq!(report["certificateId"], "leaf_good");
    assert_eq!(report["state"], "valid");
    assert_eq!(report["changed"], true);
    assert_eq!(report["incomplete"], false);
    assert!(report["subject"].as_str().unwrap_or_default().contains("CN=leaf_good"));
    Ok(())
}

#[test]
fn tool_verify_untrusted_cert() -> Result<(), Box<dyn Error>> {
    tool()
        .arg("verify-cert")
        .arg(fixture_path("self_signed.pem"))
        .arg("--fail-on-invalid")
        .assert()
        .code(2)
        .stdout(str::contains("\"state\": \"unknown\""));
    Ok(())
}

fn validate(data: PathBuf) -> Command {
    let mut cmd = tool();
    cmd.arg("validate")
        .arg(fixture_path("leaf_good.pem"))
        .arg("--chain")
        .arg(fixture_path("int.pem"))
        .arg("--data")
        .arg(data)
        .arg("--signature")
        .arg(fixture_path("leaf_good.sig"))
        .arg("--alg")
        .arg("es256");
    cmd
}

#[test]
fn tool_validate_signature() -> Result<(), Box<dyn Error>> {
    let report = json_stdout(
        validate(fixture_path("signed_data.bin")).arg("--fail-on-invalid"),
    )?;

    assert_eq!(report["status"], "valid");
    assert_eq!(report["signingTimeSource"], "validationTime");
    assert!(report.get("timeStamp").is_none());
    Ok(())
}

#[test]
fn tool_validate_without_verification() -> Result<(), Box<dyn Error>> {
    let report = json_stdout(validate(fixture_path("signed_data.bin")).arg("--no-verify"))?;

    assert_eq!(report["status"], "warning");
    Ok(())
}

#[test]
fn tool_validate_tampered_data() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tampered.bin");
    let mut data = fs::read(fixture_path("signed_data.bin"))?;
    data.push(b'!');
    fs::write(&path, data)?;

    validate(path)
        .arg("--fail-on-invalid")
        .assert()
        .code(2)
        .stdout(str::contains("\"status\": \"invalid\""));
    Ok(())
}

#[test]
fn tool_validate_with_time_stamp() -> Result<(), Box<dyn Error>> {
    // The TSA certificate is issued by the test intermediate.
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sigtrust.toml");
    fs::write(
        &path,
        format!(
            "[trust]\nintermediates = '''\n{}'''\n",
            fs::read_to_string(fixture_path("int.pem"))?
        ),
    )?;

    let report = json_stdout(
        validate(fixture_path("signed_data.bin"))
            .arg("--settings")
            .arg(&path)
            .arg("--time-stamp")
            .arg(fixture_path("ts_token.der")),
    )?;

    assert_eq!(report["status"], "valid");
    assert_eq!(report["signingTimeSource"], "timeStamp");
    assert_eq!(report["timeStamp"]["serialNumber"], "2");
    Ok(())
}
