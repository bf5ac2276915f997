// Copyright 2022 Adobe. All rights reserved.
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

use std::borrow::Cow;

use crate::{log_item, validation_codes, LogItem, LogKind, StatusTracker};

#[test]
fn new() {
    let log_item = LogItem::new("crl", "CRL checked", "check_crl", "src/test.rs", 42);

    assert_eq!(
        log_item,
        LogItem {
            label: Cow::Borrowed("crl"),
            description: Cow::Borrowed("CRL checked"),
            file: Cow::Borrowed("src/test.rs"),
            function: Cow::Borrowed("check_crl"),
            line: 42u32,
            err_val: None,
            validation_status: None,
            kind: LogKind::Informational,
        }
    );
}

#[test]
fn error() {
    let log_item = LogItem::new("ocsp", "responder failed", "check_ocsp", "src/test.rs", 42)
        .error("connection refused");

    assert_eq!(
        log_item.err_val,
        Some(Cow::Borrowed("\"connection refused\""))
    );
}

#[test]
fn validation_status_sets_kind() {
    let good = LogItem::new("ocsp", "good", "check_ocsp", "src/test.rs", 1)
        .validation_status(validation_codes::OCSP_GOOD);
    assert_eq!(good.kind, LogKind::Success);

    let unavailable = LogItem::new("ocsp", "timeout", "check_ocsp", "src/test.rs", 1)
        .validation_status(validation_codes::OCSP_UNAVAILABLE);
    assert_eq!(unavailable.kind, LogKind::Informational);

    let revoked = LogItem::new("ocsp", "revoked", "check_ocsp", "src/test.rs", 1)
        .validation_status(validation_codes::OCSP_REVOKED);
    assert_eq!(revoked.kind, LogKind::Failure);
}

#[test]
fn r#macro() {
    let log = log_item!("chain", "trusted", "validate_chain");

    assert_eq!(log.label, Cow::Borrowed("chain"));
    assert_eq!(log.file, Cow::Borrowed(file!()));
    assert_eq!(log.function, Cow::Borrowed("validate_chain"));
    assert!(log.line > 2);
}

#[test]
fn success_and_failure_set_kind() {
    let mut tracker = StatusTracker::default();

    log_item!("chain", "trusted", "validate_chain").success(&mut tracker);
    log_item!("crl", "revoked", "check_crl").failure_no_throw(&mut tracker, "revoked");

    let items = tracker.logged_items();
    assert_eq!(items[0].kind, LogKind::Success);
    assert_eq!(items[1].kind, LogKind::Failure);
    assert_eq!(items[1].err_val, Some(Cow::Borrowed("\"revoked\"")));
}

#[test]
fn serde_round_trip_keeps_owned_strings() {
    let log = log_item!("ocsp", format!("status for serial {}", 42), "check_ocsp")
        .validation_status(validation_codes::OCSP_GOOD);

    let json = serde_json::to_string(&log).unwrap();
    assert!(json.contains("\"kind\":\"success\""));
    assert!(!json.contains("err_val"));

    let back: LogItem = serde_json::from_str(&json).unwrap();
    assert_eq!(back, log);
}

#[test]
fn impl_clone() {
    // Generate coverage for the #[derive(...)] line.
    let li1 = log_item!("test1", "test item 1", "test func");
    let li2 = li1.clone();

    assert_eq!(li1, li2);
}
