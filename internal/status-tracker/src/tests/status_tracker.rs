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

use std::fmt::{self, Display, Formatter};

use crate::{log_item, validation_codes, ErrorBehavior, StatusTracker};

#[test]
fn aggregates_errors() {
    let mut tracker = StatusTracker::default();

    log_item!("chain", "trusted", "test func").success(&mut tracker);

    log_item!("crl", "revoked", "test func")
        .failure(&mut tracker, SampleError {})
        .unwrap();

    assert_eq!(tracker.logged_items().len(), 2);
    assert!(tracker.has_any_error());
    assert!(tracker.has_error(SampleError {}));

    let errors = tracker.take_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(tracker.logged_items().len(), 1);
    assert!(!tracker.has_any_error());
}

#[test]
fn stops_on_first_error() {
    let mut tracker = StatusTracker::with_error_behavior(ErrorBehavior::StopOnFirstError);

    let result = log_item!("crl", "revoked", "test func").failure(&mut tracker, SampleError {});

    assert!(result.is_err());
    assert_eq!(tracker.logged_items().len(), 1);
}

#[test]
fn has_status() {
    let mut tracker = StatusTracker::default();

    log_item!("ocsp", "good", "test func")
        .validation_status(validation_codes::OCSP_GOOD)
        .success(&mut tracker);

    assert!(tracker.has_status(validation_codes::OCSP_GOOD));
    assert!(!tracker.has_status(validation_codes::OCSP_REVOKED));
}

#[test]
fn append() {
    let mut first = StatusTracker::default();
    log_item!("crl", "not revoked", "test func").success(&mut first);

    let mut second = StatusTracker::default();
    log_item!("ocsp", "revoked", "test func").failure_no_throw(&mut second, SampleError {});

    first.append(&second);

    assert_eq!(first.logged_items().len(), 2);
    assert!(first.has_any_error());
    assert_eq!(first.into_items().len(), 2);
}

#[derive(Debug)]
struct SampleError {}

impl Display for SampleError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SampleError")
    }
}
