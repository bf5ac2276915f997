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

use std::{borrow::Cow, fmt::Debug};

use serde::{Deserialize, Serialize};

use crate::StatusTracker;

/// Detailed information about the outcome of one check performed during a
/// verification pass.
///
/// Use the [`log_item`](crate::log_item) macro to create a `LogItem`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LogItem {
    /// Which check or entity this item refers to (for example `"crl"` or a
    /// certificate fingerprint).
    pub label: Cow<'static, str>,

    /// Human-readable description of the outcome.
    pub description: Cow<'static, str>,

    /// Source file where the outcome was recorded.
    pub file: Cow<'static, str>,

    /// Function where the outcome was recorded.
    pub function: Cow<'static, str>,

    /// Source line number where the outcome was recorded.
    pub line: u32,

    /// Error value, formatted via `Debug`, if the check failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_val: Option<Cow<'static, str>>,

    /// Status code from [`validation_codes`](crate::validation_codes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<Cow<'static, str>>,

    /// Whether this item reports success, a notable condition or a failure.
    pub kind: LogKind,
}

/// Classifies a [`LogItem`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LogKind {
    /// The check passed.
    Success,

    /// The check could not produce a definitive answer, or produced one that
    /// is worth noting without being a failure.
    Informational,

    /// The check failed.
    Failure,
}

impl LogItem {
    /// Creates a new `LogItem` without error or status code.
    ///
    /// Most callers should use [`log_item!`](crate::log_item) instead so that
    /// source location is captured automatically.
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        function: impl Into<Cow<'static, str>>,
        file: impl Into<Cow<'static, str>>,
        line: u32,
    ) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            file: file.into(),
            function: function.into(),
            line,
            err_val: None,
            validation_status: None,
            kind: LogKind::Informational,
        }
    }

    /// Captures the description from the value (typically an `Error` enum) as
    /// additional information for this `LogItem`.
    ///
    /// ## Example
    ///
    /// ```
    /// # use std::borrow::Cow;
    /// # use sigtrust_status_tracker::{log_item, LogItem};
    /// let log = log_item!("crl", "CRL fetch failed", "check_crl").error("timed out");
    ///
    /// assert_eq!(log.err_val, Some(Cow::Borrowed("\"timed out\"")));
    /// ```
    pub fn error<E: Debug>(self, err: E) -> Self {
        LogItem {
            err_val: Some(format!("{err:?}").into()),
            ..self
        }
    }

    /// Adds a status code from [`validation_codes`](crate::validation_codes).
    ///
    /// The item's [`LogKind`] is derived from the code.
    ///
    /// ## Example
    ///
    /// ```
    /// # use std::borrow::Cow;
    /// # use sigtrust_status_tracker::{log_item, validation_codes, LogKind};
    /// let log = log_item!("ocsp", "certificate revoked", "check_ocsp")
    ///     .validation_status(validation_codes::OCSP_REVOKED);
    ///
    /// assert_eq!(log.validation_status, Some(Cow::Borrowed("certificate.ocsp.revoked")));
    /// assert_eq!(log.kind, LogKind::Failure);
    /// ```
    pub fn validation_status(self, status: &'static str) -> Self {
        LogItem {
            validation_status: Some(status.into()),
            kind: crate::validation_codes::log_kind(status),
            ..self
        }
    }

    /// Records this item as a passing check.
    pub fn success(mut self, tracker: &mut StatusTracker) {
        self.kind = LogKind::Success;
        tracker.add_non_error(self);
    }

    /// Records this item as a notable, non-failing condition.
    pub fn informational(mut self, tracker: &mut StatusTracker) {
        self.kind = LogKind::Informational;
        tracker.add_non_error(self);
    }

    /// Records this item as a failed check.
    ///
    /// Returns `Err(err)` if the tracker is configured to stop on the first
    /// error.
    pub fn failure<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) -> Result<(), E> {
        self.kind = LogKind::Failure;
        let item = self.error(&err);
        tracker.add_error(item, err)
    }

    /// Records this item as a failed check and never stops processing.
    pub fn failure_no_throw<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) {
        self.kind = LogKind::Failure;
        tracker.add_non_error(self.error(err));
    }
}

/// Creates a [`LogItem`] struct that is annotated with the source file and line
/// number where the condition was discovered.
///
/// Takes three parameters, each of which may be a `'static str` or `String`:
///
/// * `label`: the check or entity this item refers to
/// * `description`: human-readable outcome
/// * `function`: name of the function generating this `LogItem`
///
/// ## Example
///
/// ```
/// # use std::borrow::Cow;
/// # use sigtrust_status_tracker::{log_item, LogItem, LogKind};
/// let log = log_item!("chain", "chain terminates at trust anchor", "validate_chain");
///
/// assert_eq!(log.label, Cow::Borrowed("chain"));
/// assert_eq!(log.file, Cow::Borrowed(file!()));
/// assert_eq!(log.kind, LogKind::Informational);
/// # assert!(log.line > 2);
/// ```
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::LogItem::new($label, $description, $function, file!(), line!())
    }};
}
