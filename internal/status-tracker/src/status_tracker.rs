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

use std::fmt::Debug;

use crate::{LogItem, LogKind};

/// A `StatusTracker` collects the outcome of each check performed during a
/// verification pass and controls whether a failing check stops the pass.
#[derive(Debug, Default)]
pub struct StatusTracker {
    error_behavior: ErrorBehavior,
    logged_items: Vec<LogItem>,
}

impl StatusTracker {
    /// Returns a [`StatusTracker`] with the specified [`ErrorBehavior`].
    pub fn with_error_behavior(error_behavior: ErrorBehavior) -> Self {
        Self {
            error_behavior,
            logged_items: vec![],
        }
    }

    /// Returns the current list of log items.
    pub fn logged_items(&self) -> &[LogItem] {
        &self.logged_items
    }

    /// Consumes the tracker and returns its log items.
    pub fn into_items(self) -> Vec<LogItem> {
        self.logged_items
    }

    /// Appends the contents of another [`StatusTracker`] to this one.
    pub fn append(&mut self, other: &StatusTracker) {
        for log_item in other.logged_items() {
            self.add_non_error(log_item.clone());
        }
    }

    /// Adds a non-error [`LogItem`] to this status tracker.
    ///
    /// Primarily intended for use by [`LogItem::success()`]
    /// or [`LogItem::informational()`].
    pub fn add_non_error(&mut self, log_item: LogItem) {
        self.logged_items.push(log_item);
    }

    /// Adds an error-case [`LogItem`] to this status tracker.
    ///
    /// Will return `Err(err)` if configured to stop immediately on errors or
    /// `Ok(())` if configured to continue on errors. _(See [`ErrorBehavior`].)_
    pub fn add_error<E>(&mut self, log_item: LogItem, err: E) -> Result<(), E> {
        self.logged_items.push(log_item);

        match self.error_behavior {
            ErrorBehavior::StopOnFirstError => Err(err),
            ErrorBehavior::ContinueWhenPossible => Ok(()),
        }
    }

    /// Returns the [`LogItem`]s that report a failed check.
    pub fn filter_errors(&self) -> impl Iterator<Item = &LogItem> {
        self.logged_items
            .iter()
            .filter(|item| item.kind == LogKind::Failure)
    }

    /// Removes and returns the [`LogItem`]s that report a failed check.
    pub fn take_errors(&mut self) -> Vec<LogItem> {
        let (errors, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.logged_items)
            .into_iter()
            .partition(|item| item.kind == LogKind::Failure);

        self.logged_items = rest;
        errors
    }

    /// Returns `true` if the log contains a specific status code.
    pub fn has_status(&self, val: &str) -> bool {
        self.logged_items
            .iter()
            .any(|item| item.validation_status.as_deref() == Some(val))
    }

    /// Returns `true` if the log contains a specific error.
    pub fn has_error<E: Debug>(&self, err: E) -> bool {
        let err_type = format!("{:?}", &err);
        self.logged_items
            .iter()
            .any(|item| item.err_val.as_deref() == Some(err_type.as_str()))
    }

    /// Returns `true` if the log contains any failed check.
    pub fn has_any_error(&self) -> bool {
        self.filter_errors().next().is_some()
    }
}

/// `ErrorBehavior` configures the behavior of [`StatusTracker`] when its
/// [`add_error`] function is called.
///
/// [`add_error`]: StatusTracker::add_error
#[derive(Debug, Default, Eq, PartialEq)]
pub enum ErrorBehavior {
    /// If an error is encountered, stop immediately.
    StopOnFirstError,

    /// If an error is encountered, log it and continue with the remaining
    /// checks.
    #[default]
    ContinueWhenPossible,
}
