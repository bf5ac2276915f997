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

use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Utc};

/// Values that expire at a fixed point in time.
///
/// Time is passed in by the caller so that expiry follows the engine's
/// [`Clock`](crate::Clock).
pub(crate) struct TtlCache<V> {
    entries: Mutex<HashMap<String, (V, DateTime<Utc>)>>,
}

impl<V: Clone> TtlCache<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The value stored under `key`, unless it expired at or before `now`.
    pub(crate) fn get(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        match entries.get(key) {
            Some((value, expires_at)) if now < *expires_at => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn insert(&self, key: &str, value: V, expires_at: DateTime<Utc>) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        entries.insert(key.to_string(), (value, expires_at));
    }
}

/// `now + ttl`, but no later than `next_update`.
pub(crate) fn expiry(
    now: DateTime<Utc>,
    ttl_secs: u64,
    next_update: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let by_ttl = i64::try_from(ttl_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    match next_update {
        Some(next) if next < by_ttl => next,
        _ => by_ttl,
    }
}
