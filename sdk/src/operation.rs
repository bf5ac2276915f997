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

//! Validation operation descriptors: kinds, triggers, and options.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signature::SignatureId;

/// The kinds of work the orchestrator performs on a signature.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// Verify the signature and derive its validity.
    ValidateSignature,

    /// Run the CRL, OCSP and chain checks on the signer certificate.
    VerifyCertificate,

    /// Verify the time-stamp evidence and obtain a new token if needed.
    RefreshTimestamp,

    /// Re-validate the signer certificate's chain only.
    VerifyTrustChain,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ValidateSignature => "validateSignature",
            Self::VerifyCertificate => "verifyCertificate",
            Self::RefreshTimestamp => "refreshTimestamp",
            Self::VerifyTrustChain => "verifyTrustChain",
        })
    }
}

/// What caused an operation to be enqueued.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// A document was signed.
    Signed,

    /// The periodic re-verification.
    Scheduled,

    /// An explicit request.
    #[default]
    Manual,
}

/// Options of a [`ValidationOperation`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOptions {
    /// For [`OperationKind::RefreshTimestamp`]: request a new token even if
    /// the current one verifies.
    pub force_time_stamp_refresh: bool,

    /// What caused the operation.
    pub trigger: Trigger,
}

/// One unit of work for the orchestrator.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOperation {
    /// The signature to work on.
    pub signature_id: SignatureId,

    /// What to do.
    pub kind: OperationKind,

    /// Options.
    pub options: OperationOptions,
}

impl ValidationOperation {
    /// An operation with default options.
    pub fn new(signature_id: SignatureId, kind: OperationKind) -> Self {
        Self {
            signature_id,
            kind,
            options: OperationOptions::default(),
        }
    }

    /// Record what caused the operation.
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.options.trigger = trigger;
        self
    }

    /// Request a new time-stamp token even if the current one verifies.
    pub fn force_time_stamp_refresh(mut self) -> Self {
        self.options.force_time_stamp_refresh = true;
        self
    }
}
