use std::{fmt, str::FromStr};

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};

/// Live attestation returned by the verification service.
///
/// This is never persisted and must not be confused with the locally tracked
/// [LocalVerificationTag](crate::core::record::LocalVerificationTag), which is bookkeeping only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationOutcome {
    Compliant,
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
    Pending,
    Revoking,
    Revoked,
    Expired,
    NotFound,
    /// Local or transport failure. Not a negative attestation.
    #[serde(rename = "error")]
    Error,
}

impl VerificationOutcome {
    pub const ALL: [VerificationOutcome; 8] = [
        VerificationOutcome::Compliant,
        VerificationOutcome::NonCompliant,
        VerificationOutcome::Pending,
        VerificationOutcome::Revoking,
        VerificationOutcome::Revoked,
        VerificationOutcome::Expired,
        VerificationOutcome::NotFound,
        VerificationOutcome::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationOutcome::Compliant => "Compliant",
            VerificationOutcome::NonCompliant => "Non-Compliant",
            VerificationOutcome::Pending => "Pending",
            VerificationOutcome::Revoking => "Revoking",
            VerificationOutcome::Revoked => "Revoked",
            VerificationOutcome::Expired => "Expired",
            VerificationOutcome::NotFound => "NotFound",
            VerificationOutcome::Error => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, VerificationOutcome::Error)
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::ALL.into_iter().find(|outcome| outcome.as_str() == s) {
            Some(outcome) => Ok(outcome),
            None => bail!("unknown verification status '{s}'"),
        }
    }
}

/// A live check result with the optional detail the service attaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    #[serde(rename = "status")]
    pub outcome: VerificationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationResult {
    pub fn new(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            transaction_hash: None,
            timestamp: None,
            message: None,
        }
    }

    /// The `error` tag, carrying a description of the local failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(VerificationOutcome::Error)
        }
    }

    /// Whether the service attested the credential as currently valid.
    pub fn has_credential(&self) -> bool {
        self.outcome == VerificationOutcome::Compliant
    }
}

/// Presentation-facing status merged from the stored record and the live check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    NotIssued,
    Issued,
    Verified,
    Expired,
    Error,
}

impl DisplayStatus {
    /// Merge record presence with a live outcome.
    ///
    /// A local record is necessary but not sufficient for `verified`: only a live `Compliant`
    /// upgrades it. Without a local record the result is `not_issued`, unless the live check
    /// itself failed, which is surfaced as `error` so outages are not shown as "no credential".
    pub fn derive(record_present: bool, outcome: VerificationOutcome) -> Self {
        use VerificationOutcome as V;

        match (record_present, outcome) {
            (true, V::Compliant) => DisplayStatus::Verified,
            (true, V::Expired) => DisplayStatus::Expired,
            (true, _) => DisplayStatus::Issued,
            (false, V::Error) => DisplayStatus::Error,
            (false, _) => DisplayStatus::NotIssued,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::NotIssued => "not_issued",
            DisplayStatus::Issued => "issued",
            DisplayStatus::Verified => "verified",
            DisplayStatus::Expired => "expired",
            DisplayStatus::Error => "error",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayStatus::NotIssued => "Not issued",
            DisplayStatus::Issued => "Issued",
            DisplayStatus::Verified => "Verified",
            DisplayStatus::Expired => "Expired",
            DisplayStatus::Error => "Unavailable",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            DisplayStatus::Verified => "green",
            DisplayStatus::Issued => "blue",
            DisplayStatus::Expired => "red",
            DisplayStatus::NotIssued | DisplayStatus::Error => "gray",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
