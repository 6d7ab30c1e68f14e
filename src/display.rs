//! Presentation-ready projections of credential data. Nothing here performs I/O.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    outcome::DisplayStatus,
    record::{LocalVerificationTag, StoredCredentialRecord},
};

const UNKNOWN: &str = "Unknown";
const PENDING_ID: &str = "pending";

/// Status as known from local bookkeeping alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalCredentialStatus {
    Pending,
    Issued,
    Verified,
    Expired,
}

impl LocalCredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalCredentialStatus::Pending => "pending",
            LocalCredentialStatus::Issued => "issued",
            LocalCredentialStatus::Verified => "verified",
            LocalCredentialStatus::Expired => "expired",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            LocalCredentialStatus::Verified => "green",
            LocalCredentialStatus::Issued => "blue",
            LocalCredentialStatus::Pending => "yellow",
            LocalCredentialStatus::Expired => "red",
        }
    }
}

impl fmt::Display for LocalCredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is known about a holder's credential without asking the verification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialInfo {
    pub id: String,
    pub username: String,
    pub name: String,
    pub age: Option<i64>,
    pub location: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub status: LocalCredentialStatus,
    pub schema_id: String,
}

impl CredentialInfo {
    /// Project a stored record.
    ///
    /// Age and location live only inside the issued credential, so they are unknown here.
    pub fn from_record(record: &StoredCredentialRecord, schema_id: &str) -> Self {
        let status = match (record.verification_tag, &record.credential_ref) {
            (LocalVerificationTag::Verified, _) => LocalCredentialStatus::Verified,
            (_, Some(_)) => LocalCredentialStatus::Issued,
            (_, None) => LocalCredentialStatus::Pending,
        };

        Self {
            id: record
                .credential_ref
                .as_ref()
                .map_or_else(|| PENDING_ID.to_owned(), |r| r.as_str().to_owned()),
            username: record
                .username
                .clone()
                .unwrap_or_else(|| placeholder_username(&record.holder_id)),
            name: record
                .display_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_owned()),
            age: None,
            location: None,
            issued_at: record.created_at,
            status,
            schema_id: schema_id.to_owned(),
        }
    }
}

/// `creator_` followed by the first eight characters of the holder identifier.
pub fn placeholder_username(holder_id: &str) -> String {
    format!("creator_{}", holder_id.chars().take(8).collect::<String>())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub text: String,
    pub color: &'static str,
}

impl From<DisplayStatus> for StatusBadge {
    fn from(status: DisplayStatus) -> Self {
        Self {
            text: status.label().to_uppercase(),
            color: status.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCard {
    pub title: &'static str,
    pub subtitle: String,
    pub fields: Vec<CardField>,
    pub status_badge: StatusBadge,
}

pub fn format_credential(info: &CredentialInfo) -> CredentialCard {
    let handle = format!("@{}", info.username);
    let field = |label, value: String| CardField { label, value };

    CredentialCard {
        title: "Creator Credential",
        subtitle: handle.clone(),
        fields: vec![
            field("Name", info.name.clone()),
            field("Username", handle),
            field(
                "Age",
                info.age.map_or_else(|| UNKNOWN.to_owned(), |age| age.to_string()),
            ),
            field(
                "Location",
                info.location.clone().unwrap_or_else(|| UNKNOWN.to_owned()),
            ),
            field("Issued", info.issued_at.format("%Y-%m-%d").to_string()),
            field("Schema ID", info.schema_id.clone()),
        ],
        status_badge: StatusBadge {
            text: info.status.as_str().to_uppercase(),
            color: info.status.color(),
        },
    }
}

/// Like [format_credential], with the badge showing the reconciled status.
pub fn format_reconciled(info: &CredentialInfo, status: DisplayStatus) -> CredentialCard {
    CredentialCard {
        status_badge: status.into(),
        ..format_credential(info)
    }
}
