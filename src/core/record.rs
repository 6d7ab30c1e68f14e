use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{core::subject::ValidatedSubject, utils::NonEmptyVec};

/// Reference to a credential issued for a holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    /// Returns `None` for a blank reference.
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return None;
        }
        Some(Self(reference))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verification bookkeeping kept alongside the record.
///
/// This tag is not authoritative. Status shown to users always comes from the live
/// [VerificationOutcome](crate::core::outcome::VerificationOutcome).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalVerificationTag {
    #[default]
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Audio,
    Image,
    Mixed,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Video,
        ContentType::Audio,
        ContentType::Image,
        ContentType::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Image => "image",
            ContentType::Mixed => "mixed",
        }
    }
}

/// Audience age group a creator's content is suitable for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "all-ages")]
    AllAges,
    #[serde(rename = "18+")]
    Adults,
    #[serde(rename = "21+")]
    Over21,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::AllAges, AgeGroup::Adults, AgeGroup::Over21];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::AllAges => "all-ages",
            AgeGroup::Adults => "18+",
            AgeGroup::Over21 => "21+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPreference {
    Username,
    Realname,
}

impl DisplayPreference {
    pub const ALL: [DisplayPreference; 2] = [DisplayPreference::Username, DisplayPreference::Realname];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayPreference::Username => "username",
            DisplayPreference::Realname => "realname",
        }
    }
}

/// Content-policy and presentation settings of a creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorProfile {
    pub about: String,
    pub content_type: ContentType,
    pub supported_ages: NonEmptyVec<AgeGroup>,
    pub display_preference: DisplayPreference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_cid: Option<String>,
}

/// Durable issuance metadata for one holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentialRecord {
    pub holder_id: String,
    /// `None` until a credential has been issued.
    #[serde(default)]
    pub credential_ref: Option<CredentialRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub verification_tag: LocalVerificationTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<CreatorProfile>,
}

impl StoredCredentialRecord {
    pub fn is_issued(&self) -> bool {
        self.credential_ref.is_some()
    }
}

/// A partial write to a [StoredCredentialRecord]. Fields left as `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub credential_ref: Option<String>,
    pub verification_tag: Option<LocalVerificationTag>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile: Option<CreatorProfile>,
    admitted: bool,
}

impl RecordUpdate {
    /// The write made right after the issuance gate accepted `subject`.
    ///
    /// This is the only kind of update allowed to create a record.
    pub fn admit(subject: &ValidatedSubject) -> Self {
        Self {
            username: Some(subject.username().to_owned()),
            display_name: Some(subject.name().to_owned()),
            admitted: true,
            ..Default::default()
        }
    }

    /// Mark the record as issued with the given credential reference.
    pub fn issued(credential_ref: impl Into<String>) -> Self {
        Self {
            credential_ref: Some(credential_ref.into()),
            ..Default::default()
        }
    }

    pub fn with_verification_tag(mut self, tag: LocalVerificationTag) -> Self {
        self.verification_tag = Some(tag);
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_profile(mut self, profile: CreatorProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Whether this update was derived from a gate-validated subject.
    pub fn is_admission(&self) -> bool {
        self.admitted
    }
}
