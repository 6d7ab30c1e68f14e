//! Creator profile edits.
//!
//! A profile can only be attached to a record that already carries a credential reference.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    core::record::{
        AgeGroup, ContentType, CreatorProfile, DisplayPreference, LocalVerificationTag,
        RecordUpdate, StoredCredentialRecord,
    },
    display::placeholder_username,
    session::HolderSession,
    store::{MetadataStore, StoreError},
    utils::NonEmptyVec,
};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("cannot save creator profile: a valid credential reference is required")]
    NotIssued,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(NonEmptyVec<&'static str>),
    #[error("invalid content type '{0}', must be one of: video, audio, image, mixed")]
    InvalidContentType(String),
    #[error("invalid age groups: {}, must be one of: all-ages, 18+, 21+", .0.join(", "))]
    InvalidAgeGroups(NonEmptyVec<String>),
    #[error("invalid display preference '{0}', must be one of: username, realname")]
    InvalidDisplayPreference(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Profile form data as submitted by a creator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSubmission {
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub supported_ages: Option<Vec<String>>,
    #[serde(default)]
    pub display_preference: Option<String>,
    #[serde(default, alias = "imageIpfs")]
    pub image_cid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

impl ProfileSubmission {
    /// Check required fields and allowed values.
    pub fn validate(&self) -> Result<CreatorProfile, ProfileError> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let about = present(&self.about);
        let content_type = present(&self.content_type);
        let ages = self.supported_ages.as_deref().filter(|ages| !ages.is_empty());
        let preference = present(&self.display_preference);

        let missing: Vec<&'static str> = [
            ("about", about.is_none()),
            ("contentType", content_type.is_none()),
            ("supportedAges", ages.is_none()),
            ("displayPreference", preference.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();
        if let Some(missing) = NonEmptyVec::maybe_new(missing) {
            return Err(ProfileError::MissingFields(missing));
        }

        let about = about.unwrap_or_default();
        let content_type = content_type.unwrap_or_default();
        let ages = ages.unwrap_or_default();
        let preference = preference.unwrap_or_default();

        let content_type = ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == content_type)
            .ok_or_else(|| ProfileError::InvalidContentType(content_type.to_owned()))?;

        let mut supported_ages = Vec::with_capacity(ages.len());
        let mut invalid = Vec::new();
        for age in ages {
            match AgeGroup::ALL.into_iter().find(|g| g.as_str() == age.as_str()) {
                Some(group) => supported_ages.push(group),
                None => invalid.push(age.clone()),
            }
        }
        if let Some(invalid) = NonEmptyVec::maybe_new(invalid) {
            return Err(ProfileError::InvalidAgeGroups(invalid));
        }

        let display_preference = DisplayPreference::ALL
            .into_iter()
            .find(|p| p.as_str() == preference)
            .ok_or_else(|| ProfileError::InvalidDisplayPreference(preference.to_owned()))?;

        Ok(CreatorProfile {
            about: about.to_owned(),
            content_type,
            supported_ages: NonEmptyVec::maybe_new(supported_ages)
                .ok_or_else(|| ProfileError::MissingFields(NonEmptyVec::new("supportedAges")))?,
            display_preference,
            image_cid: present(&self.image_cid).map(str::to_owned),
        })
    }
}

/// Name shown for a creator, following their display preference.
pub fn display_name(
    holder_id: &str,
    preference: DisplayPreference,
    username: Option<&str>,
    real_name: Option<&str>,
) -> String {
    fn nonblank(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    match (preference, nonblank(real_name), nonblank(username)) {
        (DisplayPreference::Realname, Some(real_name), _) => real_name.to_owned(),
        (_, _, Some(username)) => format!("@{username}"),
        _ => placeholder_username(holder_id),
    }
}

#[derive(Debug, Clone)]
pub struct ProfileEditor {
    store: Arc<dyn MetadataStore + Send + Sync>,
}

impl ProfileEditor {
    pub fn new(store: Arc<dyn MetadataStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Validate and save the profile of the session's holder.
    ///
    /// Saving resets the local verification tag to `pending`.
    pub async fn save(
        &self,
        session: &HolderSession,
        submission: &ProfileSubmission,
    ) -> Result<StoredCredentialRecord, ProfileError> {
        let holder = session.holder_id();

        let Some(record) = self.store.get(holder).await?.filter(|r| r.is_issued()) else {
            warn!(holder, "profile save attempted without an issued credential");
            return Err(ProfileError::NotIssued);
        };

        let profile = submission.validate()?;
        let new_username = submission
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let display_name = display_name(
            holder,
            profile.display_preference,
            new_username.or(record.username.as_deref()),
            submission.real_name.as_deref(),
        );

        let mut update = RecordUpdate::default()
            .with_profile(profile)
            .with_display_name(display_name)
            .with_verification_tag(LocalVerificationTag::Pending);
        if let Some(username) = new_username {
            update = update.with_username(username);
        }
        let record = self.store.upsert(holder, update).await?;

        info!(holder, "creator profile saved");
        Ok(record)
    }
}
