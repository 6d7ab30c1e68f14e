//! The issuance gate.
//!
//! Nothing may be persisted or sent for issuance unless [validate] accepted the subject first.
//! Rules are checked in a fixed order and the first failing rule is reported:
//!
//! 1. holder identifier and subject are both present;
//! 2. every mandatory field is present and non-blank (all missing fields are named);
//! 3. the trimmed username is at least [MIN_USERNAME_LEN] characters;
//! 4. the holder is at least [MIN_AGE] years old.
//!
//! The gate is pure: it never touches the store or the verification service.

use tracing::warn;

use crate::{
    core::subject::{CredentialSubject, IssuanceRequest, SubjectField, ValidatedSubject},
    utils::NonEmptyVec,
};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_AGE: i64 = 18;

/// Why the gate refused a subject.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing required data")]
    MissingRequiredData,
    #[error("missing fields: {}", join_fields(.0))]
    MissingFields(NonEmptyVec<SubjectField>),
    #[error("username too short")]
    UsernameTooShort,
    #[error("underage")]
    Underage { age: i64 },
}

fn join_fields(fields: &NonEmptyVec<SubjectField>) -> String {
    fields
        .iter()
        .map(SubjectField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a complete issuance request body.
pub fn validate(request: &IssuanceRequest) -> Result<ValidatedSubject, Rejection> {
    let holder = request
        .wallet_address
        .as_deref()
        .filter(|holder| !holder.trim().is_empty());

    let (Some(holder), Some(subject)) = (holder, request.credential_subject.as_ref()) else {
        warn!(
            has_holder = holder.is_some(),
            has_subject = request.credential_subject.is_some(),
            "issuance blocked: missing required data"
        );
        return Err(Rejection::MissingRequiredData);
    };

    validate_subject(holder, subject)
}

/// Validate a subject for a holder that is already known, e.g. from a
/// [HolderSession](crate::session::HolderSession).
pub fn validate_subject(
    holder_id: &str,
    subject: &CredentialSubject,
) -> Result<ValidatedSubject, Rejection> {
    if holder_id.trim().is_empty() {
        return Err(Rejection::MissingRequiredData);
    }

    if let Some(missing) = NonEmptyVec::maybe_new(subject.missing_fields()) {
        warn!(holder = holder_id, missing = %join_fields(&missing), "issuance blocked: missing fields");
        return Err(Rejection::MissingFields(missing));
    }

    // Presence of every field was established above.
    let (Some(username), Some(name), Some(age), Some(location), Some(creator)) = (
        subject.username.as_deref(),
        subject.name.as_deref(),
        subject.age,
        subject.location.as_deref(),
        subject.creator,
    ) else {
        return Err(Rejection::MissingRequiredData);
    };

    let username = username.trim();
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(Rejection::UsernameTooShort);
    }

    if age < MIN_AGE {
        return Err(Rejection::Underage { age });
    }

    Ok(ValidatedSubject::new(
        holder_id.to_owned(),
        username.to_owned(),
        name.to_owned(),
        age,
        location.to_owned(),
        creator,
    ))
}
