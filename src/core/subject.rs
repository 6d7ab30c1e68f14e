use std::fmt;

use serde::{Deserialize, Serialize};

/// Claims a holder asks to have embedded in a creator credential.
///
/// Every field is optional on the wire: the [issuance gate](crate::gate) decides whether the
/// subject is complete, so a partially filled form still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<bool>,
}

impl CredentialSubject {
    /// The mandatory fields that are absent or blank, in declaration order.
    pub fn missing_fields(&self) -> Vec<SubjectField> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, |v| v.trim().is_empty())
        }

        let mut missing = Vec::new();
        if blank(&self.username) {
            missing.push(SubjectField::Username);
        }
        if blank(&self.name) {
            missing.push(SubjectField::Name);
        }
        if self.age.is_none() {
            missing.push(SubjectField::Age);
        }
        if blank(&self.location) {
            missing.push(SubjectField::Location);
        }
        if self.creator.is_none() {
            missing.push(SubjectField::Creator);
        }
        missing
    }
}

/// A mandatory [CredentialSubject] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectField {
    Username,
    Name,
    Age,
    Location,
    Creator,
}

impl SubjectField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectField::Username => "username",
            SubjectField::Name => "name",
            SubjectField::Age => "age",
            SubjectField::Location => "location",
            SubjectField::Creator => "creator",
        }
    }
}

impl fmt::Display for SubjectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an issuance request, as submitted by the holder's client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub credential_subject: Option<CredentialSubject>,
}

/// A [CredentialSubject] that passed every gate rule.
///
/// Only [gate::validate](crate::gate::validate) constructs this type, so holding one is proof
/// that the gate ran for this holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedSubject {
    holder_id: String,
    username: String,
    name: String,
    age: i64,
    location: String,
    creator: bool,
}

impl ValidatedSubject {
    pub(crate) fn new(
        holder_id: String,
        username: String,
        name: String,
        age: i64,
        location: String,
        creator: bool,
    ) -> Self {
        Self {
            holder_id,
            username,
            name,
            age,
            location,
            creator,
        }
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    /// The username with surrounding whitespace removed.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> i64 {
        self.age
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn creator(&self) -> bool {
        self.creator
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_from_client_body() {
        let request: IssuanceRequest = serde_json::from_value(json!({
            "walletAddress": "0xabc123def456",
            "credentialSubject": {
                "username": "maker",
                "name": "Ada",
                "age": 30,
                "location": "Lisbon",
                "creator": true
            }
        }))
        .unwrap();

        let subject = request.credential_subject.unwrap();
        assert_eq!(subject.username.as_deref(), Some("maker"));
        assert!(subject.missing_fields().is_empty());
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let subject = CredentialSubject {
            username: Some("maker".into()),
            name: Some("   ".into()),
            age: Some(20),
            location: Some(String::new()),
            creator: Some(false),
        };

        assert_eq!(
            subject.missing_fields(),
            vec![SubjectField::Name, SubjectField::Location]
        );
    }
}
