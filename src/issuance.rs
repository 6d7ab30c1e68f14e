//! Creator credential issuance.
//!
//! [CredentialIssuer::issue] is the only path from a holder's form data to a persisted
//! credential reference. It runs the [gate](crate::gate) first and stops at the first failure,
//! so a rejected subject never reaches the store or the token issuer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    config::IssuanceConfig,
    core::{
        record::{CredentialRef, RecordUpdate},
        subject::{CredentialSubject, ValidatedSubject},
    },
    gate::{self, Rejection},
    session::HolderSession,
    store::{MetadataStore, StoreError},
    token::{Operation, SignedToken, TokenError, TokenIssuer},
};

pub const W3C_CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const CREDENTIAL_TYPE: &str = "CreatorCredential";
pub const SCHEMA_VALIDATOR_TYPE: &str = "JsonSchemaValidator2018";

#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("holder '{holder}' already holds credential '{credential}'")]
    AlreadyIssued {
        holder: String,
        credential: CredentialRef,
    },
    #[error("failed to generate authentication token: {0}")]
    Token(#[from] TokenError),
    #[error("credential issuance failed: invalid credential generated")]
    InvalidCredential,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialIssuerRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedSubject {
    pub id: String,
    pub username: String,
    pub name: String,
    pub age: i64,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    pub id: String,
    #[serde(rename = "type")]
    pub schema_type: String,
}

/// A W3C verifiable credential document, before it is signed by the issuance service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: CredentialIssuerRef,
    pub issuance_date: DateTime<Utc>,
    pub credential_subject: IssuedSubject,
    pub credential_schema: CredentialSchema,
}

impl CredentialDocument {
    fn build(config: &IssuanceConfig, subject: &ValidatedSubject, now: DateTime<Utc>) -> Self {
        let context = std::iter::once(W3C_CREDENTIALS_CONTEXT.to_owned())
            .chain(config.contexts.iter().map(|url| url.to_string()))
            .collect();

        Self {
            context,
            id: credential_id(subject.holder_id(), now),
            types: vec!["VerifiableCredential".to_owned(), CREDENTIAL_TYPE.to_owned()],
            issuer: CredentialIssuerRef {
                id: config.issuer_did.clone(),
            },
            issuance_date: now,
            credential_subject: IssuedSubject {
                id: subject.holder_id().to_owned(),
                username: subject.username().to_owned(),
                name: subject.name().to_owned(),
                age: subject.age(),
                location: subject.location().to_owned(),
            },
            credential_schema: CredentialSchema {
                id: config.schema_id.clone(),
                schema_type: SCHEMA_VALIDATOR_TYPE.to_owned(),
            },
        }
    }
}

/// `creator-<unix millis>-<last six characters of the holder>`.
fn credential_id(holder_id: &str, now: DateTime<Utc>) -> String {
    let suffix = holder_id
        .char_indices()
        .rev()
        .nth(5)
        .map_or(holder_id, |(i, _)| &holder_id[i..]);
    format!("creator-{}-{suffix}", now.timestamp_millis())
}

/// Everything the holder's client needs to complete issuance with the service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredential {
    pub credential: CredentialDocument,
    pub auth_token: SignedToken,
    pub program_id: String,
    pub schema_id: String,
}

#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn MetadataStore + Send + Sync>,
    token_issuer: Arc<dyn TokenIssuer + Send + Sync>,
    config: IssuanceConfig,
}

impl CredentialIssuer {
    pub fn new(
        store: Arc<dyn MetadataStore + Send + Sync>,
        token_issuer: Arc<dyn TokenIssuer + Send + Sync>,
        config: IssuanceConfig,
    ) -> Self {
        Self {
            store,
            token_issuer,
            config,
        }
    }

    /// Issue a creator credential to the session's holder.
    pub async fn issue(
        &self,
        session: &HolderSession,
        subject: &CredentialSubject,
    ) -> Result<IssuedCredential, IssuanceError> {
        let validated = gate::validate_subject(session.holder_id(), subject)?;
        let holder = validated.holder_id();

        if let Some(credential) = self
            .store
            .get(holder)
            .await?
            .and_then(|record| record.credential_ref)
        {
            return Err(IssuanceError::AlreadyIssued {
                holder: holder.to_owned(),
                credential,
            });
        }

        self.store
            .upsert(holder, RecordUpdate::admit(&validated))
            .await?;

        let auth_token = self
            .token_issuer
            .mint(
                holder,
                Operation::Issuance,
                self.token_issuer.default_lifetime(),
            )
            .await
            .map_err(|e| {
                error!(holder, "issuance token could not be minted: {e}");
                e
            })?;

        let credential = CredentialDocument::build(&self.config, &validated, Utc::now());
        if credential.id.trim().is_empty() {
            error!(holder, "generated credential has no id");
            return Err(IssuanceError::InvalidCredential);
        }

        // A concurrent issuance may have set the reference since the check above.
        self.store
            .upsert(holder, RecordUpdate::issued(credential.id.clone()))
            .await
            .map_err(|e| match e {
                StoreError::AlreadyIssued { holder, existing } => IssuanceError::AlreadyIssued {
                    holder,
                    credential: existing,
                },
                other => IssuanceError::Store(other),
            })?;

        info!(holder, credential = %credential.id, "creator credential issued");

        Ok(IssuedCredential {
            credential,
            auth_token,
            program_id: self.config.schema_id.clone(),
            schema_id: self.config.schema_id.clone(),
        })
    }
}
