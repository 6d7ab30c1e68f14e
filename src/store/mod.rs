//! Persistence boundary for credential metadata.
//!
//! Records are keyed by holder identifier, written by partial upsert and never deleted. The
//! rules in [apply_update] are enforced at this boundary regardless of what the caller checked:
//!
//! - only an admission write (built from a gate-validated subject) may create a record;
//! - marking a record as issued requires a non-blank credential reference;
//! - once set, the credential reference never changes.

use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::record::{CredentialRef, RecordUpdate, StoredCredentialRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no record exists for holder '{0}' and the write did not pass the issuance gate")]
    NotAdmitted(String),
    #[error("a credential reference is required to mark a record as issued")]
    MissingCredentialReference,
    #[error("holder '{holder}' already holds credential '{existing}'")]
    AlreadyIssued {
        holder: String,
        existing: CredentialRef,
    },
    #[error("storage backend failure: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Storage interface for credential metadata.
#[async_trait]
pub trait MetadataStore: Debug {
    /// Read the record for a holder, if one exists.
    async fn get(&self, holder_id: &str) -> Result<Option<StoredCredentialRecord>, StoreError>;

    /// Create or partially update the record for a holder.
    ///
    /// Implementations must apply the update with [apply_update].
    async fn upsert(
        &self,
        holder_id: &str,
        update: RecordUpdate,
    ) -> Result<StoredCredentialRecord, StoreError>;
}

/// Apply `update` to the current state of a holder's record.
pub fn apply_update(
    existing: Option<StoredCredentialRecord>,
    holder_id: &str,
    update: RecordUpdate,
    now: DateTime<Utc>,
) -> Result<StoredCredentialRecord, StoreError> {
    let mut record = match existing {
        Some(record) => record,
        None if update.is_admission() => StoredCredentialRecord {
            holder_id: holder_id.to_owned(),
            credential_ref: None,
            created_at: now,
            updated_at: now,
            verification_tag: Default::default(),
            username: None,
            display_name: None,
            profile: None,
        },
        None => {
            warn!(holder = holder_id, "refusing to create record without admission");
            return Err(StoreError::NotAdmitted(holder_id.to_owned()));
        }
    };

    let RecordUpdate {
        credential_ref,
        verification_tag,
        username,
        display_name,
        profile,
        ..
    } = update;

    if let Some(reference) = credential_ref {
        let reference =
            CredentialRef::new(reference).ok_or(StoreError::MissingCredentialReference)?;
        match &record.credential_ref {
            Some(existing) if *existing != reference => {
                warn!(holder = holder_id, %existing, "refusing to replace credential reference");
                return Err(StoreError::AlreadyIssued {
                    holder: holder_id.to_owned(),
                    existing: existing.clone(),
                });
            }
            Some(_) => {}
            None => {
                debug!(holder = holder_id, %reference, "record marked as issued");
                record.credential_ref = Some(reference);
            }
        }
    }

    if let Some(tag) = verification_tag {
        record.verification_tag = tag;
    }
    if let Some(username) = username {
        record.username = Some(username);
    }
    if let Some(display_name) = display_name {
        record.display_name = Some(display_name);
    }
    if let Some(profile) = profile {
        record.profile = Some(profile);
    }
    record.updated_at = now;

    Ok(record)
}

/// A local in-memory store.
///
/// # Warning
/// Records live only as long as the process; this will not work for a distributed deployment.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    store: Arc<Mutex<BTreeMap<String, StoredCredentialRecord>>>,
}

impl MemoryStore {
    /// A store pre-populated with existing records, e.g. loaded from a fixture.
    pub fn with_records(records: impl IntoIterator<Item = StoredCredentialRecord>) -> Self {
        let store = records
            .into_iter()
            .map(|record| (record.holder_id.clone(), record))
            .collect();
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, holder_id: &str) -> Result<Option<StoredCredentialRecord>, StoreError> {
        Ok(self.store.lock().await.get(holder_id).cloned())
    }

    async fn upsert(
        &self,
        holder_id: &str,
        update: RecordUpdate,
    ) -> Result<StoredCredentialRecord, StoreError> {
        let mut store = self.store.lock().await;
        let record = apply_update(store.get(holder_id).cloned(), holder_id, update, Utc::now())?;
        store.insert(holder_id.to_owned(), record.clone());
        Ok(record)
    }
}
