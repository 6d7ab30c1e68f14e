//! The status reconciliation engine.
//!
//! Neither source is authoritative on its own: the verification service knows whether a
//! credential is currently valid but nothing about it, the metadata store knows about it but
//! cannot attest validity. [Reconciler::reconcile] reads both concurrently and merges them with
//! [DisplayStatus::derive].
//!
//! Every failure is absorbed. A failed store read counts as "no record", a failed, timed out or
//! unauthenticated live check counts as the `error` outcome, and the caller always receives a
//! [Reconciliation].

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    config::DEFAULT_VERIFICATION_TIMEOUT_SECS,
    core::{
        outcome::{DisplayStatus, VerificationResult},
        record::StoredCredentialRecord,
    },
    store::MetadataStore,
    token::{Operation, TokenIssuer},
    verification::VerificationClient,
};

/// The merged view of one holder's credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub record: Option<StoredCredentialRecord>,
    pub verification: VerificationResult,
    pub display: DisplayStatus,
}

impl Reconciliation {
    fn failed(reason: &str) -> Self {
        Self {
            record: None,
            verification: VerificationResult::error(reason),
            display: DisplayStatus::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<dyn MetadataStore + Send + Sync>,
    token_issuer: Arc<dyn TokenIssuer + Send + Sync>,
    verification_client: Option<Arc<dyn VerificationClient + Send + Sync>>,
    program_id: String,
    timeout: Duration,
}

impl Reconciler {
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::default()
    }

    /// Merge the stored record and the live verification status of `holder_id`.
    ///
    /// Both reads are in flight at the same time, so latency is bounded by the slower of the
    /// two. Dropping the returned future abandons both reads; nothing is written.
    pub async fn reconcile(&self, holder_id: &str) -> Reconciliation {
        let holder_id = holder_id.trim();
        if holder_id.is_empty() {
            warn!("reconciliation requested without a holder");
            return Reconciliation::failed("holder identifier is required");
        }

        let (record, verification) =
            tokio::join!(self.stored_record(holder_id), self.live_status(holder_id));

        let status = DisplayStatus::derive(record.is_some(), verification.outcome);
        info!(
            holder = holder_id,
            has_record = record.is_some(),
            outcome = %verification.outcome,
            display = %status,
            "reconciled credential status"
        );

        Reconciliation {
            record,
            verification,
            display: status,
        }
    }

    async fn stored_record(&self, holder_id: &str) -> Option<StoredCredentialRecord> {
        match self.store.get(holder_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(holder = holder_id, "credential metadata lookup failed: {e}");
                None
            }
        }
    }

    async fn live_status(&self, holder_id: &str) -> VerificationResult {
        let Some(client) = &self.verification_client else {
            warn!(holder = holder_id, "no verification client configured");
            return VerificationResult::error("verification service unavailable");
        };

        let check = async {
            let token = match self
                .token_issuer
                .mint(
                    holder_id,
                    Operation::Verification,
                    self.token_issuer.default_lifetime(),
                )
                .await
            {
                Ok(token) => token,
                Err(e) => {
                    error!(
                        holder = holder_id,
                        configuration = e.is_configuration(),
                        "unable to mint verification token: {e}"
                    );
                    return VerificationResult::error(format!(
                        "failed to generate verification token: {e}"
                    ));
                }
            };
            client.verify(holder_id, &token, &self.program_id).await
        };

        match tokio::time::timeout(self.timeout, check).await {
            Ok(result) => result,
            Err(_) => {
                warn!(holder = holder_id, timeout = ?self.timeout, "live verification timed out");
                VerificationResult::error("verification timed out")
            }
        }
    }
}

/// Builder struct for [Reconciler].
#[derive(Debug, Clone, Default)]
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn MetadataStore + Send + Sync>>,
    token_issuer: Option<Arc<dyn TokenIssuer + Send + Sync>>,
    verification_client: Option<Arc<dyn VerificationClient + Send + Sync>>,
    program_id: Option<String>,
    timeout: Option<Duration>,
}

impl ReconcilerBuilder {
    pub fn build(self) -> Result<Reconciler> {
        let Self {
            store,
            token_issuer,
            verification_client,
            program_id,
            timeout,
        } = self;

        let Some(store) = store else {
            bail!("metadata store is required, see `with_store`")
        };

        let Some(token_issuer) = token_issuer else {
            bail!("token issuer is required, see `with_token_issuer`")
        };

        let Some(program_id) = program_id.filter(|id| !id.trim().is_empty()) else {
            bail!("verification program id is required, see `with_program_id`")
        };

        if verification_client.is_none() {
            warn!("reconciler built without a verification client, live checks will report errors");
        }

        Ok(Reconciler {
            store,
            token_issuer,
            verification_client,
            program_id,
            timeout: timeout.unwrap_or(Duration::from_secs(DEFAULT_VERIFICATION_TIMEOUT_SECS)),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn MetadataStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_token_issuer(mut self, token_issuer: Arc<dyn TokenIssuer + Send + Sync>) -> Self {
        self.token_issuer = Some(token_issuer);
        self
    }

    /// Without a client every live check reports the `error` outcome.
    pub fn with_verification_client(
        mut self,
        client: Arc<dyn VerificationClient + Send + Sync>,
    ) -> Self {
        self.verification_client = Some(client);
        self
    }

    pub fn with_program_id(mut self, program_id: impl Into<String>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }

    /// Upper bound for minting the token plus the live call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
