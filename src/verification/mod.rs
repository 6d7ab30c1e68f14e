//! Live credential status checks.
//!
//! A [VerificationClient] never fails: transport errors, non-success responses and malformed
//! bodies all come back as the `error` outcome, which the reconciliation engine relies on.

use std::fmt::Debug;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::BaseUrl,
    core::{
        outcome::{VerificationOutcome, VerificationResult},
        util::{base_request, AsyncHttpClient},
    },
    token::SignedToken,
};

#[async_trait]
pub trait VerificationClient: Debug {
    /// Ask the verification service whether `holder_id` holds a valid credential for
    /// `program_id`.
    async fn verify(
        &self,
        holder_id: &str,
        token: &SignedToken,
        program_id: &str,
    ) -> VerificationResult;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    program_id: &'a str,
    wallet_address: &'a str,
}

/// A [VerificationClient] calling the service's `verify` endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpVerificationClient<C> {
    http_client: C,
    endpoint: Url,
}

impl<C> HttpVerificationClient<C>
where
    C: AsyncHttpClient + Debug + Send + Sync,
{
    pub fn new(http_client: C, base: &BaseUrl) -> Result<Self> {
        let endpoint = base
            .join("verify")
            .context("unable to build verification endpoint")?;
        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn exchange(
        &self,
        holder_id: &str,
        token: &SignedToken,
        program_id: &str,
    ) -> Result<VerificationResult> {
        if program_id.trim().is_empty() {
            bail!("verification program id is not configured")
        }

        let body = serde_json::to_vec(&VerifyRequest {
            program_id,
            wallet_address: holder_id,
        })
        .context("failed to encode verification request")?;

        let request = base_request()
            .method("POST")
            .uri(self.endpoint.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token.token))
            .body(body)
            .context("failed to construct verification request")?;

        let response = self
            .http_client
            .execute(request)
            .await
            .context("verification request failed")?;

        let status = response.status();
        let Ok(body) = String::from_utf8(response.into_body()) else {
            bail!("failed to parse verification response as UTF-8 (status: {status})")
        };

        if !status.is_success() {
            bail!("verification request was unsuccessful (status: {status}): {body}")
        }

        let json: Json =
            serde_json::from_str(&body).context("verification response is not JSON")?;
        if let Some(tag) = json.get("status").and_then(Json::as_str) {
            // Surface unknown tags with a clear message rather than a serde error.
            tag.parse::<VerificationOutcome>()?;
        }
        serde_json::from_value(json).context("malformed verification response")
    }
}

#[async_trait]
impl<C> VerificationClient for HttpVerificationClient<C>
where
    C: AsyncHttpClient + Debug + Send + Sync,
{
    async fn verify(
        &self,
        holder_id: &str,
        token: &SignedToken,
        program_id: &str,
    ) -> VerificationResult {
        match self.exchange(holder_id, token, program_id).await {
            Ok(result) => {
                debug!(holder = holder_id, outcome = %result.outcome, "live verification");
                result
            }
            Err(e) => {
                warn!(holder = holder_id, "live verification failed: {e:#}");
                VerificationResult::error(format!("{e:#}"))
            }
        }
    }
}
