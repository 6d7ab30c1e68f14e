//! Upload of creator images to a content-addressed pinning service.
//!
//! Uploads are checked against an [UploadPolicy] before anything is sent.

use std::fmt::Debug;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::config::AssetConfig;

pub const DEFAULT_MAX_ASSET_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/svg+xml",
];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid file type: {0}, only images are allowed")]
    DisallowedType(String),
    #[error("file too large: {size} bytes, maximum size is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("image upload failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Profile,
    Banner,
    Content,
    Thumbnail,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Profile => "profile",
            AssetKind::Banner => "banner",
            AssetKind::Content => "content",
            AssetKind::Thumbnail => "thumbnail",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub kind: AssetKind,
    pub creator_id: Option<String>,
    pub description: Option<String>,
}

impl Debug for AssetUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .field("kind", &self.kind)
            .field("creator_id", &self.creator_id)
            .finish()
    }
}

impl AssetUpload {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub cid: String,
    pub url: Url,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ASSET_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn check(&self, upload: &AssetUpload) -> Result<(), UploadError> {
        if !ALLOWED_IMAGE_TYPES.contains(&upload.mime_type.as_str()) {
            return Err(UploadError::DisallowedType(upload.mime_type.clone()));
        }
        if upload.size() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: upload.size(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
pub trait AssetStore: Debug {
    async fn upload(&self, upload: AssetUpload) -> Result<StoredAsset, UploadError>;

    async fn unpin(&self, cid: &str) -> Result<(), UploadError>;

    /// Retrieval URL of a stored asset.
    fn url_for(&self, cid: &str) -> Result<Url, UploadError>;
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// An [AssetStore] backed by an IPFS pinning service.
#[derive(Debug, Clone)]
pub struct PinningClient {
    http: reqwest::Client,
    config: AssetConfig,
}

impl PinningClient {
    pub fn new(config: AssetConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("unable to build http_client")?;
        Ok(Self { http, config })
    }

    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.config.max_bytes,
        }
    }

    fn metadata(upload: &AssetUpload) -> String {
        json!({
            "name": format!("{}-{}", upload.kind.as_str(), upload.file_name),
            "keyvalues": {
                "creatorId": upload.creator_id.as_deref().unwrap_or_default(),
                "imageType": upload.kind.as_str(),
                "description": upload.description.as_deref().unwrap_or_default(),
                "uploadedAt": Utc::now().to_rfc3339(),
                "fileType": upload.mime_type,
                "originalName": upload.file_name,
            }
        })
        .to_string()
    }

    async fn pin(&self, upload: &AssetUpload) -> anyhow::Result<String> {
        let endpoint = self
            .config
            .api
            .join("pinning/pinFileToIPFS")
            .context("unable to build pinning endpoint")?;

        let file = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .context("invalid mime type")?;
        let form = Form::new()
            .part("file", file)
            .text("pinataMetadata", Self::metadata(upload));

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.config.jwt)
            .multipart(form)
            .send()
            .await
            .context("pinning request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read pinning response")?;
        if !status.is_success() {
            bail!("pinning service rejected upload (status: {status}): {body}")
        }

        let PinResponse { ipfs_hash } =
            serde_json::from_str(&body).context("malformed pinning response")?;
        Ok(ipfs_hash)
    }
}

#[async_trait]
impl AssetStore for PinningClient {
    async fn upload(&self, upload: AssetUpload) -> Result<StoredAsset, UploadError> {
        self.policy().check(&upload)?;

        let cid = self.pin(&upload).await.map_err(|e| {
            warn!(file = %upload.file_name, "image upload failed: {e:#}");
            e
        })?;
        let url = self.url_for(&cid)?;

        info!(
            %cid,
            file = %upload.file_name,
            size = upload.size(),
            kind = upload.kind.as_str(),
            "image pinned"
        );

        Ok(StoredAsset {
            cid,
            url,
            size: upload.size(),
        })
    }

    async fn unpin(&self, cid: &str) -> Result<(), UploadError> {
        let endpoint = self
            .config
            .api
            .join(&format!("pinning/unpin/{cid}"))
            .context("unable to build unpin endpoint")?;

        let response = self
            .http
            .delete(endpoint)
            .bearer_auth(&self.config.jwt)
            .send()
            .await
            .context("unpin request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("failed to unpin {cid} (status: {status})").into());
        }

        info!(%cid, "image unpinned");
        Ok(())
    }

    fn url_for(&self, cid: &str) -> Result<Url, UploadError> {
        Ok(self
            .config
            .gateway
            .join(&format!("ipfs/{cid}"))
            .context("unable to build gateway url")?)
    }
}
