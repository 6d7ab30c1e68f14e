use std::{fmt, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::{assets::DEFAULT_MAX_ASSET_BYTES, token::DEFAULT_TOKEN_LIFETIME_SECS};

pub const DEFAULT_AUDIENCE: &str = "air.moca.network";
pub const DEFAULT_ALGORITHM: &str = "RS256";
pub const DEFAULT_VERIFICATION_TIMEOUT_SECS: u64 = 10;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub verification: VerificationConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    pub issuance: IssuanceConfig,
    #[serde(default)]
    pub assets: Option<AssetConfig>,
}

/// Where and how live status checks are made.
#[derive(Deserialize, Debug, Clone)]
pub struct VerificationConfig {
    pub base: BaseUrl,
    pub program_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl VerificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Token signing settings.
///
/// Every field may be absent: missing values are reported when a token is minted.
#[derive(Deserialize, Clone)]
pub struct SigningConfig {
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Issuer of verification tokens. Falls back to the partner id.
    #[serde(default)]
    pub verifier_did: Option<String>,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            partner_id: None,
            private_key: None,
            key_id: None,
            algorithm: default_algorithm(),
            verifier_did: None,
            audience: default_audience(),
            lifetime_secs: default_lifetime_secs(),
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("partner_id", &self.partner_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("verifier_did", &self.verifier_did)
            .field("audience", &self.audience)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

/// Identifiers embedded in issued credential documents.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuanceConfig {
    pub issuer_did: String,
    pub schema_id: String,
    /// JSON-LD contexts, after the W3C base context.
    #[serde(default)]
    pub contexts: Vec<Url>,
}

#[derive(Deserialize, Clone)]
pub struct AssetConfig {
    pub api: BaseUrl,
    pub gateway: BaseUrl,
    pub jwt: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl fmt::Debug for AssetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetConfig")
            .field("api", &self.api.as_str())
            .field("gateway", &self.gateway.as_str())
            .field("jwt", &"<redacted>")
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_VERIFICATION_TIMEOUT_SECS
}

fn default_algorithm() -> String {
    DEFAULT_ALGORITHM.to_owned()
}

fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_owned()
}

fn default_lifetime_secs() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_ASSET_BYTES
}

/// A url that is always a base (can be safely join()'ed with further path elements without
/// mangling).
#[derive(Deserialize, Debug, Clone, Hash, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct BaseUrl(Url);

impl std::ops::Deref for BaseUrl {
    type Target = Url;

    fn deref(&self) -> &Url {
        &self.0
    }
}

impl TryFrom<String> for BaseUrl {
    type Error = url::ParseError;

    fn try_from(mut url: String) -> Result<Self, Self::Error> {
        // Make URL a base.
        if !url.ends_with('/') {
            url += "/"
        }
        url.parse().map(Self)
    }
}

impl std::str::FromStr for BaseUrl {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn base_url_is_joinable() {
        let base: BaseUrl = "https://verify.example.com/api/v1".parse().unwrap();
        assert_eq!(
            base.join("verify").unwrap().as_str(),
            "https://verify.example.com/api/v1/verify"
        );
    }

    #[test]
    fn defaults_fill_in() {
        let config: Config = serde_json::from_value(json!({
            "verification": {
                "base": "https://verify.example.com",
                "program_id": "program-1"
            },
            "issuance": {
                "issuer_did": "did:example:issuer",
                "schema_id": "schema-1"
            }
        }))
        .unwrap();

        assert_eq!(config.verification.timeout(), Duration::from_secs(10));
        assert_eq!(config.signing.algorithm, "RS256");
        assert_eq!(config.signing.audience, DEFAULT_AUDIENCE);
        assert_eq!(config.signing.lifetime_secs, 3600);
        assert!(config.signing.private_key.is_none());
        assert!(config.assets.is_none());
    }

    #[test]
    fn debug_hides_key() {
        let signing = SigningConfig {
            private_key: Some("secret-material".into()),
            ..Default::default()
        };
        assert!(!format!("{signing:?}").contains("secret-material"));
    }
}
