use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use credstate::{
    config::{
        BaseUrl, SigningConfig, DEFAULT_ALGORITHM, DEFAULT_AUDIENCE,
        DEFAULT_VERIFICATION_TIMEOUT_SECS,
    },
    core::{record::StoredCredentialRecord, util::ReqwestClient},
    display::{format_reconciled, CredentialInfo},
    reconcile::Reconciler,
    store::MemoryStore,
    token::{JwtTokenIssuer, Operation, TokenIssuer, DEFAULT_TOKEN_LIFETIME_SECS},
    verification::HttpVerificationClient,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "credstate")]
#[command(about = "Inspect creator credential state and mint service tokens")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    #[command(flatten)]
    signing: SigningArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SigningArgs {
    #[arg(long, env = "PUBLIC_PARTNERID")]
    partner_id: Option<String>,

    /// PEM or bare base64 PKCS#8 private key
    #[arg(long, env = "PUBLIC_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[arg(long, env = "PUBLIC_KID")]
    key_id: Option<String>,

    #[arg(long, env = "PUBLIC_JWT_ALGORITHM", default_value = DEFAULT_ALGORITHM)]
    algorithm: String,

    #[arg(long, env = "PUBLIC_VERIFIER_DID")]
    verifier_did: Option<String>,

    #[arg(long, default_value = DEFAULT_AUDIENCE)]
    audience: String,

    #[arg(long, default_value_t = DEFAULT_TOKEN_LIFETIME_SECS)]
    lifetime_secs: u64,
}

impl From<SigningArgs> for SigningConfig {
    fn from(args: SigningArgs) -> Self {
        SigningConfig {
            partner_id: args.partner_id,
            private_key: args.private_key,
            key_id: args.key_id,
            algorithm: args.algorithm,
            verifier_did: args.verifier_did,
            audience: args.audience,
            lifetime_secs: args.lifetime_secs,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint a signed token for the verification or issuance service
    Token {
        #[arg(long, default_value = "verification")]
        operation: Operation,

        /// Holder the token is minted for
        #[arg(long, default_value = "")]
        subject: String,
    },
    /// Reconcile a holder's stored record with the live verification status
    Status {
        holder: String,

        /// JSON array of stored credential records
        #[arg(long)]
        records: Option<PathBuf>,

        /// Base URL of the verification service. Live checks report errors without it.
        #[arg(long, env = "PUBLIC_VERIFICATION_URL")]
        verification_url: Option<BaseUrl>,

        #[arg(long, env = "PUBLIC_VERIFICATION_PROGRAM_ID")]
        program_id: String,

        #[arg(long, env = "PUBLIC_CREATOR_SCHEMA_ID", default_value = "")]
        schema_id: String,

        #[arg(long, default_value_t = DEFAULT_VERIFICATION_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level)?;

    let token_issuer = Arc::new(JwtTokenIssuer::new(cli.signing.into()));

    match cli.command {
        Command::Token { operation, subject } => {
            let token = token_issuer
                .mint(&subject, operation, token_issuer.default_lifetime())
                .await
                .context("JWT generation failed")?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
        Command::Status {
            holder,
            records,
            verification_url,
            program_id,
            schema_id,
            timeout_secs,
        } => {
            let store = match records {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("unable to read {}", path.display()))?;
                    let records: Vec<StoredCredentialRecord> = serde_json::from_str(&raw)
                        .with_context(|| format!("invalid records file {}", path.display()))?;
                    info!(count = records.len(), "loaded records");
                    MemoryStore::with_records(records)
                }
                None => MemoryStore::default(),
            };

            let mut builder = Reconciler::builder()
                .with_store(Arc::new(store))
                .with_token_issuer(token_issuer)
                .with_program_id(program_id)
                .with_timeout(Duration::from_secs(timeout_secs));
            if let Some(base) = verification_url {
                builder = builder.with_verification_client(Arc::new(
                    HttpVerificationClient::new(ReqwestClient::new()?, &base)?,
                ));
            }
            let reconciler = builder.build()?;

            let reconciliation = reconciler.reconcile(&holder).await;
            let card = reconciliation.record.as_ref().map(|record| {
                format_reconciled(
                    &CredentialInfo::from_record(record, &schema_id),
                    reconciliation.display,
                )
            });

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "reconciliation": reconciliation,
                    "card": card,
                }))?
            );
        }
    }

    Ok(())
}

/// Setup tracing subscriber for logging. Logs go to stderr so stdout stays machine readable.
fn setup_logging(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("invalid log filter")?
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=info".parse()?);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();
    Ok(())
}
