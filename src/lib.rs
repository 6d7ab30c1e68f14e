//! Creator credential state, reconciled across two inconsistent sources.
//!
//! An external verification service attests whether a holder's verifiable credential is
//! currently valid, but exposes nothing else about it. A local metadata store keeps what the
//! service does not (display name, issuance time, content settings) but cannot attest
//! validity. This crate merges the two, and guards the path that creates credentials.
//!
//! # Reconciliation
//!
//! ```ignore
//! use std::sync::Arc;
//! use credstate::{
//!     config::SigningConfig,
//!     core::util::ReqwestClient,
//!     reconcile::Reconciler,
//!     store::MemoryStore,
//!     token::JwtTokenIssuer,
//!     verification::HttpVerificationClient,
//! };
//!
//! let reconciler = Reconciler::builder()
//!     .with_store(Arc::new(MemoryStore::default()))
//!     .with_token_issuer(Arc::new(JwtTokenIssuer::new(signing_config)))
//!     .with_verification_client(Arc::new(HttpVerificationClient::new(
//!         ReqwestClient::new()?,
//!         &verification_base,
//!     )?))
//!     .with_program_id(program_id)
//!     .build()?;
//!
//! // Never fails: outages and lookup errors degrade to a display status.
//! let reconciliation = reconciler.reconcile(&wallet_address).await;
//! println!("{}", reconciliation.display);
//! ```
//!
//! The stored record and the live check are read concurrently. The display status is then
//! derived from the following table, see [DisplayStatus::derive]:
//!
//! | stored record | live outcome         | display      |
//! |---------------|----------------------|--------------|
//! | yes           | `Compliant`          | `verified`   |
//! | yes           | `Expired`            | `expired`    |
//! | yes           | anything else        | `issued`     |
//! | no            | `error`              | `error`      |
//! | no            | anything else        | `not_issued` |
//!
//! [DisplayStatus::derive]: crate::core::outcome::DisplayStatus::derive
//!
//! # Issuance
//!
//! Credentials are created with [CredentialIssuer::issue], which runs the
//! [issuance gate](crate::gate) before anything is written. The [store](crate::store) enforces
//! its own rules as well: records are created only from gate-validated subjects, and a
//! credential reference is set once and never replaced.
//!
//! [CredentialIssuer::issue]: crate::issuance::CredentialIssuer::issue
//!
//! # Customization
//!
//! Every external dependency sits behind a trait: [MetadataStore], [VerificationClient],
//! [TokenIssuer], [AssetStore] and [AsyncHttpClient].
//!
//! [MetadataStore]: crate::store::MetadataStore
//! [VerificationClient]: crate::verification::VerificationClient
//! [TokenIssuer]: crate::token::TokenIssuer
//! [AssetStore]: crate::assets::AssetStore
//! [AsyncHttpClient]: crate::core::util::AsyncHttpClient

pub mod assets;
pub mod config;
pub mod core;
pub mod display;
pub mod gate;
pub mod issuance;
pub mod profile;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod token;
pub mod utils;
pub mod verification;
