//! Hemmer provider for LogDNA
//!
//! Manages LogDNA (Mezmo) account configuration through the
//! `/v1/config` and `/v1/enterprise` REST APIs, served to Hemmer over the
//! `hemmer.provider.v1` gRPC plugin protocol.
//!
//! # Resources
//!
//! | Type | API |
//! |------|-----|
//! | `logdna_view` | `/v1/config/view` |
//! | `logdna_alert` | `/v1/config/presetalert` |
//! | `logdna_category` | `/v1/config/categories/{type}` |
//! | `logdna_archive` | `/v1/config/archiving` |
//! | `logdna_stream_config` | `/v1/config/stream` |
//! | `logdna_stream_exclusion` | `/v1/config/stream/exclusions` |
//! | `logdna_ingestion_exclusion` | `/v1/config/ingestion/exclusions` |
//! | `logdna_key` | `/v1/config/keys` |
//! | `logdna_member` | `/v1/config/members` |
//! | `logdna_child_organization` | `/v1/enterprise/account` (enterprise only) |
//!
//! # Provider Configuration
//!
//! ```text
//! provider "logdna" {
//!   servicekey = "..."
//!   url        = "https://api.logdna.com"   # optional
//!   type       = "regular"                  # or "enterprise"
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! On start the binary prints one line to stdout and logs to stderr:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`
//!
//! # Embedding
//!
//! ```ignore
//! use hemmer_provider_logdna::{init_logging, serve, LogdnaProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(LogdnaProvider::new()).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

/// Types generated from `proto/provider.proto`.
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated {
    tonic::include_proto!("hemmer.provider.v1");
}

// Re-export main types at crate root
pub use config::{OrgType, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging};
pub use provider::LogdnaProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate};

pub use async_trait::async_trait;
