//! SQLite persistence for WS-Federation relying party configuration.
//!
//! Maps the `RelyingParties` / `RelyingPartyClaimMappings` tables to the
//! relying party model a WS-Federation host consumes, and resolves relying
//! parties by realm.

pub mod config;
pub mod context;
pub mod db;
pub mod entity;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod store;

pub use config::{default_log_level, DatabaseLocation, LoggingConfig, StoreConfig};
pub use context::{
    ConfigurationStore, ContextError, ContextResult, PendingChange, RelyingPartySet,
    SqliteConfigurationContext,
};
pub use entity::{RelyingPartyEntity, WsFedClaimMapEntity};
pub use logging::{init_logging, logging_status};
pub use mapper::{
    decode_certificate, encode_certificate, DuplicateClaimPolicy, MapError, MapResult,
    RelyingPartyMapper,
};
pub use model::certificate::{Certificate, CertificateError};
pub use model::relying_party::{ClaimMapping, RelyingParty};
pub use store::relying_party_store::{RelyingPartyStore, RelyingPartyStoreError, StoreResult};
