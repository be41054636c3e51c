//! Relying party lookup by realm.
//!
//! # Responsibility
//! - Resolve the trust configuration for a realm as a domain model.
//!
//! # Invariants
//! - Blank realms are rejected before storage is touched.
//! - Lookups are read-only; nothing is cached.
//! - A missing realm is `Ok(None)`, not an error.

use crate::context::{ConfigurationStore, ContextError};
use crate::mapper::{MapError, RelyingPartyMapper};
use crate::model::relying_party::RelyingParty;
use log::{error, info};
use std::time::Instant;

pub type StoreResult<T> = Result<T, RelyingPartyStoreError>;

#[derive(Debug, thiserror::Error)]
pub enum RelyingPartyStoreError {
    #[error("invalid argument `{name}`: {message}")]
    InvalidArgument {
        name: &'static str,
        message: &'static str,
    },
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Mapping(#[from] MapError),
}

/// Realm lookup over any `ConfigurationStore`.
pub struct RelyingPartyStore<C: ConfigurationStore> {
    context: C,
    mapper: RelyingPartyMapper,
}

impl<C: ConfigurationStore> RelyingPartyStore<C> {
    pub fn new(context: C, mapper: RelyingPartyMapper) -> Self {
        Self { context, mapper }
    }

    /// Finds the relying party registered for `realm`.
    ///
    /// # Errors
    /// - `InvalidArgument` when `realm` is empty or whitespace only.
    /// - `Context` when the storage query fails.
    /// - `Mapping` when the stored certificate cannot be decoded.
    pub fn find_relying_party_by_realm(&self, realm: &str) -> StoreResult<Option<RelyingParty>> {
        if realm.trim().is_empty() {
            return Err(RelyingPartyStoreError::InvalidArgument {
                name: "realm",
                message: "value cannot be empty or whitespace",
            });
        }

        let started_at = Instant::now();
        let result = self.lookup(realm);
        match &result {
            Ok(found) => info!(
                "event=rp_find module=store status=ok realm={realm} found={} duration_ms={}",
                found.is_some(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=rp_find module=store status=error realm={realm} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn lookup(&self, realm: &str) -> StoreResult<Option<RelyingParty>> {
        let entity = self.context.find_relying_party_by_realm(realm)?;
        Ok(self.mapper.map_to_model(entity.as_ref())?)
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }
}
