//! Configuration context: the unit of work hosts use to read and write
//! relying party rows.
//!
//! # Responsibility
//! - Define `ConfigurationStore`, the storage capability the query store and
//!   hosts depend on.
//! - Track pending adds/updates/removes until `save_changes`.
//!
//! # Invariants
//! - Pending changes are applied in one transaction, in the order queued.
//! - Constraint violations are surfaced from storage untranslated.
//! - A context is used by one logical operation at a time; it is not shared.

mod sqlite;

pub use sqlite::SqliteConfigurationContext;

use crate::config::ConfigError;
use crate::db::DbError;
use crate::entity::RelyingPartyEntity;

pub type ContextResult<T> = Result<T, ContextError>;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("relying party not found: {0}")]
    NotFound(i64),
    #[error("connection schema version {actual_version} does not match expected {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
}

impl ContextError {
    /// See [`DbError::is_constraint_violation`].
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_constraint_violation())
    }
}

impl From<rusqlite::Error> for ContextError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One queued mutation of the `RelyingParties` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    /// Insert the relying party and its claim mapping rows; `id` is ignored.
    Add(RelyingPartyEntity),
    /// Overwrite row `id` and replace its claim mapping rows.
    Update(RelyingPartyEntity),
    /// Delete row `id`; claim mapping rows cascade.
    Remove(i64),
}

/// Change tracker for relying parties, flushed by `save_changes`.
#[derive(Debug, Clone, Default)]
pub struct RelyingPartySet {
    pending: Vec<PendingChange>,
}

impl RelyingPartySet {
    pub fn add(&mut self, entity: RelyingPartyEntity) {
        self.pending.push(PendingChange::Add(entity));
    }

    pub fn update(&mut self, entity: RelyingPartyEntity) {
        self.pending.push(PendingChange::Update(entity));
    }

    pub fn remove(&mut self, id: i64) {
        self.pending.push(PendingChange::Remove(id));
    }

    pub fn pending(&self) -> &[PendingChange] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Discards all queued changes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Storage capability over relying party configuration.
///
/// Reads return entities with their claim mapping rows loaded.
pub trait ConfigurationStore {
    fn relying_parties(&mut self) -> &mut RelyingPartySet;
    /// Exact, case-sensitive match on `Realm`.
    fn find_relying_party_by_realm(&self, realm: &str)
        -> ContextResult<Option<RelyingPartyEntity>>;
    fn find_relying_party(&self, id: i64) -> ContextResult<Option<RelyingPartyEntity>>;
    /// All relying parties ordered by id.
    fn list_relying_parties(&self) -> ContextResult<Vec<RelyingPartyEntity>>;
    /// Applies pending changes atomically and returns the number of affected
    /// rows, claim mapping rows included.
    ///
    /// On error nothing is written and the pending changes are kept.
    fn save_changes(&mut self) -> ContextResult<usize>;
}

impl<T: ConfigurationStore + ?Sized> ConfigurationStore for &mut T {
    fn relying_parties(&mut self) -> &mut RelyingPartySet {
        (**self).relying_parties()
    }

    fn find_relying_party_by_realm(
        &self,
        realm: &str,
    ) -> ContextResult<Option<RelyingPartyEntity>> {
        (**self).find_relying_party_by_realm(realm)
    }

    fn find_relying_party(&self, id: i64) -> ContextResult<Option<RelyingPartyEntity>> {
        (**self).find_relying_party(id)
    }

    fn list_relying_parties(&self) -> ContextResult<Vec<RelyingPartyEntity>> {
        (**self).list_relying_parties()
    }

    fn save_changes(&mut self) -> ContextResult<usize> {
        (**self).save_changes()
    }
}
