//! SQLite-backed configuration context.
//!
//! # Responsibility
//! - Own the connection for one unit of work and release it on drop.
//! - Translate pending changes and queries into SQL over the relying party
//!   tables.
//!
//! # Invariants
//! - The owned connection is migrated and has `foreign_keys=ON`.
//! - Zero-length certificate bytes are written as NULL.

use super::{
    ConfigurationStore, ContextError, ContextResult, PendingChange, RelyingPartySet,
};
use crate::config::StoreConfig;
use crate::db::migrations::{current_user_version, latest_version, table_exists, REQUIRED_TABLES};
use crate::db::{open_db, open_db_in_memory, open_db_with};
use crate::entity::{RelyingPartyEntity, WsFedClaimMapEntity};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

const RELYING_PARTY_SELECT_SQL: &str = "SELECT
    Id,
    Realm,
    TokenType,
    DigestAlgorithm,
    SignatureAlgorithm,
    SamlNameIdentifierFormat,
    EncryptionCertificate
FROM RelyingParties";

const CLAIM_MAP_SELECT_SQL: &str = "SELECT
    Id,
    OriginalClaimType,
    NewClaimType,
    RelyingPartyId
FROM RelyingPartyClaimMappings";

/// Unit of work over a migrated SQLite database.
pub struct SqliteConfigurationContext {
    conn: Connection,
    relying_parties: RelyingPartySet,
}

impl SqliteConfigurationContext {
    /// Opens the database described by `config`, applying migrations.
    pub fn open(config: &StoreConfig) -> ContextResult<Self> {
        config.validate()?;
        Ok(Self::with_connection(open_db_with(config)?))
    }

    pub fn open_file(path: impl AsRef<Path>) -> ContextResult<Self> {
        Ok(Self::with_connection(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> ContextResult<Self> {
        Ok(Self::with_connection(open_db_in_memory()?))
    }

    /// Wraps a connection the caller already migrated.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not current.
    /// - `MissingRequiredTable` when a relying party table is absent.
    pub fn from_connection(conn: Connection) -> ContextResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(&conn)?;
        if actual_version != expected_version {
            return Err(ContextError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        for &table in REQUIRED_TABLES {
            if !table_exists(&conn, table)? {
                return Err(ContextError::MissingRequiredTable(table));
            }
        }

        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            relying_parties: RelyingPartySet::default(),
        }
    }

    /// Underlying connection, for host-level queries outside this context's API.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection, reporting errors that drop would swallow.
    ///
    /// Pending changes that were not saved are discarded.
    pub fn close(self) -> ContextResult<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }
}

impl ConfigurationStore for SqliteConfigurationContext {
    fn relying_parties(&mut self) -> &mut RelyingPartySet {
        &mut self.relying_parties
    }

    fn find_relying_party_by_realm(
        &self,
        realm: &str,
    ) -> ContextResult<Option<RelyingPartyEntity>> {
        let parent = self
            .conn
            .query_row(
                &format!("{RELYING_PARTY_SELECT_SQL} WHERE Realm = ?1;"),
                [realm],
                parse_relying_party_row,
            )
            .optional()?;

        parent
            .map(|entity| with_claim_mapping(&self.conn, entity))
            .transpose()
    }

    fn find_relying_party(&self, id: i64) -> ContextResult<Option<RelyingPartyEntity>> {
        let parent = self
            .conn
            .query_row(
                &format!("{RELYING_PARTY_SELECT_SQL} WHERE Id = ?1;"),
                [id],
                parse_relying_party_row,
            )
            .optional()?;

        parent
            .map(|entity| with_claim_mapping(&self.conn, entity))
            .transpose()
    }

    fn list_relying_parties(&self) -> ContextResult<Vec<RelyingPartyEntity>> {
        let mut claims_by_parent: HashMap<i64, Vec<WsFedClaimMapEntity>> = HashMap::new();
        let mut claim_stmt = self
            .conn
            .prepare(&format!("{CLAIM_MAP_SELECT_SQL} ORDER BY Id;"))?;
        let claims = claim_stmt.query_map([], parse_claim_map_row)?;
        for claim in claims {
            let claim = claim?;
            claims_by_parent
                .entry(claim.relying_party_id)
                .or_default()
                .push(claim);
        }

        let mut stmt = self
            .conn
            .prepare(&format!("{RELYING_PARTY_SELECT_SQL} ORDER BY Id;"))?;
        let mut rows = stmt.query([])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let mut entity = parse_relying_party_row(row)?;
            entity.claim_mapping = claims_by_parent.remove(&entity.id).unwrap_or_default();
            entities.push(entity);
        }

        Ok(entities)
    }

    fn save_changes(&mut self) -> ContextResult<usize> {
        if self.relying_parties.is_empty() {
            return Ok(0);
        }

        let started_at = Instant::now();
        let changes = self.relying_parties.pending_len();

        match apply_pending(&mut self.conn, self.relying_parties.pending()) {
            Ok(affected) => {
                self.relying_parties.clear();
                info!(
                    "event=save_changes module=context status=ok changes={changes} affected_rows={affected} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(affected)
            }
            Err(err) => {
                error!(
                    "event=save_changes module=context status=error changes={changes} duration_ms={} constraint_violation={} error={err}",
                    started_at.elapsed().as_millis(),
                    err.is_constraint_violation()
                );
                Err(err)
            }
        }
    }
}

/// Runs every pending change in one transaction; dropping `tx` on an early
/// return rolls everything back.
fn apply_pending(conn: &mut Connection, pending: &[PendingChange]) -> ContextResult<usize> {
    let tx = conn.transaction()?;
    let mut affected = 0;

    for change in pending {
        affected += match change {
            PendingChange::Add(entity) => insert_relying_party(&tx, entity)?,
            PendingChange::Update(entity) => update_relying_party(&tx, entity)?,
            PendingChange::Remove(id) => delete_relying_party(&tx, *id)?,
        };
    }

    tx.commit()?;
    Ok(affected)
}

fn insert_relying_party(tx: &Transaction<'_>, entity: &RelyingPartyEntity) -> ContextResult<usize> {
    let inserted = tx.execute(
        "INSERT INTO RelyingParties (
            Realm,
            TokenType,
            DigestAlgorithm,
            SignatureAlgorithm,
            SamlNameIdentifierFormat,
            EncryptionCertificate
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            entity.realm.as_str(),
            entity.token_type.as_deref(),
            entity.digest_algorithm.as_deref(),
            entity.signature_algorithm.as_deref(),
            entity.saml_name_identifier_format.as_deref(),
            stored_certificate(entity),
        ],
    )?;
    let id = tx.last_insert_rowid();
    debug!(
        "event=rp_insert module=context status=ok id={id} realm={}",
        entity.realm
    );

    Ok(inserted + insert_claim_mapping(tx, id, &entity.claim_mapping)?)
}

fn update_relying_party(tx: &Transaction<'_>, entity: &RelyingPartyEntity) -> ContextResult<usize> {
    let updated = tx.execute(
        "UPDATE RelyingParties
         SET
            Realm = ?1,
            TokenType = ?2,
            DigestAlgorithm = ?3,
            SignatureAlgorithm = ?4,
            SamlNameIdentifierFormat = ?5,
            EncryptionCertificate = ?6
         WHERE Id = ?7;",
        params![
            entity.realm.as_str(),
            entity.token_type.as_deref(),
            entity.digest_algorithm.as_deref(),
            entity.signature_algorithm.as_deref(),
            entity.saml_name_identifier_format.as_deref(),
            stored_certificate(entity),
            entity.id,
        ],
    )?;
    if updated == 0 {
        return Err(ContextError::NotFound(entity.id));
    }

    let removed_claims = tx.execute(
        "DELETE FROM RelyingPartyClaimMappings WHERE RelyingPartyId = ?1;",
        [entity.id],
    )?;
    let inserted_claims = insert_claim_mapping(tx, entity.id, &entity.claim_mapping)?;

    Ok(updated + removed_claims + inserted_claims)
}

fn delete_relying_party(tx: &Transaction<'_>, id: i64) -> ContextResult<usize> {
    // Cascaded deletes are not reported by sqlite3_changes, so count first.
    let claim_rows: i64 = tx.query_row(
        "SELECT COUNT(*) FROM RelyingPartyClaimMappings WHERE RelyingPartyId = ?1;",
        [id],
        |row| row.get(0),
    )?;

    let deleted = tx.execute("DELETE FROM RelyingParties WHERE Id = ?1;", [id])?;
    if deleted == 0 {
        return Err(ContextError::NotFound(id));
    }

    Ok(deleted + usize::try_from(claim_rows).unwrap_or_default())
}

fn insert_claim_mapping(
    tx: &Transaction<'_>,
    relying_party_id: i64,
    claims: &[WsFedClaimMapEntity],
) -> ContextResult<usize> {
    if claims.is_empty() {
        return Ok(0);
    }

    let mut stmt = tx.prepare(
        "INSERT INTO RelyingPartyClaimMappings (
            OriginalClaimType,
            NewClaimType,
            RelyingPartyId
        ) VALUES (?1, ?2, ?3);",
    )?;
    let mut inserted = 0;
    for claim in claims {
        inserted += stmt.execute(params![
            claim.original_claim_type.as_str(),
            claim.new_claim_type.as_str(),
            relying_party_id,
        ])?;
    }

    Ok(inserted)
}

fn with_claim_mapping(
    conn: &Connection,
    mut entity: RelyingPartyEntity,
) -> ContextResult<RelyingPartyEntity> {
    let mut stmt = conn.prepare(&format!(
        "{CLAIM_MAP_SELECT_SQL} WHERE RelyingPartyId = ?1 ORDER BY Id;"
    ))?;
    entity.claim_mapping = stmt
        .query_map([entity.id], parse_claim_map_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entity)
}

fn stored_certificate(entity: &RelyingPartyEntity) -> Option<&[u8]> {
    entity
        .encryption_certificate
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
}

fn parse_relying_party_row(row: &Row<'_>) -> rusqlite::Result<RelyingPartyEntity> {
    Ok(RelyingPartyEntity {
        id: row.get("Id")?,
        realm: row.get("Realm")?,
        token_type: row.get("TokenType")?,
        digest_algorithm: row.get("DigestAlgorithm")?,
        signature_algorithm: row.get("SignatureAlgorithm")?,
        saml_name_identifier_format: row.get("SamlNameIdentifierFormat")?,
        encryption_certificate: row
            .get::<_, Option<Vec<u8>>>("EncryptionCertificate")?
            .filter(|bytes| !bytes.is_empty()),
        claim_mapping: Vec::new(),
    })
}

fn parse_claim_map_row(row: &Row<'_>) -> rusqlite::Result<WsFedClaimMapEntity> {
    Ok(WsFedClaimMapEntity {
        id: row.get("Id")?,
        original_claim_type: row.get("OriginalClaimType")?,
        new_claim_type: row.get("NewClaimType")?,
        relying_party_id: row.get("RelyingPartyId")?,
    })
}
