//! Bidirectional mapping between persisted entities and the domain model.
//!
//! # Responsibility
//! - Decode stored DER bytes into a `Certificate` and encode it back.
//! - Turn claim mapping rows into an original -> new lookup and back.
//!
//! # Invariants
//! - Absent and zero-length certificate bytes are both "no certificate",
//!   in either direction.
//! - A decode failure fails the whole mapping; no partial model is returned.
//! - Entity ids never leak into the model; `to_entity` yields unsaved rows.

use crate::entity::{RelyingPartyEntity, WsFedClaimMapEntity};
use crate::model::certificate::{Certificate, CertificateError};
use crate::model::relying_party::{ClaimMapping, RelyingParty};
use log::warn;
use std::collections::btree_map::Entry;

pub type MapResult<T> = Result<T, MapError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("failed to decode encryption certificate: {0}")]
    CertificateDecode(#[from] CertificateError),
    #[error("claim type `{0}` is mapped more than once")]
    DuplicateClaimType(String),
}

/// What to do when several rows share an `original_claim_type`.
///
/// The schema allows such rows; the model's lookup cannot hold them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateClaimPolicy {
    /// Later rows (by row order) overwrite earlier ones.
    #[default]
    LastWins,
    /// The first row is kept; later ones are discarded.
    FirstWins,
    /// Mapping fails with `MapError::DuplicateClaimType`.
    Reject,
}

/// Entity <-> model converter. Construct one and pass it to whoever maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelyingPartyMapper {
    duplicate_policy: DuplicateClaimPolicy,
}

impl RelyingPartyMapper {
    pub fn new(duplicate_policy: DuplicateClaimPolicy) -> Self {
        Self { duplicate_policy }
    }

    pub fn duplicate_policy(&self) -> DuplicateClaimPolicy {
        self.duplicate_policy
    }

    /// Maps an optional entity; `None` short-circuits to `Ok(None)`.
    pub fn map_to_model(
        &self,
        entity: Option<&RelyingPartyEntity>,
    ) -> MapResult<Option<RelyingParty>> {
        entity.map(|entity| self.to_model(entity)).transpose()
    }

    /// Maps an optional model; `None` short-circuits to `None`.
    pub fn map_to_entity(&self, model: Option<&RelyingParty>) -> Option<RelyingPartyEntity> {
        model.map(|model| self.to_entity(model))
    }

    pub fn to_model(&self, entity: &RelyingPartyEntity) -> MapResult<RelyingParty> {
        Ok(RelyingParty {
            realm: entity.realm.clone(),
            token_type: entity.token_type.clone(),
            digest_algorithm: entity.digest_algorithm.clone(),
            signature_algorithm: entity.signature_algorithm.clone(),
            saml_name_identifier_format: entity.saml_name_identifier_format.clone(),
            encryption_certificate: decode_certificate(entity.encryption_certificate.as_deref())?,
            claim_mapping: self.claims_to_map(&entity.realm, &entity.claim_mapping)?,
        })
    }

    pub fn to_entity(&self, model: &RelyingParty) -> RelyingPartyEntity {
        RelyingPartyEntity {
            id: 0,
            realm: model.realm.clone(),
            token_type: model.token_type.clone(),
            digest_algorithm: model.digest_algorithm.clone(),
            signature_algorithm: model.signature_algorithm.clone(),
            saml_name_identifier_format: model.saml_name_identifier_format.clone(),
            encryption_certificate: encode_certificate(model.encryption_certificate.as_ref()),
            claim_mapping: map_to_claims(&model.claim_mapping),
        }
    }

    fn claims_to_map(
        &self,
        realm: &str,
        claims: &[WsFedClaimMapEntity],
    ) -> MapResult<ClaimMapping> {
        let mut mapping = ClaimMapping::new();
        for claim in claims {
            match mapping.entry(claim.original_claim_type.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(claim.new_claim_type.clone());
                }
                Entry::Occupied(mut slot) => match self.duplicate_policy {
                    DuplicateClaimPolicy::LastWins => {
                        warn!(
                            "event=claim_map_duplicate module=mapper status=overwritten realm={realm} claim_type={}",
                            claim.original_claim_type
                        );
                        slot.insert(claim.new_claim_type.clone());
                    }
                    DuplicateClaimPolicy::FirstWins => {
                        warn!(
                            "event=claim_map_duplicate module=mapper status=discarded realm={realm} claim_type={}",
                            claim.original_claim_type
                        );
                    }
                    DuplicateClaimPolicy::Reject => {
                        return Err(MapError::DuplicateClaimType(
                            claim.original_claim_type.clone(),
                        ));
                    }
                },
            }
        }
        Ok(mapping)
    }
}

/// Stored certificate bytes -> certificate.
///
/// `None` and zero-length input both yield `Ok(None)`; anything else must be
/// a well-formed DER certificate.
pub fn decode_certificate(der: Option<&[u8]>) -> MapResult<Option<Certificate>> {
    match der {
        Some(bytes) if !bytes.is_empty() => Ok(Some(Certificate::from_der(bytes)?)),
        _ => Ok(None),
    }
}

/// Certificate -> bytes to store. A zero-length encoding is stored as `None`.
pub fn encode_certificate(certificate: Option<&Certificate>) -> Option<Vec<u8>> {
    certificate
        .map(|certificate| certificate.raw_data().to_vec())
        .filter(|bytes| !bytes.is_empty())
}

fn map_to_claims(mapping: &ClaimMapping) -> Vec<WsFedClaimMapEntity> {
    mapping
        .iter()
        .map(|(original, new)| WsFedClaimMapEntity::new(original.as_str(), new.as_str()))
        .collect()
}
