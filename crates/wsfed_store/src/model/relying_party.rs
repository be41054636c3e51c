//! Relying party domain model.

use crate::model::certificate::Certificate;
use std::collections::BTreeMap;

/// Original claim type -> claim type expected by the relying party.
pub type ClaimMapping = BTreeMap<String, String>;

/// Trust configuration the host resolves for an incoming WS-Federation
/// request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelyingParty {
    pub realm: String,
    pub token_type: Option<String>,
    pub digest_algorithm: Option<String>,
    pub signature_algorithm: Option<String>,
    pub saml_name_identifier_format: Option<String>,
    pub encryption_certificate: Option<Certificate>,
    pub claim_mapping: ClaimMapping,
}

impl RelyingParty {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            ..Self::default()
        }
    }

    /// Adds or replaces the mapping for `original_claim_type`.
    pub fn with_claim_mapping(
        mut self,
        original_claim_type: impl Into<String>,
        new_claim_type: impl Into<String>,
    ) -> Self {
        self.claim_mapping
            .insert(original_claim_type.into(), new_claim_type.into());
        self
    }

    /// Claim type to emit for `original_claim_type`, if it is remapped.
    pub fn mapped_claim_type(&self, original_claim_type: &str) -> Option<&str> {
        self.claim_mapping
            .get(original_claim_type)
            .map(String::as_str)
    }
}
