//! Persisted entities mirroring the `RelyingParties` and
//! `RelyingPartyClaimMappings` tables.
//!
//! # Invariants
//! - `id == 0` means "not yet inserted"; storage assigns ids on save.
//! - Claim mapping rows are owned by their relying party; their
//!   `relying_party_id` is rewritten to the parent id on save.

/// Row of `RelyingParties` plus its owned claim mapping rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelyingPartyEntity {
    pub id: i64,
    pub realm: String,
    pub token_type: Option<String>,
    pub digest_algorithm: Option<String>,
    pub signature_algorithm: Option<String>,
    pub saml_name_identifier_format: Option<String>,
    /// DER-encoded public certificate.
    pub encryption_certificate: Option<Vec<u8>>,
    pub claim_mapping: Vec<WsFedClaimMapEntity>,
}

impl RelyingPartyEntity {
    /// Creates an unsaved entity with only `realm` set.
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            ..Self::default()
        }
    }
}

/// Row of `RelyingPartyClaimMappings`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsFedClaimMapEntity {
    pub id: i64,
    pub original_claim_type: String,
    pub new_claim_type: String,
    pub relying_party_id: i64,
}

impl WsFedClaimMapEntity {
    pub fn new(original_claim_type: impl Into<String>, new_claim_type: impl Into<String>) -> Self {
        Self {
            original_claim_type: original_claim_type.into(),
            new_claim_type: new_claim_type.into(),
            ..Self::default()
        }
    }
}
