use uuid::Uuid;
use wsfed_store::{
    Certificate, ConfigurationStore, DuplicateClaimPolicy, MapError, RelyingParty,
    RelyingPartyEntity, RelyingPartyMapper, RelyingPartyStore, RelyingPartyStoreError,
    SqliteConfigurationContext, WsFedClaimMapEntity,
};

const NAME_IDENTIFIER: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
const NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

#[test]
fn find_blank_realm_is_invalid_argument() {
    let ctx = SqliteConfigurationContext::open_in_memory().unwrap();
    let store = RelyingPartyStore::new(ctx, RelyingPartyMapper::default());

    for realm in ["", "   "] {
        let err = store.find_relying_party_by_realm(realm).unwrap_err();
        assert!(matches!(
            err,
            RelyingPartyStoreError::InvalidArgument { name: "realm", .. }
        ));
    }
}

#[test]
fn find_missing_realm_returns_none() {
    let ctx = SqliteConfigurationContext::open_in_memory().unwrap();
    let store = RelyingPartyStore::new(ctx, RelyingPartyMapper::default());

    let found = store
        .find_relying_party_by_realm(&Uuid::new_v4().to_string())
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn find_existing_realm_returns_model() {
    let mut ctx = SqliteConfigurationContext::open_in_memory().unwrap();
    let entity = RelyingPartyEntity {
        realm: Uuid::new_v4().to_string(),
        token_type: Some("urn:oasis:names:tc:SAML:2.0:assertion".to_string()),
        signature_algorithm: Some(RSA_SHA256.to_string()),
        ..RelyingPartyEntity::default()
    };
    ctx.relying_parties().add(entity.clone());
    ctx.save_changes().unwrap();

    let store = RelyingPartyStore::new(ctx, RelyingPartyMapper::default());
    let model = store
        .find_relying_party_by_realm(&entity.realm)
        .unwrap()
        .unwrap();

    assert_eq!(model.realm, entity.realm);
    assert_eq!(model.token_type, entity.token_type);
    assert_eq!(model.signature_algorithm, entity.signature_algorithm);
    assert_eq!(model.digest_algorithm, None);
    assert!(model.encryption_certificate.is_none());
    assert!(model.claim_mapping.is_empty());
}

#[test]
fn model_written_through_mapper_is_found_with_certificate_and_claims() {
    let der = rcgen::generate_simple_self_signed(vec!["rp.example.com".to_string()])
        .unwrap()
        .cert
        .der()
        .to_vec();
    let certificate = Certificate::from_der(der).unwrap();
    let mut model = RelyingParty::new(Uuid::new_v4().to_string())
        .with_claim_mapping("sub", NAME_IDENTIFIER)
        .with_claim_mapping("name", NAME);
    model.encryption_certificate = Some(certificate.clone());

    let mapper = RelyingPartyMapper::default();
    let mut ctx = SqliteConfigurationContext::open_in_memory().unwrap();
    ctx.relying_parties().add(mapper.to_entity(&model));
    ctx.save_changes().unwrap();

    let store = RelyingPartyStore::new(&mut ctx, mapper);
    let found = store
        .find_relying_party_by_realm(&model.realm)
        .unwrap()
        .unwrap();

    let found_cert = found.encryption_certificate.as_ref().unwrap();
    assert_eq!(found_cert.thumbprint(), certificate.thumbprint());
    assert_eq!(found_cert.subject_name(), certificate.subject_name());
    assert_eq!(found.claim_mapping, model.claim_mapping);
    assert_eq!(found, model);
}

#[test]
fn stored_duplicate_claim_types_follow_mapper_policy() {
    let realm = Uuid::new_v4().to_string();
    let mut entity = RelyingPartyEntity::new(realm.as_str());
    entity.claim_mapping = vec![
        WsFedClaimMapEntity::new("sub", "first"),
        WsFedClaimMapEntity::new("sub", "second"),
    ];
    let mut ctx = SqliteConfigurationContext::open_in_memory().unwrap();
    ctx.relying_parties().add(entity);
    ctx.save_changes().unwrap();

    let last_wins = RelyingPartyStore::new(&mut ctx, RelyingPartyMapper::default())
        .find_relying_party_by_realm(&realm)
        .unwrap()
        .unwrap();
    assert_eq!(last_wins.mapped_claim_type("sub"), Some("second"));

    let rejecting = RelyingPartyStore::new(
        &mut ctx,
        RelyingPartyMapper::new(DuplicateClaimPolicy::Reject),
    );
    let err = rejecting.find_relying_party_by_realm(&realm).unwrap_err();
    assert!(matches!(
        err,
        RelyingPartyStoreError::Mapping(MapError::DuplicateClaimType(_))
    ));
}

#[test]
fn corrupt_stored_certificate_fails_lookup() {
    let realm = Uuid::new_v4().to_string();
    let ctx = SqliteConfigurationContext::open_in_memory().unwrap();
    ctx.connection()
        .execute(
            "INSERT INTO RelyingParties (Realm, EncryptionCertificate) VALUES (?1, X'DEADBEEF');",
            [realm.as_str()],
        )
        .unwrap();

    let store = RelyingPartyStore::new(ctx, RelyingPartyMapper::default());
    let err = store.find_relying_party_by_realm(&realm).unwrap_err();
    assert!(matches!(
        err,
        RelyingPartyStoreError::Mapping(MapError::CertificateDecode(_))
    ));
}

#[test]
fn store_releases_context_for_further_writes() {
    let ctx = SqliteConfigurationContext::open_in_memory().unwrap();
    let store = RelyingPartyStore::new(ctx, RelyingPartyMapper::default());

    let mut ctx = store.into_context();
    ctx.relying_parties().add(RelyingPartyEntity::new("urn:rp:late"));
    assert_eq!(ctx.save_changes().unwrap(), 1);
}
