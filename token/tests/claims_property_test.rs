//! Property coverage: arbitrary claim sets survive the signed codec.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;

use proptest::prelude::*;
use pwt_token::{Audience, TokenInstance};

fn claim_string() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._:/-]{0,40}"
}

fn audience_strategy() -> impl Strategy<Value = Audience> {
    // An empty scalar is indistinguishable from no audience on the wire,
    // so the scalar case generates at least one character.
    prop_oneof![
        Just(Audience::None),
        "[a-zA-Z0-9][a-zA-Z0-9 ._:/-]{0,39}".prop_map(Audience::One),
        prop::collection::vec(claim_string(), 2..5).prop_map(Audience::Many),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_claim_set_roundtrips_signed(
        iss in claim_string(),
        sub in claim_string(),
        kid in claim_string(),
        aud in audience_strategy(),
        header_fields in prop::collection::hash_map(claim_string(), claim_string(), 0..6),
        payload_fields in prop::collection::hash_map(claim_string(), claim_string(), 0..6),
    ) {
        let issuer = TokenInstance::new().unwrap();
        issuer
            .set_issuer(iss.clone())
            .set_subject(sub.clone())
            .set_key_id(kid.clone())
            .set_audience(aud.clone())
            .set_header_fields(header_fields.clone())
            .set_payload_fields(payload_fields.clone());

        let wire = issuer.encode().unwrap();

        let verifier = TokenInstance::new().unwrap();
        verifier.copy_algorithm(&issuer);
        prop_assert!(verifier.decode(&wire));

        prop_assert_eq!(verifier.issuer(), Some(iss));
        prop_assert_eq!(verifier.subject(), Some(sub));
        prop_assert_eq!(verifier.key_id(), Some(kid));
        prop_assert_eq!(verifier.audiences(), aud.all());
        prop_assert_eq!(verifier.header_fields(), header_fields);
        prop_assert_eq!(verifier.payload_fields(), payload_fields);
    }

    #[test]
    fn arbitrary_bytes_never_verify(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
        let verifier = TokenInstance::new().unwrap();
        prop_assert!(!verifier.is_token_valid(&bytes));
        prop_assert!(!verifier.decode(&bytes));
    }

    #[test]
    fn truncated_tokens_never_verify(cut in 0usize..100) {
        let issuer = TokenInstance::new().unwrap();
        let wire = issuer.encode().unwrap();
        let cut = cut.min(wire.len().saturating_sub(1));
        prop_assert!(!issuer.is_token_valid(&wire[..cut]));
    }
}

#[test]
fn empty_claim_maps_roundtrip_as_empty() {
    let issuer = TokenInstance::new().unwrap();
    let wire = issuer.encode().unwrap();
    let verifier = TokenInstance::new().unwrap();
    verifier.copy_algorithm(&issuer);
    assert!(verifier.decode(&wire));
    assert_eq!(verifier.header_fields(), HashMap::new());
    assert_eq!(verifier.payload_fields(), HashMap::new());
}
