//! # Key Rotation and Link Verification
//!
//! Links signed under an earlier active key keep verifying for as long as
//! that key stays in the keyring, and every rejection names its reason.

use oreg_core::{DocumentIdentity, HashValue, Timestamp};
use oreg_crypto::{DocumentLinker, Ed25519KeyPair, SharedTrustChain, TrustChain, UntrustedReason};
use proptest::prelude::*;
use url::Url;

fn base() -> Url {
    Url::parse("http://docs.test/get").unwrap()
}

fn document(n: u8) -> DocumentIdentity {
    DocumentIdentity::new(
        format!("{n:02x}").repeat(16),
        Some(HashValue::parse(&format!("md5:{}", "0cc175b9c0f1b6a831c399e269772661")).unwrap()),
    )
}

#[test]
fn old_links_verify_after_rotation() {
    let first = TrustChain::new(Ed25519KeyPair::from_seed(&[1; 32]));
    let old_link = first.sign(&document(1), &base()).unwrap();

    let second = first.rotate(Ed25519KeyPair::from_seed(&[2; 32])).unwrap();
    assert_ne!(second.active_key_id(), first.active_key_id());
    let new_link = second.sign(&document(2), &base()).unwrap();

    let verified = second.verify(old_link.as_str()).unwrap();
    assert_eq!(verified.key_id, first.active_key_id());
    assert_eq!(verified.document, document(1));
    assert_eq!(second.verify(new_link.as_str()).unwrap().key_id, second.active_key_id());

    // The pre-rotation chain never learned the new key.
    assert_eq!(
        first.verify(new_link.as_str()).unwrap_err().reason,
        UntrustedReason::UnknownKey
    );

    let pruned = second.retire(&first.active_key_id()).unwrap();
    assert_eq!(
        pruned.verify(old_link.as_str()).unwrap_err().reason,
        UntrustedReason::UnknownKey
    );
}

#[test]
fn flipped_signature_bit_is_a_mismatch() {
    let chain = TrustChain::new(Ed25519KeyPair::generate());
    let link = chain.sign(&document(3), &base()).unwrap();
    let signature = link
        .query_pairs()
        .find(|(k, _)| k == "Signature")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    let mut bytes = hex::decode(&signature).unwrap();
    bytes[0] ^= 0x01;
    let forged = link.as_str().replace(&signature, &hex::encode(bytes));

    let err = chain.verify(&forged).unwrap_err();
    assert_eq!(err.reason, UntrustedReason::SignatureMismatch);
}

#[test]
fn verification_only_keys_are_trusted() {
    let other = TrustChain::new(Ed25519KeyPair::from_seed(&[9; 32]));
    let link = other.sign(&document(4), &base()).unwrap();

    let ours = TrustChain::new(Ed25519KeyPair::from_seed(&[8; 32]));
    assert_eq!(ours.verify(link.as_str()).unwrap_err().reason, UntrustedReason::UnknownKey);
    let ours = ours.register(other.active_public_key()).unwrap();
    assert!(ours.verify(link.as_str()).is_ok());
}

#[test]
fn hash_is_covered_by_the_signature() {
    let chain = TrustChain::new(Ed25519KeyPair::generate());
    let link = chain.sign(&document(5), &base()).unwrap().to_string();
    let forged = link.replace(
        "0cc175b9c0f1b6a831c399e269772661",
        "92eb5ffee6ae2fec3ad71c777531578f",
    );
    assert_eq!(chain.verify(&forged).unwrap_err().reason, UntrustedReason::SignatureMismatch);

    let stripped = Url::parse(&link).unwrap();
    let pairs: Vec<(String, String)> = stripped
        .query_pairs()
        .filter(|(k, _)| k != "Hash")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut without_hash = stripped.clone();
    without_hash.query_pairs_mut().clear().extend_pairs(pairs);
    assert_eq!(
        chain.verify(without_hash.as_str()).unwrap_err().reason,
        UntrustedReason::SignatureMismatch
    );
}

#[test]
fn expiry_checked_after_signature() {
    let chain = TrustChain::new(Ed25519KeyPair::generate()).with_max_age(60);
    let issued = Timestamp::from_epoch_secs(1_500_000_000).unwrap();
    let link = chain.sign_at(&document(6), &base(), issued).unwrap();

    let fresh = Timestamp::from_epoch_secs(1_500_000_060).unwrap();
    assert!(chain.verify_at(link.as_str(), fresh).is_ok());

    let stale = Timestamp::from_epoch_secs(1_500_000_061).unwrap();
    assert_eq!(
        chain.verify_at(link.as_str(), stale).unwrap_err().reason,
        UntrustedReason::Expired
    );

    let forged = link.as_str().replace("Issued=1500000000", "Issued=1500000050");
    assert_eq!(
        chain.verify_at(&forged, stale).unwrap_err().reason,
        UntrustedReason::SignatureMismatch
    );
}

#[test]
fn shared_chain_rotates_under_readers() {
    let shared = SharedTrustChain::new(TrustChain::new(Ed25519KeyPair::from_seed(&[1; 32])));
    let linker = DocumentLinker::new(shared.clone(), "http://docs.test/get").unwrap();
    let before = linker.sign_document_url(&document(7)).unwrap();
    let snapshot = shared.snapshot();

    let new_id = shared.rotate(Ed25519KeyPair::from_seed(&[2; 32])).unwrap();
    let after = linker.sign_document_url(&document(7)).unwrap();
    assert!(after.contains(&format!("KeyID={new_id}")));
    assert!(linker.verify_document_url(&before).is_ok());
    assert!(linker.verify_document_url(&after).is_ok());

    // A snapshot taken before rotation is unaffected.
    assert_eq!(snapshot.keyring().len(), 1);
    assert_eq!(
        snapshot.verify(&after).unwrap_err().reason,
        UntrustedReason::UnknownKey
    );

    assert!(shared.retire(&new_id).is_err());
    shared.retire(&snapshot.active_key_id()).unwrap();
    assert_eq!(
        linker.verify_document_url(&before).unwrap_err().reason,
        UntrustedReason::UnknownKey
    );
}

proptest! {
    #[test]
    fn verify_never_panics(raw in ".{0,200}") {
        let chain = TrustChain::new(Ed25519KeyPair::from_seed(&[4; 32]));
        let _ = chain.verify(&raw);
        let url = format!("http://docs.test/get/abc?KeyID={}&Issued=1&Signature={raw}", chain.active_key_id());
        prop_assert!(chain.verify(&url).is_err());
    }
}
