//! Document entities: generated identity, creation timestamps, the computed
//! download URL and the declared role tables.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use oreg_core::{
    CryptoError, DocumentIdentity, FixedClock, HashValue, IsoDateTime, LinkSigner,
    SequentialIdGenerator,
};
use oreg_model::{ocds, Model, ModelContext};
use serde_json::{json, Value};

struct PlainSigner;

impl LinkSigner for PlainSigner {
    fn sign_link(&self, document: &DocumentIdentity) -> Result<String, CryptoError> {
        let hash = document.hash.as_ref().map(|h| h.to_string()).unwrap_or_default();
        Ok(format!("http://docs.test/{}?Hash={hash}", document.id))
    }
}

struct BrokenSigner;

impl LinkSigner for BrokenSigner {
    fn sign_link(&self, _document: &DocumentIdentity) -> Result<String, CryptoError> {
        Err(CryptoError::KeyError("no active key".into()))
    }
}

fn ctx() -> ModelContext {
    let now = Utc.with_ymd_and_hms(2017, 6, 23, 6, 40, 34).unwrap();
    ModelContext::new()
        .with_clock(Arc::new(FixedClock(now)))
        .with_id_generator(Arc::new(SequentialIdGenerator::starting_at(1)))
}

fn md5() -> String {
    format!("md5:{}", "0cc175b9c0f1b6a831c399e269772661")
}

fn document(ctx: &ModelContext) -> Model {
    Model::create(
        &ocds::document(),
        &json!({
            "title": "Паспорт активу",
            "format": "application/pdf",
            "hash": md5(),
            "documentOf": "asset",
            "documentType": "notice"
        }),
        ctx,
    )
    .unwrap()
}

#[test]
fn defaults_come_from_injected_capabilities() {
    let ctx = ctx();
    let doc = document(&ctx);
    doc.validate(&ctx).unwrap();
    let rendered = doc.serialize(None).unwrap();
    assert_eq!(rendered["id"], "00000000000000000000000000000001");
    assert_eq!(rendered["datePublished"], "2017-06-23T06:40:34+00:00");
    assert_eq!(rendered["dateModified"], "2017-06-23T06:40:34+00:00");
    assert_eq!(rendered["hash"], Value::String(md5()));

    let second = document(&ctx);
    assert_eq!(second.get_str("id"), Some("00000000000000000000000000000002"));
}

#[test]
fn dates_render_in_registry_offset() {
    let offset = IsoDateTime::parse_offset("+02:00").unwrap();
    let ctx = ctx().with_timezone(IsoDateTime::new(offset));
    let doc = document(&ctx);
    assert_eq!(doc.serialize(None).unwrap()["datePublished"], "2017-06-23T08:40:34+02:00");

    let mut doc = doc;
    doc.import_data(&json!({"dateModified": "2017-06-24T00:00:00Z"}), &ctx)
        .unwrap();
    assert_eq!(doc.serialize(None).unwrap()["dateModified"], "2017-06-24T02:00:00+02:00");

    // Offset-less input is read in the registry offset.
    doc.import_data(&json!({"dateModified": "2017-06-25T10:00:00"}), &ctx)
        .unwrap();
    assert_eq!(doc.serialize(None).unwrap()["dateModified"], "2017-06-25T10:00:00+02:00");
}

#[test]
fn url_is_computed_only_with_a_signer() {
    let ctx = ctx();
    let doc = document(&ctx);
    assert!(doc.serialize(None).unwrap().get("url").is_none());

    let signed = doc.serialize_signed(None, &PlainSigner).unwrap();
    assert_eq!(
        signed["url"],
        format!("http://docs.test/00000000000000000000000000000001?Hash={}", md5())
    );

    let unsigned = doc.serialize_signed(None, &BrokenSigner).unwrap();
    assert!(unsigned.get("url").is_none());
}

#[test]
fn url_on_input_is_ignored() {
    let ctx = ctx();
    let mut doc = document(&ctx);
    let changed = doc
        .import_data(&json!({"url": "http://elsewhere.test/x"}), &ctx)
        .unwrap();
    assert!(changed.is_empty());
}

#[test]
fn signed_rendering_round_trips() {
    let ctx = ctx();
    let doc = document(&ctx);
    let signed = doc.serialize_signed(None, &PlainSigner).unwrap();
    let back = Model::create(&ocds::document(), &signed, &ctx).unwrap();
    assert_eq!(back, doc);
    assert!(back.equivalent(&doc));
}

#[test]
fn revisions_role_keeps_url_and_modification_date() {
    let ctx = ctx();
    let doc = document(&ctx);
    let revisions = doc.serialize_signed(Some("revisions"), &PlainSigner).unwrap();
    let keys: Vec<_> = revisions.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["dateModified".to_string(), "url".to_string()]);

    let view = doc.serialize(Some("view")).unwrap();
    assert_eq!(Some(view.clone()), doc.serialize(None));
    assert_eq!(Some(view), doc.serialize(Some("embedded")));
}

#[test]
fn merge_only_reports_real_changes() {
    let ctx = ctx();
    let mut doc = document(&ctx);
    let same = doc.serialize(None).unwrap();
    assert!(doc.import_data(&same, &ctx).unwrap().is_empty());

    let changed = doc
        .import_data(&json!({"title": "Паспорт активу", "description": "scan"}), &ctx)
        .unwrap();
    assert_eq!(changed, vec!["description"]);
}

#[test]
fn field_constraints() {
    let ctx = ctx();
    let doc = Model::create(
        &ocds::document(),
        &json!({"title": "t", "format": "pdf", "documentOf": "tender"}),
        &ctx,
    )
    .unwrap();
    let errors = doc.validate(&ctx).unwrap_err().errors;
    assert_eq!(errors.at("format"), ["String value did not match validation regex.".to_string()]);
    assert_eq!(errors.at("documentOf"), ["Value must be one of ['asset', 'lot'].".to_string()]);

    let err = Model::create(
        &ocds::document(),
        &json!({"id": "z".repeat(32), "hash": "sha512:", "relatedItem": "abc"}),
        &ctx,
    )
    .unwrap_err();
    assert_eq!(err.errors.at("id"), ["Hash value is not hexadecimal.".to_string()]);
    assert_eq!(err.errors.at("hash"), ["Hash value is wrong length.".to_string()]);
    assert_eq!(err.errors.at("relatedItem"), ["Hash value is wrong length.".to_string()]);
}

#[test]
fn identity_covers_id_and_hash() {
    let ctx = ctx();
    let doc = document(&ctx);
    let identity = ocds::document_identity(&doc).unwrap();
    assert_eq!(identity.id, "00000000000000000000000000000001");
    assert_eq!(identity.hash, Some(HashValue::parse(&md5()).unwrap()));
}
