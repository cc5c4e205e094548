//! # CLI Handlers
//!
//! Entity checking, link signing and key generation driven through the same
//! functions the `oreg` subcommands call, configured from temporary YAML.

use std::path::Path;

use oreg_cli::config::CliConfig;
use oreg_cli::entity::{check_entity, list_entities, EntityOutcome};
use oreg_cli::keygen::{generate, write_key};
use oreg_cli::link::{sign_link, verify_link};
use oreg_core::LinkSigner;
use oreg_crypto::UntrustedReason;
use serde_json::json;

fn no_env(_: &str) -> Option<String> {
    None
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("oreg.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

fn signing_config(dir: &Path) -> CliConfig {
    let key = generate();
    let path = write_config(
        dir,
        &format!(
            "model:\n  timezone: \"+02:00\"\ntrust:\n  dockey: \"{}\"\n  docservice_url: http://docs.test/get\n",
            key.seed_hex
        ),
    );
    CliConfig::load_with(Some(&path), no_env).unwrap()
}

#[test]
fn valid_entity_is_projected() {
    let config = CliConfig::load_with(None, no_env).unwrap();
    let ctx = config.model_context().unwrap();
    let outcome = check_entity(
        "Identifier",
        &json!({"scheme": "UA-EDR", "id": "00037256", "legalName": "ДУС"}),
        Some("embedded"),
        &ctx,
        None,
    )
    .unwrap();
    assert_eq!(
        outcome,
        EntityOutcome::Rendered(json!({"scheme": "UA-EDR", "id": "00037256", "legalName": "ДУС"}))
    );
}

#[test]
fn rejections_report_stage_and_grouped_errors() {
    let ctx = CliConfig::default().model_context().unwrap();

    let conversion = check_entity("Value", &json!({"amount": "lots", "rogue": 1}), None, &ctx, None).unwrap();
    let EntityOutcome::Rejected { stage, errors } = conversion else {
        panic!("expected rejection");
    };
    assert_eq!(stage, "conversion");
    assert_eq!(errors["amount"], json!(["Value 'lots' is not float."]));
    assert_eq!(errors["rogue"], json!(["Rogue field"]));

    let validation = check_entity("ContactPoint", &json!({"name": "ДУС"}), None, &ctx, None).unwrap();
    assert_eq!(
        validation.to_json(),
        json!({"stage": "validation", "errors": {"email": ["telephone or email should be present"]}})
    );

    assert!(check_entity("Tender", &json!({}), None, &ctx, None).is_err());
}

#[test]
fn classifications_come_from_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cpv.json"), r#"{"CPV": ["44617100-9"]}"#).unwrap();
    let path = write_config(
        dir.path(),
        "classifications_file: cpv.json\nclassifications:\n  CAV-PS: [\"04000000-8\"]\n",
    );
    let ctx = CliConfig::load_with(Some(&path), no_env)
        .unwrap()
        .model_context()
        .unwrap();

    let ok = check_entity(
        "ItemClassification",
        &json!({"scheme": "CAV-PS", "id": "04000000-8", "description": "Нерухоме майно"}),
        None,
        &ctx,
        None,
    )
    .unwrap();
    assert!(matches!(ok, EntityOutcome::Rendered(_)));

    let bad = check_entity(
        "ItemClassification",
        &json!({"scheme": "CPV", "id": "00000000-0", "description": "x"}),
        None,
        &ctx,
        None,
    )
    .unwrap();
    assert!(matches!(bad, EntityOutcome::Rejected { stage: "validation", .. }));
}

#[test]
fn documents_render_signed_urls_in_registry_offset() {
    let dir = tempfile::tempdir().unwrap();
    let config = signing_config(dir.path());
    let ctx = config.model_context().unwrap();
    let linker = config.linker(false).unwrap();

    let outcome = check_entity(
        "Document",
        &json!({
            "id": "a".repeat(32),
            "title": "Паспорт",
            "format": "application/pdf",
            "hash": format!("md5:{}", "0".repeat(32)),
            "datePublished": "2017-06-23T06:40:34Z"
        }),
        None,
        &ctx,
        Some(&linker as &dyn LinkSigner),
    )
    .unwrap();
    let EntityOutcome::Rendered(doc) = outcome else {
        panic!("expected a rendered document");
    };
    assert_eq!(doc["datePublished"], "2017-06-23T08:40:34+02:00");
    let url = doc["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("http://docs.test/get/{}", "a".repeat(32))));
    assert!(verify_link(&linker, url).is_ok());
}

#[test]
fn sign_and_verify_links() {
    let dir = tempfile::tempdir().unwrap();
    let config = signing_config(dir.path());
    let linker = config.linker(false).unwrap();

    let url = sign_link(&linker, &"b".repeat(32), Some(&format!("md5:{}", "1".repeat(32)))).unwrap();
    let verified = verify_link(&linker, &url).unwrap();
    assert_eq!(verified.document.id, "b".repeat(32));

    assert!(sign_link(&linker, "short", None).is_err());
    assert!(sign_link(&linker, &"b".repeat(32), Some("bogus:xyz")).is_err());

    let stranger = CliConfig::default().linker(true);
    // No docservice_url configured.
    assert!(stranger.is_err());

    let other_dir = tempfile::tempdir().unwrap();
    let other = signing_config(other_dir.path()).linker(false).unwrap();
    assert_eq!(verify_link(&other, &url).unwrap_err().reason, UntrustedReason::UnknownKey);
}

#[test]
fn keygen_output_loads_as_config() {
    let dir = tempfile::tempdir().unwrap();
    let key = generate();
    let (key_path, pub_path) = write_key(&key, &dir.path().join("keys"), "docs").unwrap();
    assert_eq!(std::fs::read_to_string(&pub_path).unwrap(), key.public_hex);

    let seed = std::fs::read_to_string(&key_path).unwrap();
    let config = CliConfig::load_with(None, |name| match name {
        "OREG_DOCKEY" => Some(seed.clone()),
        "OREG_DOCSERVICE_URL" => Some("http://docs.test/get".into()),
        _ => None,
    })
    .unwrap();
    let chain = config.trust_chain(false).unwrap();
    assert_eq!(chain.active_key_id().as_str(), key.key_id);
}

#[test]
fn entity_listing_names_every_type() {
    let listing = list_entities();
    let names: Vec<_> = listing.as_object().unwrap().keys().cloned().collect();
    assert_eq!(names.len(), 13);
    assert!(names.contains(&"Organization".to_string()));
    assert_eq!(listing["Document"]["roles"], json!(["embedded", "revisions", "view"]));
}
