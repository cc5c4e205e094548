//! # Scalar Type Contract
//!
//! The exact messages and round-trip behaviour of the timestamp, content
//! hash and token types, as seen by API clients.

use chrono::{DateTime, NaiveDate, Utc};
use oreg_core::{check_hex_token, ErrorTree, HashValue, IsoDateTime, TypeError, ValidationError};
use serde_json::json;

#[test]
fn timestamp_parse_failures_name_the_input() {
    let dates = IsoDateTime::utc();
    for raw in [json!(null), json!(""), json!(2017), json!("2007-06-23X06:40:34.00Z")] {
        let shown = match &raw {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let err = dates.from_json(&raw).unwrap_err();
        assert!(err.is_conversion());
        assert_eq!(err.message(), format!("Could not parse {shown}. Should be ISO8601."));
    }
}

#[test]
fn timestamp_round_trip_preserves_the_instant() {
    let kyiv = IsoDateTime::new(IsoDateTime::parse_offset("+03:00").unwrap());
    let parsed = kyiv.parse("2017-06-23T06:40:34.000123Z").unwrap();
    let rendered = kyiv.format(&parsed).unwrap();
    assert_eq!(rendered, "2017-06-23T09:40:34.000123+03:00");
    assert_eq!(kyiv.parse(&rendered).unwrap(), parsed);
}

#[test]
fn naive_input_uses_default_offset() {
    let kyiv = IsoDateTime::new(IsoDateTime::parse_offset("+02:00").unwrap());
    let parsed = kyiv.parse("2017-01-01T12:00:00").unwrap();
    assert_eq!(parsed.to_rfc3339(), "2017-01-01T12:00:00+02:00");
    let utc: DateTime<Utc> = parsed.with_timezone(&Utc);
    assert_eq!(utc.to_rfc3339(), "2017-01-01T10:00:00+00:00");
}

#[test]
fn extremes_fail_instead_of_clamping() {
    let west = IsoDateTime::new(IsoDateTime::parse_offset("-05:00").unwrap());
    let max = NaiveDate::MAX.and_hms_opt(23, 59, 59).unwrap();
    assert!(matches!(west.localize(max), Err(TypeError::Conversion(_))));
}

#[test]
fn hash_contract() {
    let raw = format!("md5:{}", uuid::Uuid::new_v4().simple());
    assert_eq!(HashValue::parse(&raw).unwrap().to_string(), raw);

    assert_eq!(
        HashValue::parse("bogus:xyz").unwrap_err(),
        TypeError::Validation("Hash type is not supported.".into())
    );
    assert_eq!(
        HashValue::parse("sha512:").unwrap_err(),
        TypeError::Validation("Hash value is wrong length.".into())
    );
    assert_eq!(
        HashValue::parse(&format!("md5:{}", "-".repeat(32))).unwrap_err(),
        TypeError::Conversion("Hash value is not hexadecimal.".into())
    );
}

#[test]
fn tokens_share_hash_messages() {
    assert_eq!(
        check_hex_token("0").unwrap_err().message(),
        "Hash value is wrong length."
    );
    assert!(check_hex_token(&"a".repeat(32)).is_ok());
}

#[test]
fn grouped_errors_render_in_their_display() {
    let mut tree = ErrorTree::new();
    tree.push("amount", "This field is required.");
    let err = ValidationError::new(tree);
    assert_eq!(err.to_string(), "validation failed: amount: This field is required.");
}
