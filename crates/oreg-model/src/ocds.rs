//! # OCDS Building Blocks
//!
//! The registry's shared entity types: monetary values, periods,
//! classifications, units, addresses, locations, documents, identifiers,
//! items, contact points and organizations.
//!
//! Each type is defined once, lazily, and shared as an `Arc<ModelType>`
//! through an accessor (`value()`, `document()`, ...). The matching
//! `define_*` function builds a fresh copy for callers that need their own
//! role table or nested type.

use std::sync::Arc;

use once_cell::sync::Lazy;
use oreg_core::{DocumentIdentity, LinkSigner};
use regex::Regex;
use serde_json::Value;

use crate::field::{ComputedField, FieldDefault, FieldDescriptor, ValidationScope};
use crate::model::{Model, ModelType};
use crate::registry::DEFAULT_ITEM_CLASSIFICATION;
use crate::roles::{blacklist, whitelist, RoleTable};
use crate::types::{choices_message, FieldType, StringRules};
use crate::value::Native;

/// Document types accepted in `Document.documentType`.
pub const DOCUMENT_TYPES: &[&str] = &[
    "notice",
    "technicalSpecifications",
    "evaluationCriteria",
    "clarifications",
    "billOfQuantity",
    "conflictOfInterest",
    "evaluationReports",
    "complaints",
    "contractSigned",
    "contractArrangements",
    "contractSchedule",
    "contractAnnexe",
    "contractGuarantees",
    "subContract",
    "eligibilityCriteria",
    "illustration",
    "financialLicense",
    "virtualDataRoom",
    "informationDetails",
    "cancellationDetails",
    "x_dgfAssetFamiliarization",
    "x_presentation",
    "x_nda",
    "x_dgfPublicAssetCertificate",
    "x_dgfPlatformLegalDetails",
];

/// Organization identifier schemes accepted in `Identifier.scheme`.
pub const IDENTIFIER_CODES: &[&str] = &[
    "UA-EDR",
    "UA-IPN",
    "UA-FIN",
    "UA-MFO",
    "AE-DCCI",
    "BE-BCE_KBO",
    "CA-CRA_ACR",
    "CH-FDJP",
    "CN-SAIC",
    "CZ-ICO",
    "DE-CR",
    "DK-CVR",
    "EE-RIK",
    "FR-RCS",
    "GB-CHC",
    "GB-COH",
    "GE-NAPR",
    "IE-CRO",
    "LT-RC",
    "LV-RE",
    "MD-IDNO",
    "NL-KVK",
    "PL-KRS",
    "PL-REGON",
    "US-DOS",
    "US-EIN",
    "XI-IATI",
    "XI-PB",
    "XM-DAC",
];

const DOCUMENT_OF: &[&str] = &["asset", "lot"];

static FORMAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-\w]+/[-\.\w\+]+$").expect("valid media type regex"));

macro_rules! shared_type {
    ($(#[$doc:meta])* $accessor:ident, $define:ident) => {
        $(#[$doc])*
        pub fn $accessor() -> Arc<ModelType> {
            static TYPE: Lazy<Arc<ModelType>> = Lazy::new(|| Arc::new($define()));
            Arc::clone(&TYPE)
        }
    };
}

shared_type!(
    /// Monetary value.
    value, define_value
);
shared_type!(
    /// Time period with ordered bounds.
    period, define_period
);
shared_type!(
    /// Time period whose end is mandatory.
    period_end_required, define_period_end_required
);
shared_type!(classification, define_classification);
shared_type!(
    /// Classification checked against the live classification registry.
    item_classification, define_item_classification
);
shared_type!(unit, define_unit);
shared_type!(address, define_address);
shared_type!(location, define_location);
shared_type!(
    /// Stored document with a signed download URL.
    document, define_document
);
shared_type!(identifier, define_identifier);
shared_type!(item, define_item);
shared_type!(contact_point, define_contact_point);
shared_type!(organization, define_organization);

/// Look up a shared type by its entity name.
pub fn by_name(name: &str) -> Option<Arc<ModelType>> {
    all_types().into_iter().find(|ty| ty.name() == name)
}

/// Every shared type, leaves first.
pub fn all_types() -> Vec<Arc<ModelType>> {
    vec![
        value(),
        period(),
        period_end_required(),
        classification(),
        item_classification(),
        unit(),
        address(),
        location(),
        document(),
        identifier(),
        item(),
        contact_point(),
        organization(),
    ]
}

fn text(name: &'static str) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldType::string())
}

fn nested(name: &'static str, ty: &Arc<ModelType>) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldType::model(ty))
}

pub fn define_value() -> ModelType {
    ModelType::builder("Value")
        .field(
            FieldDescriptor::new(
                "amount",
                FieldType::Float {
                    min: Some(0.0),
                    max: None,
                },
            )
            .required(),
        )
        .field(
            FieldDescriptor::new("currency", FieldType::String(StringRules::new().min_len(3).max_len(3)))
                .required()
                .with_default(FieldDefault::Currency),
        )
        .field(
            FieldDescriptor::new("valueAddedTaxIncluded", FieldType::Bool)
                .required()
                .with_default(FieldDefault::Bool(true)),
        )
        .build()
}

fn period_order(scope: &ValidationScope<'_>, start: Option<&Native>) -> Result<(), String> {
    let start = start.and_then(Native::as_datetime);
    let end = scope.get("endDate").and_then(Native::as_datetime);
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err("period should begin before its end".to_string())
        }
        _ => Ok(()),
    }
}

pub fn define_period() -> ModelType {
    ModelType::builder("Period")
        .field(FieldDescriptor::new("startDate", FieldType::DateTime).validator(period_order))
        .field(FieldDescriptor::new("endDate", FieldType::DateTime))
        .build()
}

pub fn define_period_end_required() -> ModelType {
    define_period()
        .extend("PeriodEndRequired")
        .field(FieldDescriptor::new("endDate", FieldType::DateTime).required())
        .build()
}

pub fn define_classification() -> ModelType {
    ModelType::builder("Classification")
        .field(text("scheme").required())
        .field(text("id").required())
        .field(text("description").required())
        .field(text("description_en"))
        .field(text("description_ru"))
        .field(FieldDescriptor::new("uri", FieldType::Url))
        .build()
}

fn scheme_registered(scope: &ValidationScope<'_>, scheme: Option<&Native>) -> Result<(), String> {
    let Some(scheme) = scheme.and_then(Native::as_str) else {
        return Ok(());
    };
    let registry = scope.context().classifications();
    if registry.has_scheme(scheme) {
        Ok(())
    } else {
        Err(choices_message(registry.schemes().as_slice()))
    }
}

fn code_registered(scope: &ValidationScope<'_>, code: Option<&Native>) -> Result<(), String> {
    let Some(code) = code.and_then(Native::as_str) else {
        return Ok(());
    };
    let scheme = scope.get("scheme").and_then(Native::as_str).unwrap_or_default();
    let registry = scope.context().classifications();
    if registry.contains(scheme, code) {
        Ok(())
    } else {
        Err(choices_message(registry.codes(scheme).as_slice()))
    }
}

pub fn define_item_classification() -> ModelType {
    define_classification()
        .extend("ItemClassification")
        .field(
            text("scheme")
                .required()
                .with_default(FieldDefault::Str(DEFAULT_ITEM_CLASSIFICATION))
                .validator(scheme_registered),
        )
        .field(text("id").required().validator(code_registered))
        .build()
}

pub fn define_unit() -> ModelType {
    ModelType::builder("Unit")
        .field(text("name"))
        .field(text("name_en"))
        .field(text("name_ru"))
        .field(nested("value", &value()))
        .field(text("code").required())
        .build()
}

pub fn define_address() -> ModelType {
    ModelType::builder("Address")
        .field(text("streetAddress"))
        .field(text("locality"))
        .field(text("region"))
        .field(text("postalCode"))
        .field(text("countryName").required())
        .field(text("countryName_en"))
        .field(text("countryName_ru"))
        .build()
}

pub fn define_location() -> ModelType {
    ModelType::builder("Location")
        .field(FieldDescriptor::new("latitude", FieldType::Any).required())
        .field(FieldDescriptor::new("longitude", FieldType::Any).required())
        .field(FieldDescriptor::new("elevation", FieldType::Any))
        .build()
}

/// The identity a document's download link signs over.
pub fn document_identity(doc: &Model) -> Option<DocumentIdentity> {
    let id = doc.get_str("id")?;
    let hash = doc.get("hash").and_then(Native::as_hash).cloned();
    Some(DocumentIdentity::new(id, hash))
}

fn document_url(doc: &Model, signer: Option<&dyn LinkSigner>) -> Option<Value> {
    let signer = signer?;
    let identity = document_identity(doc)?;
    match signer.sign_link(&identity) {
        Ok(url) => Some(Value::String(url)),
        Err(e) => {
            tracing::warn!(document = %identity.id, error = %e, "could not sign document link");
            None
        }
    }
}

/// Roles declared on documents.
pub fn document_roles() -> RoleTable {
    RoleTable::new()
        .with("embedded", blacklist(&[]))
        .with("view", blacklist(&["revisions"]))
        .with("revisions", whitelist(&["url", "dateModified"]))
}

pub fn define_document() -> ModelType {
    ModelType::builder("Document")
        .field(
            FieldDescriptor::new("id", FieldType::HexToken)
                .required()
                .with_default(FieldDefault::GeneratedId),
        )
        .field(FieldDescriptor::new("hash", FieldType::Hash))
        .field(FieldDescriptor::new(
            "documentOf",
            FieldType::String(StringRules::new().choices(DOCUMENT_OF)),
        ))
        .field(FieldDescriptor::new(
            "documentType",
            FieldType::String(StringRules::new().choices(DOCUMENT_TYPES)),
        ))
        .field(text("title").required())
        .field(text("title_en"))
        .field(text("title_ru"))
        .field(text("description"))
        .field(text("description_en"))
        .field(text("description_ru"))
        .field(
            FieldDescriptor::new("format", FieldType::String(StringRules::new().pattern(&FORMAT_RE)))
                .required(),
        )
        .field(FieldDescriptor::new("datePublished", FieldType::DateTime).with_default(FieldDefault::Now))
        .field(FieldDescriptor::new("dateModified", FieldType::DateTime).with_default(FieldDefault::Now))
        .field(text("language"))
        .field(FieldDescriptor::new("relatedItem", FieldType::HexToken))
        .field(text("author"))
        .computed(ComputedField::new("url", document_url).ephemeral())
        .roles(document_roles())
        .build()
}

pub fn define_identifier() -> ModelType {
    ModelType::builder("Identifier")
        .field(
            FieldDescriptor::new("scheme", FieldType::String(StringRules::new().choices(IDENTIFIER_CODES)))
                .required(),
        )
        .field(FieldDescriptor::new("id", FieldType::Any).required())
        .field(text("legalName"))
        .field(text("legalName_en"))
        .field(text("legalName_ru"))
        .field(FieldDescriptor::new("uri", FieldType::Url))
        .build()
}

pub fn define_item() -> ModelType {
    ModelType::builder("Item")
        .field(
            FieldDescriptor::new("id", FieldType::String(StringRules::new().min_len(1)))
                .required()
                .with_default(FieldDefault::GeneratedId),
        )
        .field(text("description").required())
        .field(text("description_en"))
        .field(text("description_ru"))
        .field(nested("classification", &item_classification()))
        .field(
            FieldDescriptor::new(
                "additionalClassifications",
                FieldType::list_of(FieldType::model(&classification())),
            )
            .with_default(FieldDefault::EmptyList),
        )
        .field(nested("unit", &unit()))
        .field(FieldDescriptor::new("quantity", FieldType::int()))
        .field(nested("address", &address()))
        .field(nested("location", &location()))
        .field(FieldDescriptor::new("relatedLot", FieldType::HexToken))
        .build()
}

fn contact_present(scope: &ValidationScope<'_>, email: Option<&Native>) -> Result<(), String> {
    let has_email = email.and_then(Native::as_str).is_some_and(|s| !s.is_empty());
    let has_phone = scope
        .get("telephone")
        .and_then(Native::as_str)
        .is_some_and(|s| !s.is_empty());
    if has_email || has_phone {
        Ok(())
    } else {
        Err("telephone or email should be present".to_string())
    }
}

pub fn define_contact_point() -> ModelType {
    ModelType::builder("ContactPoint")
        .field(text("name").required())
        .field(text("name_en"))
        .field(text("name_ru"))
        .field(FieldDescriptor::new("email", FieldType::Email).validator(contact_present))
        .field(text("telephone"))
        .field(text("faxNumber"))
        .field(FieldDescriptor::new("url", FieldType::Url))
        .build()
}

/// Roles declared on organizations.
pub fn organization_roles() -> RoleTable {
    RoleTable::new().with("embedded", blacklist(&[]))
}

pub fn define_organization() -> ModelType {
    ModelType::builder("Organization")
        .field(text("name").required())
        .field(text("name_en"))
        .field(text("name_ru"))
        .field(nested("identifier", &identifier()).required())
        .field(FieldDescriptor::new(
            "additionalIdentifiers",
            FieldType::list_of(FieldType::model(&identifier())),
        ))
        .field(nested("address", &address()).required())
        .field(nested("contactPoint", &contact_point()).required())
        .roles(organization_roles())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_types_are_built_once() {
        assert!(Arc::ptr_eq(&value(), &value()));
        assert!(Arc::ptr_eq(&document(), &document()));
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("Organization").unwrap().name(), "Organization");
        assert_eq!(by_name("PeriodEndRequired").unwrap().name(), "PeriodEndRequired");
        assert!(by_name("Tender").is_none());
        assert_eq!(all_types().len(), 13);
    }

    #[test]
    fn item_classification_inherits_classification_fields() {
        let names: Vec<_> = item_classification().fields().iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec!["scheme", "id", "description", "description_en", "description_ru", "uri"]
        );
        assert!(item_classification().field("scheme").unwrap().default_value().is_some());
        assert!(classification().field("scheme").unwrap().default_value().is_none());
    }

    #[test]
    fn media_type_pattern() {
        assert!(FORMAT_RE.is_match("application/pdf"));
        assert!(FORMAT_RE.is_match("application/vnd.ms-excel"));
        assert!(FORMAT_RE.is_match("image/svg+xml"));
        assert!(!FORMAT_RE.is_match("pdf"));
        assert!(!FORMAT_RE.is_match("application/pdf extra"));
    }

    #[test]
    fn document_roles_declared() {
        let roles: Vec<_> = document().roles().roles().collect();
        assert_eq!(roles, vec!["embedded", "revisions", "view"]);
        assert_eq!(organization().roles().roles().collect::<Vec<_>>(), vec!["embedded"]);
    }
}
