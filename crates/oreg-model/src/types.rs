//! # Field Types
//!
//! The semantic type of a field decides two things:
//!
//! - **conversion**: how an untyped JSON value becomes a [`Native`]. A
//!   failure here is a conversion error and blocks the field from being
//!   populated at all.
//! - **built-in constraints**: checks on an already converted value (string
//!   length, pattern, choices, numeric bounds). A failure here is a
//!   validation error and only blocks `validate()`.
//!
//! Nested models, lists and mappings recurse, and their failures come back
//! as an [`ErrorTree`] keyed by field name or element index.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use once_cell::sync::Lazy;
use oreg_core::{check_hex_token, ErrorTree, HashValue, IsoDateTime, TypeError};
use regex::Regex;
use serde_json::Value;

use crate::context::ModelContext;
use crate::model::{Model, ModelType};
use crate::value::Native;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("valid email regex")
});

const URL_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// Message reported when a value is not among the allowed choices.
pub fn choices_message<S: Display>(choices: &[S]) -> String {
    let listed: Vec<String> = choices.iter().map(|c| format!("'{c}'")).collect();
    format!("Value must be one of [{}].", listed.join(", "))
}

/// Constraints on a string field.
#[derive(Debug, Clone, Default)]
pub struct StringRules {
    min_len: Option<usize>,
    max_len: Option<usize>,
    pattern: Option<Regex>,
    choices: Option<&'static [&'static str]>,
}

impl StringRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    /// Values must match this regex. Anchor it if the whole value must match.
    pub fn pattern(mut self, re: &Regex) -> Self {
        self.pattern = Some(re.clone());
        self
    }

    pub fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = Some(choices);
        self
    }

    fn check(&self, s: &str) -> Vec<String> {
        let mut messages = Vec::new();
        let len = s.chars().count();
        if self.min_len.is_some_and(|min| len < min) {
            messages.push("String value is too short.".to_string());
        }
        if self.max_len.is_some_and(|max| len > max) {
            messages.push("String value is too long.".to_string());
        }
        if let Some(re) = &self.pattern {
            if !re.is_match(s) {
                messages.push("String value did not match validation regex.".to_string());
            }
        }
        if let Some(choices) = self.choices {
            if !choices.contains(&s) {
                messages.push(choices_message(choices));
            }
        }
        messages
    }
}

/// Semantic type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// Text. Integers are accepted and cast to their decimal form.
    String(StringRules),
    /// Numbers or numeric strings.
    Float { min: Option<f64>, max: Option<f64> },
    Int { min: Option<i64>, max: Option<i64> },
    Bool,
    /// Absolute `http`, `https` or `ftp` URL, kept as written.
    Url,
    Email,
    /// ISO-8601 timestamp normalized to the registry offset.
    DateTime,
    /// Composite `scheme:hexdigest` content hash.
    Hash,
    /// 32-character hex token.
    HexToken,
    /// Untyped passthrough.
    Any,
    Model(Arc<ModelType>),
    List(Box<FieldType>),
    /// String-keyed mapping.
    Dict(Box<FieldType>),
}

impl FieldType {
    /// Unconstrained string.
    pub fn string() -> Self {
        Self::String(StringRules::default())
    }

    /// Unbounded float.
    pub fn float() -> Self {
        Self::Float {
            min: None,
            max: None,
        }
    }

    /// Unbounded int.
    pub fn int() -> Self {
        Self::Int {
            min: None,
            max: None,
        }
    }

    pub fn model(ty: &Arc<ModelType>) -> Self {
        Self::Model(Arc::clone(ty))
    }

    pub fn list_of(inner: FieldType) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn dict_of(inner: FieldType) -> Self {
        Self::Dict(Box::new(inner))
    }

    /// Name of the type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Float { .. } => "float",
            Self::Int { .. } => "int",
            Self::Bool => "bool",
            Self::Url => "url",
            Self::Email => "email",
            Self::DateTime => "datetime",
            Self::Hash => "hash",
            Self::HexToken => "hex token",
            Self::Any => "any",
            Self::Model(_) => "model",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }

    /// Convert an untyped value. `null` is handled by the caller.
    pub fn convert(&self, raw: &Value, ctx: &ModelContext) -> Result<Native, ErrorTree> {
        match self {
            Self::String(_) => match raw {
                Value::String(s) => Ok(Native::Str(s.clone())),
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Native::Str(n.to_string())),
                other => Err(ErrorTree::message(format!(
                    "Couldn't interpret '{}' as string.",
                    display_raw(other)
                ))),
            },
            Self::Float { .. } => float_from(raw)
                .map(Native::Float)
                .ok_or_else(|| {
                    ErrorTree::message(format!("Value '{}' is not float.", display_raw(raw)))
                }),
            Self::Int { .. } => int_from(raw)
                .map(Native::Int)
                .ok_or_else(|| {
                    ErrorTree::message(format!("Value '{}' is not int.", display_raw(raw)))
                }),
            Self::Bool => bool_from(raw)
                .map(Native::Bool)
                .ok_or_else(|| ErrorTree::message("Must be either true or false.")),
            Self::Url => match raw {
                Value::String(s) if is_url(s) => Ok(Native::Str(s.clone())),
                _ => Err(ErrorTree::message("Not a well-formed URL.")),
            },
            Self::Email => match raw {
                Value::String(s) if EMAIL_RE.is_match(s) => Ok(Native::Str(s.clone())),
                _ => Err(ErrorTree::message("Not a well-formed email address.")),
            },
            Self::DateTime => ctx
                .dates()
                .from_json(raw)
                .map(Native::DateTime)
                .map_err(|e| ErrorTree::message(e.message())),
            Self::Hash => HashValue::parse(&display_raw(raw))
                .map(Native::Hash)
                .map_err(|e| ErrorTree::message(e.message())),
            Self::HexToken => {
                let s = display_raw(raw);
                check_hex_token(&s)
                    .map(|()| Native::Str(s))
                    .map_err(|e| ErrorTree::message(e.message()))
            }
            Self::Any => Ok(Native::Raw(raw.clone())),
            Self::Model(ty) => Model::create(ty, raw, ctx)
                .map(Native::Model)
                .map_err(|e| e.errors),
            Self::List(inner) => {
                let Value::Array(items) = raw else {
                    return Err(ErrorTree::message("Could not interpret the value as a list."));
                };
                let mut errors = ErrorTree::new();
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    match inner.convert(item, ctx) {
                        Ok(v) => out.push(v),
                        Err(tree) => errors.nest(idx.to_string(), tree),
                    }
                }
                if errors.is_empty() {
                    Ok(Native::List(out))
                } else {
                    Err(errors)
                }
            }
            Self::Dict(inner) => {
                let Value::Object(map) = raw else {
                    return Err(ErrorTree::message("Only mappings may be used in a DictType"));
                };
                let mut errors = ErrorTree::new();
                let mut out = BTreeMap::new();
                for (key, item) in map {
                    match inner.convert(item, ctx) {
                        Ok(v) => {
                            out.insert(key.clone(), v);
                        }
                        Err(tree) => errors.nest(key.clone(), tree),
                    }
                }
                if errors.is_empty() {
                    Ok(Native::Dict(out))
                } else {
                    Err(errors)
                }
            }
        }
    }

    /// Check an already-typed value assigned directly to a field.
    ///
    /// Timestamps are normalized to the registry offset, ints widen to
    /// floats, scalars assigned to an untyped field become passthrough JSON.
    /// Anything else must already be the variant the type converts to.
    pub fn accept(&self, value: Native, dates: &IsoDateTime) -> Result<Native, TypeError> {
        match (self, value) {
            (Self::DateTime, Native::DateTime(dt)) => dates.normalize(&dt).map(Native::DateTime),
            (Self::Float { .. }, Native::Int(i)) => Ok(Native::Float(i as f64)),
            (Self::Any, Native::Raw(v)) => Ok(Native::Raw(v)),
            (Self::Any, other) => other.scalar_json().map(Native::Raw).ok_or_else(|| {
                TypeError::Conversion(format!("any cannot hold {}", other.kind()))
            }),
            (Self::Model(ty), Native::Model(m)) if m.model_type().name() == ty.name() => {
                Ok(Native::Model(m))
            }
            (Self::List(inner), Native::List(items)) => items
                .into_iter()
                .map(|item| inner.accept(item, dates))
                .collect::<Result<Vec<_>, _>>()
                .map(Native::List),
            (Self::Dict(inner), Native::Dict(map)) => map
                .into_iter()
                .map(|(k, v)| inner.accept(v, dates).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Native::Dict),
            (
                Self::String(_) | Self::Url | Self::Email | Self::HexToken,
                Native::Str(s),
            ) => Ok(Native::Str(s)),
            (Self::Float { .. }, v @ Native::Float(_))
            | (Self::Int { .. }, v @ Native::Int(_))
            | (Self::Bool, v @ Native::Bool(_))
            | (Self::Hash, v @ Native::Hash(_)) => Ok(v),
            (ty, other) => Err(TypeError::Conversion(format!(
                "{} cannot hold {}",
                ty.kind(),
                other.kind()
            ))),
        }
    }

    /// Built-in constraints on a converted value, recursing into nested
    /// models and containers.
    pub fn check(&self, value: &Native, ctx: &ModelContext) -> ErrorTree {
        let mut errors = ErrorTree::new();
        match (self, value) {
            (Self::String(rules), Native::Str(s)) => {
                for msg in rules.check(s) {
                    errors.push_message(msg);
                }
            }
            (Self::Float { min, max }, Native::Float(f)) => {
                if let Some(min) = min.filter(|min| f < min) {
                    errors.push_message(format!(
                        "Float value should be greater than or equal to {min}."
                    ));
                }
                if let Some(max) = max.filter(|max| f > max) {
                    errors.push_message(format!("Float value should be less than or equal to {max}."));
                }
            }
            (Self::Int { min, max }, Native::Int(i)) => {
                if let Some(min) = min.filter(|min| i < min) {
                    errors.push_message(format!("Int value should be greater than or equal to {min}."));
                }
                if let Some(max) = max.filter(|max| i > max) {
                    errors.push_message(format!("Int value should be less than or equal to {max}."));
                }
            }
            (Self::Model(_), Native::Model(m)) => errors.merge(m.validation_errors(ctx)),
            (Self::List(inner), Native::List(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    errors.nest(idx.to_string(), inner.check(item, ctx));
                }
            }
            (Self::Dict(inner), Native::Dict(map)) => {
                for (key, item) in map {
                    errors.nest(key.clone(), inner.check(item, ctx));
                }
            }
            _ => {}
        }
        errors
    }
}

fn display_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn float_from(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn int_from(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn bool_from(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "True" | "true" | "1" => Some(true),
            "False" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn is_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| URL_SCHEMES.contains(&u.scheme()) && u.has_host())
        .unwrap_or(false)
}
