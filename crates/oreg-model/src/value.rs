//! Typed field values.
//!
//! A [`Native`] is what a field holds after conversion. Equality is strict
//! and deep: `Float(1.0)` and `Int(1)` differ, and two nested models are
//! equal only when every field matches. The merge in
//! [`Model::import_data`](crate::Model::import_data) relies on this.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use oreg_core::HashValue;
use serde_json::Value;

use crate::model::Model;

/// A converted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Str(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    DateTime(DateTime<FixedOffset>),
    Hash(HashValue),
    /// Untyped passthrough, kept exactly as supplied.
    Raw(Value),
    Model(Model),
    List(Vec<Native>),
    Dict(BTreeMap<String, Native>),
}

impl Native {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::DateTime(_) => "datetime",
            Self::Hash(_) => "hash",
            Self::Raw(_) => "raw",
            Self::Model(_) => "model",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&HashValue> {
        match self {
            Self::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_model_mut(&mut self) -> Option<&mut Model> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Native]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Primitive JSON form of a scalar. Containers and models yield `None`;
    /// they are rendered by the model serializer so roles apply.
    pub fn scalar_json(&self) -> Option<Value> {
        match self {
            Self::Str(s) => Some(Value::String(s.clone())),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
            Self::Int(i) => Some(Value::from(*i)),
            Self::Bool(b) => Some(Value::Bool(*b)),
            Self::DateTime(dt) => Some(Value::String(
                dt.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            )),
            Self::Hash(h) => Some(Value::String(h.to_string())),
            Self::Raw(v) => Some(v.clone()),
            Self::Model(_) | Self::List(_) | Self::Dict(_) => None,
        }
    }
}

impl From<&str> for Native {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Native {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for Native {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<i64> for Native {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Native {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Native {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }
}

impl From<HashValue> for Native {
    fn from(h: HashValue) -> Self {
        Self::Hash(h)
    }
}

impl From<Model> for Native {
    fn from(m: Model) -> Self {
        Self::Model(m)
    }
}

impl From<Value> for Native {
    fn from(v: Value) -> Self {
        Self::Raw(v)
    }
}

impl From<Vec<Native>> for Native {
    fn from(items: Vec<Native>) -> Self {
        Self::List(items)
    }
}
