//! Field descriptors, defaults, validators and computed fields.

use std::fmt;

use oreg_core::{ErrorTree, LinkSigner};
use serde_json::Value;

use crate::context::ModelContext;
use crate::model::Model;
use crate::types::FieldType;
use crate::value::Native;

/// Message for a required field with no value.
pub const REQUIRED: &str = "This field is required.";

/// The view a validator gets of the entity being validated.
#[derive(Debug, Clone, Copy)]
pub struct ValidationScope<'a> {
    model: &'a Model,
    ctx: &'a ModelContext,
}

impl<'a> ValidationScope<'a> {
    pub(crate) fn new(model: &'a Model, ctx: &'a ModelContext) -> Self {
        Self { model, ctx }
    }

    /// Another field of the candidate entity.
    pub fn get(&self, field: &str) -> Option<&'a Native> {
        self.model.get(field)
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn context(&self) -> &'a ModelContext {
        self.ctx
    }
}

/// Per-field rule. Runs whether or not the field holds a value.
pub type FieldValidator = fn(&ValidationScope<'_>, Option<&Native>) -> Result<(), String>;

/// Whole-entity rule. Errors are merged into the entity's error tree.
pub type ModelValidator = fn(&ValidationScope<'_>) -> Result<(), ErrorTree>;

/// Output-only field derived from the entity. The signer is present only for
/// signed serialization.
pub type ComputeFn = fn(&Model, Option<&dyn LinkSigner>) -> Option<Value>;

/// Value a field receives when an entity is created without it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Str(&'static str),
    Bool(bool),
    EmptyList,
    /// A fresh token from the context's id generator.
    GeneratedId,
    /// The context clock, in the registry offset.
    Now,
    /// The context's default currency.
    Currency,
}

impl FieldDefault {
    pub(crate) fn produce(&self, ctx: &ModelContext) -> Option<Native> {
        match self {
            Self::Str(s) => Some(Native::from(*s)),
            Self::Bool(b) => Some(Native::Bool(*b)),
            Self::EmptyList => Some(Native::List(Vec::new())),
            Self::GeneratedId => Some(Native::Str(ctx.generate_id())),
            Self::Now => ctx
                .dates()
                .normalize(&ctx.clock().now())
                .ok()
                .map(Native::DateTime),
            Self::Currency => Some(Native::from(ctx.default_currency())),
        }
    }
}

/// One named field of an entity type.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub(crate) name: &'static str,
    pub(crate) ty: FieldType,
    pub(crate) required: bool,
    pub(crate) default: Option<FieldDefault>,
    pub(crate) validators: Vec<FieldValidator>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn validator(mut self, validator: FieldValidator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type", &self.ty.kind())
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Output-only field, e.g. a document's signed download URL.
#[derive(Clone)]
pub struct ComputedField {
    pub(crate) name: &'static str,
    pub(crate) ephemeral: bool,
    pub(crate) compute: ComputeFn,
}

impl ComputedField {
    pub fn new(name: &'static str, compute: ComputeFn) -> Self {
        Self {
            name,
            ephemeral: false,
            compute,
        }
    }

    /// Mark as varying between renderings; excluded from business equality.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

impl fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedField")
            .field("name", &self.name)
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}
