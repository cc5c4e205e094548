//! # Entity Types and Instances
//!
//! A [`ModelType`] is a fixed, ordered list of [`FieldDescriptor`]s plus
//! model-level validators, computed fields and a [`RoleTable`]. A [`Model`]
//! is an instance: one optional [`Native`] per descriptor, in the same order.
//!
//! ## Lifecycle
//!
//! - [`Model::create`] applies declared defaults, then imports raw input.
//! - [`Model::import_data`] converts every present key, collecting all
//!   failures into one [`ConversionError`]. Nothing is applied unless the
//!   whole input converts. Candidates strictly equal to the current value
//!   are dropped; the names of the fields that actually changed are
//!   returned.
//! - [`Model::validate`] accumulates required-field and built-in failures,
//!   recursing into nested entities, then per-field and model-level rules.
//! - [`Model::serialize`] renders the fields visible under a role, omitting
//!   unset fields and empty containers. An entity with nothing set renders
//!   as `None`.

use std::fmt;
use std::sync::Arc;

use oreg_core::{ConversionError, ErrorTree, IsoDateTime, LinkSigner, TypeError, ValidationError};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::ModelContext;
use crate::field::{
    ComputedField, FieldDescriptor, FieldValidator, ModelValidator, ValidationScope, REQUIRED,
};
use crate::roles::RoleTable;
use crate::types::FieldType;
use crate::value::Native;

/// Message for input keys that name no field.
pub const ROGUE_FIELD: &str = "Rogue field";

/// Message for a nested entity given something other than a mapping.
pub const NOT_A_MAPPING: &str = "Please use a mapping for this field.";

/// Errors from typed field access.
#[derive(Error, Debug)]
pub enum FieldAccessError {
    #[error("{model} has no field {field:?}")]
    UnknownField { model: &'static str, field: String },
    #[error("{field}: {source}")]
    Type {
        field: &'static str,
        #[source]
        source: TypeError,
    },
}

/// An entity type definition.
#[derive(Clone)]
pub struct ModelType {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    computed: Vec<ComputedField>,
    validators: Vec<ModelValidator>,
    roles: RoleTable,
}

impl ModelType {
    /// Start a new definition.
    pub fn builder(name: &'static str) -> ModelTypeBuilder {
        ModelTypeBuilder {
            ty: ModelType {
                name,
                fields: Vec::new(),
                computed: Vec::new(),
                validators: Vec::new(),
                roles: RoleTable::new(),
            },
        }
    }

    /// Start a new definition from this one. Fields redeclared on the
    /// builder replace the inherited descriptor in place.
    pub fn extend(&self, name: &'static str) -> ModelTypeBuilder {
        let mut ty = self.clone();
        ty.name = name;
        ModelTypeBuilder { ty }
    }

    /// A copy of this definition with a different role table.
    pub fn with_roles(&self, roles: RoleTable) -> ModelType {
        let mut ty = self.clone();
        ty.roles = roles;
        ty
    }

    /// A copy of this definition whose model-typed field (or list/mapping of
    /// models) uses `nested` instead. Unknown fields leave the copy unchanged.
    pub fn with_nested(&self, field: &str, nested: Arc<ModelType>) -> ModelType {
        let mut ty = self.clone();
        if let Some(desc) = ty.fields.iter_mut().find(|d| d.name == field) {
            desc.ty = replace_model(&desc.ty, &nested);
        }
        ty
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name == name)
    }

    pub fn computed(&self) -> &[ComputedField] {
        &self.computed
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|d| d.name == name)
    }

    fn is_computed(&self, name: &str) -> bool {
        self.computed.iter().any(|c| c.name == name)
    }

    /// Convert raw input into per-field candidates without touching any
    /// instance. `None` candidates clear the field.
    fn convert(
        &self,
        raw: &Value,
        ctx: &ModelContext,
    ) -> Result<Vec<(usize, Option<Native>)>, ConversionError> {
        let map = match raw {
            Value::Object(map) => map,
            // An empty entity serializes to null.
            Value::Null => return Ok(Vec::new()),
            _ => return Err(ConversionError::new(ErrorTree::message(NOT_A_MAPPING))),
        };
        let mut errors = ErrorTree::new();
        for key in map.keys() {
            if self.index_of(key).is_none() && !self.is_computed(key) {
                errors.push(key.clone(), ROGUE_FIELD);
            }
        }
        let mut candidates = Vec::with_capacity(map.len());
        for (idx, desc) in self.fields.iter().enumerate() {
            let Some(raw_value) = map.get(desc.name) else {
                continue;
            };
            if raw_value.is_null() {
                // Clearing a required field falls back to its default.
                let fallback = match &desc.default {
                    Some(default) if desc.required => default.produce(ctx),
                    _ => None,
                };
                candidates.push((idx, fallback));
                continue;
            }
            match desc.ty.convert(raw_value, ctx) {
                Ok(value) => candidates.push((idx, Some(value))),
                Err(tree) => errors.nest(desc.name, tree),
            }
        }
        if errors.is_empty() {
            Ok(candidates)
        } else {
            Err(ConversionError::new(errors))
        }
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("fields", &self.fields.iter().map(|d| d.name).collect::<Vec<_>>())
            .field("computed", &self.computed.iter().map(|c| c.name).collect::<Vec<_>>())
            .field("roles", &self.roles.roles().collect::<Vec<_>>())
            .finish()
    }
}

fn replace_model(ty: &FieldType, nested: &Arc<ModelType>) -> FieldType {
    match ty {
        FieldType::Model(_) => FieldType::Model(Arc::clone(nested)),
        FieldType::List(inner) => FieldType::list_of(replace_model(inner, nested)),
        FieldType::Dict(inner) => FieldType::dict_of(replace_model(inner, nested)),
        other => other.clone(),
    }
}

/// Builder for [`ModelType`].
#[derive(Debug)]
pub struct ModelTypeBuilder {
    ty: ModelType,
}

impl ModelTypeBuilder {
    /// Append a field, or replace an inherited field of the same name.
    pub fn field(mut self, desc: FieldDescriptor) -> Self {
        match self.ty.fields.iter_mut().find(|d| d.name == desc.name) {
            Some(slot) => *slot = desc,
            None => self.ty.fields.push(desc),
        }
        self
    }

    /// Add a validator to an already declared field.
    pub fn field_validator(mut self, field: &str, validator: FieldValidator) -> Self {
        if let Some(desc) = self.ty.fields.iter_mut().find(|d| d.name == field) {
            desc.validators.push(validator);
        }
        self
    }

    pub fn computed(mut self, computed: ComputedField) -> Self {
        self.ty.computed.push(computed);
        self
    }

    pub fn validator(mut self, validator: ModelValidator) -> Self {
        self.ty.validators.push(validator);
        self
    }

    pub fn roles(mut self, roles: RoleTable) -> Self {
        self.ty.roles = roles;
        self
    }

    pub fn build(self) -> ModelType {
        self.ty
    }
}

/// An entity instance.
#[derive(Clone)]
pub struct Model {
    ty: Arc<ModelType>,
    dates: IsoDateTime,
    values: Vec<Option<Native>>,
}

impl Model {
    /// An instance with no field set and no defaults applied.
    pub fn empty(ty: &Arc<ModelType>, ctx: &ModelContext) -> Self {
        Self {
            ty: Arc::clone(ty),
            dates: *ctx.dates(),
            values: vec![None; ty.fields.len()],
        }
    }

    /// An instance holding only the declared defaults.
    pub fn with_defaults(ty: &Arc<ModelType>, ctx: &ModelContext) -> Self {
        let mut model = Self::empty(ty, ctx);
        model.fill_defaults(ctx);
        model
    }

    /// Create an instance from raw input: defaults first, then the input.
    ///
    /// # Errors
    ///
    /// Returns every conversion failure, grouped by field path.
    pub fn create(
        ty: &Arc<ModelType>,
        raw: &Value,
        ctx: &ModelContext,
    ) -> Result<Self, ConversionError> {
        let mut model = Self::with_defaults(ty, ctx);
        model.import_data(raw, ctx)?;
        Ok(model)
    }

    pub fn model_type(&self) -> &Arc<ModelType> {
        &self.ty
    }

    /// Whether no field holds a value.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Give every unset field with a declared default its default.
    /// Returns the names of the fields filled.
    pub fn fill_defaults(&mut self, ctx: &ModelContext) -> Vec<&'static str> {
        let mut filled = Vec::new();
        for (desc, slot) in self.ty.fields.iter().zip(self.values.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            if let Some(value) = desc.default.as_ref().and_then(|d| d.produce(ctx)) {
                *slot = Some(value);
                filled.push(desc.name);
            }
        }
        filled
    }

    /// Merge raw input into this instance.
    ///
    /// Keys absent from `raw` are left alone, explicit `null` clears a field,
    /// nested entities are rebuilt from their raw form. Candidates equal to
    /// the current value are dropped. Returns the names of the fields that
    /// changed, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns every conversion failure grouped by field path; in that case
    /// the instance is left untouched.
    pub fn import_data(
        &mut self,
        raw: &Value,
        ctx: &ModelContext,
    ) -> Result<Vec<&'static str>, ConversionError> {
        let candidates = self.ty.convert(raw, ctx)?;
        let mut changed = Vec::new();
        for (idx, value) in candidates {
            if self.values[idx] != value {
                self.values[idx] = value;
                changed.push(self.ty.fields[idx].name);
            }
        }
        if !changed.is_empty() {
            tracing::debug!(model = self.ty.name, changed = ?changed, "merged import");
        }
        Ok(changed)
    }

    /// A field's value.
    pub fn get(&self, field: &str) -> Option<&Native> {
        self.ty
            .index_of(field)
            .and_then(|idx| self.values[idx].as_ref())
    }

    /// A string field's value.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Native::as_str)
    }

    /// A nested entity.
    pub fn child(&self, field: &str) -> Option<&Model> {
        self.get(field).and_then(Native::as_model)
    }

    /// A nested entity, mutably.
    pub fn child_mut(&mut self, field: &str) -> Option<&mut Model> {
        let idx = self.ty.index_of(field)?;
        self.values[idx].as_mut().and_then(Native::as_model_mut)
    }

    /// Assign a typed value directly.
    ///
    /// # Errors
    ///
    /// Fails for an unknown field or a value the field type cannot hold.
    pub fn set(&mut self, field: &str, value: impl Into<Native>) -> Result<(), FieldAccessError> {
        let idx = self.slot(field)?;
        let desc = &self.ty.fields[idx];
        let accepted = desc
            .ty
            .accept(value.into(), &self.dates)
            .map_err(|source| FieldAccessError::Type {
                field: desc.name,
                source,
            })?;
        self.values[idx] = Some(accepted);
        Ok(())
    }

    /// Unset a field.
    ///
    /// # Errors
    ///
    /// Fails for an unknown field.
    pub fn clear(&mut self, field: &str) -> Result<(), FieldAccessError> {
        let idx = self.slot(field)?;
        self.values[idx] = None;
        Ok(())
    }

    fn slot(&self, field: &str) -> Result<usize, FieldAccessError> {
        self.ty
            .index_of(field)
            .ok_or_else(|| FieldAccessError::UnknownField {
                model: self.ty.name,
                field: field.to_string(),
            })
    }

    /// Run every check, returning all failures grouped by field path.
    ///
    /// # Errors
    ///
    /// `ValidationError` holding the grouped failures.
    pub fn validate(&self, ctx: &ModelContext) -> Result<(), ValidationError> {
        let errors = self.validation_errors(ctx);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(errors))
        }
    }

    /// The grouped failures `validate` would report; empty when valid.
    ///
    /// Required-field and built-in checks run first, recursing into nested
    /// entities. Per-field and model-level rules run only once every field
    /// has passed those, so they always see well-formed values.
    pub fn validation_errors(&self, ctx: &ModelContext) -> ErrorTree {
        let mut errors = ErrorTree::new();
        for (desc, value) in self.ty.fields.iter().zip(&self.values) {
            match value {
                None if desc.required => errors.push(desc.name, REQUIRED),
                None => {}
                Some(v) => errors.nest(desc.name, desc.ty.check(v, ctx)),
            }
        }
        if !errors.is_empty() {
            return errors;
        }

        let scope = ValidationScope::new(self, ctx);
        for (desc, value) in self.ty.fields.iter().zip(&self.values) {
            for validator in &desc.validators {
                if let Err(msg) = validator(&scope, value.as_ref()) {
                    errors.push(desc.name, msg);
                }
            }
        }
        for validator in &self.ty.validators {
            if let Err(tree) = validator(&scope) {
                errors.merge(tree);
            }
        }
        errors
    }

    /// Render the fields visible under `role`; `None` is the default role.
    pub fn serialize(&self, role: Option<&str>) -> Option<Value> {
        self.export(role, None, true)
    }

    /// As [`serialize`](Self::serialize), also rendering computed fields
    /// that need a link signer (a document's `url`).
    pub fn serialize_signed(&self, role: Option<&str>, signer: &dyn LinkSigner) -> Option<Value> {
        self.export(role, Some(signer), true)
    }

    /// Business equality: same type and the same default-role rendering,
    /// ephemeral computed fields excluded.
    pub fn equivalent(&self, other: &Model) -> bool {
        self.ty.name == other.ty.name && self.export(None, None, false) == other.export(None, None, false)
    }

    fn export(
        &self,
        role: Option<&str>,
        signer: Option<&dyn LinkSigner>,
        with_ephemeral: bool,
    ) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        let view = self.ty.roles.view(role);
        let mut out = Map::new();
        for (desc, value) in self.ty.fields.iter().zip(&self.values) {
            if !view.shows(desc.name) {
                continue;
            }
            if let Some(rendered) = value.as_ref().and_then(|v| export_value(v, role, signer)) {
                out.insert(desc.name.to_string(), rendered);
            }
        }
        for computed in &self.ty.computed {
            if !view.shows(computed.name) || (computed.ephemeral && !with_ephemeral) {
                continue;
            }
            if let Some(rendered) = (computed.compute)(self, signer) {
                out.insert(computed.name.to_string(), rendered);
            }
        }
        Some(Value::Object(out))
    }
}

fn export_value(value: &Native, role: Option<&str>, signer: Option<&dyn LinkSigner>) -> Option<Value> {
    match value {
        Native::Model(m) => m.export(role, signer, true),
        Native::List(items) => {
            let rendered: Vec<Value> = items
                .iter()
                .filter_map(|item| export_value(item, role, signer))
                .collect();
            (!rendered.is_empty()).then_some(Value::Array(rendered))
        }
        Native::Dict(map) => {
            let rendered: Map<String, Value> = map
                .iter()
                .filter_map(|(k, v)| export_value(v, role, signer).map(|v| (k.clone(), v)))
                .collect();
            (!rendered.is_empty()).then_some(Value::Object(rendered))
        }
        scalar => scalar.scalar_json(),
    }
}

/// Strict equality: same type name and identical field values.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name && self.values == other.values
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.ty.name);
        for (desc, value) in self.ty.fields.iter().zip(&self.values) {
            if let Some(v) = value {
                s.field(desc.name, v);
            }
        }
        s.finish()
    }
}
