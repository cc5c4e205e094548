//! # oreg-model — Declarative Entities for the Procurement Registry
//!
//! Entity types are declared as ordered lists of field descriptors and
//! instantiated from untyped JSON. The crate provides:
//!
//! - **Conversion** of raw input field by field, with every failure grouped
//!   by field path and nothing applied unless the whole input converts.
//! - **Partial-update merge**: re-importing drops candidates strictly equal
//!   to the current value and reports which fields changed.
//! - **Validation** of required fields, built-in constraints, per-field and
//!   cross-field rules, recursing into nested entities.
//! - **Role projections** applied during serialization and propagated into
//!   nested entities under the same role name.
//! - The **OCDS building blocks** the registry shares across resources
//!   ([`ocds`]).
//!
//! Everything an operation depends on beyond its input (timezone, id
//! generator, clock, classification registry) arrives through an explicit
//! [`ModelContext`].

pub mod context;
pub mod field;
pub mod model;
pub mod ocds;
pub mod registry;
pub mod roles;
pub mod store;
pub mod types;
pub mod value;

pub use context::{ModelContext, ModelSettings, DEFAULT_CURRENCY};
pub use field::{
    ComputedField, FieldDefault, FieldDescriptor, FieldValidator, ModelValidator,
    ValidationScope, REQUIRED,
};
pub use model::{FieldAccessError, Model, ModelType, ModelTypeBuilder, ROGUE_FIELD};
pub use registry::{ClassificationRegistry, RegistryLoadError, DEFAULT_ITEM_CLASSIFICATION};
pub use roles::{blacklist, whitelist, Projection, RoleTable, View, ALWAYS_HIDDEN};
pub use store::{EntityStore, InMemoryStore, StoreError, StoredEntity};
pub use types::{FieldType, StringRules};
pub use value::Native;
