//! # Role Projections
//!
//! Each entity type carries an immutable [`RoleTable`] mapping an audience
//! role to a [`Projection`]: either the fields to hide (blacklist) or the
//! only fields to keep (whitelist). The projection for a role is applied to
//! the entity and, under the same role name, to every nested entity.
//!
//! The internal name `__parent__` is hidden under every role, including the
//! default one. A role the table does not declare behaves like the default.

use std::collections::{BTreeMap, BTreeSet};

/// Field names no projection ever shows.
pub const ALWAYS_HIDDEN: &[&str] = &["__parent__"];

/// Which fields a role may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Blacklist(BTreeSet<&'static str>),
    Whitelist(BTreeSet<&'static str>),
}

/// Hide the named fields.
pub fn blacklist(fields: &[&'static str]) -> Projection {
    Projection::Blacklist(fields.iter().copied().collect())
}

/// Show only the named fields.
pub fn whitelist(fields: &[&'static str]) -> Projection {
    Projection::Whitelist(fields.iter().copied().collect())
}

/// Per-type mapping of role name to projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    roles: BTreeMap<&'static str, Projection>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a role.
    pub fn with(mut self, role: &'static str, projection: Projection) -> Self {
        self.roles.insert(role, projection);
        self
    }

    /// Declared role names.
    pub fn roles(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.roles.keys().copied()
    }

    /// The view for a role; `None` is the default role.
    pub fn view(&self, role: Option<&str>) -> View<'_> {
        View {
            projection: role.and_then(|r| self.roles.get(r)),
        }
    }
}

/// A resolved projection for one serialization pass over one entity.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    projection: Option<&'a Projection>,
}

impl View<'_> {
    /// Whether the field is visible.
    pub fn shows(&self, field: &str) -> bool {
        if ALWAYS_HIDDEN.contains(&field) {
            return false;
        }
        match self.projection {
            None => true,
            Some(Projection::Blacklist(hidden)) => !hidden.contains(field),
            Some(Projection::Whitelist(kept)) => kept.contains(field),
        }
    }
}
