//! Structural concepts: named bundles of related sub-objects.
//!
//! A concept describes how an object decomposes into named roles — for
//! example, a hierarchy exposing its designated leaf graph. Concepts are
//! stateless descriptors behind an explicit trait; conformance is derived
//! from the role links recorded on the object itself when the host
//! constructed it, not from runtime structure probing.

use std::collections::BTreeMap;

use canopy_cache::AttributeCache;
use canopy_common::{ObjectHandle, Value};

use crate::error::ShapeError;

/// A structural contract over an object.
///
/// `validate` answers whether the object conforms; `decompose` produces the
/// roles that are present (non-strict — a partially linked object yields its
/// partial decomposition). `rename_role` optionally translates a role name
/// to the parameter name it should fill.
pub trait Concept: Send + Sync {
    /// The concept's name, used in diagnostics.
    fn name(&self) -> &str;

    /// Returns `true` if `object` conforms to this concept.
    fn validate(&self, cache: &AttributeCache, object: &ObjectHandle) -> bool;

    /// Decomposes `object` into its present roles.
    fn decompose(&self, cache: &AttributeCache, object: &ObjectHandle) -> BTreeMap<String, Value>;

    /// Translates a role name to a target parameter name, if a translation
    /// is declared.
    fn rename_role(&self, role: &str) -> Option<&str> {
        let _ = role;
        None
    }
}

/// A concept whose roles are attribute links recorded on the object.
///
/// The host links an object when it constructs the related structures:
/// [`RoleConcept::link`] records each role as a cached attribute, and both
/// validation and decomposition read those attributes back. This is how a
/// tree built from a graph remembers which graph its leaves came from.
pub struct RoleConcept {
    name: String,
    roles: Vec<String>,
    renames: Vec<(String, String)>,
}

impl RoleConcept {
    /// Creates a concept with no roles yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
            renames: Vec::new(),
        }
    }

    /// Adds a role whose name doubles as the target parameter name.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Adds a role that fills a differently named parameter.
    pub fn role_as(mut self, role: impl Into<String>, parameter: impl Into<String>) -> Self {
        let role = role.into();
        self.roles.push(role.clone());
        self.renames.push((role, parameter.into()));
        self
    }

    /// The declared role names.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Records role links on `object`, marking it as conforming.
    ///
    /// Fails if a supplied role is not declared by this concept.
    pub fn link(
        &self,
        cache: &AttributeCache,
        object: &ObjectHandle,
        values: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<(), ShapeError> {
        for (role, value) in values {
            if !self.roles.contains(&role) {
                return Err(ShapeError::UnknownRole {
                    concept: self.name.clone(),
                    role,
                });
            }
            cache.set_attribute(object, &role, value);
        }
        Ok(())
    }
}

impl Concept for RoleConcept {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, cache: &AttributeCache, object: &ObjectHandle) -> bool {
        self.roles
            .iter()
            .all(|role| cache.get_attribute(object, role).is_some())
    }

    fn decompose(&self, cache: &AttributeCache, object: &ObjectHandle) -> BTreeMap<String, Value> {
        self.roles
            .iter()
            .filter_map(|role| {
                cache
                    .get_attribute(object, role)
                    .map(|value| (role.clone(), value))
            })
            .collect()
    }

    fn rename_role(&self, role: &str) -> Option<&str> {
        self.renames
            .iter()
            .find(|(r, _)| r == role)
            .map(|(_, parameter)| parameter.as_str())
    }
}
