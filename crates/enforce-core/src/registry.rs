//! # Class Registry
//!
//! Records user classes and their bases so that subclass-aware
//! declarations can be expanded into the concrete set of accepted classes.
//!
//! ## Thread Safety
//!
//! `ClassRegistry` is `Send + Sync`. Registration takes a write lock;
//! lookups and subclass walks take a read lock. Classes cannot be
//! redefined, so the hierarchy is always acyclic.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::CoreError;
use crate::key::TypeKey;

#[derive(Debug, Default)]
struct Hierarchy {
    /// Class name to its direct bases, in declaration order.
    bases: BTreeMap<String, Vec<String>>,
    /// Class name to its direct subclasses, in registration order.
    children: BTreeMap<String, Vec<String>>,
}

/// Registry of user classes and their inheritance edges.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    inner: RwLock<Hierarchy>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class with its direct bases.
    ///
    /// # Errors
    ///
    /// - `ReservedName` if `name` is a builtin type name.
    /// - `DuplicateClass` if `name` is already registered.
    /// - `UnknownBase` if any base has not been registered.
    pub fn register<I, S>(&self, name: &str, bases: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if TypeKey::from_builtin_name(name).is_some() {
            return Err(CoreError::ReservedName(name.to_string()));
        }
        let bases: Vec<String> = bases.into_iter().map(Into::into).collect();

        let mut h = self.inner.write();
        if h.bases.contains_key(name) {
            return Err(CoreError::DuplicateClass(name.to_string()));
        }
        if let Some(missing) = bases.iter().find(|b| !h.bases.contains_key(b.as_str())) {
            return Err(CoreError::UnknownBase {
                class: name.to_string(),
                base: missing.clone(),
            });
        }
        for base in &bases {
            h.children
                .entry(base.clone())
                .or_default()
                .push(name.to_string());
        }
        h.bases.insert(name.to_string(), bases);
        Ok(())
    }

    /// Returns true if `name` has been registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().bases.contains_key(name)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.inner.read().bases.len()
    }

    /// Returns true when no class has been registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().bases.is_empty()
    }

    /// `name` followed by every transitive subclass, depth-first in
    /// registration order, each class listed once.
    ///
    /// Returns `None` if `name` is not registered.
    pub fn with_subclasses(&self, name: &str) -> Option<Vec<String>> {
        let h = self.inner.read();
        if !h.bases.contains_key(name) {
            return None;
        }
        let mut out = Vec::new();
        let mut stack = vec![name.to_string()];
        while let Some(class) = stack.pop() {
            if out.contains(&class) {
                continue;
            }
            if let Some(children) = h.children.get(&class) {
                stack.extend(children.iter().rev().cloned());
            }
            out.push(class);
        }
        Some(out)
    }
}
