//! # Descriptors
//!
//! A [`Descriptor`] is the compiled, normalized form of one declaration: a
//! map from concrete [`TypeKey`]s to nested [`Payload`]s, plus an
//! [`Extras`] side-channel for literal fallbacks and refinement constraints.
//!
//! ## Invariants
//!
//! - The key set is empty only when Extras carries a literal set or the
//!   descriptor is a pure refinement (constraints only).
//! - Merging is a key-set union. Overlapping container keys merge their
//!   payloads recursively; literal and constraint lists concatenate.
//! - An `Any` key reduces every payload to a leaf, since `Any` already
//!   accepts whatever the nested payloads would reject.
//! - Tuple payloads keep one [`TupleShape`] per distinct declared shape, so
//!   the merge result does not depend on member order.
//! - A descriptor is immutable once compiled and holds no call state.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use enforce_core::{TypeKey, Value};

use crate::constraint::Constraint;

/// Nested expectation for a container key.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No recursion.
    Leaf,
    /// Element descriptor for `list`, `set` and `frozenset`.
    Element(Box<Descriptor>),
    /// Key and value descriptors for `dict`.
    Mapping {
        key: Box<Descriptor>,
        value: Box<Descriptor>,
    },
    /// Alternative shapes for `tuple`. A value is accepted when any shape
    /// accepts it.
    Tuple(Vec<TupleShape>),
}

/// One declared `tuple` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleShape {
    /// Positional descriptors. When `variadic` is set, this holds exactly
    /// one descriptor applied at every position.
    pub items: Vec<Descriptor>,
    pub variadic: bool,
}

impl TupleShape {
    /// `tuple[A, B, ...]` with one descriptor per position.
    pub fn fixed(items: Vec<Descriptor>) -> Self {
        Self {
            items,
            variadic: false,
        }
    }

    /// `tuple[T, ...]`.
    pub fn variadic(element: Descriptor) -> Self {
        Self {
            items: vec![element],
            variadic: true,
        }
    }

    /// True when a tuple of `len` members has the right arity.
    pub fn fits(&self, len: usize) -> bool {
        self.variadic || self.items.len() == len
    }
}

/// Literal fallbacks and refinement constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extras {
    literal: Option<Vec<Value>>,
    constraints: Vec<Constraint>,
}

impl Extras {
    /// Accepted literal values, if a literal set was declared.
    pub fn literal(&self) -> Option<&[Value]> {
        self.literal.as_deref()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.literal.is_none() && self.constraints.is_empty()
    }
}

/// A compiled declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    keys: BTreeMap<TypeKey, Payload>,
    extras: Extras,
}

impl Descriptor {
    /// A descriptor with a single leaf key.
    pub fn leaf(key: TypeKey) -> Self {
        Self::with_payload(key, Payload::Leaf)
    }

    /// A descriptor with a single key and its payload.
    pub fn with_payload(key: TypeKey, payload: Payload) -> Self {
        let mut keys = BTreeMap::new();
        keys.insert(key, payload);
        Self {
            keys,
            extras: Extras::default(),
        }
    }

    /// A literal-only descriptor.
    pub fn literal(values: Vec<Value>) -> Self {
        Self {
            keys: BTreeMap::new(),
            extras: Extras {
                literal: Some(values),
                constraints: Vec::new(),
            },
        }
    }

    /// A constraint-only descriptor.
    pub fn constraint(constraint: Constraint) -> Self {
        Self {
            keys: BTreeMap::new(),
            extras: Extras {
                literal: None,
                constraints: vec![constraint],
            },
        }
    }

    /// Append a constraint to this descriptor.
    pub fn push_constraint(&mut self, constraint: Constraint) {
        self.extras.constraints.push(constraint);
    }

    /// Merge `other` into `self` as a union member.
    pub fn merge(&mut self, other: Descriptor) {
        for (key, payload) in other.keys {
            match self.keys.entry(key) {
                Entry::Occupied(mut slot) => {
                    let current = std::mem::replace(slot.get_mut(), Payload::Leaf);
                    *slot.get_mut() = merge_payloads(current, payload);
                }
                Entry::Vacant(slot) => {
                    slot.insert(payload);
                }
            }
        }
        if self.keys.contains_key(&TypeKey::Any) {
            for payload in self.keys.values_mut() {
                *payload = Payload::Leaf;
            }
        }
        if let Some(values) = other.extras.literal {
            self.extras
                .literal
                .get_or_insert_with(Vec::new)
                .extend(values);
        }
        self.extras.constraints.extend(other.extras.constraints);
    }

    /// Owned form of [`merge`](Self::merge).
    pub fn merged(mut self, other: Descriptor) -> Self {
        self.merge(other);
        self
    }

    /// Structural keys in their canonical order.
    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.keys.keys()
    }

    /// True when a value with this key is structurally accepted.
    pub fn accepts_key(&self, key: &TypeKey) -> bool {
        self.keys.contains_key(key) || self.keys.contains_key(&TypeKey::Any)
    }

    /// Payload governing a value with this key. Under `Any` every payload is
    /// a leaf.
    pub fn payload(&self, key: &TypeKey) -> Option<&Payload> {
        self.keys
            .get(key)
            .or_else(|| self.keys.get(&TypeKey::Any))
    }

    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    /// True when every key is a leaf and there are no extras, so that a
    /// batched key-subset check is equivalent to per-element recursion.
    pub fn is_flat(&self) -> bool {
        self.extras.is_empty() && self.keys.values().all(|p| matches!(p, Payload::Leaf))
    }

    /// True for constraint-only descriptors: no structural keys and no
    /// literal set, so any value proceeds straight to refinement.
    pub fn is_pure_refinement(&self) -> bool {
        self.keys.is_empty() && self.extras.literal.is_none()
    }
}

/// Union of two payloads under the same key. A bare container accepts
/// every element, so `Leaf` absorbs any nested payload. Tuple shapes are
/// collected, with duplicates dropped.
fn merge_payloads(current: Payload, incoming: Payload) -> Payload {
    match (current, incoming) {
        (Payload::Leaf, _) | (_, Payload::Leaf) => Payload::Leaf,
        (Payload::Element(mut a), Payload::Element(b)) => {
            a.merge(*b);
            Payload::Element(a)
        }
        (
            Payload::Mapping { mut key, mut value },
            Payload::Mapping {
                key: other_key,
                value: other_value,
            },
        ) => {
            key.merge(*other_key);
            value.merge(*other_value);
            Payload::Mapping { key, value }
        }
        (Payload::Tuple(mut shapes), Payload::Tuple(others)) => {
            for shape in others {
                if !shapes.contains(&shape) {
                    shapes.push(shape);
                }
            }
            Payload::Tuple(shapes)
        }
        // One key never carries two payload kinds; a bare container is the
        // order-independent answer if it ever does.
        _ => Payload::Leaf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(key: TypeKey) -> Payload {
        Payload::Element(Box::new(Descriptor::leaf(key)))
    }

    #[test]
    fn merge_unions_keys() {
        let d = Descriptor::leaf(TypeKey::Int).merged(Descriptor::leaf(TypeKey::Str));
        let keys: Vec<_> = d.keys().cloned().collect();
        assert_eq!(keys, vec![TypeKey::Int, TypeKey::Str]);
        assert!(d.is_flat());
    }

    #[test]
    fn merge_recurses_into_containers() {
        let a = Descriptor::with_payload(TypeKey::List, element(TypeKey::Int));
        let b = Descriptor::with_payload(TypeKey::List, element(TypeKey::Str));
        let d = a.merged(b);
        match d.payload(&TypeKey::List) {
            Some(Payload::Element(inner)) => {
                assert!(inner.accepts_key(&TypeKey::Int));
                assert!(inner.accepts_key(&TypeKey::Str));
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(!d.is_flat());
    }

    #[test]
    fn bare_container_absorbs_nested_payload() {
        let d = Descriptor::leaf(TypeKey::List)
            .merged(Descriptor::with_payload(TypeKey::List, element(TypeKey::Int)));
        assert_eq!(d.payload(&TypeKey::List), Some(&Payload::Leaf));
    }

    fn tuple(shape: TupleShape) -> Descriptor {
        Descriptor::with_payload(TypeKey::Tuple, Payload::Tuple(vec![shape]))
    }

    #[test]
    fn tuple_shapes_accumulate_in_either_order() {
        let fixed = tuple(TupleShape::fixed(vec![
            Descriptor::leaf(TypeKey::Int),
            Descriptor::leaf(TypeKey::Str),
        ]));
        let variadic = tuple(TupleShape::variadic(Descriptor::leaf(TypeKey::Float)));

        let ab = fixed.clone().merged(variadic.clone());
        let ba = variadic.clone().merged(fixed.clone());
        for d in [&ab, &ba] {
            match d.payload(&TypeKey::Tuple) {
                Some(Payload::Tuple(shapes)) => {
                    assert_eq!(shapes.len(), 2);
                    assert!(shapes.iter().any(|s| s.variadic));
                    assert!(shapes.iter().any(|s| !s.variadic && s.items.len() == 2));
                }
                other => panic!("unexpected payload {other:?}"),
            }
        }
    }

    #[test]
    fn identical_tuple_shapes_collapse() {
        let shape = || tuple(TupleShape::variadic(Descriptor::leaf(TypeKey::Int)));
        let d = shape().merged(shape());
        assert_eq!(d, shape());
    }

    #[test]
    fn extras_concatenate() {
        let d = Descriptor::literal(vec![Value::str("a")])
            .merged(Descriptor::literal(vec![Value::Int(1)]))
            .merged(Descriptor::constraint(Constraint::new().ge(0)))
            .merged(Descriptor::constraint(Constraint::new().le(5)));
        assert_eq!(d.extras().literal(), Some(&[Value::str("a"), Value::Int(1)][..]));
        assert_eq!(d.extras().constraints().len(), 2);
        assert_eq!(d.keys().count(), 0);
        assert!(!d.is_pure_refinement());
    }

    #[test]
    fn any_key_governs_unlisted_types() {
        let d = Descriptor::leaf(TypeKey::Any).merged(Descriptor::leaf(TypeKey::Int));
        assert!(d.accepts_key(&TypeKey::Instance("Foo".into())));
        assert_eq!(d.payload(&TypeKey::Str), Some(&Payload::Leaf));
    }

    #[test]
    fn any_absorbs_container_payloads_in_either_order() {
        let list = || Descriptor::with_payload(TypeKey::List, element(TypeKey::Int));
        let any_first = Descriptor::leaf(TypeKey::Any).merged(list());
        let any_last = list().merged(Descriptor::leaf(TypeKey::Any));
        for d in [&any_first, &any_last] {
            assert_eq!(d.payload(&TypeKey::List), Some(&Payload::Leaf));
            assert!(d.is_flat());
        }
        assert_eq!(any_first, any_last);
    }

    #[test]
    fn pure_refinement_has_only_constraints() {
        let d = Descriptor::constraint(Constraint::new().gt(1));
        assert!(d.is_pure_refinement());
        assert!(!Descriptor::literal(vec![]).is_pure_refinement());
    }
}
