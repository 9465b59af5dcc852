//! # Structural Validator
//!
//! Walks a [`Value`] against a compiled [`Descriptor`] depth-first and
//! stops at the first offending sub-value.
//!
//! ## Algorithm
//!
//! 1. The none-value is accepted outright by a descriptor with a
//!    `NoneType` key.
//! 2. Otherwise the value's runtime key selects a payload (`Any` matches
//!    every key). On a miss, the literal set is consulted by host equality
//!    before a type mismatch is reported. Pure-refinement descriptors skip
//!    this step.
//! 3. Container payloads recurse into members. Tuples try each declared
//!    shape whose arity fits and pass if any shape accepts; the first
//!    fitting shape's failure is reported otherwise. When no shape fits,
//!    the arity mismatch is reported, never a type mismatch.
//! 4. Constraints run last, in declaration order.
//!
//! ## Fast Path
//!
//! When a member descriptor is flat (leaf keys only, no extras), the set of
//! member type keys is checked as a batch. A batch rejection falls back to
//! per-member recursion so the failing index is still reported.

use std::collections::BTreeSet;

use enforce_core::{TypeKey, Value};
use enforce_descriptor::{Descriptor, Payload, TupleShape};

use crate::diagnostic::{Diagnostic, Segment, ValuePath};

/// Check `value` against `descriptor`, rooting diagnostic paths at `root`.
///
/// # Errors
///
/// Returns the diagnostic for the first offending sub-value.
pub fn check(value: &Value, descriptor: &Descriptor, root: &str) -> Result<(), Diagnostic> {
    check_at(value, descriptor, &mut ValuePath::new(root))
}

/// Check `value` at an existing path, such as one element of `*args`.
///
/// # Errors
///
/// Returns the diagnostic for the first offending sub-value.
pub fn check_at(
    value: &Value,
    descriptor: &Descriptor,
    path: &mut ValuePath,
) -> Result<(), Diagnostic> {
    walk(value, descriptor, path)
}

fn walk(value: &Value, descriptor: &Descriptor, path: &mut ValuePath) -> Result<(), Diagnostic> {
    if value.is_none() && descriptor.keys().any(|k| *k == TypeKey::NoneType) {
        return Ok(());
    }

    if !descriptor.is_pure_refinement() {
        match descriptor.payload(&value.type_key()) {
            Some(payload) => descend(value, descriptor, payload, path)?,
            None => {
                let literal_hit = descriptor
                    .extras()
                    .literal()
                    .is_some_and(|literal| literal.iter().any(|l| l == value));
                if !literal_hit {
                    return Err(Diagnostic::type_mismatch(path, descriptor, value));
                }
            }
        }
    }

    for constraint in descriptor.extras().constraints() {
        constraint
            .evaluate(value)
            .map_err(|failure| Diagnostic::constraint_violation(path, descriptor, value, failure))?;
    }
    Ok(())
}

fn descend(
    value: &Value,
    descriptor: &Descriptor,
    payload: &Payload,
    path: &mut ValuePath,
) -> Result<(), Diagnostic> {
    match payload {
        Payload::Leaf => Ok(()),
        Payload::Element(element) => {
            let members = value.elements().unwrap_or_default();
            if matches!(value, Value::Set(_) | Value::FrozenSet(_)) {
                walk_members(members, element, path, |_, v| Segment::Member(v.to_string()))
            } else {
                walk_members(members, element, path, |i, _| Segment::Index(i))
            }
        }
        Payload::Mapping { key, value: entry } => {
            let entries = value.entries().unwrap_or_default();
            if !batch_accepts(entries.iter().map(|(k, _)| k), key, path) {
                for (k, _) in entries {
                    path.push(Segment::Key(k.to_string()));
                    walk(k, key, path)?;
                    path.pop();
                }
            }
            if !batch_accepts(entries.iter().map(|(_, v)| v), entry, path) {
                for (k, v) in entries {
                    path.push(Segment::Entry(k.to_string()));
                    walk(v, entry, path)?;
                    path.pop();
                }
            }
            Ok(())
        }
        Payload::Tuple(shapes) => {
            let members = value.elements().unwrap_or_default();
            let mut fitting = shapes.iter().filter(|shape| shape.fits(members.len()));
            let Some(first) = fitting.next() else {
                let expected = closest_arity(shapes, members.len());
                return Err(Diagnostic::length_mismatch(
                    path,
                    descriptor,
                    value,
                    expected,
                    members.len(),
                ));
            };
            let depth = path.depth();
            let Err(first_failure) = walk_shape(members, first, path) else {
                return Ok(());
            };
            for shape in fitting {
                path.truncate(depth);
                if walk_shape(members, shape, path).is_ok() {
                    return Ok(());
                }
            }
            Err(first_failure)
        }
    }
}

fn walk_shape(
    members: &[Value],
    shape: &TupleShape,
    path: &mut ValuePath,
) -> Result<(), Diagnostic> {
    if shape.variadic {
        return match shape.items.first() {
            Some(element) => walk_members(members, element, path, |i, _| Segment::Index(i)),
            None => Ok(()),
        };
    }
    for (i, (member, expected)) in members.iter().zip(&shape.items).enumerate() {
        path.push(Segment::Index(i));
        walk(member, expected, path)?;
        path.pop();
    }
    Ok(())
}

/// Arity reported when no shape fits: the declared length nearest the
/// actual one, preferring the shorter on a tie.
fn closest_arity(shapes: &[TupleShape], actual: usize) -> usize {
    shapes
        .iter()
        .filter(|shape| !shape.variadic)
        .map(|shape| shape.items.len())
        .min_by_key(|&len| (len.abs_diff(actual), len))
        .unwrap_or_default()
}

fn walk_members(
    members: &[Value],
    element: &Descriptor,
    path: &mut ValuePath,
    segment: impl Fn(usize, &Value) -> Segment,
) -> Result<(), Diagnostic> {
    if batch_accepts(members, element, path) {
        return Ok(());
    }
    for (i, member) in members.iter().enumerate() {
        path.push(segment(i, member));
        walk(member, element, path)?;
        path.pop();
    }
    Ok(())
}

/// Batched key-subset check. Only meaningful for flat descriptors, where
/// it is equivalent to per-member recursion.
fn batch_accepts<'a>(
    members: impl IntoIterator<Item = &'a Value>,
    descriptor: &Descriptor,
    path: &ValuePath,
) -> bool {
    if !descriptor.is_flat() {
        return false;
    }
    let present: BTreeSet<TypeKey> = members.into_iter().map(Value::type_key).collect();
    let accepted = present.iter().all(|k| descriptor.accepts_key(k));
    if !accepted {
        tracing::trace!(path = %path, "batch check rejected members, checking each");
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ViolationKind;
    use enforce_descriptor::{compile, Constraint, TypeExpr};

    fn run(expr: TypeExpr, value: Value) -> Result<(), Diagnostic> {
        check(&value, &compile(&expr).unwrap(), "a")
    }

    fn path_of(expr: TypeExpr, value: Value) -> String {
        run(expr, value).unwrap_err().path.to_string()
    }

    fn ints(items: impl IntoIterator<Item = i64>) -> Vec<Value> {
        items.into_iter().map(Value::Int).collect()
    }

    #[test]
    fn scalar_mismatch() {
        let err = run(TypeExpr::int(), Value::str("x")).unwrap_err();
        assert_eq!(err.kind, ViolationKind::TypeMismatch);
        assert_eq!(err.path.to_string(), "a");
        assert_eq!(err.actual_type, TypeKey::Str);
        assert_eq!(err.actual_value, "'x'");
        assert_eq!(err.expected, vec![TypeKey::Int]);
    }

    #[test]
    fn bool_is_not_int() {
        assert!(run(TypeExpr::int(), Value::Bool(true)).is_err());
        assert!(run(TypeExpr::int() | TypeExpr::bool(), Value::Bool(true)).is_ok());
    }

    #[test]
    fn optional_accepts_none_and_skips_constraints() {
        let expr = TypeExpr::optional(TypeExpr::int()) | Constraint::new().ge(0);
        assert!(run(expr.clone(), Value::None).is_ok());
        assert!(run(expr.clone(), Value::Int(3)).is_ok());
        assert!(run(expr, Value::Int(-3)).is_err());
    }

    #[test]
    fn list_element_path() {
        let value = Value::list([Value::Int(1), Value::str("2"), Value::Int(3)]);
        assert_eq!(path_of(TypeExpr::list(TypeExpr::int()), value), "a[1]");
        assert!(run(TypeExpr::list(TypeExpr::int()), Value::list(ints(0..50))).is_ok());
        assert!(run(TypeExpr::list(TypeExpr::int()), Value::list([])).is_ok());
    }

    #[test]
    fn set_member_path_uses_repr() {
        let value = Value::set([Value::Int(1), Value::str("b")]);
        assert_eq!(path_of(TypeExpr::set(TypeExpr::int()), value), "a['b']");
    }

    #[test]
    fn dict_key_and_value_paths() {
        let expr = TypeExpr::dict(TypeExpr::str(), TypeExpr::int());
        assert_eq!(
            path_of(expr.clone(), Value::dict([(Value::Int(1), Value::Int(2))])),
            "a.key[1]"
        );
        assert_eq!(
            path_of(expr.clone(), Value::dict([(Value::str("i"), Value::str("x"))])),
            "a['i']"
        );
        assert!(run(expr, Value::dict([(Value::str("i"), Value::Int(1))])).is_ok());
    }

    #[test]
    fn variadic_tuple_path() {
        let value = Value::tuple([Value::Int(1), Value::Int(2), Value::str("3")]);
        assert_eq!(path_of(TypeExpr::tuple_of(TypeExpr::int()), value), "a[2]");
        assert!(run(TypeExpr::tuple_of(TypeExpr::int()), Value::tuple([])).is_ok());
    }

    #[test]
    fn fixed_tuple_length_wins_over_types() {
        let expr = TypeExpr::tuple([TypeExpr::int(), TypeExpr::str()]);
        let err = run(expr.clone(), Value::tuple(ints([1, 2, 3]))).unwrap_err();
        assert_eq!(
            err.kind,
            ViolationKind::LengthMismatch {
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(path_of(expr.clone(), Value::tuple(ints([1, 2]))), "a[1]");
        assert!(run(expr, Value::tuple([Value::Int(1), Value::str("x")])).is_ok());
    }

    #[test]
    fn empty_tuple_declaration() {
        assert!(run(TypeExpr::tuple([]), Value::tuple([])).is_ok());
        assert!(matches!(
            run(TypeExpr::tuple([]), Value::tuple(ints([1]))).unwrap_err().kind,
            ViolationKind::LengthMismatch { expected: 0, actual: 1 }
        ));
    }

    #[test]
    fn literal_fallback_is_or() {
        let expr = TypeExpr::int() | TypeExpr::literal(["a", "b"]);
        assert!(run(expr.clone(), Value::Int(1)).is_ok());
        assert!(run(expr.clone(), Value::str("a")).is_ok());
        let err = run(expr, Value::str("c")).unwrap_err();
        assert_eq!(err.literal, Some(vec!["'a'".to_string(), "'b'".to_string()]));
    }

    #[test]
    fn literal_uses_host_equality() {
        assert!(run(TypeExpr::literal([1]), Value::Float(1.0)).is_ok());
        assert!(run(TypeExpr::literal([1]), Value::Int(2)).is_err());
    }

    #[test]
    fn constraint_after_structural_match() {
        let expr = TypeExpr::int() | Constraint::new().ge(0);
        let err = run(expr, Value::Int(-1)).unwrap_err();
        match err.kind {
            ViolationKind::ConstraintViolation { predicate, .. } => assert_eq!(predicate, "ge"),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn str_with_numeric_constraint_always_fails() {
        let expr = TypeExpr::str() | Constraint::new().ge(0);
        let on_str = run(expr.clone(), Value::str("abc")).unwrap_err();
        assert!(matches!(on_str.kind, ViolationKind::ConstraintViolation { .. }));
        let on_int = run(expr, Value::Int(5)).unwrap_err();
        assert_eq!(on_int.kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn pure_refinement_checks_any_value() {
        let expr = TypeExpr::Constraint(Constraint::new().min_length(2));
        assert!(run(expr.clone(), Value::str("ab")).is_ok());
        assert!(run(expr.clone(), Value::list(ints([1, 2]))).is_ok());
        assert!(run(expr, Value::str("a")).is_err());
    }

    #[test]
    fn constraints_inside_containers_report_member_path() {
        let expr = TypeExpr::list(TypeExpr::int() | Constraint::new().gt(0));
        let err = run(expr, Value::list(ints([3, 2, 0]))).unwrap_err();
        assert_eq!(err.path.to_string(), "a[2]");
    }

    #[test]
    fn any_in_a_union_accepts_what_any_alone_accepts() {
        let bad_list = || Value::list([Value::str("x")]);
        assert!(run(TypeExpr::Any, bad_list()).is_ok());
        assert!(run(TypeExpr::Any | TypeExpr::list(TypeExpr::int()), bad_list()).is_ok());
        assert!(run(TypeExpr::list(TypeExpr::int()) | TypeExpr::Any, bad_list()).is_ok());
        let fixed = TypeExpr::Any | TypeExpr::tuple([TypeExpr::int()]);
        assert!(run(fixed, Value::tuple(ints([1, 2, 3]))).is_ok());
        assert!(run(TypeExpr::Any, Value::object("Foo")).is_ok());
    }

    #[test]
    fn nested_any_absorbs_sibling_payloads() {
        let entry = TypeExpr::dict(TypeExpr::str(), TypeExpr::int());
        let expr = TypeExpr::list(TypeExpr::Any | entry);
        let value = Value::list([Value::dict([(Value::Int(1), Value::None)])]);
        assert!(run(expr, value).is_ok());
    }

    #[test]
    fn tuple_union_accepts_any_matching_shape() {
        let variadic = || TypeExpr::tuple_of(TypeExpr::int());
        let single = || TypeExpr::tuple([TypeExpr::str()]);
        for expr in [variadic() | single(), single() | variadic()] {
            assert!(run(expr.clone(), Value::tuple(ints([1, 1, 1]))).is_ok());
            assert!(run(expr.clone(), Value::tuple([Value::str("a")])).is_ok());
            assert!(run(expr.clone(), Value::tuple([])).is_ok());
            assert_eq!(path_of(expr, Value::tuple([Value::str("a"), Value::Int(1)])), "a[0]");
        }
    }

    #[test]
    fn tuple_union_reports_length_only_when_no_shape_fits() {
        let pair = || TypeExpr::tuple([TypeExpr::int(), TypeExpr::int()]);
        let single = || TypeExpr::tuple([TypeExpr::str()]);
        for expr in [pair() | single(), single() | pair()] {
            let err = run(expr.clone(), Value::tuple(ints([1, 2, 3]))).unwrap_err();
            assert_eq!(
                err.kind,
                ViolationKind::LengthMismatch {
                    expected: 2,
                    actual: 3
                }
            );
            let err = run(expr, Value::tuple([Value::Int(1)])).unwrap_err();
            assert_eq!(err.kind, ViolationKind::TypeMismatch);
            assert_eq!(err.path.to_string(), "a[0]");
        }
    }

    #[test]
    fn failed_tuple_shape_leaves_no_stale_path() {
        let expr = TypeExpr::tuple([TypeExpr::int(), TypeExpr::str()])
            | TypeExpr::tuple([TypeExpr::str(), TypeExpr::int()]);
        assert!(run(expr.clone(), Value::tuple([Value::str("a"), Value::Int(1)])).is_ok());
        let err = run(expr, Value::tuple([Value::Int(1), Value::Int(2)])).unwrap_err();
        assert_eq!(err.path.to_string(), "a[1]");
        assert_eq!(err.path.depth(), 1);
    }

    #[test]
    fn instances_and_classes_are_distinct() {
        assert!(run(TypeExpr::class("Foo"), Value::object("Foo")).is_ok());
        assert!(run(TypeExpr::class("Foo"), Value::class("Foo")).is_err());
        assert!(run(TypeExpr::type_of("Foo"), Value::class("Foo")).is_ok());
        assert!(run(TypeExpr::type_of("Foo"), Value::object("Foo")).is_err());
    }

    #[test]
    fn sized_and_callable_capabilities() {
        assert!(run(TypeExpr::Sized, Value::str("x")).is_ok());
        assert!(run(TypeExpr::Sized, Value::range(0, 3)).is_ok());
        assert!(run(TypeExpr::Sized, Value::Int(1)).is_err());
        let f = Value::callable(enforce_core::CallableKind::Generator, "gen");
        assert!(run(TypeExpr::Callable, f).is_ok());
        assert!(run(TypeExpr::Callable, Value::class("Foo")).is_err());
    }

    #[test]
    fn merged_list_union_accepts_mixed_elements() {
        let expr = TypeExpr::list(TypeExpr::int()) | TypeExpr::list(TypeExpr::str());
        assert!(run(expr, Value::list([Value::Int(1), Value::str("a")])).is_ok());
    }

    #[test]
    fn nested_depth_matches_segment_count() {
        let expr = TypeExpr::dict(
            TypeExpr::str(),
            TypeExpr::list(TypeExpr::tuple_of(TypeExpr::int())),
        );
        let value = Value::dict([(
            Value::str("k"),
            Value::list([Value::tuple(ints([1])), Value::tuple([Value::Float(0.5)])]),
        )]);
        let err = run(expr, value).unwrap_err();
        assert_eq!(err.path.to_string(), "a['k'][1][0]");
        assert_eq!(err.path.depth(), 3);
    }

    #[test]
    fn return_root() {
        let err = check(&Value::Int(1), &compile(&TypeExpr::str()).unwrap(), "return")
            .unwrap_err();
        assert_eq!(err.path.to_string(), "return");
    }
}
