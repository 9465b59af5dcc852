//! # Serialization Boundaries
//!
//! JSON documents as call inputs, diagnostics as structured JSON, and
//! configuration loaded from text.

use enforce_core::{TypeKey, Value};
use enforce_descriptor::{compile, TypeExpr};
use enforce_validate::{check, EnforcedCallable, EnforcerConfig, Parameter, Signature};
use serde_json::json;

// =========================================================================
// JSON inputs
// =========================================================================

#[test]
fn json_document_validates_against_nested_declaration() {
    let expr = TypeExpr::parse("dict[str, list[int | float] | str | None]").unwrap();
    let descriptor = compile(&expr).unwrap();

    let good = Value::from(json!({"xs": [1, 2.5], "name": "n", "gone": null}));
    assert!(check(&good, &descriptor, "doc").is_ok());

    let bad = Value::from(json!({"xs": [1, "2"]}));
    let err = check(&bad, &descriptor, "doc").unwrap_err();
    assert_eq!(err.path.to_string(), "doc['xs'][1]");
}

#[test]
fn json_booleans_are_not_ints() {
    let descriptor = compile(&TypeExpr::list(TypeExpr::int())).unwrap();
    let err = check(&Value::from(json!([1, true])), &descriptor, "a").unwrap_err();
    assert_eq!(err.actual_type, TypeKey::Bool);
    assert_eq!(err.actual_value, "True");
}

// =========================================================================
// Structured diagnostics
// =========================================================================

#[test]
fn diagnostic_serializes_for_reporting() {
    let descriptor =
        compile(&(TypeExpr::int() | TypeExpr::literal(["a"]) | TypeExpr::class("Foo"))).unwrap();
    let err = check(&Value::str("b"), &descriptor, "x").unwrap_err();
    let out = serde_json::to_value(&err).unwrap();
    assert_eq!(
        out,
        json!({
            "kind": "type_mismatch",
            "path": "x",
            "expected_types": ["int", {"instance": "Foo"}],
            "literal": ["'a'"],
            "actual_type": "str",
            "actual_value": "'b'"
        })
    );
}

#[test]
fn constraint_violation_serializes_its_predicate() {
    let f = EnforcedCallable::new("f", Signature::new([Parameter::positional("n")])).annotate(
        "n",
        TypeExpr::int() | enforce_descriptor::Constraint::new().lt(10),
    );
    let err = f.call(vec![Value::Int(12)], vec![], |_| Value::None).unwrap_err();
    let out = serde_json::to_value(err.diagnostic().unwrap()).unwrap();
    assert_eq!(out["kind"], "constraint_violation");
    assert_eq!(out["predicate"], "lt");
    assert_eq!(out["expectation"], "be less than 10");
    assert_eq!(out["reason"], serde_json::Value::Null);
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn yaml_configuration_drives_the_record() {
    let config = EnforcerConfig::from_yaml_str("strict: false\n").unwrap();
    let f = EnforcedCallable::new("f", Signature::new([Parameter::positional("a")]))
        .annotate("a", TypeExpr::int())
        .with_config(config);
    assert_eq!(
        f.call(vec![Value::str("x")], vec![], |_| Value::Int(1)).unwrap(),
        Value::Int(1)
    );
}

#[test]
fn configuration_round_trips_through_json() {
    let config = EnforcerConfig::default().clean_traceback(false);
    let text = serde_json::to_string(&config).unwrap();
    assert_eq!(EnforcerConfig::from_json_str(&text).unwrap(), config);
}
