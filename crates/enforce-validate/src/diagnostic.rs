//! # Diagnostics
//!
//! A [`Diagnostic`] describes the first offending sub-value found by the
//! validator: where it sits ([`ValuePath`]), what was accepted there, and
//! what was actually passed.
//!
//! ## Path Syntax
//!
//! | Segment | Rendering | Produced by |
//! |---|---|---|
//! | [`Segment::Index`] | `a[1]` | list and tuple positions |
//! | [`Segment::Member`] | `a['x']` | set members, by repr |
//! | [`Segment::Key`] | `a.key['x']` | dict keys, by repr |
//! | [`Segment::Entry`] | `a['x']` | dict values, by the key's repr |
//!
//! A failure at nesting depth `d` carries exactly `d` segments.

use std::fmt;
use std::panic::Location;

use enforce_core::{TypeKey, Value};
use enforce_descriptor::{ConstraintFailure, Descriptor};
use serde::{Serialize, Serializer};

/// One step from a container to one of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Index(usize),
    Member(String),
    Key(String),
    Entry(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Member(repr) | Self::Entry(repr) => write!(f, "[{repr}]"),
            Self::Key(repr) => write!(f, ".key[{repr}]"),
        }
    }
}

/// Location of a sub-value, rooted at a parameter name or `return`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath {
    root: String,
    segments: Vec<Segment>,
}

impl ValuePath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            segments: Vec::new(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of index or key segments below the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    /// Drop segments beyond `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.segments.truncate(depth);
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for ValuePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The three failure kinds the validator distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// The value's type is not accepted and no literal matched.
    TypeMismatch,
    /// A fixed-arity tuple had the wrong number of elements.
    LengthMismatch {
        /// Declared positional count.
        expected: usize,
        /// Elements actually present.
        actual: usize,
    },
    /// A refinement predicate rejected a structurally accepted value.
    ConstraintViolation {
        /// Name of the failing predicate (`ge`, `pattern`, a user name).
        predicate: String,
        /// What the value was expected to do.
        expectation: String,
        /// Internal failure reason, if the predicate could not run.
        reason: Option<String>,
    },
}

impl ViolationKind {
    /// Short machine-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeMismatch => "type_mismatch",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::ConstraintViolation { .. } => "constraint_violation",
        }
    }
}

/// A located validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub kind: ViolationKind,
    /// Path to the offending sub-value.
    pub path: ValuePath,
    /// Structural keys accepted at the path.
    #[serde(rename = "expected_types")]
    pub expected: Vec<TypeKey>,
    /// Reprs of the literal values accepted at the path, if any.
    pub literal: Option<Vec<String>>,
    /// Runtime type of the offending value.
    pub actual_type: TypeKey,
    /// Repr of the offending value.
    pub actual_value: String,
    /// Where inside the validator the failure was raised.
    #[serde(skip)]
    pub origin: &'static Location<'static>,
}

impl Diagnostic {
    #[track_caller]
    fn new(kind: ViolationKind, path: &ValuePath, descriptor: &Descriptor, value: &Value) -> Self {
        Self {
            kind,
            path: path.clone(),
            expected: descriptor.keys().cloned().collect(),
            literal: descriptor
                .extras()
                .literal()
                .map(|values| values.iter().map(ToString::to_string).collect()),
            actual_type: value.type_key(),
            actual_value: value.to_string(),
            origin: Location::caller(),
        }
    }

    #[track_caller]
    pub fn type_mismatch(path: &ValuePath, descriptor: &Descriptor, value: &Value) -> Self {
        Self::new(ViolationKind::TypeMismatch, path, descriptor, value)
    }

    #[track_caller]
    pub fn length_mismatch(
        path: &ValuePath,
        descriptor: &Descriptor,
        value: &Value,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::new(
            ViolationKind::LengthMismatch { expected, actual },
            path,
            descriptor,
            value,
        )
    }

    #[track_caller]
    pub fn constraint_violation(
        path: &ValuePath,
        descriptor: &Descriptor,
        value: &Value,
        failure: ConstraintFailure,
    ) -> Self {
        Self::new(
            ViolationKind::ConstraintViolation {
                predicate: failure.predicate,
                expectation: failure.expectation,
                reason: failure.reason,
            },
            path,
            descriptor,
            value,
        )
    }

    fn write_expected(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.expected.is_empty() || self.literal.is_none() {
            f.write_str("`[")?;
            for (i, key) in self.expected.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}")?;
            }
            f.write_str("]`")?;
        }
        if let Some(literal) = &self.literal {
            if !self.expected.is_empty() {
                f.write_str(" or ")?;
            }
            write!(f, "literal values `[{}]`", literal.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::TypeMismatch => {
                write!(
                    f,
                    "Type mismatch for typed variable `{}`. Expected one of the following ",
                    self.path
                )?;
                self.write_expected(f)?;
                write!(
                    f,
                    " but got `{}` with value `{}` instead.",
                    self.actual_type, self.actual_value
                )
            }
            ViolationKind::LengthMismatch { expected, actual } => write!(
                f,
                "Tuple length mismatch for typed variable `{}`. Expected length {expected} but \
                 got length {actual} with value `{}` instead.",
                self.path, self.actual_value
            ),
            ViolationKind::ConstraintViolation {
                predicate,
                expectation,
                reason,
            } => {
                write!(
                    f,
                    "Constraint violation for typed variable `{}`. Expected value to {expectation} \
                     (`{predicate}`) but got `{}` instead.",
                    self.path, self.actual_value
                )?;
                if let Some(reason) = reason {
                    write!(f, " Predicate failed: {reason}.")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enforce_descriptor::Constraint;

    fn nested_path() -> ValuePath {
        let mut path = ValuePath::new("a");
        path.push(Segment::Key("'k'".into()));
        path.push(Segment::Index(1));
        path
    }

    #[test]
    fn path_rendering() {
        assert_eq!(ValuePath::new("return").to_string(), "return");
        assert_eq!(nested_path().to_string(), "a.key['k'][1]");
        let mut path = ValuePath::new("a");
        path.push(Segment::Entry("'i'".into()));
        path.push(Segment::Member("2".into()));
        assert_eq!(path.to_string(), "a['i'][2]");
        assert_eq!(path.depth(), 2);
        path.pop();
        assert_eq!(path.to_string(), "a['i']");
    }

    #[test]
    fn type_mismatch_message() {
        let mut path = ValuePath::new("a");
        path.push(Segment::Index(1));
        let d = Diagnostic::type_mismatch(&path, &Descriptor::leaf(TypeKey::Int), &Value::str("2"));
        assert_eq!(
            d.to_string(),
            "Type mismatch for typed variable `a[1]`. Expected one of the following `[int]` \
             but got `str` with value `'2'` instead."
        );
        assert_eq!(d.kind.name(), "type_mismatch");
    }

    #[test]
    fn literal_sets_are_named() {
        let desc = Descriptor::leaf(TypeKey::Int)
            .merged(Descriptor::literal(vec![Value::str("a"), Value::str("b")]));
        let d = Diagnostic::type_mismatch(&ValuePath::new("x"), &desc, &Value::str("c"));
        assert!(d
            .to_string()
            .contains("`[int]` or literal values `['a', 'b']`"));

        let only = Descriptor::literal(vec![Value::Int(1)]);
        let d = Diagnostic::type_mismatch(&ValuePath::new("x"), &only, &Value::Int(2));
        assert!(d.to_string().contains("following literal values `[1]` but got `int`"));
    }

    #[test]
    fn length_mismatch_message() {
        let d = Diagnostic::length_mismatch(
            &ValuePath::new("a"),
            &Descriptor::leaf(TypeKey::Tuple),
            &Value::tuple([Value::Int(1), Value::Int(2), Value::Int(3)]),
            2,
            3,
        );
        assert_eq!(
            d.to_string(),
            "Tuple length mismatch for typed variable `a`. Expected length 2 but got length 3 \
             with value `(1, 2, 3)` instead."
        );
    }

    #[test]
    fn constraint_violation_message() {
        let failure = Constraint::new().ge(0).evaluate(&Value::Int(-1)).unwrap_err();
        let d = Diagnostic::constraint_violation(
            &ValuePath::new("c"),
            &Descriptor::leaf(TypeKey::Int),
            &Value::Int(-1),
            failure,
        );
        let text = d.to_string();
        assert!(text.starts_with("Constraint violation for typed variable `c`."));
        assert!(text.contains("(`ge`) but got `-1` instead."));
    }

    #[test]
    fn origin_points_at_the_constructor_call() {
        let d = Diagnostic::type_mismatch(&ValuePath::new("a"), &Descriptor::default(), &Value::None);
        assert!(d.origin.file().ends_with("diagnostic.rs"));
    }

    #[test]
    fn serializes_flat_with_rendered_path() {
        let d = Diagnostic::length_mismatch(
            &nested_path(),
            &Descriptor::leaf(TypeKey::Tuple),
            &Value::tuple([Value::Int(1)]),
            2,
            1,
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "length_mismatch");
        assert_eq!(json["expected"], serde_json::json!(2));
        assert_eq!(json["path"], "a.key['k'][1]");
        assert_eq!(json["expected_types"], serde_json::json!(["tuple"]));
        assert!(json.get("origin").is_none());
    }
}
