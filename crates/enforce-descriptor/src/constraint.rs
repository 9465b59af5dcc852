//! # Constraint Engine
//!
//! Refinement predicates evaluated against a single value after it has
//! passed structural matching.
//!
//! A [`Constraint`] is an ordered AND-chain of [`Predicate`]s. Evaluation
//! stops at the first predicate that returns false or fails internally
//! (for example `ge=0` applied to a string), and that predicate is reported.
//!
//! Built-in predicates cover numeric comparison (`gt`, `ge`, `lt`, `le`,
//! `eq`, `ne`), pattern matching (`pattern`), membership (`includes`,
//! `excludes`), and length bounds (`min_length`, `max_length`). Named
//! user predicates (`check`, `try_check`) make a generic constraint; a
//! panic inside a user predicate is captured and reported as a failure.

use std::cmp::Ordering;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use enforce_core::Value;
use regex::Regex;

use crate::error::ConstraintError;

/// Signature of a user-supplied predicate. `Err` is an internal failure
/// and is reported the same way as `Ok(false)`, with the reason attached.
pub type PredicateFn = dyn Fn(&Value) -> Result<bool, String> + Send + Sync;

/// One named predicate over a value.
#[derive(Clone)]
pub enum Predicate {
    /// The value is a `str` containing a match for the pattern.
    Pattern(Regex),
    Gt(Value),
    Ge(Value),
    Lt(Value),
    Le(Value),
    Eq(Value),
    Ne(Value),
    /// The value contains every listed item.
    Includes(Vec<Value>),
    /// The value contains none of the listed items.
    Excludes(Vec<Value>),
    MinLength(usize),
    MaxLength(usize),
    /// A named user predicate.
    Custom { name: String, func: Arc<PredicateFn> },
}

impl Predicate {
    /// Short name used in diagnostics (`ge`, `pattern`, or the user name).
    pub fn name(&self) -> &str {
        match self {
            Self::Pattern(_) => "pattern",
            Self::Gt(_) => "gt",
            Self::Ge(_) => "ge",
            Self::Lt(_) => "lt",
            Self::Le(_) => "le",
            Self::Eq(_) => "eq",
            Self::Ne(_) => "ne",
            Self::Includes(_) => "includes",
            Self::Excludes(_) => "excludes",
            Self::MinLength(_) => "min_length",
            Self::MaxLength(_) => "max_length",
            Self::Custom { name, .. } => name,
        }
    }

    /// What the value was expected to do, phrased to follow "Expected x to".
    pub fn expectation(&self) -> String {
        match self {
            Self::Pattern(re) => format!("match pattern '{}'", re.as_str()),
            Self::Gt(v) => format!("be greater than {v}"),
            Self::Ge(v) => format!("be greater than or equal to {v}"),
            Self::Lt(v) => format!("be less than {v}"),
            Self::Le(v) => format!("be less than or equal to {v}"),
            Self::Eq(v) => format!("be equal to {v}"),
            Self::Ne(v) => format!("be not equal to {v}"),
            Self::Includes(items) => format!("include {}", Value::List(items.clone())),
            Self::Excludes(items) => format!("exclude {}", Value::List(items.clone())),
            Self::MinLength(n) => format!("have length of at least {n}"),
            Self::MaxLength(n) => format!("have length of at most {n}"),
            Self::Custom { name, .. } => format!("satisfy `{name}`"),
        }
    }

    /// Evaluate against `value`. `Err` carries the reason the predicate
    /// could not be evaluated.
    pub fn evaluate(&self, value: &Value) -> Result<bool, String> {
        match self {
            Self::Pattern(re) => match value {
                Value::Str(s) => Ok(re.is_match(s)),
                other => Err(format!(
                    "expected string or bytes-like object, got '{}'",
                    other.type_key()
                )),
            },
            Self::Gt(bound) => ordered(value, bound, ">", Ordering::is_gt),
            Self::Ge(bound) => ordered(value, bound, ">=", Ordering::is_ge),
            Self::Lt(bound) => ordered(value, bound, "<", Ordering::is_lt),
            Self::Le(bound) => ordered(value, bound, "<=", Ordering::is_le),
            Self::Eq(other) => Ok(value == other),
            Self::Ne(other) => Ok(value != other),
            Self::Includes(items) => {
                for item in items {
                    if !membership(value, item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Excludes(items) => {
                for item in items {
                    if membership(value, item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::MinLength(n) => length(value).map(|len| len >= *n),
            Self::MaxLength(n) => length(value).map(|len| len <= *n),
            Self::Custom { func, .. } => {
                match panic::catch_unwind(AssertUnwindSafe(|| func(value))) {
                    Ok(result) => result,
                    Err(payload) => Err(panic_reason(payload.as_ref())),
                }
            }
        }
    }

    fn param_repr(&self) -> String {
        match self {
            Self::Pattern(re) => Value::str(re.as_str()).to_string(),
            Self::Gt(v) | Self::Ge(v) | Self::Lt(v) | Self::Le(v) | Self::Eq(v) | Self::Ne(v) => {
                v.to_string()
            }
            Self::Includes(items) | Self::Excludes(items) => Value::List(items.clone()).to_string(),
            Self::MinLength(n) | Self::MaxLength(n) => n.to_string(),
            Self::Custom { .. } => "<predicate>".to_string(),
        }
    }
}

fn ordered(
    value: &Value,
    bound: &Value,
    op: &str,
    accept: fn(Ordering) -> bool,
) -> Result<bool, String> {
    value.compare(bound).map(accept).ok_or_else(|| {
        format!(
            "'{op}' not supported between instances of '{}' and '{}'",
            value.type_key(),
            bound.type_key()
        )
    })
}

fn membership(value: &Value, item: &Value) -> Result<bool, String> {
    value.contains(item).ok_or_else(|| {
        format!(
            "membership test of '{}' in '{}' is not supported",
            item.type_key(),
            value.type_key()
        )
    })
}

fn length(value: &Value) -> Result<usize, String> {
    value
        .len()
        .ok_or_else(|| format!("object of type '{}' has no len()", value.type_key()))
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    format!("predicate panicked: {detail}")
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            (Self::Gt(a), Self::Gt(b))
            | (Self::Ge(a), Self::Ge(b))
            | (Self::Lt(a), Self::Lt(b))
            | (Self::Le(a), Self::Le(b))
            | (Self::Eq(a), Self::Eq(b))
            | (Self::Ne(a), Self::Ne(b)) => a == b,
            (Self::Includes(a), Self::Includes(b)) | (Self::Excludes(a), Self::Excludes(b)) => {
                a == b
            }
            (Self::MinLength(a), Self::MinLength(b)) | (Self::MaxLength(a), Self::MaxLength(b)) => {
                a == b
            }
            (Self::Custom { name: na, func: fa }, Self::Custom { name: nb, func: fb }) => {
                na == nb && Arc::ptr_eq(fa, fb)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name(), self.param_repr())
    }
}

/// Why a constraint rejected a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintFailure {
    /// Name of the first failing predicate.
    pub predicate: String,
    /// What the value was expected to do.
    pub expectation: String,
    /// Internal failure reason, when the predicate could not be evaluated.
    pub reason: Option<String>,
}

/// An ordered AND-chain of predicates.
#[derive(Clone, Default, PartialEq)]
pub struct Constraint {
    predicates: Vec<Predicate>,
}

impl Constraint {
    /// An empty constraint that accepts every value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a `str` containing a match for `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintError::InvalidPattern` if `pattern` does not compile.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, ConstraintError> {
        let re = Regex::new(pattern).map_err(|e| ConstraintError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.predicates.push(Predicate::Pattern(re));
        Ok(self)
    }

    pub fn gt(self, bound: impl Into<Value>) -> Self {
        self.with(Predicate::Gt(bound.into()))
    }

    pub fn ge(self, bound: impl Into<Value>) -> Self {
        self.with(Predicate::Ge(bound.into()))
    }

    pub fn lt(self, bound: impl Into<Value>) -> Self {
        self.with(Predicate::Lt(bound.into()))
    }

    pub fn le(self, bound: impl Into<Value>) -> Self {
        self.with(Predicate::Le(bound.into()))
    }

    pub fn eq(self, other: impl Into<Value>) -> Self {
        self.with(Predicate::Eq(other.into()))
    }

    pub fn ne(self, other: impl Into<Value>) -> Self {
        self.with(Predicate::Ne(other.into()))
    }

    /// Require the value to contain every item.
    pub fn includes<I, V>(self, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(Predicate::Includes(items.into_iter().map(Into::into).collect()))
    }

    /// Require the value to contain none of the items.
    pub fn excludes<I, V>(self, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(Predicate::Excludes(items.into_iter().map(Into::into).collect()))
    }

    pub fn min_length(self, n: usize) -> Self {
        self.with(Predicate::MinLength(n))
    }

    pub fn max_length(self, n: usize) -> Self {
        self.with(Predicate::MaxLength(n))
    }

    /// Add a named user predicate.
    pub fn check<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.try_check(name, move |v| Ok(func(v)))
    }

    /// Add a named user predicate that may fail internally.
    pub fn try_check<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.with(Predicate::Custom {
            name: name.into(),
            func: Arc::new(func),
        })
    }

    /// Append an already-built predicate.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Evaluate every predicate in order.
    ///
    /// # Errors
    ///
    /// Returns the first predicate that returned false or failed internally.
    pub fn evaluate(&self, value: &Value) -> Result<(), ConstraintFailure> {
        for predicate in &self.predicates {
            let reason = match predicate.evaluate(value) {
                Ok(true) => continue,
                Ok(false) => None,
                Err(reason) => Some(reason),
            };
            return Err(ConstraintFailure {
                predicate: predicate.name().to_string(),
                expectation: predicate.expectation(),
                reason,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constraint(")?;
        for (i, p) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p:?}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_of(c: &Constraint, v: Value) -> ConstraintFailure {
        c.evaluate(&v).unwrap_err()
    }

    #[test]
    fn comparisons_pass_and_fail() {
        let c = Constraint::new().ge(0).le(5);
        assert!(c.evaluate(&Value::Int(0)).is_ok());
        assert!(c.evaluate(&Value::Float(4.5)).is_ok());

        let f = failure_of(&c, Value::Int(-1));
        assert_eq!(f.predicate, "ge");
        assert_eq!(f.expectation, "be greater than or equal to 0");
        assert!(f.reason.is_none());

        assert_eq!(failure_of(&c, Value::Int(6)).predicate, "le");
    }

    #[test]
    fn incomparable_operands_fail_with_reason() {
        let c = Constraint::new().ge(0);
        let f = failure_of(&c, Value::str("a"));
        assert_eq!(f.predicate, "ge");
        assert_eq!(
            f.reason.as_deref(),
            Some("'>=' not supported between instances of 'str' and 'int'")
        );
    }

    #[test]
    fn pattern_searches_anywhere() {
        let c = Constraint::new().pattern(r"running").unwrap();
        assert!(c.evaluate(&Value::str("this is running status")).is_ok());
        assert_eq!(
            failure_of(&c, Value::str("stopped")).expectation,
            "match pattern 'running'"
        );
        assert!(failure_of(&c, Value::Int(0)).reason.is_some());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(matches!(
            Constraint::new().pattern("("),
            Err(ConstraintError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn membership_predicates() {
        let c = Constraint::new().includes(["a"]).excludes(["z"]);
        assert!(c.evaluate(&Value::str("abc")).is_ok());
        assert_eq!(failure_of(&c, Value::str("xyz")).predicate, "includes");
        assert_eq!(failure_of(&c, Value::str("abz")).predicate, "excludes");

        let list = Value::list([Value::Int(1), Value::Int(2)]);
        assert!(Constraint::new().includes([1, 2]).evaluate(&list).is_ok());
        assert!(failure_of(&Constraint::new().includes([1]), Value::Int(1))
            .reason
            .is_some());
    }

    #[test]
    fn length_bounds() {
        let c = Constraint::new().min_length(1).max_length(3);
        assert!(c.evaluate(&Value::str("ab")).is_ok());
        assert_eq!(failure_of(&c, Value::list([])).predicate, "min_length");
        assert_eq!(failure_of(&c, Value::str("abcd")).predicate, "max_length");
        assert_eq!(
            failure_of(&c, Value::Int(3)).reason.as_deref(),
            Some("object of type 'int' has no len()")
        );
    }

    #[test]
    fn generic_predicates() {
        let rgb = ["red", "green", "blue"];
        let c = Constraint::new().check("in_rgb", move |v| {
            rgb.iter().any(|c| *v == Value::str(*c))
        });
        assert!(c.evaluate(&Value::str("red")).is_ok());
        let f = failure_of(&c, Value::str("yellow"));
        assert_eq!(f.predicate, "in_rgb");
        assert_eq!(f.expectation, "satisfy `in_rgb`");
    }

    #[test]
    fn panicking_predicate_is_captured() {
        let c = Constraint::new().check("explodes", |_| panic!("boom"));
        let f = failure_of(&c, Value::Int(1));
        assert_eq!(f.predicate, "explodes");
        assert_eq!(f.reason.as_deref(), Some("predicate panicked: boom"));
    }

    #[test]
    fn try_check_reports_internal_errors() {
        let c = Constraint::new().try_check("parse", |_| Err("bad input".to_string()));
        assert_eq!(failure_of(&c, Value::None).reason.as_deref(), Some("bad input"));
    }

    #[test]
    fn display_lists_predicates() {
        let c = Constraint::new().ge(0).pattern("^a").unwrap();
        assert_eq!(c.to_string(), "Constraint(ge=0, pattern='^a')");
    }

    #[test]
    fn equality_ignores_numeric_representation() {
        assert_eq!(Constraint::new().ge(0), Constraint::new().ge(0.0));
        assert_ne!(Constraint::new().ge(0), Constraint::new().gt(0));
    }
}
