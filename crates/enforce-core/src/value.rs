//! # Dynamic Value Model
//!
//! [`Value`] is the in-process representation of every argument and return
//! value an enforced callable sees. It mirrors the host's runtime types
//! closely enough that type keys, equality, ordering, and printable forms
//! behave the way a caller of the host language expects.
//!
//! ## Equality
//!
//! `PartialEq` follows host semantics rather than structural identity:
//!
//! - numbers compare across `bool`, `int`, and `float` (`1 == 1.0 == True`),
//! - `bytes`, `bytearray`, and `memoryview` compare by content,
//! - sets compare unordered, dicts compare by entries regardless of order,
//! - objects carry no identity and compare by class.
//!
//! Literal fallbacks rely on this equality, not on type equality.
//!
//! ## Printable Form
//!
//! `Display` renders the host `repr` of the value (`'a'`, `(1,)`, `{1: 2}`).
//! Diagnostics and dict-key path segments use it verbatim.

use std::cmp::Ordering;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::key::TypeKey;

/// The shape of a callable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    Function,
    Method,
    Generator,
    BuiltinFunction,
    StaticMethod,
    ClassMethod,
}

impl CallableKind {
    fn type_key(self) -> TypeKey {
        match self {
            Self::Function => TypeKey::Function,
            Self::Method => TypeKey::Method,
            Self::Generator => TypeKey::Generator,
            Self::BuiltinFunction => TypeKey::BuiltinFunction,
            Self::StaticMethod => TypeKey::StaticMethod,
            Self::ClassMethod => TypeKey::ClassMethod,
        }
    }
}

/// A host value.
///
/// Sets are stored as vectors of distinct members; use [`Value::set`] to
/// build one so duplicates are dropped.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    ByteArray(Vec<u8>),
    MemoryView(Vec<u8>),
    Range { start: i64, stop: i64, step: i64 },
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    /// Insertion-ordered entries with distinct keys.
    Dict(Vec<(Value, Value)>),
    /// An initialized instance of the named class.
    Object(String),
    /// The named class itself, uninitialized.
    Class(String),
    Callable { kind: CallableKind, name: String },
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn compare(self, other: Numeric) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl Value {
    /// Build a `str` value.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Build a `list` value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Build a `tuple` value.
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Build a `set` value, dropping members equal to an earlier one.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(distinct(items))
    }

    /// Build a `frozenset` value, dropping members equal to an earlier one.
    pub fn frozenset(items: impl IntoIterator<Item = Value>) -> Self {
        Self::FrozenSet(distinct(items))
    }

    /// Build a `dict` value. Later entries replace earlier entries with an
    /// equal key, keeping the first position.
    pub fn dict(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut out: Vec<(Value, Value)> = Vec::new();
        for (k, v) in entries {
            match out.iter_mut().find(|(existing, _)| *existing == k) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        Self::Dict(out)
    }

    /// Build an instance of a user class.
    pub fn object(class: impl Into<String>) -> Self {
        Self::Object(class.into())
    }

    /// Build an uninitialized class value.
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Build a callable value.
    pub fn callable(kind: CallableKind, name: impl Into<String>) -> Self {
        Self::Callable {
            kind,
            name: name.into(),
        }
    }

    /// Build `range(start, stop)`.
    pub fn range(start: i64, stop: i64) -> Self {
        Self::Range {
            start,
            stop,
            step: 1,
        }
    }

    /// Returns true for the none-value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The concrete runtime type key of this value.
    ///
    /// Uninitialized classes report `ClassOf`, never `Instance`.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Self::None => TypeKey::NoneType,
            Self::Bool(_) => TypeKey::Bool,
            Self::Int(_) => TypeKey::Int,
            Self::Float(_) => TypeKey::Float,
            Self::Str(_) => TypeKey::Str,
            Self::Bytes(_) => TypeKey::Bytes,
            Self::ByteArray(_) => TypeKey::ByteArray,
            Self::MemoryView(_) => TypeKey::MemoryView,
            Self::Range { .. } => TypeKey::Range,
            Self::List(_) => TypeKey::List,
            Self::Tuple(_) => TypeKey::Tuple,
            Self::Set(_) => TypeKey::Set,
            Self::FrozenSet(_) => TypeKey::FrozenSet,
            Self::Dict(_) => TypeKey::Dict,
            Self::Object(class) => TypeKey::Instance(class.clone()),
            Self::Class(class) => TypeKey::ClassOf(class.clone()),
            Self::Callable { kind, .. } => kind.type_key(),
        }
    }

    /// Members of a list, tuple, set, or frozenset.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Tuple(items) | Self::Set(items) | Self::FrozenSet(items) => {
                Some(items)
            }
            _ => None,
        }
    }

    /// Entries of a dict.
    pub fn entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Length of a sized value, or `None` when the value has no length.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Str(s) => Some(s.chars().count()),
            Self::Bytes(b) | Self::ByteArray(b) | Self::MemoryView(b) => Some(b.len()),
            Self::Range { start, stop, step } => Some(range_len(*start, *stop, *step)),
            Self::List(items) | Self::Tuple(items) | Self::Set(items) | Self::FrozenSet(items) => {
                Some(items.len())
            }
            Self::Dict(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Host `item in self`. `None` when the membership test is unsupported
    /// for this pair of operands.
    pub fn contains(&self, item: &Value) -> Option<bool> {
        match self {
            Self::Str(haystack) => match item {
                Self::Str(needle) => Some(haystack.contains(needle.as_str())),
                _ => None,
            },
            Self::Bytes(haystack) | Self::ByteArray(haystack) | Self::MemoryView(haystack) => {
                match item {
                    Self::Int(byte) => Some(haystack.iter().any(|b| i64::from(*b) == *byte)),
                    other => other.as_bytes().map(|needle| {
                        needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
                    }),
                }
            }
            Self::Range { start, stop, step } => Some(match item.numeric() {
                Some(Numeric::Int(n)) => range_contains(*start, *stop, *step, i128::from(n)),
                Some(Numeric::Float(f)) if f.fract() == 0.0 => {
                    range_contains(*start, *stop, *step, f as i128)
                }
                _ => false,
            }),
            Self::List(items) | Self::Tuple(items) | Self::Set(items) | Self::FrozenSet(items) => {
                Some(items.iter().any(|member| member == item))
            }
            Self::Dict(entries) => Some(entries.iter().any(|(k, _)| k == item)),
            _ => None,
        }
    }

    /// Host ordering comparison. `None` when the operands are not orderable
    /// against each other.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return a.compare(b);
        }
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => {
                compare_sequences(a, b)
            }
            _ => match (self.as_bytes(), other.as_bytes()) {
                (Some(a), Some(b)) => Some(a.cmp(b)),
                _ => None,
            },
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Self::Bool(b) => Some(Numeric::Int(i64::from(*b))),
            Self::Int(i) => Some(Numeric::Int(*i)),
            Self::Float(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) | Self::ByteArray(b) | Self::MemoryView(b) => Some(b),
            _ => None,
        }
    }
}

fn distinct(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Widened to `i128` so the full `i64` span never overflows. Lengths past
/// `usize::MAX` saturate.
fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / (-step) + 1
    } else {
        0
    };
    usize::try_from(len).unwrap_or(usize::MAX)
}

fn range_contains(start: i64, stop: i64, step: i64, n: i128) -> bool {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let in_bounds = if step > 0 {
        start <= n && n < stop
    } else {
        stop < n && n <= start
    };
    in_bounds && step != 0 && (n - start) % step == 0
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return x.compare(y);
        }
    }
    Some(a.len().cmp(&b.len()))
}

fn same_members(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return a.compare(b) == Some(Ordering::Equal);
        }
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (
                Self::Range {
                    start: a0,
                    stop: a1,
                    step: a2,
                },
                Self::Range {
                    start: b0,
                    stop: b1,
                    step: b2,
                },
            ) => {
                let len = range_len(*a0, *a1, *a2);
                len == range_len(*b0, *b1, *b2)
                    && (len == 0 || a0 == b0)
                    && (len <= 1 || a2 == b2)
            }
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (
                Self::Set(a) | Self::FrozenSet(a),
                Self::Set(b) | Self::FrozenSet(b),
            ) => same_members(a, b),
            (Self::Dict(a), Self::Dict(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            (Self::Object(a), Self::Object(b)) | (Self::Class(a), Self::Class(b)) => a == b,
            (
                Self::Callable { kind: ka, name: na },
                Self::Callable { kind: kb, name: nb },
            ) => ka == kb && na == nb,
            _ => match (self.as_bytes(), other.as_bytes()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// repr
// ---------------------------------------------------------------------------

/// Host float repr: shortest round-trip digits, switching to exponent form
/// below `1e-4` and from `1e16` up, with a signed two-digit exponent.
fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        return f.write_str("nan");
    }
    if x.is_infinite() {
        return f.write_str(if x > 0.0 { "inf" } else { "-inf" });
    }
    let scientific = format!("{x:e}");
    match scientific.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exp))) if x != 0.0 && !(-4..16).contains(&exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            write!(f, "{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        _ if x.fract() == 0.0 => write!(f, "{x:.1}"),
        _ => write!(f, "{x}"),
    }
}

fn quote_for(has_single: bool, has_double: bool) -> char {
    if has_single && !has_double {
        '"'
    } else {
        '\''
    }
}

fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = quote_for(s.contains('\''), s.contains('"'));
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if c.is_control() && (c as u32) < 0x100 => write!(f, "\\x{:02x}", c as u32)?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

fn write_bytes_repr(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    let quote = quote_for(bytes.contains(&b'\''), bytes.contains(&b'"'));
    f.write_char('b')?;
    f.write_char(quote)?;
    for &b in bytes {
        match b {
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            b if b as char == quote => write!(f, "\\{}", b as char)?,
            0x20..=0x7e => f.write_char(b as char)?,
            b => write!(f, "\\x{b:02x}")?,
        }
    }
    f.write_char(quote)
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write_float(f, *x),
            Self::Str(s) => write_str_repr(f, s),
            Self::Bytes(b) => write_bytes_repr(f, b),
            Self::ByteArray(b) => {
                f.write_str("bytearray(")?;
                write_bytes_repr(f, b)?;
                f.write_char(')')
            }
            Self::MemoryView(_) => f.write_str("<memory>"),
            Self::Range { start, stop, step } if *step == 1 => {
                write!(f, "range({start}, {stop})")
            }
            Self::Range { start, stop, step } => write!(f, "range({start}, {stop}, {step})"),
            Self::List(items) => {
                f.write_char('[')?;
                write_joined(f, items)?;
                f.write_char(']')
            }
            Self::Tuple(items) => {
                f.write_char('(')?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::Set(items) if items.is_empty() => f.write_str("set()"),
            Self::Set(items) => {
                f.write_char('{')?;
                write_joined(f, items)?;
                f.write_char('}')
            }
            Self::FrozenSet(items) if items.is_empty() => f.write_str("frozenset()"),
            Self::FrozenSet(items) => {
                f.write_str("frozenset({")?;
                write_joined(f, items)?;
                f.write_str("})")
            }
            Self::Dict(entries) => {
                f.write_char('{')?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_char('}')
            }
            Self::Object(class) => write!(f, "<{class} object>"),
            Self::Class(class) => write!(f, "<class '{class}'>"),
            Self::Callable { kind, name } => match kind {
                CallableKind::Function => write!(f, "<function {name}>"),
                CallableKind::Method => write!(f, "<bound method {name}>"),
                CallableKind::Generator => write!(f, "<generator object {name}>"),
                CallableKind::BuiltinFunction => write!(f, "<built-in function {name}>"),
                CallableKind::StaticMethod => write!(f, "<staticmethod({name})>"),
                CallableKind::ClassMethod => write!(f, "<classmethod({name})>"),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}

/// JSON documents map onto host values: arrays become lists and objects
/// become dicts with `str` keys.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Int(i),
                (None, Some(x)) => Self::Float(x),
                (None, None) => Self::Float(f64::NAN),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Dict(
                map.into_iter()
                    .map(|(k, v)| (Self::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for float-free host values, so equality is reflexive.
    fn value_no_floats() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::None),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-zA-Z0-9_ '\"]{0,20}".prop_map(Value::Str),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Tuple),
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::set),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..6).prop_map(|entries| {
                    Value::dict(entries.into_iter().map(|(k, v)| (Value::Str(k), v)))
                }),
            ]
        })
    }

    proptest! {
        /// Equality is reflexive for float-free values.
        #[test]
        fn equality_reflexive(value in value_no_floats()) {
            prop_assert_eq!(&value, &value.clone());
        }

        /// repr never panics and is never empty.
        #[test]
        fn repr_non_empty(value in value_no_floats()) {
            prop_assert!(!value.to_string().is_empty());
        }

        /// Every sized container reports a length equal to its member count.
        #[test]
        fn container_len_matches_elements(value in value_no_floats()) {
            if let Some(items) = value.elements() {
                prop_assert_eq!(value.len(), Some(items.len()));
            }
        }
    }
}
