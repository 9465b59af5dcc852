//! # Type Keys
//!
//! A [`TypeKey`] names one concrete runtime type. Descriptors are maps from
//! type keys to nested payloads, and every [`Value`](crate::Value) reports
//! exactly one key via [`Value::type_key`](crate::Value::type_key).
//!
//! Keys are matched by identity: `bool` is not accepted where `int` is
//! declared, even though the host treats `bool` as a numeric subtype.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The concrete runtime type of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKey {
    /// Universal key: matches every value.
    Any,
    /// The type of the none-value.
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    ByteArray,
    MemoryView,
    Range,
    List,
    Tuple,
    Set,
    FrozenSet,
    Dict,
    /// Plain user-defined function.
    Function,
    /// Bound method.
    Method,
    Generator,
    /// Builtin function or builtin method.
    BuiltinFunction,
    StaticMethod,
    ClassMethod,
    /// An initialized instance of the named class.
    Instance(String),
    /// The named class itself, uninitialized.
    ClassOf(String),
}

impl TypeKey {
    /// Leaf keys accepted by a `Sized` capability request.
    pub const SIZED: &'static [TypeKey] = &[
        TypeKey::List,
        TypeKey::Tuple,
        TypeKey::Dict,
        TypeKey::Set,
        TypeKey::FrozenSet,
        TypeKey::Str,
        TypeKey::Bytes,
        TypeKey::ByteArray,
        TypeKey::MemoryView,
        TypeKey::Range,
    ];

    /// Leaf keys accepted by a `Callable` capability request.
    pub const CALLABLE: &'static [TypeKey] = &[
        TypeKey::Function,
        TypeKey::Method,
        TypeKey::Generator,
        TypeKey::BuiltinFunction,
        TypeKey::StaticMethod,
        TypeKey::ClassMethod,
    ];

    /// Resolve a builtin type name as the host spells it.
    ///
    /// Returns `None` for names that are not builtin types; those are
    /// treated as user classes by the caller.
    pub fn from_builtin_name(name: &str) -> Option<Self> {
        let key = match name {
            "NoneType" => Self::NoneType,
            "bool" => Self::Bool,
            "int" => Self::Int,
            "float" => Self::Float,
            "str" => Self::Str,
            "bytes" => Self::Bytes,
            "bytearray" => Self::ByteArray,
            "memoryview" => Self::MemoryView,
            "range" => Self::Range,
            "list" => Self::List,
            "tuple" => Self::Tuple,
            "set" => Self::Set,
            "frozenset" => Self::FrozenSet,
            "dict" => Self::Dict,
            "function" => Self::Function,
            "method" => Self::Method,
            "generator" => Self::Generator,
            "builtin_function_or_method" => Self::BuiltinFunction,
            "staticmethod" => Self::StaticMethod,
            "classmethod" => Self::ClassMethod,
            _ => return None,
        };
        Some(key)
    }

    /// The host-facing type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Any => "Any",
            Self::NoneType => "NoneType",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::ByteArray => "bytearray",
            Self::MemoryView => "memoryview",
            Self::Range => "range",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
            Self::Dict => "dict",
            Self::Function => "function",
            Self::Method => "method",
            Self::Generator => "generator",
            Self::BuiltinFunction => "builtin_function_or_method",
            Self::StaticMethod => "staticmethod",
            Self::ClassMethod => "classmethod",
            Self::Instance(class) | Self::ClassOf(class) => class,
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassOf(class) => write!(f, "type[{class}]"),
            other => f.write_str(other.name()),
        }
    }
}
