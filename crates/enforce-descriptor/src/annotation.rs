//! # Type Declarations
//!
//! [`TypeExpr`] is the declaration syntax accepted by the compiler. It
//! covers every form the host can write in an annotation: plain types,
//! user classes, uninitialized-class requests, unions, generic containers,
//! literal sets, the `Any`/`Sized`/`Callable` capabilities, constraint
//! objects, and `Annotated[...]` wrappers.
//!
//! `Display` renders the host spelling, which compile errors quote.

use std::fmt;
use std::ops::BitOr;

use enforce_core::{TypeKey, Value};

use crate::constraint::Constraint;

/// A generic container origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    List,
    Set,
    FrozenSet,
    Dict,
    Tuple,
}

impl Origin {
    /// The type key a value of this container reports.
    pub fn key(self) -> TypeKey {
        match self {
            Self::List => TypeKey::List,
            Self::Set => TypeKey::Set,
            Self::FrozenSet => TypeKey::FrozenSet,
            Self::Dict => TypeKey::Dict,
            Self::Tuple => TypeKey::Tuple,
        }
    }

    /// Resolve a container name, including the `typing` aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "list" | "List" => Some(Self::List),
            "set" | "Set" => Some(Self::Set),
            "frozenset" | "FrozenSet" => Some(Self::FrozenSet),
            "dict" | "Dict" => Some(Self::Dict),
            "tuple" | "Tuple" => Some(Self::Tuple),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
            Self::Dict => "dict",
            Self::Tuple => "tuple",
        }
    }
}

/// A type declaration for one parameter or return slot.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// The none-value.
    None,
    /// Any value at all.
    Any,
    /// Any builtin sized value.
    Sized,
    /// Any callable-shaped value.
    Callable,
    /// The tuple repeat marker, `...`.
    Ellipsis,
    /// A builtin type. Container keys here carry no element payload.
    Builtin(TypeKey),
    /// Instances of a user class.
    Class(String),
    /// A name from annotation text, resolved at compile time.
    Name(String),
    /// The named class itself, uninitialized (`Type[C]`).
    TypeOf(String),
    /// Instances of a class or any registered subclass.
    WithSubclasses(String),
    /// A parameterized container. Arity is checked at compile time.
    Generic { origin: Origin, args: Vec<TypeExpr> },
    Union(Vec<TypeExpr>),
    Literal(Vec<Value>),
    Constraint(Constraint),
    /// `Annotated[base, metadata...]`; constraint metadata applies, other
    /// metadata is ignored.
    Annotated {
        base: Box<TypeExpr>,
        metadata: Vec<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn of(key: TypeKey) -> Self {
        Self::Builtin(key)
    }

    pub fn int() -> Self {
        Self::Builtin(TypeKey::Int)
    }

    pub fn float() -> Self {
        Self::Builtin(TypeKey::Float)
    }

    pub fn str() -> Self {
        Self::Builtin(TypeKey::Str)
    }

    pub fn bool() -> Self {
        Self::Builtin(TypeKey::Bool)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    pub fn type_of(name: impl Into<String>) -> Self {
        Self::TypeOf(name.into())
    }

    pub fn with_subclasses(name: impl Into<String>) -> Self {
        Self::WithSubclasses(name.into())
    }

    pub fn generic(origin: Origin, args: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::Generic {
            origin,
            args: args.into_iter().collect(),
        }
    }

    pub fn list(element: TypeExpr) -> Self {
        Self::generic(Origin::List, [element])
    }

    pub fn set(element: TypeExpr) -> Self {
        Self::generic(Origin::Set, [element])
    }

    pub fn frozenset(element: TypeExpr) -> Self {
        Self::generic(Origin::FrozenSet, [element])
    }

    pub fn dict(key: TypeExpr, value: TypeExpr) -> Self {
        Self::generic(Origin::Dict, [key, value])
    }

    /// Fixed-arity tuple, one declaration per position.
    pub fn tuple(items: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::generic(Origin::Tuple, items)
    }

    /// Variadic tuple, `tuple[element, ...]`.
    pub fn tuple_of(element: TypeExpr) -> Self {
        Self::generic(Origin::Tuple, [element, Self::Ellipsis])
    }

    /// Union of the given members, flattening nested unions.
    pub fn union(members: impl IntoIterator<Item = TypeExpr>) -> Self {
        let mut flat = Vec::new();
        for member in members {
            match member {
                Self::Union(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Self::Union(flat)
    }

    /// `Optional[inner]`, i.e. `inner | None`.
    pub fn optional(inner: TypeExpr) -> Self {
        Self::union([inner, Self::None])
    }

    pub fn literal<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn annotated(base: TypeExpr, metadata: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::Annotated {
            base: Box::new(base),
            metadata: metadata.into_iter().collect(),
        }
    }
}

impl From<Constraint> for TypeExpr {
    fn from(c: Constraint) -> Self {
        Self::Constraint(c)
    }
}

impl From<TypeKey> for TypeExpr {
    fn from(key: TypeKey) -> Self {
        Self::Builtin(key)
    }
}

/// `a | b` builds a flattened union, matching the host's `|` spelling.
impl BitOr for TypeExpr {
    type Output = TypeExpr;

    fn bitor(self, rhs: TypeExpr) -> TypeExpr {
        TypeExpr::union([self, rhs])
    }
}

impl BitOr<Constraint> for TypeExpr {
    type Output = TypeExpr;

    fn bitor(self, rhs: Constraint) -> TypeExpr {
        TypeExpr::union([self, TypeExpr::Constraint(rhs)])
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Any => f.write_str("Any"),
            Self::Sized => f.write_str("Sized"),
            Self::Callable => f.write_str("Callable"),
            Self::Ellipsis => f.write_str("..."),
            Self::Builtin(key) => f.write_str(key.name()),
            Self::Class(name) | Self::Name(name) => f.write_str(name),
            Self::TypeOf(name) => write!(f, "type[{name}]"),
            Self::WithSubclasses(name) => write!(f, "WithSubclasses({name})"),
            Self::Generic { origin, args } => {
                write!(f, "{}[", origin.name())?;
                if args.is_empty() && *origin == Origin::Tuple {
                    f.write_str("()")?;
                } else {
                    write_list(f, args)?;
                }
                f.write_str("]")
            }
            Self::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Self::Literal(values) => {
                f.write_str("Literal[")?;
                write_list(f, values)?;
                f.write_str("]")
            }
            Self::Constraint(c) => write!(f, "{c}"),
            Self::Annotated { base, metadata } => {
                write!(f, "Annotated[{base}")?;
                for m in metadata {
                    write!(f, ", {m}")?;
                }
                f.write_str("]")
            }
        }
    }
}
