//! # Descriptor Compiler
//!
//! Converts a [`TypeExpr`] into a [`Descriptor`], applied by case on the
//! declaration's shape:
//!
//! | Declaration | Descriptor |
//! |---|---|
//! | `None` | `NoneType` leaf |
//! | `A \| B`, `Union[...]`, `Optional[A]` | merge of the members |
//! | `Literal[v, ...]` | literal set, no key |
//! | `list[T]`, `set[T]`, `frozenset[T]` | element payload, exactly one argument |
//! | `dict[K, V]` | key/value payload, exactly two arguments |
//! | `tuple[A, B, ...]` / `tuple[T, ...]` | positional / variadic payload |
//! | `Sized`, `Callable` | closed union of capability leaves |
//! | `Any` | universal leaf |
//! | constraint | constraint, no key |
//! | `Annotated[T, ...]` | `T` plus constraint metadata |
//! | class `C` / `Type[C]` | `Instance(C)` / `ClassOf(C)` leaf |
//! | `WithSubclasses(C)` | `Instance` leaves for `C` and its subclasses |

use std::sync::Arc;

use enforce_core::{ClassRegistry, TypeKey};

use crate::annotation::{Origin, TypeExpr};
use crate::descriptor::{Descriptor, Payload, TupleShape};
use crate::error::CompileError;

/// Compiles declarations, resolving class names through an optional
/// registry.
///
/// Without a registry, textual names cannot be resolved and
/// `WithSubclasses(C)` accepts `C` alone.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    registry: Option<Arc<ClassRegistry>>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn registry(&self) -> Option<&Arc<ClassRegistry>> {
        self.registry.as_ref()
    }

    /// Compile one declaration.
    ///
    /// # Errors
    ///
    /// - `Arity` for a container with the wrong number of type arguments.
    /// - `MisplacedEllipsis` for any `...` outside `tuple[T, ...]`.
    /// - `UnknownClass` for a name the registry does not know.
    /// - `Unsupported` for empty unions and empty literal sets.
    pub fn compile(&self, expr: &TypeExpr) -> Result<Descriptor, CompileError> {
        match expr {
            TypeExpr::None => Ok(Descriptor::leaf(TypeKey::NoneType)),
            TypeExpr::Any => Ok(Descriptor::leaf(TypeKey::Any)),
            TypeExpr::Sized => Ok(leaves(TypeKey::SIZED.iter().cloned())),
            TypeExpr::Callable => Ok(leaves(TypeKey::CALLABLE.iter().cloned())),
            TypeExpr::Ellipsis => Err(CompileError::MisplacedEllipsis(expr.to_string())),
            TypeExpr::Builtin(key) => Ok(Descriptor::leaf(key.clone())),
            TypeExpr::Class(name) => Ok(Descriptor::leaf(TypeKey::Instance(name.clone()))),
            TypeExpr::Name(name) => self.resolve_name(name),
            TypeExpr::TypeOf(name) => Ok(Descriptor::leaf(TypeKey::ClassOf(name.clone()))),
            TypeExpr::WithSubclasses(name) => self.with_subclasses(name),
            TypeExpr::Generic { origin, args } => self.generic(expr, *origin, args),
            TypeExpr::Union(members) => {
                let mut iter = members.iter();
                let first = iter
                    .next()
                    .ok_or_else(|| CompileError::Unsupported("Union[]".to_string()))?;
                let mut out = self.compile(first)?;
                for member in iter {
                    out.merge(self.compile(member)?);
                }
                Ok(out)
            }
            TypeExpr::Literal(values) if values.is_empty() => {
                Err(CompileError::Unsupported(expr.to_string()))
            }
            TypeExpr::Literal(values) => Ok(Descriptor::literal(values.clone())),
            TypeExpr::Constraint(c) => Ok(Descriptor::constraint(c.clone())),
            TypeExpr::Annotated { base, metadata } => {
                let mut out = self.compile(base)?;
                for m in metadata {
                    if let TypeExpr::Constraint(c) = m {
                        out.push_constraint(c.clone());
                    }
                }
                Ok(out)
            }
        }
    }

    /// Parse annotation text and compile it. Class names in the text
    /// resolve through this compiler's registry.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed text, otherwise as [`compile`](Self::compile).
    pub fn compile_str(&self, text: &str) -> Result<Descriptor, CompileError> {
        self.compile(&TypeExpr::parse(text)?)
    }

    fn resolve_name(&self, name: &str) -> Result<Descriptor, CompileError> {
        match &self.registry {
            Some(registry) if registry.contains(name) => {
                Ok(Descriptor::leaf(TypeKey::Instance(name.to_string())))
            }
            _ => Err(CompileError::UnknownClass(name.to_string())),
        }
    }

    fn with_subclasses(&self, name: &str) -> Result<Descriptor, CompileError> {
        let classes = match &self.registry {
            Some(registry) => registry
                .with_subclasses(name)
                .ok_or_else(|| CompileError::UnknownClass(name.to_string()))?,
            None => vec![name.to_string()],
        };
        Ok(leaves(classes.into_iter().map(TypeKey::Instance)))
    }

    fn generic(
        &self,
        expr: &TypeExpr,
        origin: Origin,
        args: &[TypeExpr],
    ) -> Result<Descriptor, CompileError> {
        let arity = |expected: usize| -> Result<(), CompileError> {
            if args.len() == expected {
                Ok(())
            } else {
                Err(CompileError::Arity {
                    declaration: expr.to_string(),
                    expected,
                    actual: args.len(),
                })
            }
        };
        let payload = match origin {
            Origin::List | Origin::Set | Origin::FrozenSet => {
                arity(1)?;
                Payload::Element(Box::new(self.compile(&args[0])?))
            }
            Origin::Dict => {
                arity(2)?;
                Payload::Mapping {
                    key: Box::new(self.compile(&args[0])?),
                    value: Box::new(self.compile(&args[1])?),
                }
            }
            Origin::Tuple => {
                let shape = match args {
                    [element, TypeExpr::Ellipsis] if !matches!(element, TypeExpr::Ellipsis) => {
                        TupleShape::variadic(self.compile(element)?)
                    }
                    _ if args.iter().any(|a| matches!(a, TypeExpr::Ellipsis)) => {
                        return Err(CompileError::MisplacedEllipsis(expr.to_string()));
                    }
                    _ => TupleShape::fixed(
                        args.iter()
                            .map(|a| self.compile(a))
                            .collect::<Result<_, _>>()?,
                    ),
                };
                Payload::Tuple(vec![shape])
            }
        };
        Ok(Descriptor::with_payload(origin.key(), payload))
    }
}

fn leaves(keys: impl IntoIterator<Item = TypeKey>) -> Descriptor {
    keys.into_iter()
        .map(Descriptor::leaf)
        .fold(Descriptor::default(), Descriptor::merged)
}

/// Compile with a registry-less [`Compiler`].
pub fn compile(expr: &TypeExpr) -> Result<Descriptor, CompileError> {
    Compiler::new().compile(expr)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn leaf_expr() -> impl Strategy<Value = TypeExpr> {
        prop_oneof![
            Just(TypeExpr::int()),
            Just(TypeExpr::str()),
            Just(TypeExpr::float()),
            Just(TypeExpr::None),
            Just(TypeExpr::class("Foo")),
            Just(TypeExpr::type_of("Foo")),
            Just(TypeExpr::Any),
            Just(TypeExpr::of(TypeKey::List)),
            Just(TypeExpr::of(TypeKey::Tuple)),
        ]
    }

    fn container_expr() -> impl Strategy<Value = TypeExpr> {
        leaf_expr().prop_recursive(3, 24, 3, |inner| {
            prop_oneof![
                inner.clone().prop_map(TypeExpr::list),
                inner.clone().prop_map(TypeExpr::set),
                inner.clone().prop_map(TypeExpr::tuple_of),
                prop::collection::vec(inner.clone(), 0..3).prop_map(TypeExpr::tuple),
                (inner.clone(), inner.clone()).prop_map(|(k, v)| TypeExpr::dict(k, v)),
                prop::collection::vec(inner.clone(), 1..3).prop_map(TypeExpr::union),
            ]
        })
    }

    proptest! {
        /// Compiling the same declaration twice yields equal descriptors.
        #[test]
        fn compile_idempotent(expr in container_expr()) {
            prop_assert_eq!(compile(&expr).unwrap(), compile(&expr).unwrap());
        }

        /// Merging is commutative on the structural key set.
        #[test]
        fn union_keys_commute(a in container_expr(), b in container_expr()) {
            let ab = compile(&(a.clone() | b.clone())).unwrap();
            let ba = compile(&(b | a)).unwrap();
            let ab_keys: Vec<_> = ab.keys().cloned().collect();
            let ba_keys: Vec<_> = ba.keys().cloned().collect();
            prop_assert_eq!(ab_keys, ba_keys);
        }

        /// Merging in either order yields the same set of tuple shapes.
        #[test]
        fn tuple_shapes_commute(a in container_expr(), b in container_expr()) {
            let ab = compile(&(a.clone() | b.clone())).unwrap();
            let ba = compile(&(b | a)).unwrap();
            match (ab.payload(&TypeKey::Tuple), ba.payload(&TypeKey::Tuple)) {
                (Some(Payload::Tuple(x)), Some(Payload::Tuple(y))) => {
                    prop_assert_eq!(x.len(), y.len());
                    prop_assert!(x.iter().all(|s| y.contains(s)));
                }
                (x, y) => prop_assert_eq!(x, y),
            }
        }
    }
}
