//! # enforce-descriptor: Declarations and the Descriptor Compiler
//!
//! Turns a type declaration into a normalized [`Descriptor`] tree once, so
//! that every later call only walks the tree.
//!
//! ## Declarations (`annotation`, `parse`)
//!
//! A [`TypeExpr`] is built in code (`TypeExpr::list(TypeExpr::int())`,
//! `TypeExpr::int() | TypeExpr::None`) or parsed from annotation text
//! (`"dict[str, list[int]] | None"`).
//!
//! ## Compilation (`compile`)
//!
//! [`Compiler::compile`] rejects malformed generic shapes, expands the
//! `Sized`/`Callable` capability sets and subclass-aware declarations, and
//! merges unions into one descriptor.
//!
//! ## Refinements (`constraint`)
//!
//! [`Constraint`] carries named predicates evaluated after structural
//! acceptance. Literal sets live on the descriptor's [`Extras`].
//!
//! ## Crate Policy
//!
//! - Depends only on `enforce-core` internally.
//! - Compilation is pure: the same declaration always compiles to an equal
//!   descriptor.

pub mod annotation;
pub mod compile;
pub mod constraint;
pub mod descriptor;
pub mod error;
pub mod parse;

pub use annotation::{Origin, TypeExpr};
pub use compile::{compile, Compiler};
pub use constraint::{Constraint, ConstraintFailure, Predicate};
pub use descriptor::{Descriptor, Extras, Payload, TupleShape};
pub use error::{CompileError, ConstraintError, ParseError};
