//! # enforce-validate: Runtime Validation of Enforced Callables
//!
//! Walks live values against compiled descriptors and reports the first
//! offending sub-value with a path-qualified [`Diagnostic`].
//!
//! ## Modules
//!
//! - **check**: the structural validator. [`check()`] is usable on its own
//!   with any compiled [`Descriptor`](enforce_descriptor::Descriptor).
//! - **diagnostic**: failure kinds, value paths, and message rendering.
//! - **signature**: explicit signatures and argument binding.
//! - **enforcer**: [`EnforcedCallable`], the per-callable record that
//!   compiles once and validates every call.
//! - **config**: [`EnforcerConfig`] switches, loadable from YAML or JSON.
//!
//! ## Example
//!
//! ```
//! use enforce_core::Value;
//! use enforce_descriptor::TypeExpr;
//! use enforce_validate::{EnforcedCallable, Parameter, Signature};
//!
//! let f = EnforcedCallable::new("f", Signature::new([Parameter::positional("a")]))
//!     .annotate("a", TypeExpr::list(TypeExpr::int()));
//!
//! let err = f
//!     .call(vec![Value::list([Value::Int(1), Value::str("2")])], vec![], |_| Value::None)
//!     .unwrap_err();
//! assert_eq!(err.diagnostic().unwrap().path.to_string(), "a[1]");
//! ```
//!
//! ## Logging
//!
//! Compilation is logged at `debug`, fast-path fallbacks at `trace`, and
//! non-strict violations at `warn` with `callable`, `path`, and `kind`
//! fields. No subscriber is installed by this crate.

pub mod check;
pub mod config;
pub mod diagnostic;
pub mod enforcer;
pub mod error;
pub mod signature;

pub use check::{check, check_at};
pub use config::EnforcerConfig;
pub use diagnostic::{Diagnostic, Segment, ValuePath, ViolationKind};
pub use enforcer::{CompiledSignature, EnforcedCallable};
pub use error::{BindError, ConfigError, EnforceError, Report};
pub use signature::{BoundArgument, BoundArguments, ParamKind, Parameter, Signature};
