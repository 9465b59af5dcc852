//! # enforce-core: Foundational Types for Runtime Type Enforcement
//!
//! This crate is the leaf of the workspace DAG. It defines the dynamic value
//! model that enforced callables receive and return, the concrete type keys
//! that descriptors are built from, and the registry of user classes used for
//! subclass-aware matching.
//!
//! ## Key Design Principles
//!
//! 1. **One value model.** Every host value is a [`Value`]. The validator
//!    never depends on how the host represents callables or objects.
//!
//! 2. **Distinct key spaces.** An instance of `Foo` has key
//!    `TypeKey::Instance("Foo")`; the uninitialized class `Foo` has key
//!    `TypeKey::ClassOf("Foo")`. The two are never conflated.
//!
//! 3. **Host equality.** `Value` equality follows host semantics:
//!    `1 == 1.0 == True`, sets compare unordered, dicts compare by entries.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `enforce-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod key;
pub mod registry;
pub mod value;

pub use error::CoreError;
pub use key::TypeKey;
pub use registry::ClassRegistry;
pub use value::{CallableKind, Value};
