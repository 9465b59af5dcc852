//! # Error Types
//!
//! Errors raised by the core value and registry layer. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Errors from the class registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A class was registered twice under the same name.
    #[error("class `{0}` is already registered")]
    DuplicateClass(String),

    /// A class names a base that has not been registered.
    #[error("class `{class}` derives from unregistered base `{base}`")]
    UnknownBase {
        /// The class being registered.
        class: String,
        /// The missing base class.
        base: String,
    },

    /// A class name collides with a builtin type name.
    #[error("class name `{0}` shadows a builtin type")]
    ReservedName(String),
}
