//! # Error Types
//!
//! Declaration-time errors. A `CompileError` is always fatal: the same
//! declaration will fail the same way on every attempt.

use thiserror::Error;

/// A type declaration is structurally malformed or unsupported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A generic container received the wrong number of type arguments.
    #[error("`{declaration}` requires exactly {expected} type argument(s) but got {actual}")]
    Arity {
        /// The offending declaration, as written.
        declaration: String,
        /// Number of arguments the container takes.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// The repeat marker (`...`) appeared anywhere other than the second of
    /// exactly two tuple arguments.
    #[error("misplaced `...` in `{0}`: only `tuple[T, ...]` may repeat an element type")]
    MisplacedEllipsis(String),

    /// The declaration form is not supported.
    #[error("unsupported type declaration `{0}`")]
    Unsupported(String),

    /// A class name could not be resolved through the class registry.
    #[error("unknown class `{0}`")]
    UnknownClass(String),

    /// An annotation names a parameter the callable does not declare.
    #[error("annotation for `{0}` does not match any declared parameter")]
    UnknownParameter(String),

    /// Annotation text could not be parsed.
    #[error("annotation parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Annotation text is not well formed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    /// Byte offset into the annotation text.
    pub offset: usize,
    /// What the parser expected or rejected.
    pub message: String,
}

/// A constraint could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// The pattern is not a valid regular expression.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why the regex engine rejected it.
        reason: String,
    },
}
