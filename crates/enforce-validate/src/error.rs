//! # Error Types
//!
//! Call-time errors raised by an [`EnforcedCallable`](crate::EnforcedCallable).
//!
//! ## Design
//!
//! - Binding errors are raised before any type checking.
//! - Validation failures carry a full [`Report`]: the diagnostic, the
//!   callable's name, and the caller's source location.
//! - Compile errors are cached with the record and returned on every call.

use std::fmt;
use std::panic::Location;

use enforce_descriptor::CompileError;
use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// Top-level error for an enforced call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnforceError {
    /// A declaration of the callable failed to compile.
    #[error("cannot enforce `{callable}`: {source}")]
    Compile {
        /// Name of the enforced callable.
        callable: String,
        source: CompileError,
    },

    /// The call's arguments do not fit the signature.
    #[error("cannot bind arguments for `{callable}`: {source}")]
    Bind {
        /// Name of the enforced callable.
        callable: String,
        source: BindError,
    },

    /// A bound argument or the return value failed validation.
    #[error("{0}")]
    Violation(Box<Report>),
}

impl EnforceError {
    /// The diagnostic, if this is a validation failure.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Violation(report) => Some(&report.diagnostic),
            _ => None,
        }
    }
}

/// Arguments could not be matched to parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// More positional arguments than positional parameters, and no
    /// `*args` parameter to absorb them.
    #[error("takes {expected} positional argument(s) but {actual} were given")]
    TooManyPositional {
        /// Number of positional parameters.
        expected: usize,
        /// Number of positional arguments supplied.
        actual: usize,
    },

    /// A keyword argument names no parameter and there is no `**kwargs`.
    #[error("got an unexpected keyword argument `{0}`")]
    UnexpectedKeyword(String),

    /// A parameter received both a positional and a keyword value.
    #[error("got multiple values for argument `{0}`")]
    MultipleValues(String),

    /// A parameter without a default received no value.
    #[error("missing required argument `{0}`")]
    MissingArgument(String),
}

/// Configuration text could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// A validation failure as presented to the caller of an enforced callable.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Name of the enforced callable.
    pub callable: String,
    pub diagnostic: Diagnostic,
    /// Source location of the enforced call.
    pub caller: &'static Location<'static>,
    /// When false, the validator's internal origin is appended on render.
    pub clean_traceback: bool,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (in `{}`, called at {})",
            self.diagnostic, self.callable, self.caller
        )?;
        if !self.clean_traceback {
            write!(f, "\n  raised from {}", self.diagnostic.origin)?;
        }
        Ok(())
    }
}
