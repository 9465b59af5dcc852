//! # Enforced Callables
//!
//! [`EnforcedCallable`] is the compiled record for one callable: its
//! signature, its per-parameter and return declarations, its configuration,
//! and a once-initialized cache of compiled descriptors.
//!
//! ## Lifecycle
//!
//! 1. Declarations are attached with [`annotate`](EnforcedCallable::annotate)
//!    and [`returns`](EnforcedCallable::returns).
//! 2. The first enforced call compiles every declaration. The outcome,
//!    success or [`CompileError`], is cached and never recomputed.
//! 3. Each call binds its arguments, checks every annotated parameter,
//!    invokes the callable, and checks the return value at path `return`.
//!
//! Un-annotated parameters are never checked. `*args` declarations apply
//! to each extra positional value (`args[0]`, `args[1]`, ...) and
//! `**kwargs` declarations to each extra keyword value (`kwargs['k']`).
//!
//! ## Strictness
//!
//! With `strict` off, violations are logged at `warn` level and the call
//! proceeds with the unvalidated value. Bind and compile errors are always
//! returned.

use std::collections::BTreeMap;
use std::panic::Location;
use std::sync::OnceLock;

use enforce_core::Value;
use enforce_descriptor::{CompileError, Compiler, Descriptor, TypeExpr};

use crate::check::{check, check_at};
use crate::config::EnforcerConfig;
use crate::diagnostic::{Diagnostic, Segment, ValuePath};
use crate::error::{EnforceError, Report};
use crate::signature::{BoundArguments, ParamKind, Signature};

/// Descriptors for one callable, compiled together.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSignature {
    parameters: BTreeMap<String, Descriptor>,
    returns: Option<Descriptor>,
}

impl CompiledSignature {
    pub fn parameter(&self, name: &str) -> Option<&Descriptor> {
        self.parameters.get(name)
    }

    pub fn returns(&self) -> Option<&Descriptor> {
        self.returns.as_ref()
    }
}

/// A declaration as attached, compiled on first use.
#[derive(Debug, Clone)]
enum Declaration {
    Expr(TypeExpr),
    /// Annotation text, parsed at compile time so that class names resolve
    /// against the registry as it stands then.
    Text(String),
}

impl Declaration {
    fn compile(&self, compiler: &Compiler) -> Result<Descriptor, CompileError> {
        match self {
            Self::Expr(expr) => compiler.compile(expr),
            Self::Text(text) => compiler.compile_str(text),
        }
    }
}

#[derive(Debug)]
pub struct EnforcedCallable {
    name: String,
    signature: Signature,
    annotations: Vec<(String, Declaration)>,
    returns: Option<Declaration>,
    config: EnforcerConfig,
    compiler: Compiler,
    compiled: OnceLock<Result<CompiledSignature, CompileError>>,
}

impl EnforcedCallable {
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
            annotations: Vec::new(),
            returns: None,
            config: EnforcerConfig::default(),
            compiler: Compiler::new(),
            compiled: OnceLock::new(),
        }
    }

    /// Declare the expected type of a parameter, replacing any earlier
    /// declaration for it.
    pub fn annotate(self, parameter: impl Into<String>, expr: impl Into<TypeExpr>) -> Self {
        self.declare(parameter.into(), Declaration::Expr(expr.into()))
    }

    /// Declare a parameter type as annotation text, such as
    /// `"list[int] | None"`. Malformed text surfaces as a compile error on
    /// the first call.
    pub fn annotate_str(self, parameter: impl Into<String>, text: impl Into<String>) -> Self {
        self.declare(parameter.into(), Declaration::Text(text.into()))
    }

    fn declare(mut self, parameter: String, declaration: Declaration) -> Self {
        self.annotations.retain(|(name, _)| *name != parameter);
        self.annotations.push((parameter, declaration));
        self.compiled = OnceLock::new();
        self
    }

    /// Declare the expected return type.
    pub fn returns(mut self, expr: impl Into<TypeExpr>) -> Self {
        self.returns = Some(Declaration::Expr(expr.into()));
        self.compiled = OnceLock::new();
        self
    }

    /// Declare the expected return type as annotation text.
    pub fn returns_str(mut self, text: impl Into<String>) -> Self {
        self.returns = Some(Declaration::Text(text.into()));
        self.compiled = OnceLock::new();
        self
    }

    pub fn with_config(mut self, config: EnforcerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `compiler` to resolve class names and subclass declarations.
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self.compiled = OnceLock::new();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }

    /// Compile every declaration now instead of on the first call.
    ///
    /// # Errors
    ///
    /// Returns the cached compile error, if any declaration is malformed.
    pub fn compiled(&self) -> Result<&CompiledSignature, EnforceError> {
        self.compiled
            .get_or_init(|| self.compile_all())
            .as_ref()
            .map_err(|source| EnforceError::Compile {
                callable: self.name.clone(),
                source: source.clone(),
            })
    }

    fn compile_all(&self) -> Result<CompiledSignature, CompileError> {
        tracing::debug!(
            callable = %self.name,
            parameters = self.annotations.len(),
            returns = self.returns.is_some(),
            "compiling descriptors"
        );
        let mut parameters = BTreeMap::new();
        for (name, declaration) in &self.annotations {
            if self.signature.parameter(name).is_none() {
                return Err(CompileError::UnknownParameter(name.clone()));
            }
            parameters.insert(name.clone(), declaration.compile(&self.compiler)?);
        }
        let returns = self
            .returns
            .as_ref()
            .map(|declaration| declaration.compile(&self.compiler))
            .transpose()?;
        Ok(CompiledSignature {
            parameters,
            returns,
        })
    }

    /// Check every annotated parameter of an already bound call.
    ///
    /// # Errors
    ///
    /// - `Compile` if a declaration is malformed.
    /// - `Violation` for the first failing parameter, in signature order,
    ///   when `strict` is set.
    #[track_caller]
    pub fn validate_args(&self, bound: &BoundArguments) -> Result<(), EnforceError> {
        let caller = Location::caller();
        if !self.config.enabled {
            tracing::debug!(callable = %self.name, "enforcement disabled, skipping arguments");
            return Ok(());
        }
        let compiled = self.compiled()?;
        for argument in bound.iter() {
            let Some(descriptor) = compiled.parameter(&argument.name) else {
                continue;
            };
            let outcome = match argument.kind {
                ParamKind::VarPositional => check_each(
                    argument
                        .value
                        .elements()
                        .unwrap_or_default()
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (Segment::Index(i), v)),
                    descriptor,
                    &argument.name,
                ),
                ParamKind::VarKeyword => check_each(
                    argument
                        .value
                        .entries()
                        .unwrap_or_default()
                        .iter()
                        .map(|(k, v)| (Segment::Entry(k.to_string()), v)),
                    descriptor,
                    &argument.name,
                ),
                _ => check(&argument.value, descriptor, &argument.name),
            };
            if let Err(diagnostic) = outcome {
                self.report(diagnostic, caller)?;
            }
        }
        Ok(())
    }

    /// Check a return value at path `return`.
    ///
    /// # Errors
    ///
    /// - `Compile` if a declaration is malformed.
    /// - `Violation` if the value fails and `strict` is set.
    #[track_caller]
    pub fn validate_return(&self, value: &Value) -> Result<(), EnforceError> {
        let caller = Location::caller();
        if !self.config.enabled {
            tracing::debug!(callable = %self.name, "enforcement disabled, skipping return");
            return Ok(());
        }
        let Some(descriptor) = self.compiled()?.returns() else {
            return Ok(());
        };
        match check(value, descriptor, "return") {
            Ok(()) => Ok(()),
            Err(diagnostic) => self.report(diagnostic, caller),
        }
    }

    /// Bind, validate, invoke, and validate the result.
    ///
    /// `invoke` receives the bound arguments and is only run once every
    /// argument has passed (or, with `strict` off, been reported).
    ///
    /// # Errors
    ///
    /// - `Bind` if the arguments do not fit the signature.
    /// - `Compile` if a declaration is malformed.
    /// - `Violation` for the first failing argument or the return value.
    #[track_caller]
    pub fn call<F>(
        &self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        invoke: F,
    ) -> Result<Value, EnforceError>
    where
        F: FnOnce(&BoundArguments) -> Value,
    {
        let bound = self
            .signature
            .bind(args, kwargs)
            .map_err(|source| EnforceError::Bind {
                callable: self.name.clone(),
                source,
            })?;
        self.validate_args(&bound)?;
        let output = invoke(&bound);
        self.validate_return(&output)?;
        Ok(output)
    }

    fn report(
        &self,
        diagnostic: Diagnostic,
        caller: &'static Location<'static>,
    ) -> Result<(), EnforceError> {
        if self.config.strict {
            return Err(EnforceError::Violation(Box::new(Report {
                callable: self.name.clone(),
                diagnostic,
                caller,
                clean_traceback: self.config.clean_traceback,
            })));
        }
        tracing::warn!(
            callable = %self.name,
            path = %diagnostic.path,
            kind = diagnostic.kind.name(),
            "{diagnostic}"
        );
        Ok(())
    }
}

fn check_each<'a>(
    members: impl Iterator<Item = (Segment, &'a Value)>,
    descriptor: &Descriptor,
    root: &str,
) -> Result<(), Diagnostic> {
    let mut path = ValuePath::new(root);
    for (segment, member) in members {
        path.push(segment);
        check_at(member, descriptor, &mut path)?;
        path.pop();
    }
    Ok(())
}
