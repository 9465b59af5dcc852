//! # Signatures and Argument Binding
//!
//! A [`Signature`] is supplied explicitly by whatever layer wraps the
//! callable. [`Signature::bind`] maps one call's positional and keyword
//! arguments onto it.
//!
//! Effective values are the defaults, overridden by positional arguments,
//! overridden by keyword arguments. Extra positional arguments collect into
//! the `*args` parameter as a tuple; unmatched keywords collect into the
//! `**kwargs` parameter as a dict with `str` keys.

use enforce_core::Value;

use crate::error::BindError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOrKeyword,
    /// `*args`
    VarPositional,
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<Value>,
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::PositionalOrKeyword)
    }

    pub fn keyword_only(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::KeywordOnly)
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarPositional)
    }

    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarKeyword)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Ordered parameters of a callable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new(parameters: impl IntoIterator<Item = Parameter>) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Bind one call's arguments.
    ///
    /// # Errors
    ///
    /// - `TooManyPositional` when positional arguments overflow and there
    ///   is no `*args` parameter.
    /// - `MultipleValues` when a keyword repeats a positional argument.
    /// - `UnexpectedKeyword` when a keyword matches nothing and there is no
    ///   `**kwargs` parameter.
    /// - `MissingArgument` when a parameter without a default is unfilled.
    pub fn bind(
        &self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<BoundArguments, BindError> {
        let mut slots: Vec<Option<Value>> = vec![None; self.parameters.len()];
        let mut extra_positional = Vec::new();
        let mut extra_keyword = Vec::new();

        let positional: Vec<usize> = self
            .parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == ParamKind::PositionalOrKeyword)
            .map(|(i, _)| i)
            .collect();
        let has_var_positional = self.index_of_kind(ParamKind::VarPositional).is_some();
        let has_var_keyword = self.index_of_kind(ParamKind::VarKeyword).is_some();

        let given = args.len();
        for (n, arg) in args.into_iter().enumerate() {
            match positional.get(n) {
                Some(&i) => slots[i] = Some(arg),
                None if has_var_positional => extra_positional.push(arg),
                None => {
                    return Err(BindError::TooManyPositional {
                        expected: positional.len(),
                        actual: given,
                    })
                }
            }
        }

        for (name, value) in kwargs {
            let target = self.parameters.iter().position(|p| {
                p.name == name
                    && matches!(p.kind, ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly)
            });
            match target {
                Some(i) if slots[i].is_some() => return Err(BindError::MultipleValues(name)),
                Some(i) => slots[i] = Some(value),
                None if has_var_keyword => extra_keyword.push((Value::Str(name), value)),
                None => return Err(BindError::UnexpectedKeyword(name)),
            }
        }

        let mut arguments = Vec::with_capacity(self.parameters.len());
        for (param, slot) in self.parameters.iter().zip(slots) {
            let value = match param.kind {
                ParamKind::VarPositional => Value::Tuple(std::mem::take(&mut extra_positional)),
                ParamKind::VarKeyword => Value::dict(std::mem::take(&mut extra_keyword)),
                _ => match slot.or_else(|| param.default.clone()) {
                    Some(value) => value,
                    None => return Err(BindError::MissingArgument(param.name.clone())),
                },
            };
            arguments.push(BoundArgument {
                name: param.name.clone(),
                kind: param.kind,
                value,
            });
        }
        Ok(BoundArguments { arguments })
    }

    fn index_of_kind(&self, kind: ParamKind) -> Option<usize> {
        self.parameters.iter().position(|p| p.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgument {
    pub name: String,
    pub kind: ParamKind,
    pub value: Value,
}

/// Every parameter's effective value, in signature order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    arguments: Vec<BoundArgument>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundArgument> {
        self.arguments.iter()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}
