//! # Annotation Text Parser
//!
//! Parses annotation text as the host writes it (including postponed,
//! string-form annotations) into a [`TypeExpr`].
//!
//! ## Grammar
//!
//! ```text
//! union   := term ('|' term)*
//! term    := '...' | name ('[' args ']')?
//! args    := arg (',' arg)* ','?
//! arg     := union | '()'            -- '()' only as the sole tuple argument
//! literal := string | int | float | 'True' | 'False' | 'None'
//! name    := ident ('.' ident)*
//! ```
//!
//! `typing.`, `builtins.` and `collections.abc.` prefixes are stripped.
//! Unknown names become [`TypeExpr::Name`] and are resolved against the
//! class registry at compile time.

use std::str::FromStr;

use enforce_core::{TypeKey, Value};

use crate::annotation::{Origin, TypeExpr};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Pipe,
    Ellipsis,
    End,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let trimmed = self.rest().trim_start();
            self.pos = self.src.len() - trimmed.len();
            let start = self.pos;
            let Some(c) = trimmed.chars().next() else {
                tokens.push((start, Token::End));
                return Ok(tokens);
            };
            let token = match c {
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                ',' => self.single(Token::Comma),
                '|' => self.single(Token::Pipe),
                '.' if trimmed.starts_with("...") => {
                    self.pos += 3;
                    Token::Ellipsis
                }
                '\'' | '"' => self.string(c)?,
                c if c.is_ascii_digit() || c == '-' => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.name(),
                other => return Err(self.error(format!("unexpected character `{other}`"))),
            };
            tokens.push((start, token));
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn name(&mut self) -> Token {
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(self.rest().len());
        let ident = self.rest()[..len].trim_end_matches('.').to_string();
        self.pos += ident.len();
        Token::Name(ident)
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || c == '_' || (i == 0 && c == '-')))
            .map_or(rest.len(), |(i, _)| i);
        let text: String = rest[..len].chars().filter(|c| *c != '_').collect();
        let token = if text.contains('.') {
            text.parse::<f64>().map(Token::Float).ok()
        } else {
            text.parse::<i64>().map(Token::Int).ok()
        };
        let token = token.ok_or_else(|| self.error(format!("invalid number `{text}`")))?;
        self.pos += len;
        Ok(token)
    }

    fn string(&mut self, quote: char) -> Result<Token, ParseError> {
        let mut out = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                c if c == quote => {
                    self.pos += i + c.len_utf8();
                    return Ok(Token::Str(out));
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string literal"))
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)].1
    }

    fn offset(&self) -> usize {
        self.tokens[self.index.min(self.tokens.len() - 1)].0
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            offset: self.offset(),
            message: message.into(),
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParseError> {
        if *self.peek() == token {
            self.next();
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.next();
            true
        } else {
            false
        }
    }

    fn union(&mut self) -> Result<TypeExpr, ParseError> {
        let first = self.term()?;
        if *self.peek() != Token::Pipe {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat(&Token::Pipe) {
            members.push(self.term()?);
        }
        Ok(TypeExpr::union(members))
    }

    fn term(&mut self) -> Result<TypeExpr, ParseError> {
        match self.next() {
            Token::Ellipsis => Ok(TypeExpr::Ellipsis),
            Token::Name(raw) => {
                let name = strip_module(&raw);
                if self.eat(&Token::LBracket) {
                    let expr = self.subscript(name)?;
                    self.expect(Token::RBracket, "`]`")?;
                    Ok(expr)
                } else {
                    self.bare(name)
                }
            }
            Token::Str(_) | Token::Int(_) | Token::Float(_) => {
                Err(self.error("literal values are only allowed inside `Literal[...]`"))
            }
            _ => Err(self.error("expected a type")),
        }
    }

    fn bare(&self, name: &str) -> Result<TypeExpr, ParseError> {
        let expr = match name {
            "None" | "NoneType" => TypeExpr::None,
            "Any" | "object" => TypeExpr::Any,
            "Sized" => TypeExpr::Sized,
            "Callable" => TypeExpr::Callable,
            "Optional" | "Union" | "Literal" | "Type" | "Annotated" => {
                return Err(self.error(format!("`{name}` requires type arguments")))
            }
            other => match Origin::from_name(other) {
                Some(origin) => TypeExpr::Builtin(origin.key()),
                None => match TypeKey::from_builtin_name(other) {
                    Some(key) => TypeExpr::Builtin(key),
                    None => TypeExpr::Name(other.to_string()),
                },
            },
        };
        Ok(expr)
    }

    fn subscript(&mut self, name: &str) -> Result<TypeExpr, ParseError> {
        match name {
            "Literal" => self.literal_args().map(TypeExpr::Literal),
            "Type" | "type" => match self.next() {
                Token::Name(raw) => Ok(TypeExpr::TypeOf(strip_module(&raw).to_string())),
                _ => Err(self.error("expected a class name inside `Type[...]`")),
            },
            "Optional" => {
                let mut args = self.type_args(false)?;
                if args.len() != 1 {
                    return Err(self.error("`Optional` takes exactly one type argument"));
                }
                Ok(TypeExpr::optional(args.remove(0)))
            }
            "Union" => {
                let args = self.type_args(false)?;
                if args.is_empty() {
                    return Err(self.error("`Union` requires at least one type argument"));
                }
                Ok(TypeExpr::union(args))
            }
            "Callable" => {
                self.skip_balanced()?;
                Ok(TypeExpr::Callable)
            }
            other => match Origin::from_name(other) {
                Some(origin) => {
                    let args = self.type_args(origin == Origin::Tuple)?;
                    Ok(TypeExpr::Generic { origin, args })
                }
                None => Err(self.error(format!("`{other}` is not subscriptable"))),
            },
        }
    }

    fn type_args(&mut self, allow_empty_tuple: bool) -> Result<Vec<TypeExpr>, ParseError> {
        if allow_empty_tuple && *self.peek() == Token::LParen {
            self.next();
            self.expect(Token::RParen, "`)`")?;
            return Ok(Vec::new());
        }
        let mut args = vec![self.union()?];
        while self.eat(&Token::Comma) {
            if *self.peek() == Token::RBracket {
                break;
            }
            args.push(self.union()?);
        }
        Ok(args)
    }

    fn literal_args(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut values = Vec::new();
        loop {
            let value = match self.next() {
                Token::Str(s) => Value::Str(s),
                Token::Int(i) => Value::Int(i),
                Token::Float(x) => Value::Float(x),
                Token::Name(n) if n == "True" => Value::Bool(true),
                Token::Name(n) if n == "False" => Value::Bool(false),
                Token::Name(n) if n == "None" => Value::None,
                _ => return Err(self.error("expected a literal value")),
            };
            values.push(value);
            if !self.eat(&Token::Comma) || *self.peek() == Token::RBracket {
                return Ok(values);
            }
        }
    }

    /// Consume everything up to the `]` that closes the current subscript.
    fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::End => return Err(self.error("expected `]`")),
                Token::RBracket if depth == 0 => return Ok(()),
                Token::RBracket => depth -= 1,
                Token::LBracket => depth += 1,
                _ => {}
            }
            self.next();
        }
    }
}

fn strip_module(name: &str) -> &str {
    ["typing.", "builtins.", "collections.abc.", "types."]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

/// Parse annotation text into a declaration.
///
/// # Errors
///
/// Returns `ParseError` with the byte offset of the first malformed token.
pub fn parse(text: &str) -> Result<TypeExpr, ParseError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser { tokens, index: 0 };
    let expr = parser.union()?;
    if *parser.peek() != Token::End {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

impl TypeExpr {
    /// Parse annotation text. See [`parse`].
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse(text)
    }
}

impl FromStr for TypeExpr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
