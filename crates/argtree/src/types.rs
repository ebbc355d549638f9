//! Value types: how raw tokens become [`Value`]s.
//!
//! A value type consumes a fixed number of tokens per conversion (its
//! [`ValueType::arity`]). Zero-arity types are switches: their presence alone
//! produces a value. Whether a declaration repeats a conversion until the
//! tokens run out is decided by the declaration's [`Arity`], not by the type.

use std::fmt;
use std::sync::Arc;

use crate::error::TypeError;
use crate::numeric::{Complex, Decimal};
use crate::value::Value;

/// Token count of a declaration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Unbounded,
}

pub trait ValueType: fmt::Debug + Send + Sync {
    /// Type name used in error messages.
    fn name(&self) -> &str;

    /// Tokens consumed by one conversion.
    fn arity(&self) -> usize {
        1
    }

    /// Convert exactly `self.arity()` tokens.
    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError>;
}

impl<T: ValueType + ?Sized> ValueType for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn arity(&self) -> usize {
        (**self).arity()
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        (**self).convert(tokens)
    }
}

pub(crate) fn single_token<'t>(tokens: &[&'t str], type_name: &str) -> Result<&'t str, TypeError> {
    match tokens {
        [token] => Ok(token),
        _ => Err(TypeError::new(
            tokens.join(" "),
            type_name,
            format!("expected exactly one token, got {}", tokens.len()),
        )),
    }
}

/// The raw token as bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bytes;

impl ValueType for Bytes {
    fn name(&self) -> &str {
        "bytes"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        Ok(Value::Bytes(token.as_bytes().to_vec()))
    }
}

/// The raw token as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Str;

impl ValueType for Str {
    fn name(&self) -> &str {
        "string"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        Ok(Value::Str(token.to_string()))
    }
}

/// A signed 64-bit integer (`[+-]?[0-9]+`). Out-of-range literals fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl ValueType for Integer {
    fn name(&self) -> &str {
        "integer"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| TypeError::not_a(token, self.name(), "an"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl ValueType for Float {
    fn name(&self) -> &str {
        "float"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| TypeError::not_a(token, self.name(), "a"))
    }
}

/// An exact decimal, see [`Decimal`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalType;

impl ValueType for DecimalType {
    fn name(&self) -> &str {
        "decimal"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        token
            .parse::<Decimal>()
            .map(Value::Decimal)
            .map_err(|_| TypeError::not_a(token, self.name(), "a"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexType;

impl ValueType for ComplexType {
    fn name(&self) -> &str {
        "complex number"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let token = single_token(tokens, self.name())?;
        token
            .parse::<Complex>()
            .map(Value::Complex)
            .map_err(|_| TypeError::not_a(token, self.name(), "a"))
    }
}

/// Tries each member type in order and keeps the first success.
///
/// Members are expected to share an arity; the first member's arity is used.
#[derive(Debug, Clone)]
pub struct Any {
    types: Vec<Arc<dyn ValueType>>,
    message: String,
}

impl Any {
    pub fn new(types: Vec<Arc<dyn ValueType>>) -> Self {
        Self {
            types,
            message: "{token} is not valid".to_string(),
        }
    }

    /// Error message on failure. `{token}` is replaced by the quoted token.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl ValueType for Any {
    fn name(&self) -> &str {
        "any"
    }

    fn arity(&self) -> usize {
        self.types.first().map_or(1, |ty| ty.arity())
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        for ty in &self.types {
            if let Ok(value) = ty.convert(tokens) {
                return Ok(value);
            }
        }
        let token = tokens.join(" ");
        let message = self.message.replace("{token}", &format!("{token:?}"));
        Err(TypeError::new(token, self.name(), message))
    }
}

/// An integer, else a float (or decimal), else a complex number.
#[derive(Debug, Clone)]
pub struct Number {
    any: Any,
}

impl Number {
    pub fn new() -> Self {
        Self::with_decimal(false)
    }

    pub fn with_decimal(use_decimal: bool) -> Self {
        let real: Arc<dyn ValueType> = if use_decimal {
            Arc::new(DecimalType)
        } else {
            Arc::new(Float)
        };
        let types: Vec<Arc<dyn ValueType>> = vec![Arc::new(Integer), real, Arc::new(ComplexType)];
        let any = Any::new(types).message("{token} is not a number");
        Self { any }
    }
}

impl Default for Number {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueType for Number {
    fn name(&self) -> &str {
        "number"
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        self.any.convert(tokens).map_err(|mut err| {
            err.type_name = self.name().to_string();
            err
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BooleanMode {
    Switch(bool),
    Literal,
}

/// A boolean, either as a switch (no tokens) or as a literal token.
///
/// Literals are matched case-insensitively against
/// `true/false`, `yes/no`, `on/off` and `1/0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boolean {
    mode: BooleanMode,
}

impl Boolean {
    /// Present means `true`.
    pub fn switch() -> Self {
        Self {
            mode: BooleanMode::Switch(true),
        }
    }

    /// Present means `false`.
    pub fn switch_off() -> Self {
        Self {
            mode: BooleanMode::Switch(false),
        }
    }

    pub fn literal() -> Self {
        Self {
            mode: BooleanMode::Literal,
        }
    }

    /// Value a switch stores when it is present.
    pub fn stored(&self) -> Option<bool> {
        match self.mode {
            BooleanMode::Switch(store) => Some(store),
            BooleanMode::Literal => None,
        }
    }
}

impl Default for Boolean {
    fn default() -> Self {
        Self::switch()
    }
}

impl ValueType for Boolean {
    fn name(&self) -> &str {
        "boolean"
    }

    fn arity(&self) -> usize {
        match self.mode {
            BooleanMode::Switch(_) => 0,
            BooleanMode::Literal => 1,
        }
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        if let BooleanMode::Switch(store) = self.mode {
            return Ok(Value::Bool(store));
        }
        let token = single_token(tokens, self.name())?;
        match token.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(TypeError::not_a(token, self.name(), "a")),
        }
    }
}

/// A switch that stores a fixed value, e.g. `Int(1)` for `-vvv` counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant(pub Value);

impl ValueType for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn arity(&self) -> usize {
        0
    }

    fn convert(&self, _tokens: &[&str]) -> Result<Value, TypeError> {
        Ok(self.0.clone())
    }
}

fn quoted_list<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values
        .map(|v| match v {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Restricts another type to a fixed set of values.
#[derive(Debug, Clone)]
pub struct Choice {
    inner: Arc<dyn ValueType>,
    choices: Vec<Value>,
}

impl Choice {
    pub fn new(inner: impl ValueType + 'static, choices: impl IntoIterator<Item = Value>) -> Self {
        Self {
            inner: Arc::new(inner),
            choices: choices.into_iter().collect(),
        }
    }

    /// String choices.
    pub fn strings<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Str, choices.into_iter().map(|c| Value::Str(c.into())))
    }

    pub fn choices(&self) -> &[Value] {
        &self.choices
    }
}

impl ValueType for Choice {
    fn name(&self) -> &str {
        "choice"
    }

    fn arity(&self) -> usize {
        self.inner.arity()
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let value = self.inner.convert(tokens)?;
        if self.choices.contains(&value) {
            return Ok(value);
        }
        let token = tokens.join(" ");
        let message = format!(
            "{token:?} is not one of {}",
            quoted_list(self.choices.iter())
        );
        Err(TypeError::new(token, self.name(), message))
    }
}

/// Converts with another type, then maps the result through a fixed table.
#[derive(Debug, Clone)]
pub struct Mapping {
    inner: Arc<dyn ValueType>,
    entries: Vec<(Value, Value)>,
}

impl Mapping {
    pub fn new(
        inner: impl ValueType + 'static,
        entries: impl IntoIterator<Item = (Value, Value)>,
    ) -> Self {
        Self {
            inner: Arc::new(inner),
            entries: entries.into_iter().collect(),
        }
    }
}

impl ValueType for Mapping {
    fn name(&self) -> &str {
        "mapping"
    }

    fn arity(&self) -> usize {
        self.inner.arity()
    }

    fn convert(&self, tokens: &[&str]) -> Result<Value, TypeError> {
        let key = self.inner.convert(tokens)?;
        if let Some((_, mapped)) = self.entries.iter().find(|(k, _)| *k == key) {
            return Ok(mapped.clone());
        }
        let token = tokens.join(" ");
        let message = format!(
            "{token:?} is not one of {}",
            quoted_list(self.entries.iter().map(|(k, _)| k))
        );
        Err(TypeError::new(token, self.name(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_rejects_fractions_and_overflow() {
        assert_eq!(Integer.convert(&["1"]).unwrap(), Value::Int(1));
        assert_eq!(Integer.convert(&["-42"]).unwrap(), Value::Int(-42));
        let err = Integer.convert(&["1.0"]).unwrap_err();
        assert_eq!(err.message, "\"1.0\" is not an integer");
        assert!(Integer.convert(&["99999999999999999999"]).is_err());
    }

    #[test]
    fn floating_types_reject_complex_literals() {
        assert_eq!(Float.convert(&["1"]).unwrap(), Value::Float(1.0));
        assert_eq!(
            DecimalType.convert(&["1.0"]).unwrap(),
            Value::Decimal("1.0".parse().unwrap())
        );
        assert!(Float.convert(&["1j"]).is_err());
        assert!(DecimalType.convert(&["1j"]).is_err());
    }

    #[test]
    fn decimal_exponent_out_of_range_is_a_type_error() {
        let err = DecimalType.convert(&["1e-9223372036854775808"]).unwrap_err();
        assert_eq!(err.token, "1e-9223372036854775808");
        assert_eq!(err.type_name, "decimal");
    }

    #[test]
    fn number_picks_the_narrowest_type() {
        let number = Number::new();
        assert_eq!(number.convert(&["1"]).unwrap(), Value::Int(1));
        assert_eq!(number.convert(&["1.0"]).unwrap(), Value::Float(1.0));
        assert_eq!(
            number.convert(&["1j"]).unwrap(),
            Value::Complex(Complex::new(0.0, 1.0))
        );
        assert_eq!(
            Number::with_decimal(true).convert(&["1.5"]).unwrap(),
            Value::Decimal("1.5".parse().unwrap())
        );
        let err = number.convert(&["one"]).unwrap_err();
        assert_eq!(err.type_name, "number");
        assert_eq!(err.message, "\"one\" is not a number");
    }

    #[test]
    fn boolean_switch_and_literal() {
        assert_eq!(Boolean::switch().arity(), 0);
        assert_eq!(Boolean::switch().convert(&[]).unwrap(), Value::Bool(true));
        assert_eq!(Boolean::switch_off().convert(&[]).unwrap(), Value::Bool(false));

        let literal = Boolean::literal();
        assert_eq!(literal.arity(), 1);
        for t in ["true", "YES", "On", "1"] {
            assert_eq!(literal.convert(&[t]).unwrap(), Value::Bool(true), "{t}");
        }
        for f in ["false", "No", "OFF", "0"] {
            assert_eq!(literal.convert(&[f]).unwrap(), Value::Bool(false), "{f}");
        }
        assert!(literal.convert(&["maybe"]).is_err());
    }

    #[test]
    fn choice_validates_converted_value() {
        let choice = Choice::new(Integer, [Value::Int(1), Value::Int(2)]);
        assert_eq!(choice.convert(&["2"]).unwrap(), Value::Int(2));
        let err = choice.convert(&["3"]).unwrap_err();
        assert_eq!(err.message, "\"3\" is not one of 1, 2");
        let err = choice.convert(&["x"]).unwrap_err();
        assert_eq!(err.type_name, "integer");
    }

    #[test]
    fn mapping_returns_mapped_value() {
        let mapping = Mapping::new(Str, [(Value::from("spam"), Value::Int(1))]);
        assert_eq!(mapping.convert(&["spam"]).unwrap(), Value::Int(1));
        let err = mapping.convert(&["eggs"]).unwrap_err();
        assert_eq!(err.message, "\"eggs\" is not one of \"spam\"");
    }

    #[test]
    fn any_uses_custom_message() {
        let integer: Arc<dyn ValueType> = Arc::new(Integer);
        let any = Any::new(vec![integer]).message("{token} is not an integer");
        assert_eq!(any.convert(&["1"]).unwrap(), Value::Int(1));
        assert_eq!(
            any.convert(&["foo"]).unwrap_err().message,
            "\"foo\" is not an integer"
        );
    }

    #[test]
    fn single_token_types_refuse_other_counts() {
        assert!(Str.convert(&[]).is_err());
        assert!(Bytes.convert(&["a", "b"]).is_err());
        assert_eq!(Bytes.convert(&["ab"]).unwrap(), Value::Bytes(b"ab".to_vec()));
    }
}
