//! Exact decimal and complex number literals.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid {kind} literal")]
pub struct ParseNumberError {
    kind: &'static str,
}

impl ParseNumberError {
    fn decimal() -> Self {
        Self { kind: "decimal" }
    }

    fn complex() -> Self {
        Self { kind: "complex" }
    }
}

/// A base-10 number stored exactly as `coefficient * 10^-scale`.
///
/// `1.0` and `1.00` compare equal but keep their scale for display.
///
/// The coefficient is an `i128`, so a literal is limited to 38 significant
/// digits once its exponent is applied. Larger literals such as `1e100` are
/// rejected rather than rounded.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    coefficient: i128,
    scale: u32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        coefficient: 0,
        scale: 0,
    };

    pub fn new(coefficient: i128, scale: u32) -> Self {
        Self { coefficient, scale }
    }

    pub fn coefficient(&self) -> i128 {
        self.coefficient
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    fn normalized(self) -> Self {
        let mut out = self;
        while out.scale > 0 && out.coefficient % 10 == 0 {
            out.coefficient /= 10;
            out.scale -= 1;
        }
        out
    }

    fn rescaled(self, scale: u32) -> Option<i128> {
        let factor = 10i128.checked_pow(scale.checked_sub(self.scale)?)?;
        self.coefficient.checked_mul(factor)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let scale = self.scale.max(other.scale);
        let sum = self.rescaled(scale)?.checked_add(other.rescaled(scale)?)?;
        Some(Self::new(sum, scale))
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.checked_add(Self::new(other.coefficient.checked_neg()?, other.scale))
    }

    /// Lossy conversion, for mixing with floats.
    pub fn to_f64(self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(i128::from(value), 0)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.normalized(), other.normalized());
        a.coefficient == b.coefficient && a.scale == b.scale
    }
}

impl Eq for Decimal {}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let n = self.normalized();
        n.coefficient.hash(state);
        n.scale.hash(state);
    }
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for Decimal {
    type Err = ParseNumberError;

    /// `[+-]?(digits[.digits?]|.digits)([eE][+-]?digits)?`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(idx) => {
                let exp = &body[idx + 1..];
                let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
                if digits.is_empty() || !all_digits(digits) {
                    return Err(ParseNumberError::decimal());
                }
                let exp: i64 = exp.parse().map_err(|_| ParseNumberError::decimal())?;
                (&body[..idx], exp)
            }
            None => (body, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.len() + frac_part.len() == 0 || !all_digits(int_part) || !all_digits(frac_part)
        {
            return Err(ParseNumberError::decimal());
        }

        let digits = format!("{int_part}{frac_part}");
        let mut coefficient: i128 = digits.parse().map_err(|_| ParseNumberError::decimal())?;
        let mut scale = (frac_part.len() as i64)
            .checked_sub(exponent)
            .ok_or_else(ParseNumberError::decimal)?;
        if scale < 0 {
            let factor = u32::try_from(-scale)
                .ok()
                .and_then(|e| 10i128.checked_pow(e))
                .ok_or_else(ParseNumberError::decimal)?;
            coefficient = coefficient
                .checked_mul(factor)
                .ok_or_else(ParseNumberError::decimal)?;
            scale = 0;
        }
        let scale = u32::try_from(scale).map_err(|_| ParseNumberError::decimal())?;
        if negative {
            coefficient = -coefficient;
        }
        Ok(Self::new(coefficient, scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.coefficient < 0 { "-" } else { "" };
        let digits = self.coefficient.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

/// A complex number with `f64` parts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl std::ops::Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl std::ops::Sub for Complex {
    type Output = Complex;

    fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.re - rhs.re, self.im - rhs.im)
    }
}

fn parse_part(s: &str) -> Result<f64, ParseNumberError> {
    match s {
        "" | "+" => Ok(1.0),
        "-" => Ok(-1.0),
        _ => s.parse().map_err(|_| ParseNumberError::complex()),
    }
}

impl FromStr for Complex {
    type Err = ParseNumberError;

    /// Accepts `re`, `imj`, `re+imj` and `re-imj`, optionally wrapped in
    /// parentheses. A bare `j` means `1j`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(s);
        if s.is_empty() {
            return Err(ParseNumberError::complex());
        }

        let Some(body) = s.strip_suffix(['j', 'J']) else {
            let re: f64 = s.parse().map_err(|_| ParseNumberError::complex())?;
            return Ok(Self::new(re, 0.0));
        };

        let bytes = body.as_bytes();
        let split = (1..bytes.len())
            .rev()
            .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'));
        match split {
            Some(i) => {
                let re: f64 = body[..i].parse().map_err(|_| ParseNumberError::complex())?;
                Ok(Self::new(re, parse_part(&body[i..])?))
            }
            None => Ok(Self::new(0.0, parse_part(body)?)),
        }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.re == 0.0 && self.re.is_sign_positive() {
            write!(f, "{}j", self.im)
        } else if self.im.is_sign_negative() {
            write!(f, "({}{}j)", self.re, self.im)
        } else {
            write!(f, "({}+{}j)", self.re, self.im)
        }
    }
}
