use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::numeric::{Complex, Decimal};
use crate::resource::ResourceHandle;

/// A bound argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Complex(Complex),
    List(Vec<Value>),
    /// Insertion-ordered, without duplicates.
    Set(Vec<Value>),
    Resource(ResourceHandle),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Complex(_) => "complex",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Resource(_) => "resource",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<Complex> {
        match self {
            Value::Complex(c) => Some(*c),
            _ => None,
        }
    }

    /// Elements of a list or set.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceHandle> {
        match self {
            Value::Resource(handle) => Some(handle),
            _ => None,
        }
    }

    /// Every resource handle reachable from this value.
    pub fn resources(&self) -> Vec<ResourceHandle> {
        let mut out = Vec::new();
        self.collect_resources(&mut out);
        out
    }

    fn collect_resources(&self, out: &mut Vec<ResourceHandle>) {
        match self {
            Value::Resource(handle) => out.push(handle.clone()),
            Value::List(items) | Value::Set(items) => {
                for item in items {
                    item.collect_resources(out);
                }
            }
            _ => {}
        }
    }

    /// Numeric addition with promotion (integer < decimal/float < complex).
    ///
    /// Returns `None` for non-numeric operands and on integer/decimal overflow.
    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int),
            (Value::Decimal(_), Value::Int(_) | Value::Decimal(_))
            | (Value::Int(_), Value::Decimal(_)) => self
                .as_decimal()?
                .checked_add(other.as_decimal()?)
                .map(Value::Decimal),
            (Value::Float(_), Value::Int(_) | Value::Float(_))
            | (Value::Int(_), Value::Float(_)) => {
                Some(Value::Float(self.as_float()? + other.as_float()?))
            }
            (Value::Complex(_), _) | (_, Value::Complex(_)) => {
                Some(Value::Complex(self.to_complex()? + other.to_complex()?))
            }
            _ => None,
        }
    }

    /// Numeric subtraction, see [`Value::checked_add`].
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int),
            (Value::Decimal(_), Value::Int(_) | Value::Decimal(_))
            | (Value::Int(_), Value::Decimal(_)) => self
                .as_decimal()?
                .checked_sub(other.as_decimal()?)
                .map(Value::Decimal),
            (Value::Float(_), Value::Int(_) | Value::Float(_))
            | (Value::Int(_), Value::Float(_)) => {
                Some(Value::Float(self.as_float()? - other.as_float()?))
            }
            (Value::Complex(_), _) | (_, Value::Complex(_)) => {
                Some(Value::Complex(self.to_complex()? - other.to_complex()?))
            }
            _ => None,
        }
    }

    fn to_complex(&self) -> Option<Complex> {
        match self {
            Value::Complex(c) => Some(*c),
            Value::Int(i) => Some(Complex::new(*i as f64, 0.0)),
            Value::Float(f) => Some(Complex::new(*f, 0.0)),
            Value::Decimal(d) => Some(Complex::new(d.to_f64(), 0.0)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Complex> for Value {
    fn from(c: Complex) -> Self {
        Value::Complex(c)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Complex(c) => write!(f, "{c}"),
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Value::Set(items) => {
                f.write_str("{")?;
                write_joined(f, items)?;
                f.write_str("}")
            }
            Value::Resource(handle) => f.write_str(handle.location()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Decimal(d) => serializer.collect_str(d),
            Value::Complex(c) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("re", &c.re)?;
                map.serialize_entry("im", &c.im)?;
                map.end()
            }
            Value::List(items) | Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Resource(handle) => serializer.serialize_str(handle.location()),
        }
    }
}
