//! Container actions: how repeated occurrences of one declaration fold into
//! the value that ends up bound to its destination.

use std::fmt;
use std::sync::Arc;

use crate::error::TypeError;
use crate::value::Value;

pub trait ContainerAction: fmt::Debug + Send + Sync {
    /// Accumulator before the first occurrence. `None` means the first
    /// occurrence is folded into nothing.
    fn initial(&self) -> Option<Value> {
        None
    }

    fn fold(&self, acc: Option<Value>, value: Value) -> Result<Value, TypeError>;
}

/// Keep the most recent value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Last;

impl ContainerAction for Last {
    fn fold(&self, _acc: Option<Value>, value: Value) -> Result<Value, TypeError> {
        Ok(value)
    }
}

/// Append every value, in supply order.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

impl ContainerAction for List {
    fn initial(&self) -> Option<Value> {
        Some(Value::List(Vec::new()))
    }

    fn fold(&self, acc: Option<Value>, value: Value) -> Result<Value, TypeError> {
        let mut items = match acc {
            Some(Value::List(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        };
        items.push(value);
        Ok(Value::List(items))
    }
}

/// Collect distinct values, keeping first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Set;

impl ContainerAction for Set {
    fn initial(&self) -> Option<Value> {
        Some(Value::Set(Vec::new()))
    }

    fn fold(&self, acc: Option<Value>, value: Value) -> Result<Value, TypeError> {
        let mut items = match acc {
            Some(Value::Set(items)) | Some(Value::List(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        };
        if !items.contains(&value) {
            items.push(value);
        }
        Ok(Value::Set(items))
    }
}

fn arithmetic(
    acc: Option<Value>,
    value: Value,
    op: &str,
    apply: fn(&Value, &Value) -> Option<Value>,
) -> Result<Value, TypeError> {
    let acc = acc.unwrap_or(Value::Int(0));
    apply(&acc, &value).ok_or_else(|| {
        TypeError::new(
            value.to_string(),
            value.type_name(),
            format!("cannot {op} {value} and {acc}"),
        )
    })
}

/// Sum numeric values, starting at 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl ContainerAction for Add {
    fn initial(&self) -> Option<Value> {
        Some(Value::Int(0))
    }

    fn fold(&self, acc: Option<Value>, value: Value) -> Result<Value, TypeError> {
        arithmetic(acc, value, "add", Value::checked_add)
    }
}

/// Subtract numeric values from an accumulator starting at 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sub;

impl ContainerAction for Sub {
    fn initial(&self) -> Option<Value> {
        Some(Value::Int(0))
    }

    fn fold(&self, acc: Option<Value>, value: Value) -> Result<Value, TypeError> {
        arithmetic(acc, value, "subtract", Value::checked_sub)
    }
}

type Reducer = dyn Fn(Value, Value) -> Result<Value, TypeError> + Send + Sync;

/// A user-supplied fold with an explicit starting value.
#[derive(Clone)]
pub struct Reduce {
    initial: Value,
    reducer: Arc<Reducer>,
}

impl Reduce {
    pub fn new<F>(initial: Value, reducer: F) -> Self
    where
        F: Fn(Value, Value) -> Result<Value, TypeError> + Send + Sync + 'static,
    {
        Self {
            initial,
            reducer: Arc::new(reducer),
        }
    }
}

impl fmt::Debug for Reduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reduce")
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

impl ContainerAction for Reduce {
    fn initial(&self) -> Option<Value> {
        Some(self.initial.clone())
    }

    fn fold(&self, acc: Option<Value>, value: Value) -> Result<Value, TypeError> {
        let acc = acc.unwrap_or_else(|| self.initial.clone());
        (self.reducer)(acc, value)
    }
}
