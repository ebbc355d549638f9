use indexmap::IndexMap;
use serde::Serialize;

use crate::command::Command;
use crate::error::RunError;
use crate::resource::ResourceHandle;
use crate::value::Value;

/// Values bound by one successful parse, keyed by destination.
///
/// Destinations that were never supplied and have no default are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Matches {
    command: Vec<String>,
    values: IndexMap<String, Value>,
}

impl Matches {
    pub(crate) fn new(command: Vec<String>, values: IndexMap<String, Value>) -> Self {
        Self { command, values }
    }

    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    pub fn contains(&self, dest: &str) -> bool {
        self.values.contains_key(dest)
    }

    pub fn get_str(&self, dest: &str) -> Option<&str> {
        self.get(dest).and_then(Value::as_str)
    }

    pub fn get_int(&self, dest: &str) -> Option<i64> {
        self.get(dest).and_then(Value::as_int)
    }

    pub fn get_float(&self, dest: &str) -> Option<f64> {
        self.get(dest).and_then(Value::as_float)
    }

    pub fn get_bool(&self, dest: &str) -> Option<bool> {
        self.get(dest).and_then(Value::as_bool)
    }

    /// `true` only if a boolean destination was bound to `true`.
    pub fn flag(&self, dest: &str) -> bool {
        self.get_bool(dest).unwrap_or(false)
    }

    /// Elements of a list or set destination.
    pub fn get_list(&self, dest: &str) -> Option<&[Value]> {
        self.get(dest).and_then(Value::as_list)
    }

    pub fn get_resource(&self, dest: &str) -> Option<&ResourceHandle> {
        self.get(dest).and_then(Value::as_resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(dest, value)| (dest.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of the commands from the root to the selected leaf.
    pub fn command_path(&self) -> &[String] {
        &self.command
    }

    /// Name of the selected leaf command.
    pub fn command_name(&self) -> &str {
        self.command.last().map_or("", String::as_str)
    }
}

/// A successful parse: the selected command and its bound values.
pub struct Invocation<'c, R> {
    command: &'c Command<R>,
    matches: Matches,
}

impl<'c, R> Invocation<'c, R> {
    pub(crate) fn new(command: &'c Command<R>, matches: Matches) -> Self {
        Self { command, matches }
    }

    pub fn command(&self) -> &'c Command<R> {
        self.command
    }

    pub fn matches(&self) -> &Matches {
        &self.matches
    }

    pub fn into_matches(self) -> Matches {
        self.matches
    }

    /// Call the selected command's handler. `Ok(None)` if it has none.
    pub fn run(self) -> Result<Option<R>, RunError> {
        let Some(handler) = self.command.handler_fn() else {
            return Ok(None);
        };
        tracing::debug!(command = self.command.name(), "running handler");
        handler(&self.matches).map(Some).map_err(RunError::Handler)
    }
}

impl<R> std::fmt::Debug for Invocation<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.command.name())
            .field("matches", &self.matches)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matches {
        let mut values = IndexMap::new();
        values.insert("verbose".to_string(), Value::Bool(true));
        values.insert("level".to_string(), Value::Int(2));
        values.insert(
            "tags".to_string(),
            Value::List(vec!["a".into(), "b".into()]),
        );
        Matches::new(vec!["tool".into(), "build".into()], values)
    }

    #[test]
    fn typed_accessors() {
        let m = sample();
        assert!(m.flag("verbose"));
        assert!(!m.flag("missing"));
        assert_eq!(m.get_int("level"), Some(2));
        assert_eq!(m.get_float("level"), Some(2.0));
        assert_eq!(m.get_str("level"), None);
        assert_eq!(m.get_list("tags").map(<[Value]>::len), Some(2));
        assert_eq!(m.command_name(), "build");
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn serializes_in_binding_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"command":["tool","build"],"values":{"verbose":true,"level":2,"tags":["a","b"]}}"#
        );
    }

    #[test]
    fn run_without_handler_returns_none() {
        let cmd = Command::<i32>::new("tool");
        let inv = Invocation::new(&cmd, Matches::default());
        assert!(inv.run().unwrap().is_none());
    }

    #[test]
    fn run_propagates_handler_errors() {
        let cmd = Command::<i32>::new("tool").handler(|_| anyhow::bail!("boom"));
        let err = Invocation::new(&cmd, Matches::default()).run().unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "boom");
    }
}
