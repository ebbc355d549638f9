//! The recognition loop.
//!
//! Tokens are processed left to right in one pass:
//! - dispatch: tokens naming a sub-command of the current command descend
//!   into it,
//! - options: option-looking tokens are matched against the options of every
//!   command on the path, leaf first,
//! - positionals: whatever is left goes to the leaf's positionals.
//!
//! Dispatch runs again after each option phase, so `tool -v build` works.
//! Once `--` is seen, nothing else is treated as an option or sub-command.

use indexmap::IndexMap;

use crate::actions::ContainerAction;
use crate::command::Command;
use crate::cursor::Cursor;
use crate::declare::{DEFAULT_LONG_PREFIX, Multiplicity, Opt, Positional, Signature};
use crate::error::ParseError;
use crate::matches::{Invocation, Matches};
use crate::resource::ResourceScope;
use crate::types::ValueType;
use crate::value::Value;

const END_OF_OPTIONS: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    EndOfOptions,
}

/// Parse `tokens` (without the program name) against `root`.
///
/// On failure every resource opened during this parse is closed before the
/// error is returned.
pub fn parse<'c, R, I, S>(root: &'c Command<R>, tokens: I) -> Result<Invocation<'c, R>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parser = Parser::new(root, Cursor::new(tokens));
    let outcome = parser.run();
    let Parser {
        path,
        leaf,
        bound,
        scope,
        ..
    } = parser;

    match outcome {
        Ok(()) => {
            scope.commit();
            let command_path = path.iter().map(|c| c.name().to_string()).collect();
            Ok(Invocation::new(leaf, Matches::new(command_path, bound)))
        }
        Err(err) => {
            let released = scope.release();
            if released > 0 {
                tracing::debug!(released, error = %err, "parse failed; released resources");
            }
            Err(err)
        }
    }
}

fn looks_numeric(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

struct Parser<'c, R> {
    cursor: Cursor,
    path: Vec<&'c Command<R>>,
    leaf: &'c Command<R>,
    bound: IndexMap<String, Value>,
    scope: ResourceScope,
}

impl<'c, R> Parser<'c, R> {
    fn new(root: &'c Command<R>, cursor: Cursor) -> Self {
        Self {
            cursor,
            path: vec![root],
            leaf: root,
            bound: IndexMap::new(),
            scope: ResourceScope::new(),
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        loop {
            self.dispatch();
            if self.options()? == Flow::EndOfOptions || !self.at_subcommand() {
                break;
            }
        }
        self.positionals()?;
        self.finalize()
    }

    fn at_subcommand(&self) -> bool {
        self.cursor
            .peek()
            .is_some_and(|token| self.leaf.find_subcommand(token).is_some())
    }

    fn dispatch(&mut self) {
        loop {
            let leaf = self.leaf;
            let Some(next) = self
                .cursor
                .peek()
                .and_then(|token| leaf.find_subcommand(token))
            else {
                break;
            };
            if self.cursor.advance().is_err() {
                break;
            }
            tracing::debug!(command = next.name(), "dispatching sub-command");
            self.path.push(next);
            self.leaf = next;
        }
    }

    fn looks_like_option(&self, token: &str) -> bool {
        if token == END_OF_OPTIONS {
            return true;
        }
        if let Some(rest) = token.strip_prefix('-') {
            if rest.is_empty() {
                return false;
            }
            if looks_numeric(rest) {
                return self.path.iter().any(|c| c.has_digit_flag());
            }
            return true;
        }
        self.path.iter().any(|c| {
            c.custom_prefixes()
                .iter()
                .any(|p| token.len() > p.len() && token.starts_with(p.as_str()))
        })
    }

    fn lookup(&self, flag: &str) -> Option<(&'c str, &'c Opt)> {
        self.path.iter().rev().copied().find_map(|c| c.find_flag(flag))
    }

    fn options(&mut self) -> Result<Flow, ParseError> {
        while let Some(token) = self.cursor.peek() {
            if !self.looks_like_option(token) {
                break;
            }
            let Ok(token) = self.cursor.advance() else {
                break;
            };
            if token == END_OF_OPTIONS {
                tracing::debug!("end of options");
                return Ok(Flow::EndOfOptions);
            }
            self.option(&token)?;
        }
        Ok(Flow::Continue)
    }

    fn option(&mut self, token: &str) -> Result<(), ParseError> {
        if let Some((flag, inline)) = token.split_once('=') {
            if let Some((dest, opt)) = self.lookup(flag) {
                if opt.signature().is_switch() {
                    return Err(ParseError::unexpected(token));
                }
                self.cursor.push_back(inline);
                return self.occurrence(dest, opt);
            }
        }
        if let Some((dest, opt)) = self.lookup(token) {
            return self.occurrence(dest, opt);
        }
        if token.starts_with(DEFAULT_LONG_PREFIX) {
            return Err(ParseError::unexpected(token));
        }
        self.bundle(token)
    }

    /// `-abn5`: switches fold immediately, the first value-taking flag gets
    /// the rest of the token (or the following tokens) and ends the bundle.
    /// `-abn=5` is the same as `-abn5`, like `-n=5` is for a lone flag.
    fn bundle(&mut self, token: &str) -> Result<(), ParseError> {
        let prefix = self
            .path
            .iter()
            .copied()
            .flat_map(|c| c.short_prefixes())
            .filter(|p| token.len() > p.len() && token.starts_with(p))
            .max_by_key(|p| p.len());
        let Some(prefix) = prefix else {
            return Err(ParseError::unexpected(token));
        };

        let body = &token[prefix.len()..];
        for (idx, c) in body.char_indices() {
            let flag = format!("{prefix}{c}");
            let Some((dest, opt)) = self.lookup(&flag) else {
                return Err(ParseError::unexpected(flag));
            };
            if opt.signature().is_switch() {
                self.occurrence(dest, opt)?;
                continue;
            }
            let tail = &body[idx + c.len_utf8()..];
            match tail.strip_prefix('=') {
                Some(inline) => self.cursor.push_back(inline),
                None if !tail.is_empty() => self.cursor.push_back(tail),
                None => {}
            }
            return self.occurrence(dest, opt);
        }
        Ok(())
    }

    fn occurrence(&mut self, dest: &str, opt: &Opt) -> Result<(), ParseError> {
        let name = opt.display_name();
        let value = self.read_signature(opt.signature(), &name)?;
        self.fold(dest, opt.container(), value, &name)
    }

    fn read_signature(&mut self, signature: &Signature, name: &str) -> Result<Value, ParseError> {
        let missing = || ParseError::ArgumentMissing {
            name: name.to_string(),
        };
        let mut values = Vec::new();
        for slot in signature.slots() {
            let ty = slot.value_type();
            match slot.multiplicity() {
                Multiplicity::Required => {
                    let value = self.read_value(ty, name)?.ok_or_else(missing)?;
                    values.push(value);
                }
                Multiplicity::Optional => match self.read_value(ty, name)? {
                    Some(value) => values.push(value),
                    None => break,
                },
                Multiplicity::Remaining { min, max } => {
                    let mut count = 0;
                    while max.is_none_or(|max| count < max) {
                        let Some(value) = self.read_value(ty, name)? else {
                            break;
                        };
                        values.push(value);
                        count += 1;
                    }
                    if count < min {
                        return Err(missing());
                    }
                }
            }
        }
        if signature.is_scalar() && values.len() == 1 {
            return Ok(values.remove(0));
        }
        Ok(Value::List(values))
    }

    /// One conversion of `ty`. `None` when no token is available at all.
    ///
    /// A pushed-back token is always taken literally; other tokens are only
    /// taken when they do not look like an option.
    fn read_value(&mut self, ty: &dyn ValueType, name: &str) -> Result<Option<Value>, ParseError> {
        let arity = ty.arity();
        let mut tokens = Vec::with_capacity(arity);
        while tokens.len() < arity {
            let literal = self.cursor.has_pushed_back();
            let ready = match self.cursor.peek() {
                Some(token) => literal || !self.looks_like_option(token),
                None => false,
            };
            if !ready {
                break;
            }
            let Ok(token) = self.cursor.advance() else {
                break;
            };
            tokens.push(token);
        }
        if tokens.len() < arity {
            if tokens.is_empty() {
                return Ok(None);
            }
            return Err(ParseError::ArgumentMissing {
                name: name.to_string(),
            });
        }

        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let value = ty
            .convert(&refs)
            .map_err(|err| ParseError::user_type(name, err))?;
        self.scope.register(&value);
        Ok(Some(value))
    }

    fn fold(
        &mut self,
        dest: &str,
        action: &dyn ContainerAction,
        value: Value,
        name: &str,
    ) -> Result<(), ParseError> {
        let acc = match self.bound.get(dest) {
            Some(previous) => Some(previous.clone()),
            None => action.initial(),
        };
        let folded = action
            .fold(acc, value)
            .map_err(|err| ParseError::user_type(name, err))?;
        tracing::trace!(dest, value = %folded, "bound");
        self.bound.insert(dest.to_string(), folded);
        Ok(())
    }

    fn positionals(&mut self) -> Result<(), ParseError> {
        let tokens = self.cursor.drain();
        let declared: Vec<(&'c str, &'c Positional)> = self.leaf.positionals().collect();
        let mut idx = 0;

        for (i, &(dest, positional)) in declared.iter().enumerate() {
            let slot = positional.slot();
            let arity = slot.value_type().arity();
            let available = tokens.len() - idx;
            let reserved: usize = declared[i + 1..]
                .iter()
                .map(|(_, later)| later.slot().min_tokens())
                .sum();
            let free = available.saturating_sub(reserved);
            let missing = || ParseError::PositionalArgumentMissing {
                name: dest.to_string(),
            };

            let count = match slot.multiplicity() {
                Multiplicity::Required if available < arity => return Err(missing()),
                Multiplicity::Required => 1,
                Multiplicity::Optional => usize::from(free >= arity),
                Multiplicity::Remaining { min, max } => {
                    let count = max.map_or(free / arity, |max| (free / arity).min(max));
                    if count < min {
                        return Err(missing());
                    }
                    count
                }
            };

            for _ in 0..count {
                let chunk: Vec<&str> = tokens[idx..idx + arity].iter().map(String::as_str).collect();
                idx += arity;
                let value = slot
                    .value_type()
                    .convert(&chunk)
                    .map_err(|err| ParseError::user_type(dest, err))?;
                self.scope.register(&value);
                self.fold(dest, positional.container(), value, dest)?;
            }
        }

        match tokens.get(idx) {
            Some(extra) => Err(ParseError::unexpected(extra.as_str())),
            None => Ok(()),
        }
    }

    fn finalize(&mut self) -> Result<(), ParseError> {
        let leaf = self.leaf;
        if leaf.has_subcommands() && leaf.handler_fn().is_none() {
            return Err(ParseError::CommandMissing {
                command: leaf.name().to_string(),
                available: leaf.subcommands().map(|c| c.name().to_string()).collect(),
            });
        }

        for command in self.path.iter().copied() {
            for (dest, opt) in command.options() {
                if self.bound.contains_key(dest) {
                    continue;
                }
                if opt.is_required() {
                    return Err(ParseError::ArgumentMissing {
                        name: opt.display_name(),
                    });
                }
                if let Some(default) = opt.default_value() {
                    self.bound.insert(dest.to_string(), default.clone());
                }
            }
        }
        for (dest, positional) in leaf.positionals() {
            if self.bound.contains_key(dest) {
                continue;
            }
            if let Some(default) = positional.default_value() {
                self.bound.insert(dest.to_string(), default.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::Slot;
    use crate::types::{Boolean, Integer, Str};

    fn root() -> Command {
        Command::new("tool")
            .option("all", Opt::switch().short('a'))
            .unwrap()
            .option("num", Opt::new(Integer).short('n').long("num"))
            .unwrap()
    }

    #[test]
    fn negative_numbers_are_values() {
        assert!(looks_numeric("5"));
        assert!(looks_numeric(".5"));
        assert!(!looks_numeric("."));
        assert!(!looks_numeric("x"));

        let cmd = root();
        let inv = parse(&cmd, ["-n", "-5"]).unwrap();
        assert_eq!(inv.matches().get_int("num"), Some(-5));
        let inv = parse(&cmd, ["-n-5"]).unwrap();
        assert_eq!(inv.matches().get_int("num"), Some(-5));
    }

    #[test]
    fn digit_flag_turns_negative_numbers_into_options() {
        let cmd = root()
            .option("one", Opt::switch().short('1'))
            .unwrap();
        let err = parse(&cmd, ["-n", "-1"]).unwrap_err();
        assert_eq!(err, ParseError::ArgumentMissing { name: "--num".into() });
    }

    #[test]
    fn inline_value_is_literal() {
        let cmd = Command::<()>::new("tool")
            .option("pattern", Opt::new(Str).long("pattern"))
            .unwrap();
        let inv = parse(&cmd, ["--pattern=--x"]).unwrap();
        assert_eq!(inv.matches().get_str("pattern"), Some("--x"));
    }

    #[test]
    fn inline_value_on_switch_is_rejected() {
        let cmd = root();
        let err = parse(&cmd, ["-a=yes"]).unwrap_err();
        assert_eq!(err, ParseError::unexpected("-a=yes"));
    }

    #[test]
    fn bundle_tail_is_the_value() {
        let cmd = root();
        let inv = parse(&cmd, ["-an12"]).unwrap();
        assert_eq!(inv.matches().get_bool("all"), Some(true));
        assert_eq!(inv.matches().get_int("num"), Some(12));
    }

    #[test]
    fn bundle_tail_accepts_an_equals_sign() {
        let cmd = root();
        let inv = parse(&cmd, ["-an=5"]).unwrap();
        assert_eq!(inv.matches().get_bool("all"), Some(true));
        assert_eq!(inv.matches().get_int("num"), Some(5));
        let inv = parse(&cmd, ["-n=5"]).unwrap();
        assert_eq!(inv.matches().get_int("num"), Some(5));
        let inv = parse(&cmd, ["-an=-5"]).unwrap();
        assert_eq!(inv.matches().get_int("num"), Some(-5));
    }

    #[test]
    fn unknown_bundled_flag_names_the_flag() {
        let err = parse(&root(), ["-axn", "1"]).unwrap_err();
        assert_eq!(err, ParseError::unexpected("-x"));
    }

    #[test]
    fn missing_option_value() {
        let err = parse(&root(), ["--num"]).unwrap_err();
        assert_eq!(err, ParseError::ArgumentMissing { name: "--num".into() });
        let err = parse(&root(), ["--num", "--", "1"]).unwrap_err();
        assert_eq!(err, ParseError::ArgumentMissing { name: "--num".into() });
    }

    #[test]
    fn optional_slot_stops_later_slots() {
        let cmd = Command::<()>::new("tool")
            .option(
                "pair",
                Opt::with_slots([Slot::new(Str), Slot::new(Str).optional(), Slot::new(Str).optional()])
                    .long("pair"),
            )
            .unwrap()
            .option("all", Opt::new(Boolean::switch()).short('a'))
            .unwrap();
        let inv = parse(&cmd, ["--pair", "x", "-a"]).unwrap();
        assert_eq!(
            inv.matches().get("pair"),
            Some(&Value::List(vec!["x".into()]))
        );
        assert_eq!(inv.matches().get_bool("all"), Some(true));
    }

    #[test]
    fn custom_prefixes_are_recognized() {
        let cmd = Command::<()>::new("tool")
            .option(
                "plus",
                Opt::switch().short('o').long("option").short_prefix("+").long_prefix("++"),
            )
            .unwrap();
        let inv = parse(&cmd, ["+o"]).unwrap();
        assert_eq!(inv.matches().get_bool("plus"), Some(true));
        let inv = parse(&cmd, ["++option"]).unwrap();
        assert_eq!(inv.matches().get_bool("plus"), Some(true));
        assert!(parse(&cmd, ["-o"]).is_err());
    }

    #[test]
    fn end_of_options_never_escapes() {
        let cmd = Command::<()>::new("tool")
            .positional("rest", Positional::new(Str).remaining())
            .unwrap();
        let inv = parse(&cmd, ["--", "--", "-x"]).unwrap();
        assert_eq!(
            inv.matches().get("rest"),
            Some(&Value::List(vec!["--".into(), "-x".into()]))
        );
    }
}
