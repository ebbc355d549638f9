//! Option and positional declarations.

use std::sync::Arc;

use crate::actions::{ContainerAction, Last, List};
use crate::error::DeclarationError;
use crate::types::{Arity, ValueType};
use crate::value::Value;

pub const DEFAULT_SHORT_PREFIX: &str = "-";
pub const DEFAULT_LONG_PREFIX: &str = "--";

/// How many conversions a slot performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Required,
    /// May be absent. Once an optional slot is absent, later slots are skipped.
    Optional,
    /// Repeats until the tokens run out or an option-looking token is reached.
    Remaining { min: usize, max: Option<usize> },
}

/// A value type together with how often it is applied.
#[derive(Debug, Clone)]
pub struct Slot {
    ty: Arc<dyn ValueType>,
    multiplicity: Multiplicity,
}

impl Slot {
    pub fn new(ty: impl ValueType + 'static) -> Self {
        Self {
            ty: Arc::new(ty),
            multiplicity: Multiplicity::Required,
        }
    }

    pub fn optional(mut self) -> Self {
        self.multiplicity = Multiplicity::Optional;
        self
    }

    pub fn remaining(mut self) -> Self {
        self.multiplicity = Multiplicity::Remaining { min: 0, max: None };
        self
    }

    /// Minimum number of conversions. Turns the slot into a remaining slot.
    pub fn min(mut self, n: usize) -> Self {
        let max = match self.multiplicity {
            Multiplicity::Remaining { max, .. } => max,
            _ => None,
        };
        self.multiplicity = Multiplicity::Remaining { min: n, max };
        self
    }

    /// Maximum number of conversions. Turns the slot into a remaining slot.
    pub fn max(mut self, n: usize) -> Self {
        let min = match self.multiplicity {
            Multiplicity::Remaining { min, .. } => min,
            _ => 0,
        };
        self.multiplicity = Multiplicity::Remaining { min, max: Some(n) };
        self
    }

    pub fn value_type(&self) -> &dyn ValueType {
        self.ty.as_ref()
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn arity(&self) -> Arity {
        match self.multiplicity {
            Multiplicity::Remaining { .. } => Arity::Unbounded,
            _ => Arity::Exactly(self.ty.arity()),
        }
    }

    /// Fewest tokens this slot can be satisfied with.
    pub(crate) fn min_tokens(&self) -> usize {
        match self.multiplicity {
            Multiplicity::Required => self.ty.arity(),
            Multiplicity::Optional => 0,
            Multiplicity::Remaining { min, .. } => min * self.ty.arity(),
        }
    }
}

impl<T: ValueType + 'static> From<T> for Slot {
    fn from(ty: T) -> Self {
        Slot::new(ty)
    }
}

/// The ordered slots an option consumes per occurrence.
#[derive(Debug, Clone)]
pub struct Signature(Vec<Slot>);

impl Signature {
    pub fn new(slots: impl IntoIterator<Item = Slot>) -> Self {
        Self(slots.into_iter().collect())
    }

    pub fn slots(&self) -> &[Slot] {
        &self.0
    }

    /// Whether an occurrence binds the bare slot value instead of a list.
    pub(crate) fn is_scalar(&self) -> bool {
        matches!(
            self.0.as_slice(),
            [slot] if slot.multiplicity == Multiplicity::Required
        )
    }

    pub(crate) fn is_switch(&self) -> bool {
        self.0.iter().all(|slot| slot.ty.arity() == 0)
    }

    fn validate(&self, name: &str) -> Result<(), DeclarationError> {
        if self.0.is_empty() {
            return Err(DeclarationError::invalid(name, "an option needs at least one slot"));
        }
        let mut seen_optional = false;
        for (idx, slot) in self.0.iter().enumerate() {
            match slot.multiplicity {
                Multiplicity::Required if seen_optional => {
                    return Err(DeclarationError::invalid(
                        name,
                        "a required slot cannot follow an optional one",
                    ));
                }
                Multiplicity::Required => {}
                Multiplicity::Optional => seen_optional = true,
                Multiplicity::Remaining { min, max } => {
                    if idx + 1 != self.0.len() {
                        return Err(DeclarationError::invalid(
                            name,
                            "a remaining slot must be the last one",
                        ));
                    }
                    validate_range(name, min, max)?;
                }
            }
            if slot.ty.arity() == 0 && self.0.len() > 1 {
                return Err(DeclarationError::invalid(
                    name,
                    "switch types cannot be combined with other slots",
                ));
            }
        }
        Ok(())
    }
}

fn validate_range(name: &str, min: usize, max: Option<usize>) -> Result<(), DeclarationError> {
    match max {
        Some(max) if max < min => Err(DeclarationError::invalid(
            name,
            format!("max ({max}) is smaller than min ({min})"),
        )),
        Some(0) => Err(DeclarationError::invalid(name, "max must be at least 1")),
        _ => Ok(()),
    }
}

/// A named option such as `-v`, `--verbose` or `--output FILE`.
///
/// Options are optional unless marked [`Opt::required`]. Without an explicit
/// action, the last occurrence wins.
#[derive(Debug, Clone)]
pub struct Opt {
    signature: Signature,
    shorts: Vec<char>,
    longs: Vec<String>,
    short_prefix: String,
    long_prefix: String,
    action: Arc<dyn ContainerAction>,
    required: bool,
    default: Option<Value>,
    help: Option<String>,
}

impl Opt {
    pub fn new(slot: impl Into<Slot>) -> Self {
        Self::with_slots([slot.into()])
    }

    pub fn with_slots(slots: impl IntoIterator<Item = Slot>) -> Self {
        Self {
            signature: Signature::new(slots),
            shorts: Vec::new(),
            longs: Vec::new(),
            short_prefix: DEFAULT_SHORT_PREFIX.to_string(),
            long_prefix: DEFAULT_LONG_PREFIX.to_string(),
            action: Arc::new(Last),
            required: false,
            default: None,
            help: None,
        }
    }

    /// A boolean switch that stores `true` when present.
    pub fn switch() -> Self {
        Self::new(crate::types::Boolean::switch())
    }

    pub fn short(mut self, name: char) -> Self {
        self.shorts.push(name);
        self
    }

    /// Long name without its prefix; leading dashes are stripped.
    pub fn long(mut self, name: impl AsRef<str>) -> Self {
        self.longs
            .push(name.as_ref().trim_start_matches('-').to_string());
        self
    }

    pub fn short_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.short_prefix = prefix.into();
        self
    }

    pub fn long_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.long_prefix = prefix.into();
        self
    }

    pub fn action(mut self, action: impl ContainerAction + 'static) -> Self {
        self.action = Arc::new(action);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub(crate) fn container(&self) -> &dyn ContainerAction {
        self.action.as_ref()
    }

    pub fn short_prefix_str(&self) -> &str {
        &self.short_prefix
    }

    pub fn long_prefix_str(&self) -> &str {
        &self.long_prefix
    }

    /// Short flags with their prefix, e.g. `-v`.
    pub fn short_flags(&self) -> impl Iterator<Item = String> + '_ {
        self.shorts
            .iter()
            .map(|c| format!("{}{c}", self.short_prefix))
    }

    /// Long flags with their prefix, e.g. `--verbose`.
    pub fn long_flags(&self) -> impl Iterator<Item = String> + '_ {
        self.longs
            .iter()
            .map(|name| format!("{}{name}", self.long_prefix))
    }

    /// The name used in error messages: the first long flag, else the first
    /// short flag.
    pub fn display_name(&self) -> String {
        self.long_flags()
            .next()
            .or_else(|| self.short_flags().next())
            .unwrap_or_default()
    }

    pub(crate) fn validate(&self, dest: &str) -> Result<(), DeclarationError> {
        if self.shorts.is_empty() && self.longs.is_empty() {
            return Err(DeclarationError::invalid(dest, "an option needs a short or long name"));
        }
        if self.short_prefix.is_empty() || self.long_prefix.is_empty() {
            return Err(DeclarationError::invalid(dest, "option prefixes cannot be empty"));
        }
        if self.longs.iter().any(|name| name.is_empty() || name.contains('=')) {
            return Err(DeclarationError::invalid(
                dest,
                "long names must be non-empty and cannot contain '='",
            ));
        }
        if self.shorts.iter().any(|c| c.is_whitespace() || *c == '=') {
            return Err(DeclarationError::invalid(dest, "invalid short name"));
        }
        self.signature.validate(dest)
    }
}

/// An unnamed, ordered argument.
///
/// Positionals are required unless marked optional. A remaining positional
/// collects every token it is given into a list unless another action is set.
#[derive(Debug, Clone)]
pub struct Positional {
    slot: Slot,
    action: Option<Arc<dyn ContainerAction>>,
    default: Option<Value>,
    help: Option<String>,
}

impl Positional {
    pub fn new(ty: impl ValueType + 'static) -> Self {
        Self {
            slot: Slot::new(ty),
            action: None,
            default: None,
            help: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.slot = self.slot.optional();
        self
    }

    pub fn remaining(mut self) -> Self {
        self.slot = self.slot.remaining();
        self
    }

    pub fn min(mut self, n: usize) -> Self {
        self.slot = self.slot.min(n);
        self
    }

    pub fn max(mut self, n: usize) -> Self {
        self.slot = self.slot.max(n);
        self
    }

    pub fn action(mut self, action: impl ContainerAction + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn is_required(&self) -> bool {
        self.slot.min_tokens() > 0
    }

    pub fn is_unbounded(&self) -> bool {
        self.slot.arity() == Arity::Unbounded
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub(crate) fn container(&self) -> &dyn ContainerAction {
        match &self.action {
            Some(action) => action.as_ref(),
            None if self.is_unbounded() => &List,
            None => &Last,
        }
    }

    pub(crate) fn validate(&self, dest: &str) -> Result<(), DeclarationError> {
        if self.slot.ty.arity() == 0 {
            return Err(DeclarationError::invalid(
                dest,
                "a positional cannot use a switch type",
            ));
        }
        if let Multiplicity::Remaining { min, max } = self.slot.multiplicity {
            validate_range(dest, min, max)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Boolean, Integer, Str};

    #[test]
    fn long_names_drop_leading_dashes() {
        let opt = Opt::new(Str).short('o').long("--output");
        assert_eq!(opt.long_flags().collect::<Vec<_>>(), vec!["--output"]);
        assert_eq!(opt.short_flags().collect::<Vec<_>>(), vec!["-o"]);
        assert_eq!(opt.display_name(), "--output");
    }

    #[test]
    fn custom_prefixes_apply_to_flags() {
        let opt = Opt::switch().short('o').long("option").short_prefix("+").long_prefix("++");
        assert_eq!(opt.short_flags().collect::<Vec<_>>(), vec!["+o"]);
        assert_eq!(opt.display_name(), "++option");
    }

    #[test]
    fn option_without_names_is_invalid() {
        let err = Opt::new(Str).validate("out").unwrap_err();
        assert!(matches!(err, DeclarationError::Invalid { ref name, .. } if name == "out"));
    }

    #[test]
    fn signature_shape_rules() {
        let ok = Opt::with_slots([Slot::new(Str), Slot::new(Str).optional(), Slot::new(Str).remaining()])
            .long("x");
        assert!(ok.validate("x").is_ok());

        let bad = Opt::with_slots([Slot::new(Str).optional(), Slot::new(Str)]).long("x");
        assert!(bad.validate("x").is_err());

        let bad = Opt::with_slots([Slot::new(Str).remaining(), Slot::new(Str)]).long("x");
        assert!(bad.validate("x").is_err());

        let bad = Opt::with_slots([Slot::new(Boolean::switch()), Slot::new(Str)]).long("x");
        assert!(bad.validate("x").is_err());
    }

    #[test]
    fn scalar_and_switch_signatures() {
        assert!(Opt::new(Integer).signature().is_scalar());
        assert!(!Opt::new(Slot::new(Integer).optional()).signature().is_scalar());
        assert!(Opt::switch().signature().is_switch());
        assert!(!Opt::new(Integer).signature().is_switch());
    }

    #[test]
    fn positional_requiredness_and_default_action() {
        let fixed = Positional::new(Str);
        assert!(fixed.is_required());
        assert!(!fixed.is_unbounded());

        let rest = Positional::new(Str).remaining();
        assert!(!rest.is_required());
        assert!(rest.is_unbounded());
        assert_eq!(rest.container().initial(), Some(Value::List(Vec::new())));

        let some = Positional::new(Str).min(1);
        assert!(some.is_required());
        assert_eq!(some.slot().min_tokens(), 1);
    }

    #[test]
    fn help_text_is_kept_for_callers() {
        let opt = Opt::new(Integer).short('j').help("parallel jobs");
        assert_eq!(opt.help_text(), Some("parallel jobs"));
        assert_eq!(Opt::switch().short('q').help_text(), None);

        let positional = Positional::new(Str).help("what to build");
        assert_eq!(positional.help_text(), Some("what to build"));
        assert_eq!(Positional::new(Str).help_text(), None);
    }

    #[test]
    fn positional_rejects_switch_and_bad_range() {
        assert!(Positional::new(Boolean::switch()).validate("p").is_err());
        assert!(Positional::new(Str).min(3).max(2).validate("p").is_err());
    }
}
