//! The command tree.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::declare::{DEFAULT_LONG_PREFIX, DEFAULT_SHORT_PREFIX, Opt, Positional};
use crate::error::DeclarationError;
use crate::matches::Matches;

/// Called with the bound values once a parse resolves to its command.
pub type Handler<R> = Arc<dyn Fn(&Matches) -> anyhow::Result<R> + Send + Sync>;

/// A node of the command tree: options, ordered positionals, sub-commands
/// and an optional handler.
///
/// Every `add_*` method validates eagerly, so a tree that was built without
/// errors can always be parsed.
pub struct Command<R = ()> {
    name: String,
    about: Option<String>,
    options: IndexMap<String, Opt>,
    flags: HashMap<String, String>,
    custom_prefixes: Vec<String>,
    positionals: Vec<(String, Positional)>,
    subcommands: IndexMap<String, Command<R>>,
    handler: Option<Handler<R>>,
}

impl<R> Command<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            options: IndexMap::new(),
            flags: HashMap::new(),
            custom_prefixes: Vec::new(),
            positionals: Vec::new(),
            subcommands: IndexMap::new(),
            handler: None,
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Matches) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn option(mut self, dest: impl Into<String>, opt: Opt) -> Result<Self, DeclarationError> {
        self.add_option(dest, opt)?;
        Ok(self)
    }

    pub fn positional(
        mut self,
        dest: impl Into<String>,
        positional: Positional,
    ) -> Result<Self, DeclarationError> {
        self.add_positional(dest, positional)?;
        Ok(self)
    }

    pub fn subcommand(mut self, command: Command<R>) -> Result<Self, DeclarationError> {
        self.add_subcommand(command)?;
        Ok(self)
    }

    fn check_dest(&self, dest: &str) -> Result<(), DeclarationError> {
        let taken = self.options.contains_key(dest) || self.positionals.iter().any(|(d, _)| d == dest);
        if taken {
            return Err(DeclarationError::ArgumentConflict {
                dest: dest.to_string(),
                command: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn add_option(&mut self, dest: impl Into<String>, opt: Opt) -> Result<(), DeclarationError> {
        let dest = dest.into();
        opt.validate(&dest)?;
        self.check_dest(&dest)?;

        let flags: Vec<String> = opt.short_flags().chain(opt.long_flags()).collect();
        for (idx, flag) in flags.iter().enumerate() {
            let existing = self
                .flags
                .get(flag)
                .cloned()
                .or_else(|| flags[..idx].contains(flag).then(|| dest.clone()));
            if let Some(existing) = existing {
                return Err(DeclarationError::OptionConflict {
                    flag: flag.clone(),
                    existing,
                    dest,
                });
            }
        }

        for flag in flags {
            self.flags.insert(flag, dest.clone());
        }
        for prefix in [opt.short_prefix_str(), opt.long_prefix_str()] {
            let builtin = prefix == DEFAULT_SHORT_PREFIX || prefix == DEFAULT_LONG_PREFIX;
            if !builtin && !self.custom_prefixes.iter().any(|p| p == prefix) {
                self.custom_prefixes.push(prefix.to_string());
            }
        }
        tracing::trace!(command = %self.name, dest = %dest, "declared option");
        self.options.insert(dest, opt);
        Ok(())
    }

    pub fn add_positional(
        &mut self,
        dest: impl Into<String>,
        positional: Positional,
    ) -> Result<(), DeclarationError> {
        let dest = dest.into();
        positional.validate(&dest)?;
        self.check_dest(&dest)?;

        if self.positionals.iter().any(|(_, p)| p.is_unbounded())
            && (positional.is_unbounded() || !positional.is_required())
        {
            return Err(DeclarationError::invalid(
                dest,
                "only required positionals of fixed arity may follow a remaining positional",
            ));
        }

        self.positionals.push((dest, positional));
        Ok(())
    }

    pub fn add_subcommand(&mut self, command: Command<R>) -> Result<(), DeclarationError> {
        if command.name.is_empty() || command.name.starts_with('-') {
            return Err(DeclarationError::invalid(
                command.name,
                "sub-command names must be non-empty and cannot start with '-'",
            ));
        }
        if self.subcommands.contains_key(&command.name) {
            return Err(DeclarationError::CommandConflict {
                name: command.name,
                parent: self.name.clone(),
            });
        }
        self.subcommands.insert(command.name.clone(), command);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about_text(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &Opt)> {
        self.options.iter().map(|(dest, opt)| (dest.as_str(), opt))
    }

    pub fn positionals(&self) -> impl Iterator<Item = (&str, &Positional)> {
        self.positionals.iter().map(|(dest, p)| (dest.as_str(), p))
    }

    pub fn subcommands(&self) -> impl Iterator<Item = &Command<R>> {
        self.subcommands.values()
    }

    pub fn find_subcommand(&self, name: &str) -> Option<&Command<R>> {
        self.subcommands.get(name)
    }

    pub fn has_subcommands(&self) -> bool {
        !self.subcommands.is_empty()
    }

    pub fn handler_fn(&self) -> Option<&Handler<R>> {
        self.handler.as_ref()
    }

    /// Look up an option by its full flag text (`-v`, `--verbose`).
    pub fn find_flag(&self, flag: &str) -> Option<(&str, &Opt)> {
        let dest = self.flags.get(flag)?;
        self.options.get_key_value(dest).map(|(d, opt)| (d.as_str(), opt))
    }

    /// Option prefixes other than `-` and `--` used by this command.
    pub(crate) fn custom_prefixes(&self) -> &[String] {
        &self.custom_prefixes
    }

    /// Short prefixes in use, longest first, always including `-`.
    pub(crate) fn short_prefixes(&self) -> impl Iterator<Item = &str> {
        let mut prefixes: Vec<&str> = self
            .options
            .values()
            .map(Opt::short_prefix_str)
            .collect();
        prefixes.push(DEFAULT_SHORT_PREFIX);
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        prefixes.dedup();
        prefixes.into_iter()
    }

    /// Whether a flag made of a digit is declared, which turns `-5` into an
    /// option instead of a negative number.
    pub(crate) fn has_digit_flag(&self) -> bool {
        self.flags.keys().any(|flag| {
            flag.strip_prefix(DEFAULT_SHORT_PREFIX)
                .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        })
    }
}

impl<R> fmt::Debug for Command<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("positionals", &self.positionals)
            .field("subcommands", &self.subcommands)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Integer, Str};

    #[test]
    fn duplicate_flags_conflict() {
        let err = Command::<()>::new("tool")
            .option("verbose", Opt::switch().short('v'))
            .unwrap()
            .option("version", Opt::switch().short('v').long("version"))
            .unwrap_err();
        assert_eq!(
            err,
            DeclarationError::OptionConflict {
                flag: "-v".into(),
                existing: "verbose".into(),
                dest: "version".into(),
            }
        );
    }

    #[test]
    fn flag_repeated_within_one_option_conflicts() {
        let err = Command::<()>::new("tool")
            .option("out", Opt::new(Str).long("out").long("--out"))
            .unwrap_err();
        assert!(matches!(err, DeclarationError::OptionConflict { ref flag, .. } if flag == "--out"));
    }

    #[test]
    fn destinations_are_shared_by_options_and_positionals() {
        let err = Command::<()>::new("tool")
            .option("name", Opt::new(Str).long("name"))
            .unwrap()
            .positional("name", Positional::new(Str))
            .unwrap_err();
        assert_eq!(
            err,
            DeclarationError::ArgumentConflict {
                dest: "name".into(),
                command: "tool".into(),
            }
        );
    }

    #[test]
    fn about_text_describes_the_command() {
        let cmd = Command::<()>::new("build").about("Build a target");
        assert_eq!(cmd.name(), "build");
        assert_eq!(cmd.about_text(), Some("Build a target"));
        assert_eq!(Command::<()>::new("tool").about_text(), None);
    }

    #[test]
    fn sibling_names_are_unique() {
        let err = Command::<()>::new("tool")
            .subcommand(Command::new("build"))
            .unwrap()
            .subcommand(Command::new("build"))
            .unwrap_err();
        assert_eq!(
            err,
            DeclarationError::CommandConflict {
                name: "build".into(),
                parent: "tool".into(),
            }
        );
        assert!(Command::<()>::new("tool").subcommand(Command::new("-x")).is_err());
    }

    #[test]
    fn remaining_positional_placement() {
        let cmd = Command::<()>::new("cp")
            .positional("src", Positional::new(Str).remaining())
            .unwrap()
            .positional("dest", Positional::new(Str))
            .unwrap();
        assert_eq!(cmd.positionals().count(), 2);

        let err = Command::<()>::new("tool")
            .positional("a", Positional::new(Str).remaining())
            .unwrap()
            .positional("b", Positional::new(Str).remaining())
            .unwrap_err();
        assert!(matches!(err, DeclarationError::Invalid { ref name, .. } if name == "b"));

        let err = Command::<()>::new("tool")
            .positional("a", Positional::new(Str).remaining())
            .unwrap()
            .positional("b", Positional::new(Integer).optional())
            .unwrap_err();
        assert!(matches!(err, DeclarationError::Invalid { .. }));
    }

    #[test]
    fn digit_flags_and_prefixes() {
        let cmd = Command::<()>::new("tool")
            .option("one", Opt::switch().short('1'))
            .unwrap()
            .option("plus", Opt::switch().short('p').short_prefix("+"))
            .unwrap();
        assert!(cmd.has_digit_flag());
        assert_eq!(cmd.custom_prefixes(), ["+".to_string()]);
        assert_eq!(cmd.short_prefixes().collect::<Vec<_>>(), vec!["+", "-"]);
        assert_eq!(cmd.find_flag("+p").map(|(dest, _)| dest), Some("plus"));
        assert!(cmd.find_flag("-p").is_none());
    }
}
