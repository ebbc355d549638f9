//! Typed command-line parsing over a tree of commands.
//!
//! A [`Command`] owns named options ([`Opt`]), ordered positionals
//! ([`Positional`]) and sub-commands. Each declaration pairs a value type
//! (see [`types`]) with a container action (see [`actions`]) that folds
//! repeated occurrences into the bound value.
//!
//! Declarations are validated while the tree is built, so conflicts surface
//! as [`DeclarationError`]s at startup. Bad input surfaces as a
//! [`ParseError`] when parsing.
//!
//! # Example
//!
//! ```
//! use argtree::actions::List;
//! use argtree::types::{Integer, Str};
//! use argtree::{Cli, Command, Opt, Positional};
//!
//! # fn main() -> anyhow::Result<()> {
//! let build = Command::new("build")
//!     .positional("target", Positional::new(Str))?
//!     .option("jobs", Opt::new(Integer).short('j').long("jobs").default(1i64))?
//!     .handler(|m| Ok(m.get_int("jobs").unwrap_or(1)));
//! let cli = Cli::new(
//!     Command::new("tool")
//!         .option("tag", Opt::new(Str).long("tag").action(List))?
//!         .subcommand(build)?,
//! );
//!
//! let jobs = cli.run(["--tag", "a", "build", "-j", "4", "widget"])?;
//! assert_eq!(jobs, Some(4));
//! # Ok(()) }
//! ```

pub mod actions;
mod cli;
mod command;
pub mod cursor;
mod declare;
mod engine;
mod error;
mod matches;
pub mod numeric;
pub mod resource;
pub mod types;
mod value;

pub use actions::ContainerAction;
pub use cli::Cli;
pub use command::{Command, Handler};
pub use cursor::{Cursor, Exhausted};
pub use declare::{
    DEFAULT_LONG_PREFIX, DEFAULT_SHORT_PREFIX, Multiplicity, Opt, Positional, Signature, Slot,
};
pub use engine::parse;
pub use error::*;
pub use matches::{Invocation, Matches};
pub use numeric::{Complex, Decimal};
pub use resource::{Resource, ResourceHandle};
pub use types::{Arity, ValueType};
pub use value::Value;
