use crate::command::Command;
use crate::engine;
use crate::error::{ParseError, RunError};
use crate::matches::Invocation;

/// The root of a command-line interface.
///
/// Owns the command tree, which is read-only from here on, so one `Cli` can
/// serve any number of parses.
#[derive(Debug)]
pub struct Cli<R = ()> {
    root: Command<R>,
}

impl<R> Cli<R> {
    pub fn new(root: Command<R>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Command<R> {
        &self.root
    }

    /// Parse `args` (without the program name).
    pub fn parse<I, S>(&self, args: I) -> Result<Invocation<'_, R>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        engine::parse(&self.root, args)
    }

    /// Parse `args` and call the selected command's handler.
    pub fn run<I, S>(&self, args: I) -> Result<Option<R>, RunError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse(args)?.run()
    }

    /// [`Cli::run`] over the process arguments. Arguments that are not valid
    /// UTF-8 are decoded lossily.
    pub fn run_env(&self) -> Result<Option<R>, RunError> {
        self.run(env_args())
    }
}

fn env_args() -> impl Iterator<Item = String> {
    std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
}
