use thiserror::Error;

/// A token that a value type could not convert.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TypeError {
    pub token: String,
    pub type_name: String,
    pub message: String,
}

impl TypeError {
    pub fn new(
        token: impl Into<String>,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// The common "`'x' is not a <type>`" shape.
    pub fn not_a(token: &str, type_name: &str, article: &str) -> Self {
        Self::new(
            token,
            type_name,
            format!("{token:?} is not {article} {type_name}"),
        )
    }
}

/// Errors caused by bad input. These abort the parse and are meant to be
/// reported to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected argument: {token}")]
    UnexpectedArgument { token: String },

    #[error("missing required argument: {name}")]
    ArgumentMissing { name: String },

    #[error("missing positional argument: <{name}>")]
    PositionalArgumentMissing { name: String },

    #[error("invalid value for {name}: {source}")]
    UserType {
        name: String,
        #[source]
        source: TypeError,
    },

    #[error("missing command for '{command}' (expected one of: {})", .available.join(", "))]
    CommandMissing {
        command: String,
        available: Vec<String>,
    },
}

impl ParseError {
    /// The offending token, when the error is tied to one.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::UnexpectedArgument { token } => Some(token),
            Self::UserType { source, .. } => Some(&source.token),
            _ => None,
        }
    }

    pub(crate) fn unexpected(token: impl Into<String>) -> Self {
        Self::UnexpectedArgument {
            token: token.into(),
        }
    }

    pub(crate) fn user_type(name: impl Into<String>, source: TypeError) -> Self {
        Self::UserType {
            name: name.into(),
            source,
        }
    }
}

/// Errors in the declared command tree. These are bugs in the code that
/// builds the CLI and are reported while the tree is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("option conflict: {flag} is declared by both '{existing}' and '{dest}'")]
    OptionConflict {
        flag: String,
        existing: String,
        dest: String,
    },

    #[error("command conflict: '{name}' is already a sub-command of '{parent}'")]
    CommandConflict { name: String, parent: String },

    #[error("argument conflict: destination '{dest}' is already declared on '{command}'")]
    ArgumentConflict { dest: String, command: String },

    #[error("invalid declaration '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

impl DeclarationError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// What [`crate::Cli::run`] can fail with.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Handler(anyhow::Error),
}

impl RunError {
    /// Process exit code for this failure: 2 for usage errors, 1 for
    /// handler failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse(_) => 2,
            Self::Handler(_) => 1,
        }
    }
}
