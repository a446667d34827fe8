//! Annotated configuration keys.
//!
//! A key may carry two suffixes, written as `name$command@environment`:
//! - `@environment` keeps the entry only when the active environment matches
//! - `$command` changes how the value combines with an existing one
//!
//! The environment suffix is split off first (at the first `@`), then the
//! command (at the first `$`).

use crate::error::{ConfigError, Result};

/// Separator introducing an environment suffix.
pub const ENV_SEPARATOR: char = '@';

/// Separator introducing a merge command.
pub const COMMAND_SEPARATOR: char = '$';

/// Per-key merge directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Concatenate lists instead of replacing them.
    Merge,
    /// Drop any existing value before merging.
    Replace,
    /// Remove the key; the value is ignored.
    Unset,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Merge => "merge",
            Command::Replace => "replace",
            Command::Unset => "unset",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A key split into its plain name and optional annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedKey<'a> {
    pub name: &'a str,
    pub environment: Option<&'a str>,
    command: Option<&'a str>,
}

impl<'a> AnnotatedKey<'a> {
    /// Split a raw key. Never fails; command validation is deferred to
    /// [`AnnotatedKey::command`] so that filtered-out keys are not validated.
    pub fn parse(raw: &'a str) -> Self {
        let (rest, environment) = match raw.split_once(ENV_SEPARATOR) {
            Some((rest, env)) => (rest, Some(env)),
            None => (raw, None),
        };
        let (name, command) = match rest.split_once(COMMAND_SEPARATOR) {
            Some((name, command)) => (name, Some(command)),
            None => (rest, None),
        };
        Self {
            name,
            environment,
            command,
        }
    }

    /// Whether the entry applies under `active`.
    pub fn applies_to(&self, active: &str) -> bool {
        self.environment.is_none_or(|env| env == active)
    }

    /// Validated command, if any.
    pub fn command(&self) -> Result<Option<Command>> {
        match self.command {
            None => Ok(None),
            Some("merge") => Ok(Some(Command::Merge)),
            Some("replace") => Ok(Some(Command::Replace)),
            Some("unset") => Ok(Some(Command::Unset)),
            Some(other) => Err(ConfigError::unknown_command(other, self.name)),
        }
    }
}
