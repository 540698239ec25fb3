use std::fmt;
use std::path::PathBuf;

use crate::settings::ResolvedSettings;

/// Where to look for a config file.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// A file name relative to the current working directory, e.g. `Cwd(".myapprc")`.
    Cwd(String),
    /// A path relative to the user's home directory, e.g. `Home(".myapp/myapp.conf")`.
    Home(String),
    /// A file name inside the platform config directory (XDG on Linux).
    Platform(String),
    /// An explicit path.
    Path(PathBuf),
}

/// A request that ends the run right after producing its output.
#[derive(Debug, Clone, PartialEq)]
pub enum ShortCircuit {
    /// `--version` was given. Holds the resolved version string.
    Version(String),
    /// `--longhelp` was given. Holds the full application documentation.
    LongHelp(String),
}

impl fmt::Display for ShortCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortCircuit::Version(v) => write!(f, "Version {v}"),
            ShortCircuit::LongHelp(text) => write!(f, "{text}"),
        }
    }
}

/// Result of a resolution pass.
#[derive(Debug)]
pub enum Outcome<C> {
    /// Settings are resolved and validated; the application should run.
    Ready(ResolvedSettings<C>),
    /// A short-circuit option was requested; print it and exit with status 0.
    Exit(ShortCircuit),
}

impl<C> Outcome<C> {
    pub fn ready(self) -> Option<ResolvedSettings<C>> {
        match self {
            Outcome::Ready(resolved) => Some(resolved),
            Outcome::Exit(_) => None,
        }
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    CommandLine,
    ConfigFile { path: PathBuf, line: usize },
    /// The argument's own compiled-in default.
    Default,
    /// No value from any layer.
    Unset,
}
