//! The result of a resolution pass.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{ArgMatches, Command};
use serde::Serialize;
use tracing::warn;

use crate::error::SettingsError;
use crate::merge::{ConfigDefaults, ConfigValue};
use crate::resolve::find_arg_id;
use crate::types::Origin;

/// Typed settings plus what it took to produce them.
///
/// Dereferences to `C`, so `resolved.verbosity` reads a field directly.
#[derive(Debug)]
pub struct ResolvedSettings<C> {
    /// The parsed settings.
    pub settings: C,
    /// The config file list that was searched, highest priority first.
    pub config_files: Vec<PathBuf>,
    /// Arguments no declared option recognised, in their original order.
    pub leftover: Vec<String>,
    command: Command,
    matches: ArgMatches,
    /// Config values that became argument defaults, keyed by argument id.
    from_config: BTreeMap<String, ConfigValue>,
}

impl<C> ResolvedSettings<C> {
    pub(crate) fn new(
        settings: C,
        config_files: Vec<PathBuf>,
        leftover: Vec<String>,
        command: Command,
        matches: ArgMatches,
        defaults: &ConfigDefaults,
    ) -> Self {
        let from_config = defaults
            .iter()
            .filter(|(_, origin)| !origin.value.is_empty())
            .filter_map(|(key, origin)| Some((find_arg_id(&command, key)?, origin.clone())))
            .collect();
        ResolvedSettings {
            settings,
            config_files,
            leftover,
            command,
            matches,
            from_config,
        }
    }

    /// The fully built parser, config defaults included.
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    fn has_arg(&self, id: &str) -> bool {
        self.command.get_arguments().any(|a| a.get_id() == id)
    }

    /// The raw value of argument `id` as it was given (or defaulted).
    /// Several values are joined with newlines.
    pub fn value(&self, id: &str) -> Option<String> {
        let raw = self.matches.try_get_raw(id).ok().flatten()?;
        let values: Vec<String> = raw.map(|v| v.to_string_lossy().into_owned()).collect();
        Some(values.join("\n"))
    }

    /// Which layer supplied the value of argument `id`.
    pub fn origin(&self, id: &str) -> Origin {
        if !self.has_arg(id) {
            return Origin::Unset;
        }
        match self.matches.value_source(id) {
            Some(ValueSource::DefaultValue) => match self.from_config.get(id) {
                Some(origin) => Origin::ConfigFile {
                    path: origin.path.clone(),
                    line: origin.line,
                },
                None => Origin::Default,
            },
            Some(_) => Origin::CommandLine,
            None => Origin::Unset,
        }
    }

    /// Every argument's raw value, keyed by id. Unset arguments are left out.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.command
            .get_arguments()
            .map(|a| a.get_id().as_str())
            .filter(|id| *id != "help")
            .filter_map(|id| Some((id.to_string(), self.value(id)?)))
            .collect()
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            config_files: self.config_files.clone(),
            leftover: self.leftover.clone(),
            values: self.values(),
        }
    }

    /// All arguments as `key = value` lines, in declaration order.
    pub fn listing(&self) -> Listing {
        let entries = self
            .command
            .get_arguments()
            .map(|a| a.get_id().as_str())
            .filter(|id| *id != "help")
            .map(|id| {
                let display = match self.value(id) {
                    Some(v) => v.replace('\n', ", "),
                    None => "<not set>".to_string(),
                };
                (id.to_string(), display)
            })
            .collect();
        Listing { entries }
    }

    /// `(key, value)` pairs to write back for `names`. Unset values are written empty.
    pub fn persisted_pairs(&self, names: &[String]) -> Result<Vec<(String, String)>, SettingsError> {
        names
            .iter()
            .map(|name| {
                let id = find_arg_id(&self.command, name)
                    .ok_or_else(|| SettingsError::KeyNotFound(name.clone()))?;
                Ok((name.clone(), self.value(&id).unwrap_or_default()))
            })
            .collect()
    }

    /// A usage error in the parser's own format, exit code 2.
    pub fn error(&mut self, message: impl fmt::Display) -> clap::Error {
        self.command.error(ErrorKind::ValueValidation, message)
    }

    pub fn render_help(&mut self) -> String {
        self.command.render_help().to_string()
    }

    /// Print the help text to stdout. Returns 2, the conventional status for
    /// a run that only showed usage.
    pub fn print_help(&mut self) -> i32 {
        if let Err(e) = self.command.print_help() {
            warn!(error = %e, "could not print help");
        }
        2
    }

    /// `(parser, settings, leftover)`.
    pub fn into_parts(self) -> (Command, C, Vec<String>) {
        (self.command, self.settings, self.leftover)
    }
}

impl<C> Deref for ResolvedSettings<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.settings
    }
}

/// Serializable view of resolved settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    pub config_files: Vec<PathBuf>,
    pub leftover: Vec<String>,
    pub values: BTreeMap<String, String>,
}

impl SettingsSnapshot {
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string(self).map_err(|e| SettingsError::InvalidValue {
            key: "<snapshot>".into(),
            reason: e.to_string(),
        })
    }
}

/// `key = value` lines for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub entries: Vec<(String, String)>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}
