//! Turn config files into argument defaults.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, so the whole
//! pipeline is testable with synthetic inputs. Steps:
//!
//! 1. Parse each file as INI
//! 2. Merge the declared sections (first file wins per key)
//! 3. Install each merged value as the default of the matching argument, so a
//!    value on the command line still wins and the argument's own default only
//!    applies when the config is silent

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use tracing::debug;

use crate::error::SettingsError;
use crate::ini::{self, IniDocument};
use crate::merge::{ConfigDefaults, ConfigValue, merge_defaults};

/// All pre-loaded data needed to compute config defaults. No I/O happens here.
pub struct ResolveInput {
    /// File contents in priority-descending order: first = highest priority.
    pub files: Vec<(PathBuf, String)>,
    /// Sections to read, in declaration order.
    pub sections: Vec<String>,
}

/// Parse and merge the config files into a defaults map.
pub fn collect_defaults(input: &ResolveInput) -> Result<ConfigDefaults, SettingsError> {
    let docs = input
        .files
        .iter()
        .map(|(path, content)| IniDocument::parse(path, content))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_defaults(&docs, &input.sections))
}

fn normalize(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

/// Find the argument a config key refers to, by id or by long name.
/// `-` and `_` are interchangeable and case is ignored.
pub fn find_arg<'a>(command: &'a Command, key: &str) -> Option<&'a Arg> {
    let key = normalize(key);
    command.get_arguments().find(|arg| {
        normalize(arg.get_id().as_str()) == key || arg.get_long().is_some_and(|l| normalize(l) == key)
    })
}

pub fn find_arg_id(command: &Command, key: &str) -> Option<String> {
    find_arg(command, key).map(|arg| arg.get_id().to_string())
}

enum DefaultKind {
    Bool,
    Many,
    Single,
    Unsupported,
}

fn default_kind(arg: &Arg) -> DefaultKind {
    match arg.get_action() {
        ArgAction::SetTrue | ArgAction::SetFalse => DefaultKind::Bool,
        ArgAction::Append => DefaultKind::Many,
        ArgAction::Set | ArgAction::Count => match arg.get_num_args() {
            Some(range) if range.max_values() > 1 => DefaultKind::Many,
            _ => DefaultKind::Single,
        },
        _ => DefaultKind::Unsupported,
    }
}

fn bool_default(key: &str, origin: &ConfigValue) -> Result<String, SettingsError> {
    ini::parse_bool(&origin.value)
        .map(|b| b.to_string())
        .ok_or_else(|| SettingsError::InvalidValue {
            key: key.to_string(),
            reason: format!(
                "'{}' is not a boolean ({} line {})",
                origin.value,
                origin.path.display(),
                origin.line
            ),
        })
}

/// Run `value` through the argument's own value parser.
///
/// clap only checks defaults when a run ends up using them (and asserts on
/// them in debug builds), so config values are checked up front.
fn check_value(arg: &Arg, key: &str, origin: &ConfigValue, value: &str) -> Result<(), SettingsError> {
    let checker = Command::new("check").no_binary_name(true).arg(
        Arg::new("value")
            .value_parser(arg.get_value_parser().clone())
            .action(ArgAction::Set)
            .allow_hyphen_values(true)
            .required(true),
    );
    checker
        .try_get_matches_from([value])
        .map(|_| ())
        .map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            reason: format!(
                "'{}' is not accepted ({} line {}): {}",
                value,
                origin.path.display(),
                origin.line,
                std::error::Error::source(&e)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| e.kind().to_string())
            ),
        })
}

/// Install config values as argument defaults.
///
/// Keys with no matching argument are left alone; strict mode reports them
/// separately. An empty value (`key=`) counts as unset. A required argument
/// stops being required once the config supplies it.
pub fn apply_defaults(mut command: Command, defaults: &ConfigDefaults) -> Result<Command, SettingsError> {
    for (key, origin) in defaults {
        let Some(arg) = find_arg(&command, key) else {
            debug!(key = %key, "config key matches no argument");
            continue;
        };
        if origin.value.is_empty() {
            debug!(key = %key, "empty config value, leaving argument default");
            continue;
        }
        let id = arg.get_id().to_string();

        command = match default_kind(arg) {
            DefaultKind::Bool => {
                let value = bool_default(key, origin)?;
                check_value(arg, key, origin, &value)?;
                command.mut_arg(&id, |a| a.default_value(value).required(false))
            }
            DefaultKind::Many => {
                let values: Vec<String> = origin.value.split('\n').map(str::to_string).collect();
                for value in &values {
                    check_value(arg, key, origin, value)?;
                }
                command.mut_arg(&id, |a| a.default_values(values).required(false))
            }
            DefaultKind::Single => {
                let value = origin.value.clone();
                check_value(arg, key, origin, &value)?;
                command.mut_arg(&id, |a| a.default_value(value).required(false))
            }
            DefaultKind::Unsupported => {
                debug!(key = %key, "argument does not accept a default, skipping");
                continue;
            }
        };
        debug!(
            key = %key,
            path = %origin.path.display(),
            line = origin.line,
            "default from config file"
        );
    }
    Ok(command)
}
