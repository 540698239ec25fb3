//! Strict-mode validation: detect config keys that match no argument.
//!
//! Off by default, since a config file is often shared by several tools. When
//! on, every unknown key is reported with its file path and line number.

use clap::Command;

use crate::error::SettingsError;
use crate::merge::ConfigDefaults;
use crate::resolve::find_arg_id;

/// Fail with [`SettingsError::UnknownKeys`] if any default has no matching argument.
pub fn validate_unknown_keys(command: &Command, defaults: &ConfigDefaults) -> Result<(), SettingsError> {
    let errors: Vec<SettingsError> = defaults
        .iter()
        .filter(|(key, _)| find_arg_id(command, key).is_none())
        .map(|(key, origin)| SettingsError::UnknownKey {
            key: key.clone(),
            path: origin.path.clone(),
            line: origin.line,
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SettingsError::UnknownKeys(errors))
    }
}
