//! Settings persistence: write selected values back to a config file.
//!
//! The `[app_name]` section of the target file is replaced; every other section,
//! comment, and blank line is kept as written. The write goes through
//! [`safe_edit`](crate::safe_edit::safe_edit), so a failure leaves the
//! original untouched. Creates parent directories as needed. Values that would
//! not read back unchanged (see [`ini::round_trips`]) are rejected up front.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SettingsError;
use crate::file;
use crate::ini;
use crate::safe_edit::safe_edit;

/// Pure function: replace `section` in `content` with `pairs`.
///
/// The new section goes at the end of the document, after a blank line when
/// other content precedes it.
pub fn update_section(content: &str, section: &str, pairs: &[(String, String)]) -> String {
    let mut out = ini::strip_section(content, section);
    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.trim().is_empty() {
        out.push('\n');
    } else {
        out.clear();
    }
    out.push_str(&ini::render_section(section, pairs));
    out
}

/// I/O wrapper: rewrite `section` of the file at `path`.
pub fn persist_section(
    path: &Path,
    section: &str,
    pairs: &[(String, String)],
) -> Result<(), SettingsError> {
    if let Some((key, _)) = pairs.iter().find(|(_, value)| !ini::round_trips(value)) {
        return Err(SettingsError::InvalidValue {
            key: key.clone(),
            reason: "value would not read back unchanged from the config file".into(),
        });
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
    }

    safe_edit(path, |input, output| {
        let mut content = String::new();
        if let Some(input) = input {
            input
                .read_to_string(&mut content)
                .map_err(|e| SettingsError::io(path, e))?;
        }
        let updated = update_section(&content, section, pairs);
        output
            .write_all(updated.as_bytes())
            .map_err(|e| SettingsError::io(path, e))
    })?;

    info!(
        path = %path.display(),
        section,
        keys = pairs.len(),
        "persisted settings"
    );
    Ok(())
}

/// Persist `pairs` under `[app_name]` in the highest-priority config file:
/// the first one that exists, else the first in the list.
///
/// Returns the file written.
pub fn persist_settings(
    config_files: &[PathBuf],
    app_name: &str,
    pairs: &[(String, String)],
) -> Result<PathBuf, SettingsError> {
    let target = file::persist_target(config_files)?;
    persist_section(&target, app_name, pairs)?;
    Ok(target)
}
