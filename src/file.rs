//! Config file discovery and loading.
//!
//! Config file lists are kept in **priority-descending** order: the first entry
//! has the highest priority. An explicit `--conf_file` is inserted at the front.
//!
//! Each [`SearchPath`] resolves to one concrete file path. Paths that cannot be
//! resolved (no home directory, for example) are dropped from the list. When the
//! files are read, missing ones are silently skipped; only real I/O errors
//! (permissions, a directory in place of a file) propagate.

use std::path::PathBuf;

use tracing::debug;

use crate::error::SettingsError;
use crate::types::SearchPath;

/// The default search list for a package named `pkg`:
///
/// 1. `./.{pkg}rc`
/// 2. `~/.{pkg}/{pkg}.conf`
/// 3. `~/.{pkg}rc`
pub fn default_search_paths(pkg: &str) -> Vec<SearchPath> {
    vec![
        SearchPath::Cwd(format!(".{pkg}rc")),
        SearchPath::Home(format!(".{pkg}/{pkg}.conf")),
        SearchPath::Home(format!(".{pkg}rc")),
    ]
}

/// Resolve a [`SearchPath`] to a concrete file path.
///
/// `app_name` names the platform config directory for [`SearchPath::Platform`].
/// Returns `None` if the location cannot be determined.
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Cwd(name) => Some(PathBuf::from(name)),
        SearchPath::Home(relative) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(relative))
        }
        SearchPath::Platform(name) => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().join(name))
        }
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Resolve every search path, keeping their order.
pub fn resolve_search_paths(search_paths: &[SearchPath], app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .collect()
}

/// Read every existing file in `paths`, keeping list order.
pub fn read_config_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, SettingsError> {
    let mut results = Vec::new();
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "read config file");
                results.push((path.clone(), content));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, skipping");
            }
            Err(e) => return Err(SettingsError::io(path, e)),
        }
    }
    Ok(results)
}

/// The file that persisted settings are written to: the first existing file in
/// the list, falling back to the highest-priority entry.
pub fn persist_target(paths: &[PathBuf]) -> Result<PathBuf, SettingsError> {
    paths
        .iter()
        .find(|p| p.is_file())
        .or_else(|| paths.first())
        .cloned()
        .ok_or(SettingsError::NoPersistPath)
}
