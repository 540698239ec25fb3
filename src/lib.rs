//! Layered settings for command-line applications: config files supply the
//! defaults, the command line has the last word.
//!
//! Declare the options with clap derive, name the application, and resolve:
//!
//! ```ignore
//! #[derive(clap::Parser)]
//! struct Options {
//!     /// Logging verbosity.
//!     #[arg(long, default_value_t = 2)]
//!     verbosity: u8,
//! }
//!
//! let settings = AppSettings::builder::<Options>()
//!     .app_name("myapp")
//!     .version(env!("CARGO_PKG_VERSION"))
//!     .load();
//! ```
//!
//! That call looks for `.myapprc`, `~/.myapp/myapp.conf` and `~/.myapprc`,
//! reads their `[myapp]` sections, installs the values as argument defaults,
//! parses the command line, and hands back typed settings along with any
//! arguments it did not recognise.
//!
//! # Layer precedence
//!
//! ```text
//! Argument defaults     #[arg(default_value_t = ...)]
//!        ↑ overridden by
//! Search-path files     first file in the list wins per key
//!        ↑ overridden by
//! --conf_file FILE      put in front of the list
//!        ↑ overridden by
//! Command line
//! ```
//!
//! # Config files
//!
//! Files are INI: `[section]` headers and `key = value` (or `key: value`)
//! entries. Keys are case-insensitive and match an argument's id or long name,
//! with `-` and `_` interchangeable. Indented lines continue the previous
//! value; for list arguments each line is one value. Booleans accept
//! `1/yes/true/on` and `0/no/false/off`. `key =` with nothing after it counts
//! as unset. Entries of a `[DEFAULT]` section apply to every section.
//!
//! Several sections can be read with
//! [`config_sections`](AppSettingsBuilder::config_sections); within one file a
//! later section wins over an earlier one.
//!
//! # Always present
//!
//! - `-c/--conf_file FILE`: an extra config file with the highest priority
//! - `-v/--version`: print `Version x.y.z` and exit 0
//! - `--longhelp`: print the long documentation and exit 0
//!
//! A validation hook runs after those two short-circuits, or before them with
//! [`early_validate`](AppSettingsBuilder::early_validate). A failing check is
//! reported like any other usage error.
//!
//! # Persistence
//!
//! [`persist`](AppSettingsBuilder::persist) names arguments whose values are
//! written back under `[app_name]` in the first existing config file. The
//! write is crash-safe ([`SafeEdit`]): the previous version is kept as
//! `{file}~` and a failed write leaves the file untouched.
//!
//! # Utilities
//!
//! - [`InterruptGuard`]: nested Ctrl-C capture that sets a flag instead of
//!   killing the process
//! - [`safe_edit`], [`quick_edit`], [`touch`]: file edits with a backup
//! - [`terminal_size`]: width and height used to wrap help text

pub mod error;
pub mod types;

mod args;
mod builder;
mod file;
mod ini;
mod interrupt;
pub(crate) mod merge;
mod persist;
mod resolve;
mod safe_edit;
mod settings;
mod terminal;
mod validate;
mod version;

#[cfg(test)]
mod fixtures;

pub use builder::{AppSettings, AppSettingsBuilder, CONF_FILE, LONGHELP, VERSION};
pub use error::SettingsError;
pub use file::default_search_paths;
pub use interrupt::{INTERRUPTED_EXIT_CODE, InterruptGuard, deliver as deliver_interrupt};
pub use safe_edit::{SafeEdit, backup_path, quick_edit, safe_edit, touch};
pub use settings::{Listing, ResolvedSettings, SettingsSnapshot};
pub use terminal::terminal_size;
pub use types::{Origin, Outcome, SearchPath, ShortCircuit};
pub use version::{UNKNOWN_VERSION, VersionLookup};
