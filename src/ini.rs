//! INI reader and writer for config files.
//!
//! The accepted dialect is the common one:
//!
//! - `[section]` headers. Section names are case-sensitive and appear at most
//!   once per file.
//! - `key = value` or `key: value`. The first `=` or `:` on the line is the
//!   delimiter. Keys are trimmed and lowercased, values are trimmed.
//! - Full-line comments start with `#` or `;`. Blank lines are ignored.
//! - An indented line directly below an entry continues that entry's value;
//!   continuation lines are joined with `\n`.
//! - Entries of the `DEFAULT` section act as fallbacks for every other section.
//!
//! Values are kept as raw strings. There is no `%(name)s` interpolation.

use std::path::{Path, PathBuf};

use crate::error::SettingsError;

/// Name of the section whose entries are visible from every other section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// A single `key = value` entry and the line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub line: usize,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

/// A parsed config file. Sections keep their file order.
#[derive(Debug, Clone, PartialEq)]
pub struct IniDocument {
    pub path: PathBuf,
    pub sections: Vec<Section>,
}

impl IniDocument {
    /// Parse `text`, attributing errors to `path`.
    pub fn parse(path: &Path, text: &str) -> Result<Self, SettingsError> {
        let err = |line: usize, reason: String| SettingsError::Ini {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut sections: Vec<Section> = Vec::new();
        // Index of the section and entry a continuation line would extend.
        let mut open_entry: Option<(usize, usize)> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                open_entry = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw.starts_with(|c: char| c.is_whitespace());
            if indented && let Some((s, e)) = open_entry {
                let entry = &mut sections[s].entries[e];
                entry.value.push('\n');
                entry.value.push_str(trimmed);
                continue;
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(err(line_no, format!("malformed section header '{trimmed}'")));
                };
                let name = name.trim().to_string();
                if let Some(first) = sections.iter().find(|s| s.name == name) {
                    return Err(err(
                        line_no,
                        format!("section [{name}] already defined on line {}", first.line),
                    ));
                }
                sections.push(Section {
                    name,
                    line: line_no,
                    entries: Vec::new(),
                });
                open_entry = None;
                continue;
            }

            let Some(current) = sections.len().checked_sub(1) else {
                return Err(err(
                    line_no,
                    format!("entry '{trimmed}' appears before any section header"),
                ));
            };

            let Some(delim) = trimmed.find(['=', ':']) else {
                return Err(err(line_no, format!("expected 'key = value', got '{trimmed}'")));
            };
            let key = trimmed[..delim].trim().to_lowercase();
            let value = trimmed[delim + 1..].trim().to_string();
            if key.is_empty() {
                return Err(err(line_no, "empty key".into()));
            }

            let section = &mut sections[current];
            if section.get(&key).is_some() {
                return Err(err(
                    line_no,
                    format!("duplicate key '{key}' in section [{}]", section.name),
                ));
            }
            section.entries.push(Entry {
                key,
                value,
                line: line_no,
            });
            open_entry = Some((current, section.entries.len() - 1));
        }

        Ok(IniDocument {
            path: path.to_path_buf(),
            sections,
        })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Entries visible from `section`, with `DEFAULT` entries filling the gaps.
    ///
    /// Returns `None` when the section does not exist in this file.
    pub fn items(&self, section: &str) -> Option<Vec<&Entry>> {
        let own = self.section(section)?;
        let mut items: Vec<&Entry> = Vec::new();
        if section != DEFAULT_SECTION
            && let Some(defaults) = self.section(DEFAULT_SECTION)
        {
            items.extend(defaults.entries.iter().filter(|d| own.get(&d.key).is_none()));
        }
        items.extend(own.entries.iter());
        Some(items)
    }
}

/// Render one section as `[name]` followed by `key=value` lines.
///
/// Values spanning several lines are written as indented continuation lines so
/// they read back unchanged. Values are trimmed on reading, so leading or
/// trailing whitespace does not survive; see [`round_trips`].
pub fn render_section(name: &str, pairs: &[(String, String)]) -> String {
    let mut out = format!("[{name}]\n");
    for (key, value) in pairs {
        let value = value.replace('\n', "\n\t");
        out.push_str(&format!("{key}={value}\n"));
    }
    out
}

/// Whether `value` reads back unchanged after [`render_section`].
pub fn round_trips(value: &str) -> bool {
    if value.ends_with('\n') {
        return false;
    }
    let mut lines = value.lines();
    let first_ok = lines.next().is_none_or(|line| line == line.trim());
    first_ok
        && lines.all(|line| {
            line == line.trim() && !line.is_empty() && !line.starts_with(['#', ';'])
        })
}

/// Remove the `[name]` section (header, entries, and the comments inside it).
pub fn strip_section(text: &str, name: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut skipping = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[')
            && let Some(header) = header.strip_suffix(']')
        {
            skipping = header.trim() == name;
        }
        if !skipping {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Interpret an INI boolean spelling.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}
