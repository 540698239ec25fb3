//! Crash-safe file editing.
//!
//! An edit reads the original (if any) and writes a temporary file next to it.
//! Only [`SafeEdit::commit`] touches the original:
//!
//! 1. Remove a stale `~` backup
//! 2. Rename the original to `{name}~`
//! 3. Rename the temporary file into place
//!
//! Dropping the guard without committing, or returning an error from the
//! [`safe_edit`] closure, deletes the temporary file and leaves the original
//! byte-for-byte unchanged.
//!
//! There is no cross-process locking. Two processes editing the same file at
//! the same time can lose one of the edits.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::SettingsError;

/// The backup name for `path`: the same name with `~` appended.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}

/// Create `path` if it does not exist. Existing content is left alone.
pub fn touch(path: &Path) -> Result<(), SettingsError> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| SettingsError::io(path, e))
}

/// Scoped guard over one in-progress edit.
pub struct SafeEdit {
    path: PathBuf,
    input: Option<File>,
    output: NamedTempFile,
}

impl SafeEdit {
    /// Start editing `path`. A missing file is fine: there is simply no input.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let input = match File::open(&path) {
            Ok(f) => Some(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(SettingsError::io(&path, e)),
        };

        // Same directory as the target so the final rename stays on one filesystem.
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let output = NamedTempFile::new_in(&dir).map_err(|e| SettingsError::io(&dir, e))?;
        debug!(path = %path.display(), temp = %output.path().display(), "safe edit started");

        Ok(SafeEdit {
            path,
            input,
            output,
        })
    }

    /// Like [`open`](Self::open), but creates an empty file first.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        touch(&path)?;
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The original file, or `None` when it did not exist.
    pub fn input(&mut self) -> Option<&mut File> {
        self.input.as_mut()
    }

    /// The temporary file that replaces the original on commit.
    pub fn output(&mut self) -> &mut File {
        self.output.as_file_mut()
    }

    /// Both ends at once.
    pub fn files(&mut self) -> (Option<&mut File>, &mut File) {
        (self.input.as_mut(), self.output.as_file_mut())
    }

    /// Read the whole original, or an empty string when there is none.
    pub fn read_input(&mut self) -> Result<String, SettingsError> {
        let mut text = String::new();
        if let Some(f) = self.input.as_mut() {
            f.read_to_string(&mut text)
                .map_err(|e| SettingsError::io(&self.path, e))?;
        }
        Ok(text)
    }

    /// Put the edited file in place, keeping the original as `{name}~`.
    pub fn commit(self) -> Result<(), SettingsError> {
        let SafeEdit {
            path,
            input,
            mut output,
        } = self;
        drop(input);

        output
            .as_file_mut()
            .flush()
            .and_then(|_| output.as_file().sync_all())
            .map_err(|e| SettingsError::io(output.path(), e))?;

        let backup = backup_path(&path);
        if let Err(e) = fs::remove_file(&backup)
            && e.kind() != io::ErrorKind::NotFound
        {
            debug!(backup = %backup.display(), error = %e, "could not remove stale backup");
        }

        if path.is_file() {
            if let Ok(meta) = fs::metadata(&path) {
                let _ = fs::set_permissions(output.path(), meta.permissions());
            }
            fs::rename(&path, &backup).map_err(|e| SettingsError::io(&path, e))?;
        }

        output
            .persist(&path)
            .map_err(|e| SettingsError::io(&path, e.error))?;
        debug!(path = %path.display(), backup = %backup.display(), "safe edit committed");
        Ok(())
    }
}

/// Edit `path` through `edit`, committing only when it returns `Ok`.
///
/// ```no_run
/// use std::io::{BufRead, BufReader, Write};
/// use appsettings::{SettingsError, safe_edit};
///
/// safe_edit("notes.txt".as_ref(), |input, output| {
///     if let Some(input) = input {
///         for line in BufReader::new(input).lines() {
///             let line = line.map_err(|e| SettingsError::io("notes.txt", e))?;
///             writeln!(output, "{}", line.to_uppercase())
///                 .map_err(|e| SettingsError::io("notes.txt", e))?;
///         }
///     }
///     Ok::<_, SettingsError>(())
/// })?;
/// # Ok::<(), SettingsError>(())
/// ```
pub fn safe_edit<T, E, F>(path: &Path, edit: F) -> Result<T, E>
where
    F: FnOnce(Option<&mut File>, &mut File) -> Result<T, E>,
    E: From<SettingsError>,
{
    let mut guard = SafeEdit::open(path)?;
    let (input, output) = guard.files();
    let value = edit(input, output)?;
    guard.commit()?;
    Ok(value)
}

/// Compile a quick-edit pattern. A pattern with no group is wrapped as
/// `.*(pattern).*`; matching is anchored at the start of the line.
fn compile_rule(pattern: &str) -> Result<Regex, SettingsError> {
    let pattern = if pattern.contains('(') {
        pattern.to_string()
    } else {
        format!(".*({pattern}).*")
    };
    Regex::new(&format!("^(?:{pattern})")).map_err(|e| SettingsError::InvalidValue {
        key: pattern.clone(),
        reason: e.to_string(),
    })
}

/// Replace each capture group of `re` in `line` with the matching entry of
/// `values`. Text between and after groups is kept.
fn replace_groups(line: &str, re: &Regex, values: &[&str]) -> String {
    let Some(caps) = re.captures(line) else {
        return line.to_string();
    };

    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for (group, value) in caps.iter().skip(1).zip(values) {
        let Some(m) = group else { continue };
        out.push_str(&line[cursor..m.start()]);
        out.push_str(value);
        cursor = m.end();
    }
    out.push_str(&line[cursor..]);
    out
}

/// Rewrite `path` line by line with regex replacements.
///
/// Each rule is `(pattern, values)`: the n-th capture group of a matching line
/// is replaced by the n-th value. Rules apply in order, each to the output of
/// the previous one. A missing file is left missing.
///
/// ```no_run
/// use appsettings::quick_edit;
///
/// // replace the version number on the `version = "..."` line
/// quick_edit("Cargo.toml".as_ref(), &[(r#"version = "([^"]*)""#, &["0.2.0"])])?;
/// # Ok::<(), appsettings::SettingsError>(())
/// ```
pub fn quick_edit(path: &Path, rules: &[(&str, &[&str])]) -> Result<(), SettingsError> {
    let compiled = rules
        .iter()
        .map(|(pattern, values)| Ok((compile_rule(pattern)?, *values)))
        .collect::<Result<Vec<_>, SettingsError>>()?;

    let mut guard = SafeEdit::open(path)?;
    if guard.input().is_none() {
        return Ok(());
    }
    let text = guard.read_input()?;

    let mut edited = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let mut line = line.to_string();
        for (re, values) in &compiled {
            line = replace_groups(&line, re, values);
        }
        edited.push_str(&line);
    }

    guard
        .output()
        .write_all(edited.as_bytes())
        .map_err(|e| SettingsError::io(path, e))?;
    guard.commit()
}
