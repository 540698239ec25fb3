//! Terminal size probing, used to wrap help text.

use console::Term;

/// Used when neither the terminal nor the environment gives a size.
pub const DEFAULT_SIZE: (usize, usize) = (80, 25);

/// `(width, height)` from `COLUMNS` and `LINES`. Both must be set to positive numbers.
pub fn size_from_env(columns: Option<&str>, lines: Option<&str>) -> Option<(usize, usize)> {
    let width = columns?.trim().parse::<usize>().ok()?;
    let height = lines?.trim().parse::<usize>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

/// The terminal's `(width, height)` in characters.
///
/// Asks the terminal attached to stderr first, then `COLUMNS`/`LINES`, and
/// finally falls back to [`DEFAULT_SIZE`].
pub fn terminal_size() -> (usize, usize) {
    if let Some((rows, cols)) = Term::stderr().size_checked()
        && rows > 0
        && cols > 0
    {
        return (cols as usize, rows as usize);
    }
    let columns = std::env::var("COLUMNS").ok();
    let lines = std::env::var("LINES").ok();
    size_from_env(columns.as_deref(), lines.as_deref()).unwrap_or(DEFAULT_SIZE)
}
