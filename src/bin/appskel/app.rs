use appsettings::{InterruptGuard, ResolvedSettings, SettingsError};
use thiserror::Error;
use tracing::{debug, info};

use crate::settings::Options;

#[derive(Debug, Error)]
pub enum AppError {
    /// There is a problem with a command line argument.
    #[error("{0}")]
    Argument(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// The application.
pub struct App;

impl App {
    /// Run the tasks the settings ask for. Returns results worth reporting.
    pub fn execute(&self, settings: &ResolvedSettings<Options>) -> Result<Option<String>, AppError> {
        if !settings.leftover.is_empty() {
            return Err(AppError::Argument(format!(
                "unrecognized arguments: {}",
                settings.leftover.join(" ")
            )));
        }

        let guard = InterruptGuard::capture()?;
        debug!(files = ?settings.config_files, "config files searched");
        if let Ok(text) = toml::to_string(&settings.settings) {
            debug!("settings:\n{text}");
        }

        // Application work goes here, checking `guard.interrupted()` between steps.
        if guard.interrupted() {
            info!("interrupted");
            return Ok(None);
        }

        Ok(Some(settings.listing().to_string().replace('\n', ", ")))
    }
}
