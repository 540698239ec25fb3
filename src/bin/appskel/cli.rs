use tracing::{error, info};

use crate::app::{App, AppError};
use crate::logging;
use crate::settings;

/// Command line interface for the app.
pub struct Cli;

impl Cli {
    /// Resolve the settings, then run `app`. Returns the process exit code.
    pub fn execute(&self, app: &App) -> i32 {
        let settings = settings::builder().load();
        if let Err(e) = logging::init(settings.verbosity, settings.logfile.as_deref()) {
            eprintln!("error: {e}");
            return 1;
        }

        match app.execute(&settings) {
            Ok(results) => {
                if let Some(results) = results {
                    self.report(&results);
                }
                0
            }
            Err(AppError::Argument(message)) => {
                error!("{message}");
                1
            }
            Err(e) => {
                error!("{e}");
                1
            }
        }
    }

    fn report(&self, results: &str) {
        info!("Results: {results}");
    }
}
