use std::path::PathBuf;

use appsettings::{AppSettings, AppSettingsBuilder};
use clap::Parser;
use serde::Serialize;

pub const APP_NAME: &str = "appskel";

/// Skeleton for a command-line application.
#[derive(Parser, Serialize, Debug)]
#[command(name = "appskel")]
pub struct Options {
    /// Set verbosity level: 0=none, 1=errors, 2=info+errors, 3+=debug+info+errors
    #[arg(
        long,
        value_name = "INT",
        default_value_t = 2,
        help_heading = "Output Options"
    )]
    pub verbosity: u8,

    /// File to log all messages (debug, info, warning, error) to
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub logfile: Option<PathBuf>,
}

pub fn builder() -> AppSettingsBuilder<Options> {
    AppSettings::builder::<Options>()
        .app_name(APP_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .help("version", "Show appskel's version")
        .help("longhelp", "Long help about appskel")
        .long_help(crate::LONG_HELP)
}
