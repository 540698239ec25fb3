//! appskel: the skeleton a new command-line application starts from.

mod app;
mod cli;
mod logging;
mod settings;

pub const LONG_HELP: &str = "\
appskel is the starting point for a new command-line application.

Settings come from three layers, highest priority first:

  1. the command line
  2. config files: --conf_file FILE, then ./.appskelrc,
     ~/.appskel/appskel.conf and ~/.appskelrc
  3. the built-in defaults

Config files are INI. Options go in the [appskel] section:

  [appskel]
  verbosity = 3
  logfile = /tmp/appskel.log

Ctrl-C is captured while the application runs, so work in progress can
stop cleanly.";

fn main() {
    std::process::exit(cli::Cli.execute(&app::App));
}
