use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::ValueParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, Parser};
use tracing::{debug, warn};

use crate::args::split_known_args;
use crate::error::SettingsError;
use crate::file;
use crate::merge::ConfigDefaults;
use crate::persist;
use crate::resolve::{self, ResolveInput};
use crate::settings::ResolvedSettings;
use crate::terminal;
use crate::types::{Outcome, SearchPath, ShortCircuit};
use crate::validate;
use crate::version::VersionLookup;

/// Argument id of `-c/--conf_file`.
pub const CONF_FILE: &str = "conf_file";
/// Argument id of `-v/--version`.
pub const VERSION: &str = "version";
/// Argument id of `--longhelp`.
pub const LONGHELP: &str = "longhelp";

type Validator<C> = Box<dyn Fn(&C, &[String]) -> Option<String>>;

/// Entry point for building application settings.
pub struct AppSettings;

impl AppSettings {
    pub fn builder<C: Parser>() -> AppSettingsBuilder<C> {
        AppSettingsBuilder::new()
    }
}

/// Builder for resolving layered settings.
///
/// `C` declares the application's own options with clap derive. The builder
/// adds `-c/--conf_file`, `-v/--version` and `--longhelp`, so `C` must not
/// declare those ids itself.
pub struct AppSettingsBuilder<C> {
    app_name: Option<String>,
    package: Option<String>,
    config_sections: Option<Vec<String>>,
    help: BTreeMap<String, String>,
    description: Option<String>,
    config_files: Option<Vec<PathBuf>>,
    search_paths: Option<Vec<SearchPath>>,
    persist: Vec<String>,
    parent_args: Vec<Arg>,
    validate: Option<Validator<C>>,
    early_validate: bool,
    strict: bool,
    term_width: Option<usize>,
    version: VersionLookup,
    long_help: Option<String>,
}

impl<C: Parser> AppSettingsBuilder<C> {
    fn new() -> Self {
        Self {
            app_name: None,
            package: None,
            config_sections: None,
            help: BTreeMap::new(),
            description: None,
            config_files: None,
            search_paths: None,
            persist: Vec::new(),
            parent_args: Vec::new(),
            validate: None,
            early_validate: false,
            strict: false,
            term_width: None,
            version: VersionLookup::default(),
            long_help: None,
        }
    }

    /// Set the application name. This derives sensible defaults:
    /// - `package` → lowercased `app_name`
    /// - `config_sections` → `[app_name]`
    /// - persisted values go to the `[app_name]` section
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Override the package name used for the default config file names.
    pub fn package(mut self, name: &str) -> Self {
        self.package = Some(name.to_string());
        self
    }

    /// INI sections to read, in order. A later section wins over an earlier
    /// one for the same key.
    pub fn config_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_sections = Some(sections.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the help text of argument `id`.
    pub fn help(mut self, id: &str, text: &str) -> Self {
        self.help.insert(id.to_string(), text.to_string());
        self
    }

    /// Text shown above the usage line.
    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    /// Use exactly these config files, highest priority first, instead of
    /// the search paths. `--conf_file` is still put in front.
    pub fn config_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the default search paths, highest priority first.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Argument ids whose values are written back to the config file after
    /// every resolution.
    pub fn persist<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persist = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Extra arguments shared with other tools. They take config defaults like
    /// any other argument; read them through [`ResolvedSettings::matches`].
    pub fn parent_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = Arg>,
    {
        self.parent_args.extend(args);
        self
    }

    /// Check the final settings and leftover arguments. Returning a message
    /// fails resolution with a usage error.
    pub fn validate<F>(mut self, check: F) -> Self
    where
        F: Fn(&C, &[String]) -> Option<String> + 'static,
    {
        self.validate = Some(Box::new(check));
        self
    }

    /// Run validation before `--longhelp` and `--version` are handled.
    pub fn early_validate(mut self, early: bool) -> Self {
        self.early_validate = early;
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, config keys that match no argument produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Wrap help at `width` columns instead of the terminal's width.
    pub fn term_width(mut self, width: usize) -> Self {
        self.term_width = Some(width);
        self
    }

    /// The version `--version` reports, usually `env!("CARGO_PKG_VERSION")`.
    pub fn version(mut self, version: &str) -> Self {
        self.version.declared = Some(version.to_string());
        self
    }

    /// Manifest to search for a `version = "..."` line when no version is declared.
    pub fn version_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.version.manifest = Some(path.into());
        self
    }

    /// Plain-text version file, the last source tried.
    pub fn version_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.version.version_file = Some(path.into());
        self
    }

    /// Text printed by `--longhelp` (default: the full help).
    pub fn long_help(mut self, text: &str) -> Self {
        self.long_help = Some(text.to_string());
        self
    }

    /// Resolve the effective app name, or error if not set.
    fn effective_app_name(&self) -> Result<&str, SettingsError> {
        self.app_name
            .as_deref()
            .ok_or(SettingsError::AppNameRequired)
    }

    fn effective_package(&self) -> Result<String, SettingsError> {
        if let Some(pkg) = &self.package {
            return Ok(pkg.clone());
        }
        Ok(self.effective_app_name()?.to_lowercase())
    }

    fn effective_sections(&self) -> Result<Vec<String>, SettingsError> {
        if let Some(sections) = &self.config_sections {
            return Ok(sections.clone());
        }
        Ok(vec![self.effective_app_name()?.to_string()])
    }

    /// The config file list before `--conf_file` is considered.
    fn base_config_files(&self) -> Result<Vec<PathBuf>, SettingsError> {
        if let Some(files) = &self.config_files {
            return Ok(files.clone());
        }
        let search_paths = match &self.search_paths {
            Some(paths) => paths.clone(),
            None => file::default_search_paths(&self.effective_package()?),
        };
        Ok(file::resolve_search_paths(
            &search_paths,
            self.effective_app_name()?,
        ))
    }

    fn conf_file_arg(defaults: &[PathBuf]) -> Arg {
        let listed: Vec<String> = defaults.iter().map(|p| p.display().to_string()).collect();
        Arg::new(CONF_FILE)
            .short('c')
            .long(CONF_FILE)
            .value_name("FILE")
            .value_parser(clap::value_parser!(PathBuf))
            .help(format!(
                "Configuration file in INI format (default: [{}])",
                listed.join(", ")
            ))
    }

    /// First pass: find `--conf_file`.
    ///
    /// The command carries every flag of the full parser so clustered shorts
    /// such as `-dc FILE` split the same way in both passes. Nothing is
    /// required and values are taken as raw strings; only `conf_file` is read.
    fn find_conf_file(
        &self,
        app_name: &str,
        defaults: &[PathBuf],
        args: &[String],
    ) -> Result<Option<PathBuf>, SettingsError> {
        let mut command = C::command()
            .name(app_name.to_string())
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .subcommand_required(false)
            .arg_required_else_help(false)
            .ignore_errors(true)
            .args(self.parent_args.iter().cloned())
            .arg(Arg::new(VERSION).short('v').long(VERSION).action(ArgAction::SetTrue))
            .arg(Arg::new(LONGHELP).long(LONGHELP).action(ArgAction::SetTrue))
            .mut_args(|arg| {
                let arg = arg.required(false);
                if arg.get_action().takes_values() {
                    arg.value_parser(ValueParser::os_string())
                } else {
                    arg
                }
            })
            .arg(Self::conf_file_arg(defaults));
        let (known, _) = split_known_args(&mut command, args);
        let matches = command.try_get_matches_from_mut(known)?;
        Ok(matches.get_one::<PathBuf>(CONF_FILE).cloned())
    }

    /// The second pass must agree with the first on `--conf_file`, otherwise
    /// the file it names was never read.
    fn check_conf_file(
        matches: &ArgMatches,
        first_pass: Option<&PathBuf>,
    ) -> Result<(), SettingsError> {
        if matches.value_source(CONF_FILE) != Some(ValueSource::CommandLine) {
            return Ok(());
        }
        let parsed = matches.get_one::<PathBuf>(CONF_FILE);
        if parsed == first_pass {
            return Ok(());
        }
        Err(SettingsError::InvalidValue {
            key: CONF_FILE.to_string(),
            reason: format!(
                "'{}' was not picked up before parsing",
                parsed.map(|p| p.display().to_string()).unwrap_or_default()
            ),
        })
    }

    /// Second pass: the full parser with config defaults installed.
    fn build_command(
        &self,
        app_name: &str,
        defaults_list: &[PathBuf],
        input: &ResolveInput,
    ) -> Result<(Command, ConfigDefaults), SettingsError> {
        let mut command = C::command()
            .name(app_name.to_string())
            .disable_version_flag(true)
            .arg(Self::conf_file_arg(defaults_list))
            .args(self.parent_args.iter().cloned())
            .arg(
                Arg::new(VERSION)
                    .short('v')
                    .long(VERSION)
                    .action(ArgAction::SetTrue)
                    .help("Show the application's version"),
            )
            .arg(
                Arg::new(LONGHELP)
                    .long(LONGHELP)
                    .action(ArgAction::SetTrue)
                    .help("Verbose help message"),
            );

        if let Some(text) = &self.description {
            command = command.about(text.clone());
        }
        for (id, text) in &self.help {
            if command.get_arguments().any(|a| a.get_id() == id) {
                command = command.mut_arg(id, |a| a.help(text.clone()));
            } else {
                debug!(id = %id, "help text for unknown argument ignored");
            }
        }

        let defaults = resolve::collect_defaults(input)?;
        if self.strict {
            validate::validate_unknown_keys(&command, &defaults)?;
        }
        let command = resolve::apply_defaults(command, &defaults)?;

        let width = self
            .term_width
            .unwrap_or_else(|| terminal::terminal_size().0);
        Ok((command.term_width(width), defaults))
    }

    fn run_validation(&self, resolved: &mut ResolvedSettings<C>) -> Result<(), SettingsError> {
        let Some(check) = &self.validate else {
            return Ok(());
        };
        match check(&resolved.settings, &resolved.leftover) {
            Some(message) => Err(SettingsError::Validation(resolved.error(message))),
            None => Ok(()),
        }
    }

    /// Resolve settings from `args`, the first of which is the program name.
    ///
    /// 1. Find `--conf_file`
    /// 2. Put it in front of the config file list
    /// 3. Read the files and merge the declared sections
    /// 4. Build the parser with the merged values as argument defaults
    /// 5. Size help to the terminal
    /// 6. Parse, setting unknown arguments aside
    /// 7. Record the config file list on the result
    /// 8. Persist the requested values
    ///
    /// Then, in order: early validation (if requested), `--longhelp`,
    /// `--version`, validation.
    pub fn resolve_from<I, T>(self, args: I) -> Result<Outcome<C>, SettingsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let app_name = self.effective_app_name()?.to_string();
        let mut args: Vec<String> = args
            .into_iter()
            .map(|a| a.into().to_string_lossy().into_owned())
            .collect();
        let bin = if args.is_empty() {
            app_name.clone()
        } else {
            args.remove(0)
        };

        let base_files = self.base_config_files()?;
        let mut config_files = base_files.clone();
        let conf_file = self.find_conf_file(&app_name, &base_files, &args)?;
        if let Some(conf_file) = &conf_file {
            if !conf_file.is_file() {
                warn!(path = %conf_file.display(), "--conf_file does not exist");
            }
            config_files.insert(0, conf_file.clone());
        }
        debug!(files = ?config_files, "config file list");

        let input = ResolveInput {
            files: file::read_config_files(&config_files)?,
            sections: self.effective_sections()?,
        };
        let (mut command, defaults) = self.build_command(&app_name, &base_files, &input)?;

        let (known, leftover) = split_known_args(&mut command, &args);
        if !leftover.is_empty() {
            debug!(?leftover, "unrecognised arguments set aside");
        }
        let matches = command.try_get_matches_from_mut(std::iter::once(bin).chain(known))?;
        Self::check_conf_file(&matches, conf_file.as_ref())?;
        let settings = C::from_arg_matches(&matches)?;

        let mut resolved =
            ResolvedSettings::new(settings, config_files, leftover, command, matches, &defaults);

        if !self.persist.is_empty() {
            let pairs = resolved.persisted_pairs(&self.persist)?;
            persist::persist_settings(&resolved.config_files, &app_name, &pairs)?;
        }

        if self.early_validate {
            self.run_validation(&mut resolved)?;
        }
        if resolved.matches().get_flag(LONGHELP) {
            let text = match &self.long_help {
                Some(text) => text.clone(),
                None => resolved.command().clone().render_long_help().to_string(),
            };
            return Ok(Outcome::Exit(ShortCircuit::LongHelp(text)));
        }
        if resolved.matches().get_flag(VERSION) {
            return Ok(Outcome::Exit(ShortCircuit::Version(self.version.resolve())));
        }
        if !self.early_validate {
            self.run_validation(&mut resolved)?;
        }

        Ok(Outcome::Ready(resolved))
    }

    /// [`resolve_from`](Self::resolve_from) over the process arguments.
    pub fn try_load(self) -> Result<Outcome<C>, SettingsError> {
        self.resolve_from(std::env::args_os())
    }

    /// Resolve from the process arguments, exiting like clap's `Parser::parse`.
    ///
    /// `--version` and `--longhelp` print and exit 0. Usage errors and
    /// validation failures exit 2 with clap's formatting; other errors exit 1.
    pub fn load(self) -> ResolvedSettings<C> {
        match self.try_load() {
            Ok(Outcome::Ready(resolved)) => resolved,
            Ok(Outcome::Exit(short_circuit)) => {
                println!("{short_circuit}");
                std::process::exit(0)
            }
            Err(SettingsError::Cli(e)) | Err(SettingsError::Validation(e)) => e.exit(),
            Err(SettingsError::UnknownKeys(errors)) => {
                for e in errors {
                    eprintln!("error: {e}");
                }
                std::process::exit(1)
            }
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{RequiredSettings, TestSettings};
    use crate::types::Origin;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn builder(files: &[&Path]) -> AppSettingsBuilder<TestSettings> {
        AppSettings::builder::<TestSettings>()
            .app_name("TestApp")
            .config_files(files.iter().map(|p| p.to_path_buf()))
            .term_width(100)
    }

    fn ready(outcome: Outcome<TestSettings>) -> ResolvedSettings<TestSettings> {
        match outcome {
            Outcome::Ready(r) => r,
            Outcome::Exit(sc) => panic!("expected settings, got {sc:?}"),
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn app_name_required() {
        let result = AppSettings::builder::<TestSettings>().resolve_from(["testapp"]);
        assert!(matches!(result, Err(SettingsError::AppNameRequired)));
    }

    #[test]
    fn config_value_used_when_not_on_command_line() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[TestApp]\nverbosity=3\n");

        let r = ready(builder(&[&conf]).resolve_from(["testapp"]).unwrap());

        assert_eq!(r.verbosity, 3);
        assert_eq!(
            r.origin("verbosity"),
            Origin::ConfigFile {
                path: conf.clone(),
                line: 2
            }
        );
        assert_eq!(r.config_files, vec![conf]);
    }

    #[test]
    fn command_line_beats_config_file() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[TestApp]\nverbosity=3\n");

        let r = ready(
            builder(&[&conf])
                .resolve_from(["testapp", "--verbosity", "5"])
                .unwrap(),
        );

        assert_eq!(r.verbosity, 5);
        assert_eq!(r.origin("verbosity"), Origin::CommandLine);
    }

    #[test]
    fn hardcoded_default_when_nothing_else() {
        let dir = TempDir::new().unwrap();
        let r = ready(
            builder(&[&dir.path().join("missing.conf")])
                .resolve_from(["testapp"])
                .unwrap(),
        );
        assert_eq!(r.verbosity, 2);
        assert_eq!(r.origin("verbosity"), Origin::Default);
        assert_eq!(r.logfile, None);
    }

    #[test]
    fn every_field_type_takes_config_values() {
        let dir = TempDir::new().unwrap();
        let conf = write(
            &dir,
            "app.conf",
            "[TestApp]\nlogfile = /tmp/app.log\ndebug = yes\ntag = one\n  two\n",
        );

        let r = ready(builder(&[&conf]).resolve_from(["testapp"]).unwrap());

        assert_eq!(r.logfile, Some(PathBuf::from("/tmp/app.log")));
        assert!(r.debug);
        assert_eq!(r.tags, vec!["one", "two"]);
    }

    #[test]
    fn conf_file_goes_first_and_wins() {
        let dir = TempDir::new().unwrap();
        let low = write(&dir, "low.conf", "[TestApp]\nverbosity=1\ndebug=true\n");
        let high = write(&dir, "high.conf", "[TestApp]\nverbosity=4\n");

        let r = ready(
            builder(&[&low])
                .resolve_from(["testapp", "--conf_file", high.to_str().unwrap()])
                .unwrap(),
        );

        assert_eq!(r.verbosity, 4);
        assert!(r.debug);
        assert_eq!(r.config_files, vec![high, low]);
    }

    #[test]
    fn short_conf_file_and_leftovers() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[TestApp]\nverbosity=3\n");

        let r = ready(
            builder(&[])
                .resolve_from([
                    "testapp",
                    "-c",
                    conf.to_str().unwrap(),
                    "--unknown",
                    "input.txt",
                    "-d",
                ])
                .unwrap(),
        );

        assert_eq!(r.verbosity, 3);
        assert!(r.debug);
        assert_eq!(r.leftover, vec!["--unknown", "input.txt"]);
    }

    #[test]
    fn conf_file_inside_short_cluster_is_read() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "c.conf", "[TestApp]\nverbosity=3\n");

        let r = ready(
            builder(&[])
                .resolve_from(["testapp", "-dc", conf.to_str().unwrap()])
                .unwrap(),
        );

        assert!(r.debug);
        assert_eq!(r.verbosity, 3);
        assert_eq!(r.config_files, vec![conf]);
    }

    #[test]
    fn conf_file_after_option_values_is_read() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "c.conf", "[TestApp]\nverbosity=3\n");

        let r = ready(
            builder(&[])
                .resolve_from(["testapp", "--tag", "a", "-c", conf.to_str().unwrap(), "--logfile=x.log"])
                .unwrap(),
        );

        assert_eq!(r.verbosity, 3);
        assert_eq!(r.tags, vec!["a"]);
        assert!(r.leftover.is_empty());
    }

    #[test]
    fn conf_file_disagreeing_between_passes_is_error() {
        let mut cmd = Command::new("app")
            .no_binary_name(true)
            .arg(AppSettingsBuilder::<TestSettings>::conf_file_arg(&[]));
        let matches = cmd.try_get_matches_from_mut(["-c", "b.conf"]).unwrap();

        let first = PathBuf::from("a.conf");
        let err = AppSettingsBuilder::<TestSettings>::check_conf_file(&matches, Some(&first))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { ref key, .. } if key == CONF_FILE));

        let same = PathBuf::from("b.conf");
        assert!(AppSettingsBuilder::<TestSettings>::check_conf_file(&matches, Some(&same)).is_ok());
    }

    #[test]
    fn sections_merge_in_declared_order() {
        let dir = TempDir::new().unwrap();
        let conf = write(
            &dir,
            "app.conf",
            "[Common]\nverbosity=1\ndebug=on\n[TestApp]\nverbosity=3\n[Other]\nverbosity=9\n",
        );

        let r = ready(
            builder(&[&conf])
                .config_sections(["Common", "TestApp"])
                .resolve_from(["testapp"])
                .unwrap(),
        );

        assert_eq!(r.verbosity, 3);
        assert!(r.debug);
    }

    #[test]
    fn first_file_in_list_wins() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "first.conf", "[TestApp]\nverbosity=1\n");
        let second = write(&dir, "second.conf", "[TestApp]\nverbosity=2\ndebug=1\n");

        let r = ready(
            builder(&[&first, &second])
                .resolve_from(["testapp"])
                .unwrap(),
        );

        assert_eq!(r.verbosity, 1);
        assert!(r.debug);
    }

    #[test]
    fn search_paths_resolve_to_files() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[TestApp]\nverbosity=6\n");

        let r = ready(
            AppSettings::builder::<TestSettings>()
                .app_name("TestApp")
                .search_paths(vec![
                    SearchPath::Path(dir.path().join("absent.conf")),
                    SearchPath::Path(conf.clone()),
                ])
                .resolve_from(["testapp"])
                .unwrap(),
        );

        assert_eq!(r.verbosity, 6);
        assert_eq!(r.config_files.len(), 2);
    }

    #[test]
    fn config_satisfies_required_option() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[Named]\nname = from-file\n");

        let outcome = AppSettings::builder::<RequiredSettings>()
            .app_name("Named")
            .config_files([conf])
            .resolve_from(["named"])
            .unwrap();

        let Outcome::Ready(r) = outcome else {
            panic!("expected settings");
        };
        assert_eq!(r.name, "from-file");
    }

    #[test]
    fn malformed_config_is_error() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "verbosity=3\n");
        let result = builder(&[&conf]).resolve_from(["testapp"]);
        assert!(matches!(result, Err(SettingsError::Ini { line: 1, .. })));
    }

    #[test]
    fn strict_mode_reports_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[TestApp]\nverbosity=3\ntypo=1\n");

        let lenient = builder(&[&conf]).resolve_from(["testapp"]);
        assert!(lenient.is_ok());

        let strict = builder(&[&conf]).strict(true).resolve_from(["testapp"]);
        let Err(SettingsError::UnknownKeys(errors)) = strict else {
            panic!("expected UnknownKeys");
        };
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn invalid_value_on_command_line_is_cli_error() {
        let result = builder(&[]).resolve_from(["testapp", "--verbosity", "loud"]);
        assert!(matches!(result, Err(SettingsError::Cli(_))));
    }

    #[test]
    fn help_is_cli_error_with_display_kind() {
        let result = builder(&[]).resolve_from(["testapp", "--help"]);
        let Err(SettingsError::Cli(e)) = result else {
            panic!("expected clap error");
        };
        assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(e.exit_code(), 0);
    }

    #[test]
    fn version_short_circuits() {
        let outcome = builder(&[])
            .version("9.9.9")
            .resolve_from(["testapp", "-v"])
            .unwrap();
        assert!(matches!(outcome, Outcome::Exit(ShortCircuit::Version(ref v)) if v == "9.9.9"));
    }

    #[test]
    fn version_falls_back_to_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest = write(&dir, "Cargo.toml", "[package]\nversion = \"0.3.0\"\n");
        let outcome = builder(&[])
            .version_manifest(manifest)
            .resolve_from(["testapp", "--version"])
            .unwrap();
        assert!(matches!(outcome, Outcome::Exit(ShortCircuit::Version(ref v)) if v == "0.3.0"));
    }

    #[test]
    fn longhelp_checked_before_version() {
        let outcome = builder(&[])
            .long_help("All about testapp.")
            .resolve_from(["testapp", "--version", "--longhelp"])
            .unwrap();
        let Outcome::Exit(ShortCircuit::LongHelp(text)) = outcome else {
            panic!("expected long help");
        };
        assert_eq!(text, "All about testapp.");
    }

    #[test]
    fn default_long_help_is_full_help() {
        let outcome = builder(&[])
            .description("Does test things.")
            .resolve_from(["testapp", "--longhelp"])
            .unwrap();
        let Outcome::Exit(ShortCircuit::LongHelp(text)) = outcome else {
            panic!("expected long help");
        };
        assert!(text.contains("Does test things."));
        assert!(text.contains("--conf_file"));
    }

    #[test]
    fn short_circuit_runs_before_validation() {
        let outcome = builder(&[])
            .validate(|_, _| Some("always fails".into()))
            .version("1.0.0")
            .resolve_from(["testapp", "--version"])
            .unwrap();
        assert!(matches!(outcome, Outcome::Exit(ShortCircuit::Version(_))));
    }

    #[test]
    fn early_validation_runs_before_short_circuit() {
        let result = builder(&[])
            .validate(|_, _| Some("always fails".into()))
            .early_validate(true)
            .resolve_from(["testapp", "--version"]);
        let Err(SettingsError::Validation(e)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(e.exit_code(), 2);
        assert!(e.to_string().contains("always fails"));
    }

    #[test]
    fn validation_sees_settings_and_leftovers() {
        let check = |s: &TestSettings, rest: &[String]| {
            if s.verbosity > 3 {
                Some("verbosity too high".to_string())
            } else if !rest.is_empty() {
                Some(format!("unexpected: {}", rest.join(" ")))
            } else {
                None
            }
        };

        assert!(builder(&[]).validate(check).resolve_from(["testapp"]).is_ok());

        let err = builder(&[])
            .validate(check)
            .resolve_from(["testapp", "--verbosity", "4"])
            .unwrap_err();
        assert!(err.to_string().contains("verbosity too high"));

        let err = builder(&[])
            .validate(check)
            .resolve_from(["testapp", "stray"])
            .unwrap_err();
        assert!(err.to_string().contains("unexpected: stray"));
    }

    #[test]
    fn persist_round_trip() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("home").join("app.conf");

        ready(
            builder(&[&conf])
                .persist(["verbosity", "tags"])
                .resolve_from(["testapp", "--verbosity", "7", "--tag", "a", "--tag", "b"])
                .unwrap(),
        );
        assert_eq!(
            fs::read_to_string(&conf).unwrap(),
            "[TestApp]\nverbosity=7\ntags=a\n\tb\n"
        );

        let r = ready(builder(&[&conf]).resolve_from(["testapp"]).unwrap());
        assert_eq!(r.verbosity, 7);
        assert_eq!(r.tags, vec!["a", "b"]);
    }

    #[test]
    fn persist_keeps_other_sections() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[Other]\nx = 1\n\n[TestApp]\nverbosity=1\n");

        ready(
            builder(&[&conf])
                .persist(["verbosity"])
                .resolve_from(["testapp", "--verbosity", "3"])
                .unwrap(),
        );

        let content = fs::read_to_string(&conf).unwrap();
        assert!(content.starts_with("[Other]\nx = 1\n"));
        assert!(content.ends_with("[TestApp]\nverbosity=3\n"));
    }

    #[test]
    fn persist_unknown_id_is_error() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("app.conf");
        let result = builder(&[&conf])
            .persist(["nope"])
            .resolve_from(["testapp"]);
        assert!(matches!(result, Err(SettingsError::KeyNotFound(_))));
        assert!(!conf.exists());
    }

    #[test]
    fn persist_without_files_is_error() {
        let result = builder(&[]).persist(["verbosity"]).resolve_from(["testapp"]);
        assert!(matches!(result, Err(SettingsError::NoPersistPath)));
    }

    #[test]
    fn help_overrides_and_conf_file_help() {
        let mut r = ready(
            builder(&[Path::new("/etc/testapp.conf")])
                .help("verbosity", "How chatty to be")
                .help("no_such_arg", "ignored")
                .resolve_from(["testapp"])
                .unwrap(),
        );
        let help = r.render_help();
        assert!(help.contains("How chatty to be"));
        assert!(help.contains("Configuration file in INI format (default: [/etc/testapp.conf])"));
        assert!(help.contains("--longhelp"));
        assert!(help.contains("-v, --version"));
    }

    #[test]
    fn help_wraps_at_width_and_keeps_newlines() {
        let mut r = ready(
            builder(&[Path::new("a.conf")])
                .term_width(60)
                .help(
                    "verbosity",
                    "Stays on its own line.\nThe rest is long enough that it has to be \
                     wrapped over more than one line at sixty columns.",
                )
                .resolve_from(["testapp"])
                .unwrap(),
        );
        let help = r.render_help();

        for line in help.lines() {
            assert!(line.chars().count() <= 60, "too wide: {line:?}");
        }
        assert!(
            help.lines()
                .any(|l| l.trim_end().ends_with("Stays on its own line."))
        );
        assert!(
            !help
                .lines()
                .any(|l| l.contains("own line.") && l.contains("The rest"))
        );
        assert!(help.contains("columns."));
    }

    #[test]
    fn parent_args_take_config_defaults() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "app.conf", "[TestApp]\ndry-run = yes\n");

        let r = ready(
            builder(&[&conf])
                .parent_args([Arg::new("dry_run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)])
                .resolve_from(["testapp"])
                .unwrap(),
        );

        assert!(r.matches().get_flag("dry_run"));
    }

    #[test]
    fn name_follows_app_name() {
        let r = ready(builder(&[]).resolve_from(["testapp"]).unwrap());
        assert_eq!(r.command().get_name(), "TestApp");
    }
}
