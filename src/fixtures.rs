#[cfg(test)]
pub mod test {
    use std::path::PathBuf;

    use clap::Parser;
    use serde::Serialize;

    /// Test application.
    #[derive(Parser, Serialize, Debug, PartialEq)]
    #[command(name = "testapp")]
    pub struct TestSettings {
        /// Logging verbosity.
        #[arg(long, value_name = "INT", default_value_t = 2)]
        pub verbosity: u8,

        /// Write log output to FILE.
        #[arg(long, value_name = "FILE")]
        pub logfile: Option<PathBuf>,

        /// Enable debug output.
        #[arg(short, long)]
        pub debug: bool,

        /// Tags to apply.
        #[arg(long = "tag", value_name = "TAG")]
        pub tags: Vec<String>,
    }

    #[test]
    fn test_settings_parse_defaults() {
        let settings = TestSettings::try_parse_from(["testapp"]).unwrap();
        assert_eq!(settings.verbosity, 2);
        assert_eq!(settings.logfile, None);
        assert!(!settings.debug);
        assert!(settings.tags.is_empty());
    }

    /// Requires a name, so resolution has to supply one.
    #[derive(Parser, Debug)]
    #[command(name = "named")]
    pub struct RequiredSettings {
        #[arg(long)]
        pub name: String,
    }
}
