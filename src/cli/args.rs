//! Command-line arguments for the dbsuite binary.
//!
//! Parsed with `clap`'s derive API, then frozen into a [`HarnessConfig`].

use clap::Parser;
use std::path::PathBuf;

use crate::config::{HarnessConfig, ReportFormat, StorePath, DATA_SOURCE_FILE_NAME, PROFILE_FILE_NAME};
use crate::logging::DEFAULT_LEVEL;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "dbsuite",
    version,
    about = "Resolve named database test profiles and run the backend test suite against each data source."
)]
pub struct DbsuiteArgs {
    /// Configuration names to resolve and test.
    pub labels: Vec<String>,

    /// Hand the suites to the interactive renderer and wait for Ctrl-C.
    #[arg(long)]
    pub gui: bool,

    /// Also run the backend-independent generic suite.
    #[arg(short = 'g', long)]
    pub generic: bool,

    /// Profile store to read instead of the default.
    #[arg(short = 'f', long = "config-file", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Data-source registry to read instead of the default.
    #[arg(long = "dsn-file", value_name = "PATH")]
    pub dsn_file: Option<PathBuf>,

    /// Print what each label resolves to without running anything.
    #[arg(long)]
    pub list: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Log filter, e.g. `info` or `dbsuite=debug`.
    #[arg(long, value_name = "LEVEL", default_value = DEFAULT_LEVEL)]
    pub log_level: String,
}

impl DbsuiteArgs {
    pub fn into_config(self) -> HarnessConfig {
        HarnessConfig {
            labels: self.labels,
            gui: self.gui,
            generic: self.generic,
            profile_file: StorePath::choose(self.config_file, PROFILE_FILE_NAME),
            data_source_file: StorePath::choose(self.dsn_file, DATA_SOURCE_FILE_NAME),
            list_only: self.list,
            format: self.format,
            color: !self.no_color && atty::is(atty::Stream::Stdout),
            log_level: self.log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let args = DbsuiteArgs::parse_from([
            "dbsuite", "-g", "-f", "/tmp/p.sexp", "--format", "json", "--no-color", "--log-level", "debug", "pg",
            "lite",
        ]);
        let config = args.into_config();
        assert_eq!(config.labels, ["pg", "lite"]);
        assert!(config.generic && !config.gui && !config.color);
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.profile_file, StorePath::Explicit(PathBuf::from("/tmp/p.sexp")));
        assert!(matches!(config.data_source_file, StorePath::Default(_)));
        assert_eq!(config.log_level, "debug");
    }
}
