//! The dbsuite command-line interface.
//!
//! Parses arguments, installs logging, loads the stores and hands control to
//! the [`RunDriver`] in one of three modes: list, render, or sequential run.

use std::process;

use clap::Parser;

use crate::backend::DriverRegistry;
use crate::cli::args::DbsuiteArgs;
use crate::config::{HarnessConfig, ReportFormat};
use crate::driver::RunDriver;
use crate::errors::{renderer_error, HarnessError};
use crate::logging::init_logging;
use crate::render::{CtrlC, OutlineRenderer};

pub mod args;
pub mod output;

/// Line printed on stderr when renderer mode is interrupted.
pub const INTERRUPT_ADVISORY: &str = "dbsuite: interrupted, exiting";

/// The main entry point for the CLI.
pub fn run() {
    let config = DbsuiteArgs::parse().into_config();
    init_logging(&config.log_level);

    let code = execute(&config).unwrap_or_else(output::fail);
    process::exit(code);
}

/// Runs one invocation and returns its exit code.
pub fn execute(config: &HarnessConfig) -> Result<i32, HarnessError> {
    let (profiles, sources) = config.load_stores()?;
    let drivers = DriverRegistry::with_builtin();
    let mut driver = RunDriver::new(config, &profiles, &sources, &drivers);

    if config.list_only {
        return handle_list(&mut driver, config);
    }
    if config.gui {
        return handle_render(&mut driver, config);
    }

    let report = driver.run();
    let code = report.exit_code();
    let mut out = output::stdout(config);
    match config.format {
        ReportFormat::Text => output::write_text_report(&mut out, &report),
        ReportFormat::Json => output::write_json_report(&mut out, &report),
    }
    .map_err(|e| renderer_error(format!("cannot write report: {}", e)))?;
    output::print_label_failures(report.failures, config);
    Ok(code)
}

fn handle_list(driver: &mut RunDriver<'_>, config: &HarnessConfig) -> Result<i32, HarnessError> {
    let listings = driver.resolve_labels();
    let code = if listings.iter().all(|l| l.configs.is_ok()) { 0 } else { 1 };
    let mut out = output::stdout(config);
    match config.format {
        ReportFormat::Text => output::write_listing(&mut out, &listings),
        ReportFormat::Json => output::write_json_listing(&mut out, &listings),
    }
    .map_err(|e| renderer_error(format!("cannot write listing: {}", e)))?;
    Ok(code)
}

fn handle_render(driver: &mut RunDriver<'_>, config: &HarnessConfig) -> Result<i32, HarnessError> {
    let mut renderer = OutlineRenderer::new(output::stdout(config));
    driver.render(&mut renderer, &mut CtrlC::new(), |failures| {
        output::print_label_failures(failures, config)
    })?;
    eprintln!("{}", INTERRUPT_ADVISORY);
    Ok(0)
}
