//! Handles all user-facing output for the CLI.
//!
//! Reports go to stdout, as colored text or JSON. Diagnostics for labels that
//! failed to resolve go to stderr through miette.

use std::io::{self, Write};

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::config::HarnessConfig;
use crate::descriptor::DialectFlags;
use crate::driver::{LabelFailure, LabelListing, RunReport};
use crate::errors::{print_error, HarnessError};
use crate::suite::{CaseResult, SuiteOutcome};

// ============================================================================
// SINKS
// ============================================================================

pub fn color_choice(config: &HarnessConfig) -> ColorChoice {
    if config.color {
        ColorChoice::Always
    } else {
        ColorChoice::Never
    }
}

pub fn stdout(config: &HarnessConfig) -> StandardStream {
    StandardStream::stdout(color_choice(config))
}

// ============================================================================
// TEXT REPORT
// ============================================================================

fn write_colored<W: WriteColor>(out: &mut W, text: &str, color: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", text)?;
    out.reset()
}

/// One line per case, then a summary line.
pub fn write_text_report<W: WriteColor>(out: &mut W, report: &RunReport) -> io::Result<()> {
    for outcome in &report.outcomes {
        for result in &outcome.results {
            match result {
                CaseResult::Pass { path } => {
                    write_colored(out, "PASS", Color::Green)?;
                    writeln!(out, ": {}", path)?;
                }
                CaseResult::Fail { path, error } => {
                    write_colored(out, "FAIL", Color::Red)?;
                    writeln!(out, ": {}", path)?;
                    writeln!(out, "  Error: {}", error)?;
                }
            }
        }
    }

    write!(out, "\nTest summary: total {}, ", report.passed() + report.failed())?;
    write_colored(out, "passed", Color::Green)?;
    write!(out, " {}, ", report.passed())?;
    write_colored(out, "failed", Color::Red)?;
    write!(out, " {}, ", report.failed())?;
    write_colored(out, "skipped labels", Color::Yellow)?;
    writeln!(out, " {}", report.failures.len())
}

// ============================================================================
// JSON REPORT
// ============================================================================

#[derive(Serialize)]
struct JsonFailure<'a> {
    label: &'a str,
    code: &'a str,
    message: String,
}

impl<'a> From<&'a LabelFailure> for JsonFailure<'a> {
    fn from(failure: &'a LabelFailure) -> Self {
        Self {
            label: &failure.label,
            code: &failure.error.diagnostic_info.error_code,
            message: failure.error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    passed: usize,
    failed: usize,
    suites: &'a [SuiteOutcome],
    label_failures: Vec<JsonFailure<'a>>,
}

pub fn write_json_report<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    let json = JsonReport {
        success: report.is_success(),
        passed: report.passed(),
        failed: report.failed(),
        suites: &report.outcomes,
        label_failures: report.failures.iter().map(JsonFailure::from).collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &json)?;
    writeln!(out)
}

// ============================================================================
// LISTING
// ============================================================================

/// `label` header, then `name  kind  (flags)` per configuration.
pub fn write_listing<W: WriteColor>(out: &mut W, listings: &[LabelListing]) -> io::Result<()> {
    for listing in listings {
        out.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(out, "{}", listing.label)?;
        out.reset()?;
        match &listing.configs {
            Ok(configs) => {
                for config in configs {
                    writeln!(
                        out,
                        "  {}  {}  {}",
                        config.name,
                        config.descriptor.kind(),
                        config.descriptor.test_flags()
                    )?;
                }
            }
            Err(error) => {
                write_colored(out, "  unresolved", Color::Red)?;
                writeln!(out, ": {}", error)?;
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonListingEntry<'a> {
    name: &'a str,
    kind: &'a str,
    flags: DialectFlags,
}

#[derive(Serialize)]
struct JsonListing<'a> {
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    configs: Option<Vec<JsonListingEntry<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn write_json_listing<W: Write>(out: &mut W, listings: &[LabelListing]) -> io::Result<()> {
    let entries: Vec<_> = listings
        .iter()
        .map(|listing| match &listing.configs {
            Ok(configs) => JsonListing {
                label: &listing.label,
                configs: Some(
                    configs
                        .iter()
                        .map(|c| JsonListingEntry {
                            name: &c.name,
                            kind: c.descriptor.kind().as_str(),
                            flags: c.descriptor.test_flags(),
                        })
                        .collect(),
                ),
                error: None,
            },
            Err(error) => JsonListing {
                label: &listing.label,
                configs: None,
                error: Some(error.to_string()),
            },
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &entries)?;
    writeln!(out)
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Prints each failed label as a full diagnostic on stderr.
pub fn print_label_failures(failures: Vec<LabelFailure>, config: &HarnessConfig) {
    for failure in failures {
        let mut stderr = StandardStream::stderr(color_choice(config));
        let _ = write_colored(&mut stderr, "skipped label", Color::Yellow);
        let _ = writeln!(stderr, " '{}':", failure.label);
        print_error(failure.error);
    }
}

/// Prints a fatal error and returns the failing exit code.
pub fn fail(error: HarnessError) -> i32 {
    print_error(error);
    1
}
