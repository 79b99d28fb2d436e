//! Interactive rendering.
//!
//! In renderer mode the driver hands every built suite to a [`SuiteRenderer`]
//! and then parks on an [`InterruptSignal`]. Both are injected, so the binary
//! can swap in a richer front end and tests can interrupt immediately.

use std::io::{self, Write};

use termcolor::{Color, ColorSpec, WriteColor};
use tracing::debug;

use crate::errors::{renderer_error, HarnessError};
use crate::suite::{run_suite, CaseResult, Suite, SuiteItem};

/// Consumes assembled suites.
pub trait SuiteRenderer {
    fn render(&mut self, suites: &[Suite]) -> Result<(), HarnessError>;
}

/// Blocks the calling thread until the process is asked to stop.
///
/// `arm` runs before any suite is rendered; an interrupt that arrives after
/// it must make the later `wait` return instead of killing the process.
pub trait InterruptSignal {
    fn arm(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    fn wait(&mut self) -> Result<(), HarnessError>;
}

// ============================================================================
// OUTLINE RENDERER
// ============================================================================

/// Runs each suite and prints its tree with a mark per case.
pub struct OutlineRenderer<W> {
    out: W,
}

impl<W: WriteColor> OutlineRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_suite(&mut self, suite: &Suite, results: &[CaseResult], depth: usize) -> io::Result<usize> {
        let mut consumed = 0;
        self.out.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(self.out, "{:indent$}{}", "", suite.label(), indent = depth * 2)?;
        self.out.reset()?;

        for item in suite.children() {
            match item {
                SuiteItem::Group(group) => {
                    writeln!(self.out, "{:indent$}{}", "", group.name(), indent = (depth + 1) * 2)?;
                    for case in group.cases() {
                        let result = results.get(consumed);
                        consumed += 1;
                        self.write_case(case.name(), result, depth + 2)?;
                    }
                }
                SuiteItem::Suite(nested) => {
                    consumed += self.write_suite(nested, &results[consumed.min(results.len())..], depth + 1)?;
                }
            }
        }
        Ok(consumed)
    }

    fn write_case(&mut self, name: &str, result: Option<&CaseResult>, depth: usize) -> io::Result<()> {
        write!(self.out, "{:indent$}", "", indent = depth * 2)?;
        match result {
            Some(CaseResult::Pass { .. }) => {
                self.out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                write!(self.out, "[pass]")?;
                self.out.reset()?;
                writeln!(self.out, " {}", name)
            }
            Some(CaseResult::Fail { error, .. }) => {
                self.out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                write!(self.out, "[FAIL]")?;
                self.out.reset()?;
                writeln!(self.out, " {}: {}", name, error)
            }
            None => writeln!(self.out, "[ -- ] {}", name),
        }
    }
}

impl<W: WriteColor> SuiteRenderer for OutlineRenderer<W> {
    fn render(&mut self, suites: &[Suite]) -> Result<(), HarnessError> {
        for suite in suites {
            let outcome = run_suite(suite);
            self.write_suite(suite, &outcome.results, 0)
                .and_then(|_| self.out.flush())
                .map_err(|e| renderer_error(e.to_string()))?;
        }
        debug!(suites = suites.len(), "outline rendered");
        Ok(())
    }
}

// ============================================================================
// INTERRUPTS
// ============================================================================

#[cfg(unix)]
type Listener = tokio::signal::unix::Signal;
#[cfg(windows)]
type Listener = tokio::signal::windows::CtrlC;

#[cfg(unix)]
fn listen() -> io::Result<Listener> {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
}

#[cfg(windows)]
fn listen() -> io::Result<Listener> {
    tokio::signal::windows::ctrl_c()
}

/// Waits for Ctrl-C on a single-threaded tokio runtime.
///
/// The handler is installed by `arm`, so an interrupt delivered while suites
/// are still rendering is queued and ends the following `wait`.
#[derive(Default)]
pub struct CtrlC {
    armed: Option<(tokio::runtime::Runtime, Listener)>,
}

impl CtrlC {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InterruptSignal for CtrlC {
    fn arm(&mut self) -> Result<(), HarnessError> {
        if self.armed.is_some() {
            return Ok(());
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| renderer_error(format!("cannot start signal runtime: {}", e)))?;
        let listener = {
            let _guard = runtime.enter();
            listen().map_err(|e| renderer_error(format!("cannot listen for interrupt: {}", e)))?
        };
        debug!("interrupt handler installed");
        self.armed = Some((runtime, listener));
        Ok(())
    }

    fn wait(&mut self) -> Result<(), HarnessError> {
        self.arm()?;
        let Some((runtime, listener)) = self.armed.as_mut() else {
            return Err(renderer_error("interrupt handler is not installed"));
        };
        runtime.block_on(listener.recv());
        Ok(())
    }
}

/// Returns at once. Used when the renderer should not block.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl InterruptSignal for Immediate {
    fn wait(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::{check, TestGroup};
    use termcolor::NoColor;

    #[cfg(unix)]
    #[test]
    fn armed_ctrl_c_keeps_an_early_interrupt() {
        let mut signal = CtrlC::new();
        signal.arm().unwrap();
        let status = std::process::Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
        signal.wait().unwrap();
    }

    #[test]
    fn outline_marks_each_case() {
        let mut inner = Suite::new("inner");
        inner.push_group(TestGroup::new("g2").case("bad", || check(false, "nope")));
        let mut suite = Suite::new("top");
        suite.push_group(TestGroup::new("g1").case("good", || Ok(())));
        suite.push_suite(inner);

        let mut renderer = OutlineRenderer::new(NoColor::new(Vec::new()));
        renderer.render(&[suite]).unwrap();
        let text = String::from_utf8(renderer.into_inner().into_inner()).unwrap();

        assert_eq!(
            text,
            "top\n  g1\n    [pass] good\n  inner\n    g2\n      [FAIL] bad: assertion failed: nope\n"
        );
    }
}
