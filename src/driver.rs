//! Run Driver
//!
//! Orchestrates one invocation:
//!
//! ```text
//! Idle → ResolvingLabels → BuildingSuites → Running   → Done
//!                                         ↘ Rendering ↗
//! ```
//!
//! Every label is resolved and specialized on its own. A label that fails is
//! recorded in the report and skipped; the remaining labels still run. The
//! policy is the same whether suites are run or rendered.

use std::fmt;

use tracing::{debug, info, warn};

use crate::backend::{adapt, DriverRegistry};
use crate::config::HarnessConfig;
use crate::errors::HarnessError;
use crate::modules::{generic_suite, specialize};
use crate::render::{InterruptSignal, SuiteRenderer};
use crate::resolver::{NamedConfig, Resolver};
use crate::store::{DescriptorRegistry, ExpressionTable};
use crate::suite::{run_suite, Suite, SuiteOutcome};

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    Idle,
    ResolvingLabels,
    BuildingSuites,
    Running,
    Rendering,
    Done,
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverPhase::Idle => "idle",
            DriverPhase::ResolvingLabels => "resolving-labels",
            DriverPhase::BuildingSuites => "building-suites",
            DriverPhase::Running => "running",
            DriverPhase::Rendering => "rendering",
            DriverPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// A label that could not be resolved.
#[derive(Debug)]
pub struct LabelFailure {
    pub label: String,
    pub error: HarnessError,
}

/// One label's resolution, for `--list`.
#[derive(Debug)]
pub struct LabelListing {
    pub label: String,
    pub configs: Result<Vec<NamedConfig>, HarnessError>,
}

/// Sequential-mode result.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<SuiteOutcome>,
    pub failures: Vec<LabelFailure>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().map(|o| o.passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.failed() == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Suites built for one invocation, plus the labels that never got one.
#[derive(Debug, Default)]
pub struct SuitePlan {
    pub suites: Vec<Suite>,
    pub failures: Vec<LabelFailure>,
}

// ============================================================================
// DRIVER
// ============================================================================

pub struct RunDriver<'a> {
    config: &'a HarnessConfig,
    profiles: &'a dyn ExpressionTable,
    registry: &'a dyn DescriptorRegistry,
    drivers: &'a DriverRegistry,
    phase: DriverPhase,
}

impl<'a> RunDriver<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        profiles: &'a dyn ExpressionTable,
        registry: &'a dyn DescriptorRegistry,
        drivers: &'a DriverRegistry,
    ) -> Self {
        Self {
            config,
            profiles,
            registry,
            drivers,
            phase: DriverPhase::Idle,
        }
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    fn enter(&mut self, next: DriverPhase) {
        debug!(from = %self.phase, to = %next, "driver phase");
        self.phase = next;
    }

    /// Resolves every requested label, in order.
    pub fn resolve_labels(&mut self) -> Vec<LabelListing> {
        self.enter(DriverPhase::ResolvingLabels);
        let resolver = Resolver::new(self.profiles, self.registry);
        self.config
            .labels
            .iter()
            .map(|label| {
                let configs = resolver.resolve_label(label);
                match &configs {
                    Ok(found) => info!(label = %label, configs = found.len(), "label resolved"),
                    Err(error) => warn!(label = %label, %error, "label failed to resolve"),
                }
                LabelListing {
                    label: label.clone(),
                    configs,
                }
            })
            .collect()
    }

    /// Resolves labels and specializes one suite per label. Nothing runs.
    pub fn build_suites(&mut self) -> SuitePlan {
        let listings = self.resolve_labels();
        self.enter(DriverPhase::BuildingSuites);

        let mut plan = SuitePlan::default();
        if self.config.runs_generic() {
            plan.suites.push(generic_suite());
        }
        for listing in listings {
            match listing.configs {
                Ok(configs) => plan.suites.push(self.label_suite(&listing.label, &configs)),
                Err(error) => plan.failures.push(LabelFailure {
                    label: listing.label,
                    error,
                }),
            }
        }
        debug!(suites = plan.suites.len(), failures = plan.failures.len(), "suites built");
        plan
    }

    /// One nested suite per resolved configuration, under the label.
    fn label_suite(&self, label: &str, configs: &[NamedConfig]) -> Suite {
        let mut suite = Suite::new(label);
        for config in configs {
            let connector = adapt(&config.descriptor, self.drivers);
            suite.push_suite(specialize(connector, &config.name));
        }
        suite
    }

    /// Sequential mode: builds, then runs each suite in order.
    pub fn run(&mut self) -> RunReport {
        let plan = self.build_suites();
        self.enter(DriverPhase::Running);
        let outcomes = plan.suites.iter().map(run_suite).collect();
        self.enter(DriverPhase::Done);
        RunReport {
            outcomes,
            failures: plan.failures,
        }
    }

    /// Renderer mode: arms the interrupt, builds everything, reports the
    /// labels that could not be built, hands the suites over, then blocks
    /// until interrupted. Returns how many labels were skipped.
    pub fn render(
        &mut self,
        renderer: &mut dyn SuiteRenderer,
        interrupt: &mut dyn InterruptSignal,
        report_failures: impl FnOnce(Vec<LabelFailure>),
    ) -> Result<usize, HarnessError> {
        interrupt.arm()?;
        let plan = self.build_suites();
        let skipped = plan.failures.len();
        report_failures(plan.failures);
        self.enter(DriverPhase::Rendering);
        renderer.render(&plan.suites)?;
        interrupt.wait()?;
        self.enter(DriverPhase::Done);
        Ok(skipped)
    }
}
