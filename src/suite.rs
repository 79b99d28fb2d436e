//! Runnable suites.
//!
//! A [`Suite`] is an ordered tree of [`TestGroup`]s and nested suites. Nothing
//! in a suite runs until [`run_suite`] walks it; building one is pure
//! composition.
//!
//! Each case runs under `catch_unwind`, so a panicking case is recorded as a
//! failure carrying its `suite/group/case` path and the walk continues.

use std::fmt::{self, Debug, Write as _};
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::BackendError;

// ============================================================================
// CASES AND GROUPS
// ============================================================================

/// Why a case failed.
#[derive(Debug, Error)]
pub enum CaseFailure {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error("panicked: {0}")]
    Panic(String),
}

/// Fails with an assertion message unless `expected == actual`.
pub fn check_eq<T: PartialEq + Debug>(what: &str, expected: &T, actual: &T) -> Result<(), CaseFailure> {
    if expected == actual {
        return Ok(());
    }
    Err(CaseFailure::Assertion(format!(
        "{}: expected {:?}, got {:?}",
        what, expected, actual
    )))
}

/// Fails with `message` unless `condition` holds.
pub fn check(condition: bool, message: impl Into<String>) -> Result<(), CaseFailure> {
    if condition {
        Ok(())
    } else {
        Err(CaseFailure::Assertion(message.into()))
    }
}

pub type CaseBody = Box<dyn Fn() -> Result<(), CaseFailure> + Send + Sync>;

/// One named test body.
pub struct TestCase {
    name: String,
    body: CaseBody,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Result<(), CaseFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<(), CaseFailure> {
        (self.body)()
    }
}

impl Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The cases one test module produces for one backend.
#[derive(Debug)]
pub struct TestGroup {
    name: String,
    cases: Vec<TestCase>,
}

impl TestGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Builder-style [`TestGroup::push`].
    pub fn case<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn() -> Result<(), CaseFailure> + Send + Sync + 'static,
    {
        self.push(TestCase::new(name, body));
        self
    }

    pub fn push(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }
}

// ============================================================================
// SUITES
// ============================================================================

#[derive(Debug)]
pub enum SuiteItem {
    Group(TestGroup),
    Suite(Suite),
}

/// An ordered, labeled aggregation of groups and suites.
#[derive(Debug)]
pub struct Suite {
    label: String,
    children: Vec<SuiteItem>,
}

impl Suite {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn push_group(&mut self, group: TestGroup) {
        self.children.push(SuiteItem::Group(group));
    }

    pub fn push_suite(&mut self, suite: Suite) {
        self.children.push(SuiteItem::Suite(suite));
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn children(&self) -> &[SuiteItem] {
        &self.children
    }

    /// Direct child groups, skipping nested suites.
    pub fn groups(&self) -> impl Iterator<Item = &TestGroup> {
        self.children.iter().filter_map(|item| match item {
            SuiteItem::Group(group) => Some(group),
            SuiteItem::Suite(_) => None,
        })
    }

    /// Direct child suites.
    pub fn suites(&self) -> impl Iterator<Item = &Suite> {
        self.children.iter().filter_map(|item| match item {
            SuiteItem::Suite(suite) => Some(suite),
            SuiteItem::Group(_) => None,
        })
    }

    /// Total cases in the whole tree.
    pub fn case_count(&self) -> usize {
        self.children
            .iter()
            .map(|item| match item {
                SuiteItem::Group(group) => group.cases.len(),
                SuiteItem::Suite(suite) => suite.case_count(),
            })
            .sum()
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

/// Result of one case, keyed by its `suite/group/case` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseResult {
    Pass { path: String },
    Fail { path: String, error: String },
}

impl CaseResult {
    pub fn path(&self) -> &str {
        match self {
            CaseResult::Pass { path } | CaseResult::Fail { path, .. } => path,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CaseResult::Pass { .. })
    }
}

/// Everything one suite run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteOutcome {
    pub label: String,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<CaseResult>,
}

impl SuiteOutcome {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs every case in `suite` in order.
pub fn run_suite(suite: &Suite) -> SuiteOutcome {
    let mut results = Vec::with_capacity(suite.case_count());
    walk(suite, suite.label(), &mut results);

    let passed = results.iter().filter(|r| r.is_pass()).count();
    let failed = results.len() - passed;
    info!(suite = suite.label(), passed, failed, "suite finished");

    SuiteOutcome {
        label: suite.label().to_string(),
        passed,
        failed,
        results,
    }
}

fn walk(suite: &Suite, prefix: &str, results: &mut Vec<CaseResult>) {
    for item in &suite.children {
        match item {
            SuiteItem::Group(group) => {
                for case in &group.cases {
                    let path = format!("{}/{}/{}", prefix, group.name, case.name);
                    results.push(run_case(case, path));
                }
            }
            SuiteItem::Suite(nested) => {
                let nested_prefix = format!("{}/{}", prefix, nested.label);
                walk(nested, &nested_prefix, results);
            }
        }
    }
}

fn run_case(case: &TestCase, path: String) -> CaseResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| case.run()))
        .unwrap_or_else(|payload| Err(CaseFailure::Panic(panic_message(payload))));
    match outcome {
        Ok(()) => {
            debug!(case = %path, "pass");
            CaseResult::Pass { path }
        }
        Err(failure) => {
            debug!(case = %path, error = %failure, "fail");
            CaseResult::Fail {
                path,
                error: failure.to_string(),
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    let mut message = String::new();
    if let Some(text) = payload.downcast_ref::<&str>() {
        let _ = write!(&mut message, "{text}");
    } else if let Some(text) = payload.downcast_ref::<String>() {
        let _ = write!(&mut message, "{text}");
    } else {
        let _ = write!(&mut message, "<non-string panic payload>");
    }
    message
}
