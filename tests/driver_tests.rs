mod common;

use dbsuite::backend::DriverRegistry;
use dbsuite::config::HarnessConfig;
use dbsuite::driver::{DriverPhase, RunDriver};
use dbsuite::modules::generic::GENERIC_LABEL;
use dbsuite::suite::CaseResult;

#[test]
fn no_labels_runs_only_the_generic_suite() {
    let (profiles, sources) = common::stores();
    let drivers = DriverRegistry::with_builtin();
    let config = HarnessConfig::new(Vec::<String>::new());

    let report = RunDriver::new(&config, &profiles, &sources, &drivers).run();
    let labels: Vec<_> = report.outcomes.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, [GENERIC_LABEL]);
    assert!(report.is_success());
}

#[test]
fn generic_flag_adds_the_generic_suite() {
    let (profiles, sources) = common::stores();
    let drivers = DriverRegistry::with_builtin();
    let mut config = HarnessConfig::new(["lb"]);
    config.generic = true;

    let report = RunDriver::new(&config, &profiles, &sources, &drivers).run();
    let labels: Vec<_> = report.outcomes.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, [GENERIC_LABEL, "lb"]);
}

#[test]
fn unknown_label_is_reported_and_others_still_run() {
    let (profiles, sources) = common::stores();
    let drivers = DriverRegistry::with_builtin();
    let config = HarnessConfig::new(["ghost", "lab", "loop-a", "pair"]);

    let mut driver = RunDriver::new(&config, &profiles, &sources, &drivers);
    let report = driver.run();
    assert_eq!(driver.phase(), DriverPhase::Done);

    let failed: Vec<_> = report.failures.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(failed, ["ghost", "loop-a"]);
    assert_eq!(report.failures[0].error.unknown_name(), Some("ghost"));

    let ran: Vec<_> = report.outcomes.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(ran, ["lab", "pair"]);
    assert_eq!(report.failed(), 0, "{:#?}", report.outcomes);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn every_resolved_config_gets_all_four_modules() {
    let (profiles, sources) = common::stores();
    let drivers = DriverRegistry::with_builtin();
    let config = HarnessConfig::new(["lab"]);

    let plan = RunDriver::new(&config, &profiles, &sources, &drivers).build_suites();
    let lab = &plan.suites[0];
    for per_config in lab.suites() {
        let groups: Vec<_> = per_config.groups().map(|g| g.name()).collect();
        assert_eq!(groups, ["connection", "query", "type-mapping", "concurrency"]);
    }
    assert_eq!(lab.suites().count(), 2);
}

#[test]
fn connect_failures_fail_cases_not_the_run() {
    let (profiles, sources) = common::stores();
    let drivers = DriverRegistry::with_builtin();
    let config = HarnessConfig::new(["down", "lb"]);

    let report = RunDriver::new(&config, &profiles, &sources, &drivers).run();
    assert!(report.failures.is_empty());
    let down = &report.outcomes[0];
    assert_eq!(down.passed, 0);
    assert!(down.results.iter().all(|r| match r {
        CaseResult::Fail { error, .. } => error.contains("server down"),
        CaseResult::Pass { .. } => false,
    }));
    assert!(report.outcomes[1].is_success());
}

#[test]
fn unregistered_backend_fails_at_connect_time() {
    let (profiles, sources) = common::stores();
    let drivers = DriverRegistry::with_builtin();
    let config = HarnessConfig::new(["pg-real"]);

    let report = RunDriver::new(&config, &profiles, &sources, &drivers).run();
    assert!(report.failures.is_empty());
    assert!(report.failed() > 0);
    assert!(report.outcomes[0]
        .results
        .iter()
        .any(|r| matches!(r, CaseResult::Fail { error, .. } if error.contains("no driver registered for backend 'postgresql'"))));
}
