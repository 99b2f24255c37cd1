//! Test cases, groups and the runners that drive them.
//!
//! Per case: fixture setup, then render, then selection and assertion. Never
//! reordered, never retried. Per group: one fixture shared by all cases,
//! torn down after the last case. Groups run concurrently, each with its own
//! fixture.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::assertion::evaluate_checks;
use crate::config::{FixtureConfig, RunOptions, Suite};
use crate::errors::PagecheckError;
use crate::fixture::{setup_fixture, FixtureContext};
use crate::report::{CaseResult, GroupReport, SuiteReport};

/// Lifecycle of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    NotRun,
    Running,
    Passed,
    Failed,
}

impl CaseStatus {
    /// Valid transitions: `NotRun -> Running -> {Passed, Failed}` and `NotRun -> Failed`.
    pub fn advance(self, next: CaseStatus) -> Option<CaseStatus> {
        use CaseStatus::*;
        match (self, next) {
            (NotRun, Running) | (NotRun, Failed) | (Running, Passed) | (Running, Failed) => {
                Some(next)
            }
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

/// One containment check: the text of the first `selector` match must contain `contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub selector: String,
    pub contains: String,
}

impl Check {
    pub fn new(selector: impl Into<String>, contains: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            contains: contains.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default = "default_route")]
    pub route: String,
    pub checks: Vec<Check>,
}

fn default_route() -> String {
    "/".to_string()
}

impl TestCase {
    pub fn new(name: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route: route.into(),
            checks: Vec::new(),
        }
    }

    pub fn expect_contains(mut self, selector: impl Into<String>, contains: impl Into<String>) -> Self {
        self.checks.push(Check::new(selector, contains));
        self
    }
}

/// Cases sharing one fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestGroup {
    pub name: String,
    /// Bundler modes this group is excluded from.
    #[serde(default)]
    pub skip_modes: Vec<String>,
    pub fixture: FixtureConfig,
    pub cases: Vec<TestCase>,
}

impl TestGroup {
    pub fn new(name: impl Into<String>, fixture: FixtureConfig) -> Self {
        Self {
            name: name.into(),
            skip_modes: Vec::new(),
            fixture,
            cases: Vec::new(),
        }
    }

    pub fn with_case(mut self, case: TestCase) -> Self {
        self.cases.push(case);
        self
    }

    pub fn skip_in(mut self, mode: impl Into<String>) -> Self {
        self.skip_modes.push(mode.into());
        self
    }

    pub fn is_skipped_in(&self, mode: Option<&str>) -> bool {
        mode.is_some_and(|m| self.skip_modes.iter().any(|s| s.eq_ignore_ascii_case(m)))
    }
}

/// Run one case against an already running fixture.
pub async fn run_case(fixture: &FixtureContext, case: &TestCase) -> CaseResult {
    let start = Instant::now();

    let page = match fixture.render(&case.route).await {
        Ok(page) => page,
        Err(e) => {
            warn!(case = %case.name, route = %case.route, error = %e, "render failed");
            return CaseResult::failed(
                case,
                CaseStatus::NotRun,
                &PagecheckError::from(e),
                elapsed_ms(start),
            );
        }
    };

    // fixture and render both succeeded: the case is Running from here on
    match evaluate_checks(&page, &case.checks) {
        Ok(actual) => {
            info!(case = %case.name, route = %case.route, "passed");
            CaseResult::passed(case, actual.last().cloned(), elapsed_ms(start))
        }
        Err(e) => {
            warn!(case = %case.name, route = %case.route, error = %e, "assertion failed");
            CaseResult::failed(
                case,
                CaseStatus::Running,
                &PagecheckError::from(e),
                elapsed_ms(start),
            )
        }
    }
}

/// Set up the group's fixture, run its cases in order, tear the fixture down.
pub async fn run_group(group: &TestGroup, options: &RunOptions) -> GroupReport {
    let start = Instant::now();

    if group.is_skipped_in(options.mode.as_deref()) {
        info!(group = %group.name, mode = ?options.mode, "group skipped in this mode");
        return GroupReport::skipped(group);
    }

    let fixture_cfg = options.effective_fixture(&group.fixture);
    let fixture = match setup_fixture(&fixture_cfg, options).await {
        Ok(fixture) => fixture,
        Err(e) => {
            error!(group = %group.name, error = %e, "fixture setup failed");
            return GroupReport::fixture_failed(group, &e, elapsed_ms(start));
        }
    };

    let mut results = Vec::with_capacity(group.cases.len());
    for case in &group.cases {
        results.push(run_case(&fixture, case).await);
    }
    fixture.teardown().await;

    GroupReport::completed(group, results, elapsed_ms(start))
}

/// Run every group of `suite`, at most `options.max_concurrency` at once.
///
/// Groups appear in the report in declaration order.
pub async fn run_suite(suite: &Suite, options: &RunOptions) -> SuiteReport {
    let options = Arc::new(options.clone());
    let permits = options.max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
    let limit = Arc::new(Semaphore::new(permits));
    let mut tasks = JoinSet::new();

    info!(
        suite = %suite.suite,
        groups = suite.groups.len(),
        cases = suite.case_count(),
        mode = ?options.mode,
        "running suite"
    );

    for (index, group) in suite.groups.iter().cloned().enumerate() {
        let options = options.clone();
        let limit = limit.clone();
        tasks.spawn(async move {
            let _permit = limit.acquire_owned().await;
            (index, run_group(&group, &options).await)
        });
    }

    let mut reports: Vec<Option<GroupReport>> = vec![None; suite.groups.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, report)) => reports[index] = Some(report),
            Err(e) => error!(error = %e, "group task failed"),
        }
    }

    let mut report = SuiteReport::new(&suite.suite, options.mode.clone());
    for (group, slot) in suite.groups.iter().zip(reports) {
        report.add_group(slot.unwrap_or_else(|| GroupReport::aborted(group, "group task aborted")));
    }
    report
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
