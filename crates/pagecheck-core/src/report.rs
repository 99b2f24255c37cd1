//! Suite, group and case results, with JSON and console rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::case::{CaseStatus, TestCase, TestGroup};
use crate::errors::{AssertionError, FixtureError, PagecheckError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SuiteReport {
    pub suite: String,
    pub mode: Option<String>,
    pub summary: SuiteSummary,
    pub groups: Vec<GroupReport>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub not_run: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupReport {
    pub name: String,
    pub status: GroupStatus,
    /// Fixture error that aborted the group, if any.
    pub error: Option<String>,
    pub duration_ms: u64,
    pub cases: Vec<CaseResult>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Completed,
    Skipped,
    FixtureFailed,
    Aborted,
}

/// Where a failed case stopped.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fixture,
    Render,
    Assertion,
    Internal,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub name: String,
    pub route: String,
    pub status: CaseStatus,
    pub stage: Option<FailureStage>,
    pub message: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub duration_ms: u64,
}

impl CaseResult {
    fn base(case: &TestCase, status: CaseStatus, duration_ms: u64) -> Self {
        Self {
            name: case.name.clone(),
            route: case.route.clone(),
            status,
            stage: None,
            message: None,
            expected: None,
            actual: None,
            duration_ms,
        }
    }

    pub fn not_run(case: &TestCase) -> Self {
        Self::base(case, CaseStatus::NotRun, 0)
    }

    pub fn passed(case: &TestCase, actual: Option<String>, duration_ms: u64) -> Self {
        Self {
            actual,
            ..Self::base(case, CaseStatus::Passed, duration_ms)
        }
    }

    /// Failed case. `from` is the state the case was in when the error hit.
    pub fn failed(case: &TestCase, from: CaseStatus, err: &PagecheckError, duration_ms: u64) -> Self {
        debug_assert!(from.advance(CaseStatus::Failed).is_some());
        let mut result = Self {
            message: Some(err.to_string()),
            ..Self::base(case, CaseStatus::Failed, duration_ms)
        };
        match err {
            PagecheckError::Fixture(_) | PagecheckError::Config(_) => {
                result.stage = Some(FailureStage::Fixture);
            }
            PagecheckError::Render(_) => result.stage = Some(FailureStage::Render),
            PagecheckError::Assertion(assertion) => {
                result.stage = Some(FailureStage::Assertion);
                match assertion {
                    AssertionError::TextMismatch {
                        expected, actual, ..
                    } => {
                        result.expected = Some(expected.clone());
                        result.actual = Some(actual.clone());
                    }
                    AssertionError::SelectorNotFound { selector, .. } => {
                        result.expected = case
                            .checks
                            .iter()
                            .find(|c| &c.selector == selector)
                            .map(|c| c.contains.clone());
                    }
                    AssertionError::InvalidSelector { .. } => {}
                }
            }
        }
        result
    }

    fn failed_with(case: &TestCase, stage: FailureStage, message: String) -> Self {
        Self {
            stage: Some(stage),
            message: Some(message),
            ..Self::base(case, CaseStatus::Failed, 0)
        }
    }
}

impl GroupReport {
    pub fn completed(group: &TestGroup, cases: Vec<CaseResult>, duration_ms: u64) -> Self {
        Self {
            name: group.name.clone(),
            status: GroupStatus::Completed,
            error: None,
            duration_ms,
            cases,
        }
    }

    /// Excluded in the active mode: every case stays `NotRun`.
    pub fn skipped(group: &TestGroup) -> Self {
        Self {
            name: group.name.clone(),
            status: GroupStatus::Skipped,
            error: None,
            duration_ms: 0,
            cases: group.cases.iter().map(CaseResult::not_run).collect(),
        }
    }

    /// Fixture setup failed: every case fails with the fixture error, none runs.
    pub fn fixture_failed(group: &TestGroup, err: &FixtureError, duration_ms: u64) -> Self {
        let message = err.to_string();
        Self {
            name: group.name.clone(),
            status: GroupStatus::FixtureFailed,
            error: Some(message.clone()),
            duration_ms,
            cases: group
                .cases
                .iter()
                .map(|c| CaseResult::failed_with(c, FailureStage::Fixture, message.clone()))
                .collect(),
        }
    }

    pub fn aborted(group: &TestGroup, reason: &str) -> Self {
        Self {
            name: group.name.clone(),
            status: GroupStatus::Aborted,
            error: Some(reason.to_string()),
            duration_ms: 0,
            cases: group
                .cases
                .iter()
                .map(|c| CaseResult::failed_with(c, FailureStage::Internal, reason.to_string()))
                .collect(),
        }
    }

    pub fn count(&self, status: CaseStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }
}

impl SuiteReport {
    pub fn new(suite: &str, mode: Option<String>) -> Self {
        Self {
            suite: suite.to_string(),
            mode,
            summary: SuiteSummary::default(),
            groups: Vec::new(),
        }
    }

    pub fn add_group(&mut self, group: GroupReport) {
        for case in &group.cases {
            self.summary.total += 1;
            match case.status {
                CaseStatus::Passed => self.summary.passed += 1,
                CaseStatus::Failed => self.summary.failed += 1,
                CaseStatus::NotRun | CaseStatus::Running => self.summary.not_run += 1,
            }
        }
        self.groups.push(group);
    }

    pub fn is_success(&self) -> bool {
        self.summary.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&GroupReport, &CaseResult)> {
        self.groups.iter().flat_map(|g| {
            g.cases
                .iter()
                .filter(|c| c.status == CaseStatus::Failed)
                .map(move |c| (g, c))
        })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report: one line per case, diagnostics under failures.
    pub fn render_console(&self) -> String {
        let mut out = String::new();
        match &self.mode {
            Some(mode) => {
                let _ = writeln!(out, "Suite: {} (mode: {})", self.suite, mode);
            }
            None => {
                let _ = writeln!(out, "Suite: {}", self.suite);
            }
        }

        for group in &self.groups {
            let _ = writeln!(
                out,
                "\n{} [{}] ({}ms)",
                group.name,
                group_label(group.status),
                group.duration_ms
            );
            if let Some(err) = &group.error {
                let _ = writeln!(out, "  fixture: {}", err);
            }
            for case in &group.cases {
                let tag = match case.status {
                    CaseStatus::Passed => "PASS",
                    CaseStatus::Failed => "FAIL",
                    CaseStatus::NotRun | CaseStatus::Running => "SKIP",
                };
                let _ = writeln!(out, "  {} {} {} ({}ms)", tag, case.route, case.name, case.duration_ms);
                if case.status != CaseStatus::Failed || group.error.is_some() {
                    continue;
                }
                let assertion = case.stage == Some(FailureStage::Assertion);
                if let Some(message) = &case.message {
                    // assertion diagnostics are printed from expected/actual below
                    let take = if assertion { 1 } else { usize::MAX };
                    for line in message.lines().take(take) {
                        let _ = writeln!(out, "       {}", line);
                    }
                }
                if assertion {
                    if let Some(expected) = &case.expected {
                        let _ = writeln!(out, "       expected to contain: {:?}", expected);
                    }
                    match (&case.actual, case.expected.is_some()) {
                        (Some(actual), _) => {
                            let _ = writeln!(out, "       actual: {:?}", actual);
                        }
                        // selector matched nothing; invalid selectors carry no expectation
                        (None, true) => {
                            let _ = writeln!(out, "       actual: <no matching element>");
                        }
                        (None, false) => {}
                    }
                }
            }
        }

        let _ = writeln!(
            out,
            "\nSummary: {} total, {} passed, {} failed, {} not run",
            self.summary.total, self.summary.passed, self.summary.failed, self.summary.not_run
        );
        out
    }
}

fn group_label(status: GroupStatus) -> &'static str {
    match status {
        GroupStatus::Completed => "completed",
        GroupStatus::Skipped => "skipped",
        GroupStatus::FixtureFailed => "fixture failed",
        GroupStatus::Aborted => "aborted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixtureConfig;
    use crate::errors::RenderError;

    fn group() -> TestGroup {
        TestGroup::new("optimizePackageImports - mui", FixtureConfig::static_dir("app"))
            .with_case(TestCase::new("should support MUI", "/").expect_contains("#client-mod", "client:default"))
            .with_case(TestCase::new("about page", "/about").expect_contains("h1", "About"))
    }

    #[test]
    fn summary_counts_every_case() {
        let g = group();
        let mut report = SuiteReport::new("s", Some("webpack".into()));
        let err: PagecheckError = RenderError::Status {
            route: "/about".into(),
            status: 500,
        }
        .into();
        report.add_group(GroupReport::completed(
            &g,
            vec![
                CaseResult::passed(&g.cases[0], Some("client:default".into()), 3),
                CaseResult::failed(&g.cases[1], CaseStatus::NotRun, &err, 2),
            ],
            10,
        ));
        report.add_group(GroupReport::skipped(&g));

        assert_eq!(
            report.summary,
            SuiteSummary {
                total: 4,
                passed: 1,
                failed: 1,
                not_run: 2
            }
        );
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.groups[1].count(CaseStatus::NotRun), 2);
    }

    #[test]
    fn fixture_failure_fails_every_case() {
        let g = group();
        let err = FixtureError::MissingDir { path: "app".into() };
        let report = GroupReport::fixture_failed(&g, &err, 1);
        assert_eq!(report.status, GroupStatus::FixtureFailed);
        assert_eq!(report.count(CaseStatus::Failed), 2);
        assert!(report
            .cases
            .iter()
            .all(|c| c.stage == Some(FailureStage::Fixture) && c.message == report.error));
    }

    #[test]
    fn console_shows_expected_and_actual() {
        let g = group();
        let err: PagecheckError = AssertionError::TextMismatch {
            selector: "#client-mod".into(),
            expected: "client:default".into(),
            actual: "server:default".into(),
        }
        .into();
        let mut report = SuiteReport::new("s", None);
        report.add_group(GroupReport::completed(
            &g,
            vec![CaseResult::failed(&g.cases[0], CaseStatus::Running, &err, 1)],
            1,
        ));
        let text = report.render_console();
        assert!(text.contains("FAIL / should support MUI"), "{text}");
        assert!(text.contains("expected to contain: \"client:default\""), "{text}");
        assert!(text.contains("actual: \"server:default\""), "{text}");
        assert!(text.contains("Summary: 1 total, 0 passed, 1 failed, 0 not run"), "{text}");
    }

    #[test]
    fn invalid_selector_omits_no_match_line() {
        let g = group();
        let err: PagecheckError = AssertionError::InvalidSelector {
            selector: "#".into(),
            message: "unexpected end of input".into(),
        }
        .into();
        let mut report = SuiteReport::new("s", None);
        report.add_group(GroupReport::completed(
            &g,
            vec![CaseResult::failed(&g.cases[0], CaseStatus::Running, &err, 1)],
            1,
        ));
        let text = report.render_console();
        assert!(text.contains("invalid selector `#`"), "{text}");
        assert!(!text.contains("<no matching element>"), "{text}");
    }

    #[test]
    fn selector_not_found_prints_no_match() {
        let g = group();
        let err: PagecheckError = AssertionError::SelectorNotFound {
            selector: "#client-mod".into(),
            route: "/".into(),
        }
        .into();
        let mut report = SuiteReport::new("s", None);
        report.add_group(GroupReport::completed(
            &g,
            vec![CaseResult::failed(&g.cases[0], CaseStatus::Running, &err, 1)],
            1,
        ));
        let text = report.render_console();
        assert!(text.contains("expected to contain: \"client:default\""), "{text}");
        assert!(text.contains("actual: <no matching element>"), "{text}");
    }

    #[test]
    fn selector_not_found_records_expected_literal() {
        let g = group();
        let err: PagecheckError = AssertionError::SelectorNotFound {
            selector: "#client-mod".into(),
            route: "/".into(),
        }
        .into();
        let result = CaseResult::failed(&g.cases[0], CaseStatus::Running, &err, 1);
        assert_eq!(result.expected.as_deref(), Some("client:default"));
        assert_eq!(result.actual, None);
        assert!(result.message.unwrap().contains("selector not found"));
    }
}
