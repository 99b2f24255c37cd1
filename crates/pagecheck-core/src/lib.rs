//! End-to-end page checks against a fixture application.
//!
//! A fixture turns a source directory into a running application, a render
//! returns the final markup of a route, and a containment assertion checks the
//! text of a selected element:
//!
//! ```no_run
//! use pagecheck_core::{expect_text_contains, setup_fixture, FixtureConfig, RunOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fixture = setup_fixture(&FixtureConfig::static_dir("fixtures/mui"), &RunOptions::default()).await?;
//! let page = fixture.render("/").await?;
//! expect_text_contains(&page, "#client-mod", "client:default")?;
//! fixture.teardown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `PAGECHECK_MODE` | Active bundler mode; groups listing it in `skip_modes` are skipped |
//! | `PAGECHECK_RENDER_TIMEOUT` | Render timeout in seconds (default: 30) |
//! | `PAGECHECK_STARTUP_TIMEOUT` | Overrides every fixture's startup timeout |
//! | `PAGECHECK_MAX_CONCURRENCY` | Groups run at once (default: 4) |

pub mod assertion;
pub mod case;
pub mod config;
pub mod errors;
pub mod fixture;
pub mod page;
pub mod report;
pub mod server;

pub use assertion::{evaluate_checks, expect_text_contains, text_contains};
pub use case::{run_case, run_group, run_suite, CaseStatus, Check, TestCase, TestGroup};
pub use config::{FixtureConfig, FixtureKind, RunOptions, Suite};
pub use errors::{AssertionError, ConfigError, FixtureError, PagecheckError, RenderError};
pub use fixture::{setup_fixture, FixtureContext};
pub use page::{normalize_text, select, text, ElementHandle, PageHandle};
pub use report::{CaseResult, FailureStage, GroupReport, GroupStatus, SuiteReport, SuiteSummary};
pub use server::{DevServer, DevServerListening, FallbackHandler};
