//! Ad-hoc single case against a static fixture directory.

use anyhow::Result;
use pagecheck_core::{run_suite, FixtureConfig, RunOptions, Suite, TestCase, TestGroup};

use crate::cli::args::CheckArgs;
use crate::exit_codes::CONFIG_ERROR;

pub async fn run(args: CheckArgs) -> Result<i32> {
    let case = TestCase::new(format!("{} contains {:?}", args.selector, args.contains), &args.route)
        .expect_contains(&args.selector, &args.contains);
    let group = TestGroup::new(
        args.dir.display().to_string(),
        FixtureConfig::static_dir(&args.dir).with_port(args.port),
    )
    .with_case(case);
    let suite = Suite {
        suite: "check".to_string(),
        groups: vec![group],
    };
    if let Err(e) = suite.validate() {
        eprintln!("Config error: {}", e);
        return Ok(CONFIG_ERROR);
    }

    let report = run_suite(&suite, &RunOptions::from_env()).await;
    super::reporting::emit(&report, args.format, None)
}
