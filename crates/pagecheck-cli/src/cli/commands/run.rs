use anyhow::Result;
use pagecheck_core::{run_suite, RunOptions, Suite};
use tracing::info;

use crate::cli::args::RunArgs;
use crate::exit_codes::CONFIG_ERROR;

pub async fn run(args: RunArgs) -> Result<i32> {
    let suite = match Suite::load(&args.suite) {
        Ok(suite) => suite,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return Ok(CONFIG_ERROR);
        }
    };

    let mut options = RunOptions::from_env();
    if let Some(mode) = args.mode.filter(|m| !m.trim().is_empty()) {
        options = options.with_mode(mode);
    }
    if let Some(n) = args.max_concurrency {
        options = options.with_max_concurrency(n);
    }
    if let Some(secs) = args.render_timeout {
        options = options.with_render_timeout(secs);
    }
    if args.startup_timeout.is_some() {
        options.startup_timeout_secs = args.startup_timeout;
    }

    info!(suite = %args.suite.display(), cases = suite.case_count(), "loaded suite");
    let report = run_suite(&suite, &options).await;
    super::reporting::emit(&report, args.format, args.out.as_deref())
}
