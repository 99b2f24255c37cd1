use std::path::Path;

use anyhow::{Context, Result};
use pagecheck_core::SuiteReport;

use crate::cli::args::OutputFormat;
use crate::exit_codes::{CHECK_FAILED, SUCCESS};

/// Print or write the report, return the exit code it implies.
pub fn emit(report: &SuiteReport, format: OutputFormat, out: Option<&Path>) -> Result<i32> {
    let rendered = match format {
        OutputFormat::Console => report.render_console(),
        OutputFormat::Json => report.to_json_pretty().context("serializing report")?,
    };

    match out {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(if report.is_success() { SUCCESS } else { CHECK_FAILED })
}
