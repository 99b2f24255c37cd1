use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "pagecheck",
    version,
    about = "End-to-end page checks: start a fixture app, render routes, assert on rendered text"
)]
pub struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value = "text", env = "PAGECHECK_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run every group of a suite file
    Run(RunArgs),
    /// Check one route of a static fixture directory
    Check(CheckArgs),
    /// Serve a static fixture directory until Ctrl-C
    Serve(ServeArgs),
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Console,
    Json,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "pagecheck.yaml")]
    pub suite: PathBuf,

    /// bundler mode; groups listing it in `skip_modes` are not run
    #[arg(long, env = "PAGECHECK_MODE")]
    pub mode: Option<String>,

    #[arg(long, value_enum, default_value = "console")]
    pub format: OutputFormat,

    /// write the report here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(
        long,
        env = "PAGECHECK_MAX_CONCURRENCY",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_concurrency: Option<usize>,

    /// render timeout in seconds
    #[arg(long, env = "PAGECHECK_RENDER_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..))]
    pub render_timeout: Option<u64>,

    /// overrides every fixture's startup timeout (seconds)
    #[arg(long, env = "PAGECHECK_STARTUP_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..))]
    pub startup_timeout: Option<u64>,
}

#[derive(Parser, Clone)]
pub struct CheckArgs {
    /// built output directory containing index.html
    #[arg(long)]
    pub dir: PathBuf,

    #[arg(long, default_value = "/")]
    pub route: String,

    /// CSS selector, e.g. `#client-mod`
    #[arg(long)]
    pub selector: String,

    /// literal the selected element's text must contain
    #[arg(long)]
    pub contains: String,

    #[arg(long, default_value_t = 0)]
    pub port: u16,

    #[arg(long, value_enum, default_value = "console")]
    pub format: OutputFormat,
}

#[derive(Parser, Clone)]
pub struct ServeArgs {
    #[arg(long)]
    pub dir: PathBuf,

    #[arg(long, default_value_t = 3000, env = "PORT")]
    pub port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: std::net::IpAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_defaults() {
        let cli = Cli::try_parse_from(["pagecheck", "run"]).unwrap();
        match cli.cmd {
            Command::Run(args) => {
                assert_eq!(args.suite, PathBuf::from("pagecheck.yaml"));
                assert_eq!(args.format, OutputFormat::Console);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_rejects_zero_timeouts_and_concurrency() {
        for flag in ["--render-timeout", "--startup-timeout", "--max-concurrency"] {
            let err = Cli::try_parse_from(["pagecheck", "run", flag, "0"]).err();
            assert!(err.is_some(), "{flag} 0 accepted");
        }
        let cli = Cli::try_parse_from(["pagecheck", "run", "--max-concurrency", "8"]).unwrap();
        match cli.cmd {
            Command::Run(args) => assert_eq!(args.max_concurrency, Some(8)),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn check_requires_selector_and_contains() {
        assert!(Cli::try_parse_from(["pagecheck", "check", "--dir", "out"]).is_err());
        let cli = Cli::try_parse_from([
            "pagecheck",
            "check",
            "--dir",
            "out",
            "--selector",
            "#client-mod",
            "--contains",
            "client:default",
        ])
        .unwrap();
        match cli.cmd {
            Command::Check(args) => {
                assert_eq!(args.route, "/");
                assert_eq!(args.selector, "#client-mod");
            }
            _ => panic!("expected check"),
        }
    }
}
