use std::net::SocketAddr;

use anyhow::{Context, Result};
use pagecheck_core::DevServer;

use crate::cli::args::ServeArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(args: ServeArgs) -> Result<i32> {
    let server = DevServer::new(&args.dir)
        .with_addr(SocketAddr::new(args.host, args.port))
        .listen()
        .await
        .with_context(|| format!("serving {}", args.dir.display()))?;

    eprintln!("Serving {} at {}", args.dir.display(), server.url());
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    server.shutdown().await;
    Ok(SUCCESS)
}
