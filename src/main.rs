use clap::Parser;
use manga_archiver::{Config, run_server_until_signal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Serve manga chapters as streamed zip archives
#[derive(Parser, Debug)]
#[command(version, about)]
struct Opts {
    /// Path to a JSON config file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding `server.api.bind_address`
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = Opts::parse();

    let mut config = match opts.config.as_deref().map(Config::from_file).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = opts.bind {
        config.server.api.bind_address = bind;
    }

    match run_server_until_signal(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited with error");
            ExitCode::FAILURE
        }
    }
}
