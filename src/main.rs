use clap::Parser;
use navguard::cli::{self, Cli};
use navguard::config::GuardConfig;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GuardConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("navguard: {err}");
            return ExitCode::from(2);
        }
    };
    navguard::logging::init(&config.log_level);

    match cli::run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "navguard failed");
            ExitCode::FAILURE
        }
    }
}
