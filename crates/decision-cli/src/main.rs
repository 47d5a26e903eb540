//! Decision task entrypoint.

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod config;
mod event_source;
mod git;
mod handlers;
mod output;

#[cfg(test)]
mod client_tests;
#[cfg(test)]
mod handlers_tests;

use commands::{Cli, LogFormat};
use config::{DecisionConfig, Environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let env = Environment::from_env();
    let mut config = DecisionConfig::load(cli.config.as_deref())?;
    config.apply_env(&env);
    config.validate()?;

    if let Err(err) = handlers::decide(&cli, &config, &env).await {
        error!(kind = handlers::failure_kind(err.as_ref()), error = %err, "Decision failed");
        return Err(err);
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
