//! Load generator for the Leaf function-execution scheduler.

use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use loadtest::config::Config;
use loadtest::controller::Controller;

/// Drive a phased workload against a Leaf scheduler and record per-call
/// latencies to a CSV log.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the yaml workload configuration file
    #[argh(option, default = "PathBuf::from(\"workload_config.yaml\")")]
    config: PathBuf,

    /// log level: debug, info, warn or error
    #[argh(option, default = "String::from(\"info\")")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_tracing(&args.log_level);

    let config = Config::load(&args.config)?;
    let controller = Controller::new(config).await?;
    controller.run().await
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}
