mod bootstrap;
mod config;
mod envelope;
mod kafka;
mod log;
mod metrics;
mod sample;

use crate::log::kflog;
use clap::{Arg, ArgMatches, Command};

fn app_args() -> ArgMatches {
    Command::new("kcev")
        .version(clap::crate_version!())
        .about("CloudEvents over Kafka producer and consumer")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file path"),
        )
        .get_matches()
}

#[tokio::main]
async fn main() {
    let args = app_args();
    let config_path = args.get_one::<String>("config").map(|s| s.as_str());

    let cfg = match config::AppConfig::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to initialize config: {}", e);
            std::process::exit(1);
        }
    };

    let logger = match kflog::new_logger(&cfg.get_output_file()) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("failed to open log output: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = bootstrap::run(&cfg, logger.clone()).await {
        slog::crit!(logger, "failed to start application"; "error" => e.to_string());
        // Last reference: dropping it flushes the async drain.
        drop(logger);
        std::process::exit(1);
    }
}
