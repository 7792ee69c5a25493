use slog::Drain;
use std::sync::Arc;

const DEFAULT_OUTPUT: &str = "/dev/stdout";

pub const SERVICE_NAME: &str = "kcev";

pub type Logger = Arc<slog::Logger>;

pub fn new_logger(output: &str) -> std::io::Result<Logger> {
    let output_path = if output.is_empty() {
        DEFAULT_OUTPUT
    } else {
        output
    };

    if output_path != DEFAULT_OUTPUT {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(output_path)?;
        let drain = slog_json::Json::new(file)
            .add_default_keys()
            .build()
            .fuse();
        let async_drain = slog_async::Async::new(drain).build();
        return Ok(Arc::new(slog::Logger::root(
            async_drain.fuse(),
            slog::o!("service" => SERVICE_NAME),
        )));
    }

    let drain = slog_json::Json::new(std::io::stdout())
        .add_default_keys()
        .build()
        .fuse();
    let async_drain = slog_async::Async::new(drain).build();
    let logger = slog::Logger::root(async_drain.fuse(), slog::o!("service" => SERVICE_NAME));
    Ok(Arc::new(logger))
}
