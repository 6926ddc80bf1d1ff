use std::process::ExitCode;

use log::{error, info};

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "naicha=info,serenity=warn,poise=warn";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .format_timestamp_millis()
        .init();
    info!("naicha {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = naicha::run().await {
        error!("naicha stopped on error: {e}");
        return ExitCode::FAILURE;
    }

    info!("naicha stopped");
    ExitCode::SUCCESS
}
