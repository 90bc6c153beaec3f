//! tracing setup for the binary. Library code only emits events.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub struct LogConfig<'a> {
    /// Filter used when RUST_LOG is unset.
    pub filter: &'a str,
    pub verbose: bool,
}

/// Install a stderr subscriber. RUST_LOG takes precedence over the configured
/// filter; `verbose` forces debug level for this crate.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let filter = if config.verbose {
        EnvFilter::new("sracurate=debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.filter))
            .map_err(|e| eyre!("Invalid log filter \"{}\": {}", config.filter, e))?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init()
        .map_err(|e| eyre!("Could not initialize logging: {}", e))
}
