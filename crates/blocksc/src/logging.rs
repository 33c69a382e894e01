use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::Config;

/// Initialize logging. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so the compiled program can be piped from stdout.
pub fn init(config: &Config, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr);
        Registry::default().with(env_filter).with(json_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        Registry::default().with(env_filter).with(fmt_layer).try_init()?;
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "blocksc starting");
    Ok(())
}

/// Log configuration
pub fn log_config(config: &Config) {
    tracing::debug!(
        compile_key = %config.compile_key,
        log_level = %config.log_level,
        fail_on_warnings = config.fail_on_warnings,
        "Configuration loaded"
    );
}
