//! blocksc - compile a block graph into source code

use anyhow::{Context, Result};
use tracing::{info, warn};

use blocksc::{compile_file, logging, write_report, Config};

fn main() -> Result<()> {
    let (cli, config) = Config::from_env().context("Failed to load configuration")?;
    logging::init(&config, cli.json).context("Failed to initialize logging")?;
    logging::log_config(&config);

    let report = compile_file(&cli.graph, &config)?;
    for event in &report.events {
        warn!("{}", event);
    }

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }

    let program = report.render(&config.separator);
    match &cli.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", program))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Program written");
        }
        None => println!("{}", program),
    }

    if config.fail_on_warnings && report.has_warnings() {
        anyhow::bail!("Compilation emitted {} warning(s)", report.events.len());
    }
    Ok(())
}
