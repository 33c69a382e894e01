use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend to compile for
    pub compile_key: String,

    /// Log level
    pub log_level: String,

    /// Placed between compiled program roots
    pub separator: String,

    /// Exit with an error when any warning was emitted
    pub fail_on_warnings: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compile_key: blocks_engine::graph::MOTOKO.to_string(),
            log_level: "info".to_string(),
            separator: "\n".to_string(),
            fail_on_warnings: false,
        }
    }
}

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "blocksc")]
#[command(about = "Compile a block graph into source code", version)]
pub struct Cli {
    /// Graph file (JSON)
    pub graph: PathBuf,

    /// Configuration file path
    #[arg(short, long, env = "BLOCKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the program here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Backend compile key
    #[arg(short = 'k', long, env = "BLOCKS_COMPILE_KEY")]
    pub compile_key: Option<String>,

    /// Log level
    #[arg(long, env = "BLOCKS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Separator between compiled program roots
    #[arg(long)]
    pub separator: Option<String>,

    /// Exit with an error when any warning was emitted
    #[arg(long)]
    pub fail_on_warnings: bool,

    /// Also write the compile report (outputs and events) here as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json: bool,
}

impl Config {
    /// Load configuration from CLI args, environment and config file
    pub fn from_env() -> Result<(Cli, Self)> {
        let cli = Cli::parse();
        let config = Self::load(&cli)?;
        Ok((cli, config))
    }

    /// The config file named on the command line, else the default one if
    /// it exists, overridden by CLI flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli
            .config
            .clone()
            .or_else(|| Self::default_path().filter(|path| path.exists()));
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(compile_key) = &cli.compile_key {
            config.compile_key = compile_key.clone();
        }
        if let Some(log_level) = &cli.log_level {
            config.log_level = log_level.clone();
        }
        if let Some(separator) = &cli.separator {
            config.separator = separator.clone();
        }
        if cli.fail_on_warnings {
            config.fail_on_warnings = true;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "Blocks", "blocksc")
            .map(|proj| proj.config_dir().join("blocksc.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.compile_key.trim().is_empty() {
            anyhow::bail!("compile_key must not be empty");
        }
        Ok(())
    }
}
