use clap::Parser;
use std::path::PathBuf;

/// Command-line options for the gateway server.
#[derive(Debug, Parser)]
#[command(name = "weather-gateway", version, about = "Cached current-weather HTTP API")]
pub struct Cli {
    /// Path to a TOML config file (defaults to the platform config directory).
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8000. Overrides the config file.
    #[arg(long)]
    pub listen: Option<String>,
}
