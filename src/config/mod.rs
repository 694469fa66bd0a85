pub mod cli;
pub mod toml_config;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::config::toml_config::EtlConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "relay-etl")]
#[command(about = "Reshape JSON records and relay them through a broker to CSV")]
pub struct CliConfig {
    #[arg(long, default_value = "relay-etl.toml")]
    pub config: String,

    #[arg(long, default_value = ".", help = "Base directory for input and output paths")]
    pub base_dir: String,

    #[arg(long, help = "Override source.input_path")]
    pub input: Option<String>,

    #[arg(long, help = "Override load.output_path")]
    pub output: Option<String>,

    #[arg(long, help = "Override relay.url")]
    pub broker_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Apply command-line overrides on top of a resolved file config.
    pub fn apply_overrides(&self, config: &mut EtlConfig) {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(url) = &self.broker_url {
            config.broker_url = url.clone();
        }
    }
}
