use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_parallel_lists, validate_path, validate_positive_number,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Raw configuration file shape. List-valued settings are delimited
/// strings, split into lists by `resolve` before the core ever sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineMeta,
    pub source: SourceConfig,
    pub reshape: ReshapeConfig,
    pub relay: RelayConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMeta {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
    pub subset: Option<String>,
    pub rowkey: Option<String>,
}

/// Comma-delimited lists, except `split_to` and `splitter` which are
/// semicolon-delimited so a literal comma delimiter stays expressible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReshapeConfig {
    pub header: String,
    pub rename_from: Option<String>,
    pub rename_to: Option<String>,
    pub split_from: Option<String>,
    pub split_to: Option<String>,
    pub splitter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub backend: Option<String>,
    pub url: Option<String>,
    pub channel: String,
    pub stream: Option<String>,
    pub consume_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayBackend {
    Nats,
    Memory,
}

/// Resolved, validated configuration: every delimited string parsed into
/// its list, scalar defaults applied.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub name: String,
    pub input_path: String,
    pub output_path: String,
    pub subset: Option<String>,
    pub rowkey: Option<String>,
    pub header: Vec<String>,
    pub rename_from: Vec<String>,
    pub rename_to: Vec<String>,
    pub split_from: Vec<String>,
    pub split_to: Vec<String>,
    pub splitters: Vec<String>,
    pub relay_backend: RelayBackend,
    pub broker_url: String,
    pub channel: String,
    pub stream: String,
    pub consume_timeout_ms: u64,
}

fn split_list(value: Option<&str>, delimiter: char) -> Vec<String> {
    match value {
        Some(s) if !s.is_empty() => s.split(delimiter).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Substitute `${VAR_NAME}` placeholders from the environment.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn resolve(self) -> Result<EtlConfig> {
        let backend = match self.relay.backend.as_deref().unwrap_or("nats") {
            "nats" => RelayBackend::Nats,
            "memory" => RelayBackend::Memory,
            other => {
                return Err(EtlError::InvalidConfigValueError {
                    field: "relay.backend".to_string(),
                    value: other.to_string(),
                    reason: "Supported backends: nats, memory".to_string(),
                })
            }
        };

        let config = EtlConfig {
            name: self.pipeline.name,
            input_path: self.source.input_path,
            output_path: self.load.output_path,
            subset: non_empty(self.source.subset),
            rowkey: non_empty(self.source.rowkey),
            header: split_list(Some(self.reshape.header.as_str()), ','),
            rename_from: split_list(self.reshape.rename_from.as_deref(), ','),
            rename_to: split_list(self.reshape.rename_to.as_deref(), ','),
            split_from: split_list(self.reshape.split_from.as_deref(), ','),
            split_to: split_list(self.reshape.split_to.as_deref(), ';'),
            // An empty splitter entry means whitespace splitting, so a
            // present-but-empty setting is one entry, not zero.
            splitters: match self.reshape.splitter.as_deref() {
                Some(s) => s.split(';').map(str::to_string).collect(),
                None => Vec::new(),
            },
            relay_backend: backend,
            broker_url: self
                .relay
                .url
                .unwrap_or_else(|| "nats://localhost:4222".to_string()),
            channel: self.relay.channel,
            stream: self
                .relay
                .stream
                .unwrap_or_else(|| "RELAY_ETL".to_string()),
            consume_timeout_ms: self.relay.consume_timeout_ms.unwrap_or(5000),
        };

        config.validate()?;
        Ok(config)
    }
}

impl EtlConfig {
    pub fn validate_config(&self) -> Result<()> {
        validate_path("source.input_path", &self.input_path)?;
        validate_path("load.output_path", &self.output_path)?;
        validate_non_empty_string("relay.channel", &self.channel)?;
        validate_non_empty_string("relay.stream", &self.stream)?;
        validate_positive_number("relay.consume_timeout_ms", self.consume_timeout_ms, 1)?;

        if self.relay_backend == RelayBackend::Nats {
            validate_url("relay.url", &self.broker_url, &["nats"])?;
        }

        if self.header.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "reshape.header".to_string(),
            });
        }

        validate_parallel_lists(
            "reshape.rename_from",
            self.rename_from.len(),
            "reshape.rename_to",
            self.rename_to.len(),
        )?;
        validate_parallel_lists(
            "reshape.split_from",
            self.split_from.len(),
            "reshape.split_to",
            self.split_to.len(),
        )?;
        validate_parallel_lists(
            "reshape.split_from",
            self.split_from.len(),
            "reshape.splitter",
            self.splitters.len(),
        )?;

        for destinations in &self.split_to {
            validate_non_empty_string("reshape.split_to", destinations)?;
        }

        Ok(())
    }

    pub fn consume_timeout(&self) -> Duration {
        Duration::from_millis(self.consume_timeout_ms)
    }
}

impl ConfigProvider for EtlConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn subset(&self) -> Option<&str> {
        self.subset.as_deref()
    }

    fn rowkey(&self) -> Option<&str> {
        self.rowkey.as_deref()
    }

    fn header(&self) -> &[String] {
        &self.header
    }

    fn rename_from(&self) -> &[String] {
        &self.rename_from
    }

    fn rename_to(&self) -> &[String] {
        &self.rename_to
    }

    fn split_from(&self) -> &[String] {
        &self.split_from
    }

    fn split_to(&self) -> &[String] {
        &self.split_to
    }

    fn splitters(&self) -> &[String] {
        &self.splitters
    }

    fn consume_timeout(&self) -> Duration {
        self.consume_timeout()
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
