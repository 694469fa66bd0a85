pub mod config;
pub mod core;
pub mod domain;
pub mod relay;
pub mod utils;

pub use config::toml_config::{EtlConfig, RelayBackend, TomlConfig};
pub use config::{cli::LocalStorage, CliConfig};
pub use core::{engine::EtlEngine, pipeline::RelayPipeline};
pub use relay::{MemoryRelay, NatsRelay, NatsSettings};
pub use utils::error::{EtlError, Result};
