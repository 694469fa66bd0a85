use clap::Parser;
use relay_etl::core::Relay;
use relay_etl::utils::logger;
use relay_etl::{
    CliConfig, EtlEngine, LocalStorage, MemoryRelay, NatsRelay, NatsSettings, RelayBackend,
    RelayPipeline, TomlConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting relay-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let mut config = match TomlConfig::from_file(&cli.config).and_then(TomlConfig::resolve) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration loading failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(3);
        }
    };
    cli.apply_overrides(&mut config);
    tracing::info!("Loaded pipeline '{}' from {}", config.name, cli.config);

    let relay: Box<dyn Relay> = match config.relay_backend {
        RelayBackend::Memory => {
            tracing::info!("Using in-process relay on channel '{}'", config.channel);
            Box::new(MemoryRelay::new(config.channel.clone()))
        }
        RelayBackend::Nats => {
            let settings = NatsSettings {
                url: config.broker_url.clone(),
                stream_name: config.stream.clone(),
                channel: config.channel.clone(),
            };
            match NatsRelay::connect(settings).await {
                Ok(relay) => Box::new(relay),
                Err(e) => {
                    tracing::error!("❌ Broker connection failed: {}", e);
                    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                    eprintln!("❌ {}", e.user_friendly_message());
                    std::process::exit(3);
                }
            }
        }
    };

    let storage = LocalStorage::new(cli.base_dir.clone());
    let pipeline = RelayPipeline::new(storage, config, relay);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!("❌ ETL process failed: {} (Severity: {:?})", e, e.severity());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                relay_etl::utils::error::ErrorSeverity::Low => 0,
                relay_etl::utils::error::ErrorSeverity::Medium => 2,
                relay_etl::utils::error::ErrorSeverity::High => 1,
                relay_etl::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
