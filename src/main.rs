use clap::Parser;
use rate_relay::cli::{Cli, Commands};
use rate_relay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            rate_relay::telemetry::init_telemetry(&config.telemetry)?;
            tracing::info!("Starting rate relay");
            args.execute(config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Server: port {}", config.server.port);
            println!(
                "  Provider: {} (timeout {}ms)",
                config.provider.base_url, config.provider.timeout_ms
            );
            println!("  Currencies: {}", config.provider.currencies.join(", "));
            println!(
                "  Pipeline: fetch every {}s, retain {}s ({} slots), subscriber buffer {}",
                config.pipeline.fetch_interval_secs,
                config.pipeline.retention_secs,
                config.pipeline.cache_capacity(),
                config.pipeline.subscription_buffer_size
            );
            println!(
                "  Telemetry: level {}, format {:?}, metrics port {:?}",
                config.telemetry.log_level,
                config.telemetry.log_format,
                config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
