use clap::Parser;
use trade_bot::cli::{Cli, Commands};
use trade_bot::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    trade_bot::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Serve(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Server: {}", config.server.bind);
            println!(
                "  Exchange: {} (timeout {}s)",
                config.exchange.api_url, config.exchange.request_timeout_secs
            );
            println!(
                "  Stream: {} (dial attempts {}, pong wait {}s, ping {}s)",
                config.stream.ws_url,
                config.stream.max_dial_attempts,
                config.stream.pong_wait_secs,
                config.stream.ping_period_secs
            );
            println!(
                "  Telemetry: level={}, json={}, metrics_port={:?}",
                config.telemetry.log_level, config.telemetry.json, config.telemetry.metrics_port
            );
            println!("  Users: {}", config.users.len());
        }
    }

    Ok(())
}
