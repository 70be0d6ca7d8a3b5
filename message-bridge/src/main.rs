//! Message Bridge Service
//!
//! Runs a set of bridge instances against a local attestation network, relays
//! published VAAs between them, and serves the operations API.
//!
//! ## Overview
//!
//! The service:
//! 1. Loads configuration (`--config <path>`, `MESSAGE_BRIDGE_CONFIG_PATH`, or
//!    `config/message-bridge.toml`)
//! 2. Builds and initializes every configured bridge and registers its emitters
//! 3. Relays VAAs from the network to destination bridges
//! 4. Serves the REST API until shutdown

use anyhow::Result;
use tracing::info;

use message_bridge::{BridgeService, Config};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Message Bridge Service");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Message Bridge Service");
        println!();
        println!("Usage: message-bridge [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --devnet          Run the built-in three-chain devnet configuration");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  MESSAGE_BRIDGE_CONFIG_PATH    Config file path used when --config is absent");
        return Ok(());
    }

    let mut config_path = None;
    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    let config = if let Some(path) = config_path {
        info!("Using custom config: {}", path);
        Config::load_from(&path)?
    } else if args.iter().any(|arg| arg == "--devnet") {
        info!("Using built-in devnet configuration");
        let config = Config::default();
        config.validate()?;
        config
    } else {
        Config::load()?
    };
    info!("Configuration loaded successfully");

    let service = BridgeService::build(config).await?;
    info!("Bridges initialized successfully");

    // Run the relay and API server (this blocks until shutdown)
    service.run().await
}
