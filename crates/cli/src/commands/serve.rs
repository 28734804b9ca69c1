//! `portico serve`: Start the UI gateway.

use portico_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
        config.validate()?;
    }

    println!("🚪 Portico Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Index:     {}", config.ui.index_path);
    println!("   Auth:      {}", config.auth.mode);

    portico_gateway::start(config).await?;

    Ok(())
}
