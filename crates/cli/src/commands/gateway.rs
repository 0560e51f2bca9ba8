//! `standin gateway` — Start the HTTP chat server.

use standin_config::AppConfig;
use std::sync::Arc;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    super::require_api_key(&config)?;
    let agent = super::build_agent(&config)?;

    println!("Standin Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Persona:   {}", agent.persona().name);
    println!("   Model:     {}", config.default_model);

    standin_gateway::start(&config.gateway.host, config.gateway.port, Arc::new(agent)).await?;

    Ok(())
}
