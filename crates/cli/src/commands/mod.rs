pub mod agent;
pub mod doctor;
pub mod gateway;

use standin_agent::AgentLoop;
use standin_config::AppConfig;
use standin_core::event::EventBus;
use standin_core::persona::Persona;
use std::sync::Arc;

/// Wire provider, notifier, tools and persona into an agent loop.
pub fn build_agent(config: &AppConfig) -> Result<AgentLoop, Box<dyn std::error::Error>> {
    let router = standin_providers::build_from_config(config);
    let provider = router.default().ok_or("No default provider configured")?;

    let event_bus = Arc::new(EventBus::default());
    let sink = standin_notify::build_from_config(&config.notifier);
    let tools = standin_tools::default_registry(sink, Some(event_bus.clone()))
        .map_err(standin_core::Error::from)?;

    let persona = Persona::load(&config.persona.name, &config.persona.paths());

    Ok(AgentLoop::from_config(
        config,
        provider,
        Arc::new(tools),
        Arc::new(persona),
        event_bus,
    ))
}

/// Print setup help and fail when no API key is available.
pub fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables (or put it in .env):");
    eprintln!("    OPENAI_API_KEY=sk-...          (OpenAI)");
    eprintln!("    OPENROUTER_API_KEY=sk-or-...   (OpenRouter, with STANDIN_PROVIDER=openrouter)");
    eprintln!("    STANDIN_API_KEY=...            (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err(standin_core::Error::Config {
        message: "no API key found, see above for setup instructions".into(),
    }
    .into())
}
