//! `standin doctor` — Diagnose configuration and connectivity.

use standin_config::AppConfig;
use standin_core::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Standin Doctor — System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file at {} — using defaults", config_path.display());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    // Check API key
    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set OPENAI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    // Check notifier
    if !config.notifier.enabled {
        println!("  ⚠️  Notifier disabled — questions will only be logged");
    } else if config.notifier.has_credentials() {
        println!("  ✅ Notifier credentials present");
    } else {
        println!("  ⚠️  Notifier missing BOT_TOKEN or CHAT_ID — notifications will be skipped");
        issues += 1;
    }

    // Check persona documents
    let paths = config.persona.paths();
    for (label, path) in [("Summary", paths.summary), ("Profile", paths.profile)] {
        match path {
            Some(path) if path.is_file() => println!("  ✅ {label} file found"),
            Some(path) => {
                println!("  ⚠️  {label} file missing: {}", path.display());
                issues += 1;
            }
            None => println!("  ⚠️  {label} file not configured"),
        }
    }

    // Check provider reachability
    let router = standin_providers::build_from_config(&config);
    match router.default() {
        Some(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ❌ Provider '{}' rejected the health check", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        None => {
            println!("  ❌ No default provider configured");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
