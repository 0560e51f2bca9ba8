//! `standin agent` — Interactive or single-message chat mode.

use standin_config::AppConfig;
use standin_core::message::HistoryEntry;
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    super::require_api_key(&config)?;

    let agent = super::build_agent(&config)?;

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = agent.chat(&msg, &[]).await?;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Standin — Interactive Mode");
    println!();
    println!("  Persona:   {}", agent.persona().name);
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Context:   ~{} tokens of persona prompt", agent.persona().estimated_tokens());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Ctrl+C cancels a reply in progress; 'exit' quits.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut history: Vec<HistoryEntry> = Vec::new();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        eprint!("  ...");
        let mut conversation = agent.start_conversation(line, &history);

        // Dropping the turn future on Ctrl+C abandons the remaining rounds.
        let result = tokio::select! {
            result = agent.run(&mut conversation) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        eprint!("\r     \r");

        match result {
            Some(Ok(outcome)) => {
                println!();
                for line in outcome.reply.lines() {
                    println!("  {} > {line}", agent.persona().name);
                }
                println!();
                history = conversation.transcript();
            }
            Some(Err(e)) => {
                eprintln!("  [Error] {e}");
                println!();
            }
            None => {
                eprintln!("  [Cancelled]");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
