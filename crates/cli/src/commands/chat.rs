//! `jarvis chat` — Interactive mode.
//!
//! Requests share one orchestrator, so memory written by one request is
//! visible to the analyst on the next.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use super::{CliResult, build_orchestrator, load_config, progress};

pub async fn run(show_progress: bool) -> CliResult {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config)?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          JARVIS — Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Memory:    {} ({} embeddings)", config.memory.backend, config.memory.embedding);
    println!();
    println!("  Type your request and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        if matches!(request, "exit" | "quit") {
            break;
        }

        let renderer = show_progress.then(|| progress::spawn_until_answer(orchestrator.event_bus()));
        let result = orchestrator.run(request).await;

        // A failed request publishes no final answer, so its renderer is stopped
        if let Some(renderer) = renderer {
            if result.is_ok() {
                let _ = renderer.await;
            } else {
                renderer.abort();
            }
        }

        match result {
            Ok(answer) => {
                println!();
                println!("{answer}");
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!("  Goodbye!");
    Ok(())
}
