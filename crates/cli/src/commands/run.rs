//! `jarvis run` — Handle one request.

use super::{CliResult, build_orchestrator, load_config, progress};

pub async fn run(task: &str, show_progress: bool) -> CliResult {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config)?;
    let renderer = show_progress.then(|| progress::spawn(orchestrator.event_bus()));

    let result = orchestrator.run(task).await;

    // Dropping the orchestrator closes the bus so the renderer drains and exits
    drop(orchestrator);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    let answer = result?;
    println!();
    println!("{answer}");
    Ok(())
}
