//! `jarvis memory` — Task history commands.

use jarvis_core::memory::MemoryRecord;
use jarvis_core::tool::Tool;
use jarvis_tools::{MemoryAddTool, memory_search};
use super::{CliResult, build_memory, load_config};

pub async fn search(query: &str, k: usize) -> CliResult {
    let config = load_config()?;
    let memory = build_memory(&config)?;

    println!("🔍 Searching memory for: \"{query}\"");
    println!();

    let records = memory.search(query, k).await?;
    if records.is_empty() {
        empty_hint(&config.memory.backend);
    } else {
        println!("{}", memory_search::format_records(&records));
    }
    Ok(())
}

pub async fn recent(n: usize) -> CliResult {
    let config = load_config()?;
    let memory = build_memory(&config)?;

    let total = memory.count().await?;
    println!("🧠 Memory: {total} records");
    println!();

    let records = memory.get_recent(n).await?;
    if records.is_empty() {
        empty_hint(&config.memory.backend);
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

pub async fn add(text: &str, agent: &str, action: &str) -> CliResult {
    let config = load_config()?;
    let memory = build_memory(&config)?;

    let tool = MemoryAddTool::new(memory);
    let result = tool
        .execute(serde_json::json!({ "text": text, "agent": agent, "action": action }))
        .await?;
    println!("{}", result.output);

    if config.memory.backend != "file" {
        println!("   (memory.backend is \"{}\"; the record lives only for this process)", config.memory.backend);
    }
    Ok(())
}

fn print_record(record: &MemoryRecord) {
    println!(
        "  #{:<4} {}  [{}] {}",
        record.id,
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.agent(),
        record.action()
    );
    for line in record.text.lines() {
        println!("        {line}");
    }
    println!();
}

fn empty_hint(backend: &str) {
    println!("   No records found.");
    if backend != "file" {
        println!("   Set memory.backend = \"file\" to keep history across runs.");
    }
}
