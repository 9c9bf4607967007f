//! CLI handlers for `nalp history` subcommands.
//!
//! Implements:
//! - `nalp history list`          -- list saved plans, newest first
//! - `nalp history show <id>`     -- print a saved plan as JSON
//! - `nalp history export <id>`   -- render a saved plan as markdown
//! - `nalp history delete <id>`   -- remove a saved plan

use std::path::Path;

use anyhow::{Context, Result};

use nalp_core::PlanResult;
use nalp_store::{HistoryRecord, HistoryStore};

use crate::HistoryCommands;

/// Dispatch a `HistoryCommands` variant to the appropriate handler.
pub async fn run_history_command(command: HistoryCommands, store: &HistoryStore) -> Result<()> {
    match command {
        HistoryCommands::List => cmd_list(store).await,
        HistoryCommands::Show { id } => cmd_show(store, &id).await,
        HistoryCommands::Export { id, output } => cmd_export(store, &id, output.as_deref()).await,
        HistoryCommands::Delete { id } => cmd_delete(store, &id).await,
    }
}

// -----------------------------------------------------------------------
// nalp history list
// -----------------------------------------------------------------------

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// Render the history table printed by `nalp history list`.
fn format_table(records: &[HistoryRecord]) -> String {
    let id_w = records.iter().map(|r| r.id.len()).max().unwrap_or(2).max(2);
    let ts_w = records
        .iter()
        .map(|r| r.timestamp.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = format!("{:<id_w$}  {:<ts_w$}  IDEA\n", "ID", "TIME");
    out.push_str(&format!("{}  {}  {}\n", "-".repeat(id_w), "-".repeat(ts_w), "-".repeat(4)));
    for r in records {
        out.push_str(&format!(
            "{:<id_w$}  {:<ts_w$}  {}\n",
            r.id,
            r.timestamp,
            truncate(&r.app_idea, 60)
        ));
    }
    out
}

async fn cmd_list(store: &HistoryStore) -> Result<()> {
    let records = store.list().await.context("failed to list history")?;
    if records.is_empty() {
        println!("No saved plans. Use `nalp plan <idea> --save` to create one.");
        return Ok(());
    }
    print!("{}", format_table(&records));
    Ok(())
}

// -----------------------------------------------------------------------
// nalp history show / export / delete
// -----------------------------------------------------------------------

async fn load_plan(store: &HistoryStore, id: &str) -> Result<(HistoryRecord, PlanResult)> {
    let record = store
        .get(id)
        .await
        .with_context(|| format!("failed to load history record {id}"))?;
    let plan = PlanResult::from_history(&record)
        .with_context(|| format!("history record {id} does not contain a valid plan"))?;
    Ok((record, plan))
}

async fn cmd_show(store: &HistoryStore, id: &str) -> Result<()> {
    let (record, plan) = load_plan(store, id).await?;
    println!("Idea:   {}", record.app_idea);
    println!("Saved:  {}", record.timestamp);
    println!("Budget: {}", record.budget);
    println!("Skill:  {}", record.skill);
    println!();
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn cmd_export(store: &HistoryStore, id: &str, output: Option<&Path>) -> Result<()> {
    let (record, plan) = load_plan(store, id).await?;
    let markdown = plan.to_markdown(&record.app_idea);

    match output {
        Some(path) => {
            std::fs::write(path, &markdown)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported {id} to {}", path.display());
        }
        None => print!("{markdown}"),
    }
    Ok(())
}

async fn cmd_delete(store: &HistoryStore, id: &str) -> Result<()> {
    store
        .delete(id)
        .await
        .with_context(|| format!("failed to delete history record {id}"))?;
    println!("Deleted {id}.");
    Ok(())
}
