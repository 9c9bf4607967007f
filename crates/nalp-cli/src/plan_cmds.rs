//! CLI handlers for `nalp questions` and `nalp plan`.
//!
//! Implements:
//! - `nalp questions <idea>` -- print clarifying questions
//! - `nalp plan <idea>`      -- synthesize a build plan, optionally asking
//!   the clarifying questions first and saving the result to history

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use nalp_core::{PlanRequest, PlanResult, Synthesizer};
use nalp_store::HistoryStore;

/// Options for `nalp plan`.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub idea: String,
    pub platforms: Vec<String>,
    pub budget: String,
    pub skill: String,
    pub priority: String,
    pub vibe: String,
    pub interactive: bool,
    pub markdown: bool,
    pub save: bool,
}

/// Append the target platforms to the idea the way the plan prompt
/// expects them.
pub fn idea_with_platforms(idea: &str, platforms: &[String]) -> String {
    let idea = idea.trim();
    if platforms.is_empty() {
        return idea.to_string();
    }
    format!("{idea} (Platforms: {})", platforms.join(", "))
}

// -----------------------------------------------------------------------
// nalp questions <idea>
// -----------------------------------------------------------------------

pub async fn run_questions(synth: &Synthesizer, idea: &str) -> Result<()> {
    let questions = synth
        .generate_questions(idea)
        .await
        .context("failed to generate clarifying questions")?;

    for (i, q) in questions.iter().enumerate() {
        println!("{}. {q}", i + 1);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// nalp plan <idea>
// -----------------------------------------------------------------------

/// Ask each question on stdout and read one answer line per question.
fn ask_questions(
    questions: &[String],
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Vec<String>> {
    let mut answers = Vec::with_capacity(questions.len());
    for (i, q) in questions.iter().enumerate() {
        write!(output, "Q{}: {q}\n> ", i + 1)?;
        output.flush()?;
        let mut line = String::new();
        input.read_line(&mut line).context("failed to read answer")?;
        answers.push(line.trim().to_string());
    }
    Ok(answers)
}

pub async fn run_plan(synth: &Synthesizer, store: &HistoryStore, opts: &PlanOptions) -> Result<()> {
    let idea = idea_with_platforms(&opts.idea, &opts.platforms);

    let (questions, answers) = if opts.interactive {
        let questions = synth
            .generate_questions(&idea)
            .await
            .context("failed to generate clarifying questions")?;
        let stdin = std::io::stdin();
        let answers = ask_questions(&questions, &mut stdin.lock(), &mut std::io::stderr())?;
        (questions, answers)
    } else {
        (Vec::new(), Vec::new())
    };

    let request = PlanRequest {
        app_idea: idea.clone(),
        questions,
        answers,
        budget: opts.budget.clone(),
        skill: opts.skill.clone(),
        priority: opts.priority.clone(),
        vibe: opts.vibe.clone(),
    };

    let plan = synth
        .generate_plan(&request)
        .await
        .context("failed to generate plan")?;

    print_plan(&plan, &idea, opts.markdown)?;

    if opts.save {
        let record = plan
            .to_history(&idea, &opts.budget, &opts.skill)
            .context("failed to serialize plan")?;
        let id = store.save(&record).await.context("failed to save plan")?;
        eprintln!("Saved to history as {id}.");
    }

    Ok(())
}

fn print_plan(plan: &PlanResult, idea: &str, markdown: bool) -> Result<()> {
    if markdown {
        print!("{}", plan.to_markdown(idea));
    } else {
        let json = serde_json::to_string_pretty(plan).context("failed to serialize plan")?;
        println!("{json}");
    }
    Ok(())
}
