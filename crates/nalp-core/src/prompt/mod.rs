//! Prompt construction for the two model calls.
//!
//! Pure string assembly, no I/O. The catalog is passed in rather than read
//! from ambient state.

use std::fmt;

use crate::catalog::Catalog;

/// Q/A context used when the user answered nothing.
pub const SKIPPED_QUESTIONS: &str = "User skipped questions.";

// ---------------------------------------------------------------------------
// Personas
// ---------------------------------------------------------------------------

/// Tone applied to the generated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    BrutalTruth,
    SupportiveCoach,
    #[default]
    SeniorEngineer,
}

impl Persona {
    pub const ALL: [Persona; 3] = [
        Persona::BrutalTruth,
        Persona::SupportiveCoach,
        Persona::SeniorEngineer,
    ];

    /// Resolve a persona label by exact match. Anything else, including a
    /// padded or differently cased label, falls back to
    /// [`Persona::SeniorEngineer`].
    pub fn resolve(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.label() == label)
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::BrutalTruth => "Brutal Truth",
            Self::SupportiveCoach => "Supportive Coach",
            Self::SeniorEngineer => "Senior Engineer",
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            Self::BrutalTruth => {
                "Be blunt. If the budget is too low for the idea, SAY IT. Call out technical bottlenecks."
            }
            Self::SupportiveCoach => {
                "Be encouraging. Break complex terms into simple analogies."
            }
            Self::SeniorEngineer => {
                "Be concise. Focus on scalability, latency, and data structure."
            }
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Clarifying questions
// ---------------------------------------------------------------------------

/// Build the clarifying-questions prompt for an idea.
pub fn questions_prompt(idea: &str) -> String {
    let mut prompt = String::with_capacity(768);
    prompt.push_str(&format!("Analyze this app idea: \"{}\"\n\n", idea.trim()));
    prompt.push_str("Task: Generate 3 to 5 specific, technical clarifying questions.\n\n");
    prompt.push_str("Constraints:\n");
    prompt.push_str("- Do NOT ask \"Who is the target audience?\" (Assume we know).\n");
    prompt.push_str("- Do NOT ask \"What is the budget?\" (We already know).\n");
    prompt.push_str(
        "- Ask about: Technical complexity, Real-time needs, Data volume, or specific integrations.\n",
    );
    prompt.push_str("- Be curious and challenging.\n\n");
    prompt.push_str("Output Format: Just the questions, one per line, numbered 1-5.\n");
    prompt
}

// ---------------------------------------------------------------------------
// Plan synthesis
// ---------------------------------------------------------------------------

/// Everything the plan prompt interpolates.
#[derive(Debug, Clone)]
pub struct PlanPromptContext<'a> {
    pub idea: &'a str,
    pub budget: &'a str,
    pub skill: &'a str,
    pub priority: &'a str,
    /// Rendered Q/A pairs, or [`SKIPPED_QUESTIONS`].
    pub qa_context: &'a str,
    pub search_digest: &'a str,
    pub persona: Persona,
}

/// Render the Q/A pairs as `Q: .. -> A: ..` lines.
///
/// Falls back to [`SKIPPED_QUESTIONS`] unless both lists are non-empty.
pub fn qa_context(questions: &[String], answers: &[String]) -> String {
    if questions.is_empty() || answers.is_empty() {
        return SKIPPED_QUESTIONS.to_string();
    }
    questions
        .iter()
        .zip(answers)
        .map(|(q, a)| format!("Q: {q} -> A: {a}"))
        .collect::<Vec<_>>()
        .join("\n")
}

const STRICT_RULES: &str = r#"## STRICT RULES (DO NOT BREAK)
1. **NO GENERIC ADVICE:** Do not say "Use a database." You MUST say "Use Supabase."
2. **NO ABSTRACTIONS:** Do not say "Implement Authentication." Say "Set up Clerk for authentication."
3. **CONNECT THE DOTS:** Explain exactly how Tool A talks to Tool B (e.g., "Use Make to send data from FlutterFlow to Supabase").
4. **BUDGET CONSCIOUS:** If the user budget is low, DO NOT recommend expensive enterprise tools.
"#;

const OUTPUT_SCHEMA: &str = r#"## JSON OUTPUT FORMAT (Strict JSON only, no commentary)
{
    "pro_tip": "A single, specific 'Golden Nugget' of advice for this exact idea.",
    "stack_reasoning": "A short paragraph explaining why this specific stack fits the budget/skill constraints. Mention the search results if relevant.",
    "tools_list": ["Tool Name 1", "Tool Name 2", "Tool Name 3"],
    "budget_breakdown": [
        {"item": "Tool Name 1", "cost": "$X/mo"},
        {"item": "Tool Name 2", "cost": "$Y/mo"},
        {"item": "Total Estimated Cost", "cost": "$Z/mo"}
    ],
    "build_steps": [
        "Step 1: Go to [Specific Tool] and create a project...",
        "Step 2: Connect [Specific Tool] to [Other Tool] using...",
        "Step 3: ..."
    ],
    "copy_paste_prompt": "A detailed prompt the user can paste into the AI Tool (like Replit or Cursor) to start building immediately."
}

Every entry in "tools_list" MUST be a name from YOUR TOOLBOX, spelled exactly as listed.
The last "budget_breakdown" entry MUST be the "Total Estimated Cost".
"#;

/// Build the plan-synthesis prompt.
pub fn plan_prompt(catalog: &Catalog, ctx: &PlanPromptContext<'_>) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "You are a Senior Solutions Architect. Your job is to build concrete, actionable tech stacks.\n\n",
    );

    prompt.push_str("## YOUR TOOLBOX (You MUST pick from this list)\n");
    prompt.push_str(&catalog.toolbox_listing());
    prompt.push_str("\n\n");

    prompt.push_str(STRICT_RULES);
    prompt.push('\n');

    prompt.push_str(&format!("## APP IDEA\n{}\n\n", ctx.idea.trim()));

    prompt.push_str("## USER CONSTRAINTS\n");
    prompt.push_str(&format!("- Budget: {}\n", ctx.budget));
    prompt.push_str(&format!("- Skill Level: {}\n", ctx.skill));
    prompt.push_str(&format!("- Priority: {}\n\n", ctx.priority));

    prompt.push_str(&format!("## USER ANSWERS\n{}\n\n", ctx.qa_context));
    prompt.push_str(&format!("## LIVE SEARCH CONTEXT\n{}\n\n", ctx.search_digest));
    prompt.push_str(&format!("## TONE\n{}\n\n", ctx.persona.instruction()));

    prompt.push_str(
        "Your Goal: Create a specific, actionable build plan using the Available Tools and Search Results.\n\n",
    );
    prompt.push_str(OUTPUT_SCHEMA);

    prompt
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
