//! Parsing of model responses.
//!
//! Both parsers return explicit errors; deciding whether a failure degrades
//! to a fallback is left to the caller.

use tracing::debug;

use super::SynthesisError;
use crate::plan::PlanResult;

/// Maximum number of clarifying questions kept from a response.
pub const MAX_QUESTIONS: usize = 5;

fn is_bullet(c: char) -> bool {
    matches!(c, '-' | '*' | '•' | '·' | '#' | '>') || c.is_whitespace()
}

/// Strip a leading list marker such as `1.`, `2)`, `3 - `, `-`, `*` or `•`.
///
/// A leading number only counts as a marker when whitespace or a separator
/// follows it, so `3D models` keeps its digit.
fn strip_enumeration(line: &str) -> &str {
    let rest = line.trim_start_matches(is_bullet);
    let after_digits = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if after_digits.len() < rest.len() {
        let gap = after_digits.trim_start();
        let after_sep = gap.trim_start_matches(['.', ')', ':', '-']);
        if after_sep.len() < gap.len() || gap.len() < after_digits.len() {
            after_sep
        } else {
            rest
        }
    } else {
        rest
    };
    rest.trim_start_matches(is_bullet).trim()
}

/// Split a free-text response into at most [`MAX_QUESTIONS`] questions.
///
/// Blank lines are dropped and list markers stripped. A response with no
/// usable line is an error.
pub fn parse_questions(text: &str) -> Result<Vec<String>, SynthesisError> {
    let questions: Vec<String> = text
        .lines()
        .map(strip_enumeration)
        .filter(|l| !l.is_empty())
        .take(MAX_QUESTIONS)
        .map(str::to_owned)
        .collect();

    if questions.is_empty() {
        return Err(SynthesisError::Parse(
            "model response contained no questions".to_string(),
        ));
    }
    Ok(questions)
}

/// Body of the first fenced code block, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_open = &text[start + 3..];
    // Skip the language tag line (e.g. "json").
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// The span from the first `{` to the last `}`.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a plan response body into a [`PlanResult`].
///
/// The whole body is tried first. If that fails, JSON wrapped in a code
/// fence or surrounded by commentary is recovered. Anything else is a hard
/// error carrying the original parse message.
pub fn parse_plan_response(text: &str) -> Result<PlanResult, SynthesisError> {
    let trimmed = text.trim();
    let first_error = match serde_json::from_str::<PlanResult>(trimmed) {
        Ok(plan) => return Ok(plan),
        Err(e) => e,
    };

    for candidate in [fenced_block(trimmed), outer_object(trimmed)]
        .into_iter()
        .flatten()
    {
        if let Ok(plan) = serde_json::from_str::<PlanResult>(candidate) {
            debug!("recovered plan JSON from surrounding text");
            return Ok(plan);
        }
    }

    Err(SynthesisError::Parse(first_error.to_string()))
}
