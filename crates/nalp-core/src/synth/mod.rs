//! Plan synthesis: clarifying questions and build plans.
//!
//! The [`Synthesizer`] wires the catalog, a [`LanguageModel`] and an
//! optional [`SearchProvider`] together. It holds no per-request state and
//! is shared across handlers behind an `Arc`.

mod parse;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ToolEntry};
use crate::llm::{GenerateRequest, LanguageModel, LlmError, ModelConfig};
use crate::plan::{PlanRequest, PlanResult};
use crate::prompt::{self, PlanPromptContext};
use crate::search::{self, SearchConfig, SearchProvider};

pub use parse::{MAX_QUESTIONS, parse_plan_response, parse_questions};

/// Questions returned whenever question generation fails for a reason other
/// than configuration.
pub const FALLBACK_QUESTIONS: [&str; 3] = [
    "Does this app need real-time chat?",
    "Will users upload videos/images?",
    "Do you need a web admin panel?",
];

/// Upper bound on a server-suggested wait before the plan retry.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(10);

pub fn fallback_questions() -> Vec<String> {
    FALLBACK_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

/// Search query for an idea, anchored to the current year.
pub fn search_query(idea: &str) -> String {
    format!(
        "best no-code tools to build {} {}",
        idea.trim(),
        Utc::now().year()
    )
}

/// Errors from plan synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The service is missing configuration (e.g. the API key).
    #[error("{0}")]
    Config(String),

    /// The request failed validation before any external call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model call failed: {0}")]
    Model(LlmError),

    /// The model answered but the answer could not be used.
    #[error("could not parse model response: {0}")]
    Parse(String),
}

impl From<LlmError> for SynthesisError {
    fn from(e: LlmError) -> Self {
        if e.is_config() {
            SynthesisError::Config(e.to_string())
        } else {
            SynthesisError::Model(e)
        }
    }
}

/// Tunables for a [`Synthesizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizerOptions {
    pub question_temperature: f32,
    /// Extra attempts after a transient model failure during plan synthesis.
    pub plan_retries: u32,
    /// Wait before a retry when the model gave no `retry-after`.
    pub retry_backoff: Duration,
    pub search_max_results: usize,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default(), &SearchConfig::default())
    }
}

impl SynthesizerOptions {
    pub fn from_config(model: &ModelConfig, search: &SearchConfig) -> Self {
        Self {
            question_temperature: model.question_temperature,
            plan_retries: model.plan_retries,
            retry_backoff: Duration::from_secs(2),
            search_max_results: search.max_results,
        }
    }
}

/// Turns ideas into questions and questions into plans.
pub struct Synthesizer {
    catalog: Arc<Catalog>,
    model: Arc<dyn LanguageModel>,
    search: Option<Arc<dyn SearchProvider>>,
    options: SynthesizerOptions,
}

impl Synthesizer {
    /// `search: None` disables web search; the fallback digest is used.
    pub fn new(
        catalog: Arc<Catalog>,
        model: Arc<dyn LanguageModel>,
        search: Option<Arc<dyn SearchProvider>>,
        options: SynthesizerOptions,
    ) -> Self {
        Self {
            catalog,
            model,
            search,
            options,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    fn ensure_configured(&self) -> Result<(), SynthesisError> {
        if self.model.is_configured() {
            return Ok(());
        }
        Err(SynthesisError::Config(format!(
            "model {} has no API key configured",
            self.model.model_id()
        )))
    }

    /// Generate up to five clarifying questions for an idea.
    ///
    /// Only configuration errors escape. Model, network and parse failures
    /// are logged and answered with [`FALLBACK_QUESTIONS`].
    pub async fn generate_questions(&self, idea: &str) -> Result<Vec<String>, SynthesisError> {
        self.ensure_configured()?;

        match self.try_generate_questions(idea).await {
            Ok(questions) => {
                debug!(count = questions.len(), "generated clarifying questions");
                Ok(questions)
            }
            Err(SynthesisError::Config(msg)) => Err(SynthesisError::Config(msg)),
            Err(e) => {
                warn!(error = %e, "question generation failed, using fallback questions");
                Ok(fallback_questions())
            }
        }
    }

    async fn try_generate_questions(&self, idea: &str) -> Result<Vec<String>, SynthesisError> {
        let request = GenerateRequest::text(prompt::questions_prompt(idea))
            .with_temperature(self.options.question_temperature);
        let text = self.model.generate(request).await?;
        parse_questions(&text)
    }

    /// Produce a structured build plan.
    ///
    /// The request is validated and the model configuration checked before
    /// search or model traffic. Transient model errors are retried up to
    /// `plan_retries` times; unusable responses are never retried.
    pub async fn generate_plan(&self, request: &PlanRequest) -> Result<PlanResult, SynthesisError> {
        request.validate().map_err(SynthesisError::InvalidRequest)?;
        self.ensure_configured()?;

        let query = search_query(&request.app_idea);
        let digest = search::search_digest(
            self.search.as_deref(),
            &query,
            self.options.search_max_results,
        )
        .await;

        let persona = request.persona();
        let qa = prompt::qa_context(&request.questions, &request.answers);
        let ctx = PlanPromptContext {
            idea: &request.app_idea,
            budget: &request.budget,
            skill: &request.skill,
            priority: &request.priority,
            qa_context: &qa,
            search_digest: &digest,
            persona,
        };
        let plan_prompt = prompt::plan_prompt(&self.catalog, &ctx);

        let text = self
            .generate_with_retry(GenerateRequest::json(plan_prompt))
            .await?;
        let mut plan = parse_plan_response(&text)?;

        plan.detected_tools =
            detect_tools(&self.catalog, &plan).map_err(|e| SynthesisError::Parse(e.to_string()))?;

        let unknown = self.catalog.unknown_names(&plan.tools_list);
        if !unknown.is_empty() {
            warn!(?unknown, "plan names tools outside the catalog");
        }

        info!(
            persona = %persona,
            tools = plan.tools_list.len(),
            steps = plan.build_steps.len(),
            detected = plan.detected_tools.len(),
            "plan synthesized"
        );
        Ok(plan)
    }

    async fn generate_with_retry(&self, request: GenerateRequest) -> Result<String, SynthesisError> {
        let mut attempt = 0u32;
        loop {
            match self.model.generate(request.clone()).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.options.plan_retries => {
                    attempt += 1;
                    let delay = e
                        .retry_after()
                        .map(|d| d.min(MAX_RETRY_WAIT))
                        .unwrap_or(self.options.retry_backoff);
                    warn!(
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "transient model error, retrying plan synthesis"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Catalog entries mentioned anywhere in the serialized plan, in catalog
/// order.
pub fn detect_tools(catalog: &Catalog, plan: &PlanResult) -> Result<Vec<ToolEntry>, serde_json::Error> {
    let mut visible = plan.clone();
    visible.detected_tools.clear();
    let text = serde_json::to_string(&visible)?;
    Ok(catalog.detect(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::BudgetItem;

    fn plan_mentioning(text: &str) -> PlanResult {
        PlanResult {
            pro_tip: text.to_string(),
            stack_reasoning: String::new(),
            tools_list: vec![],
            budget_breakdown: vec![BudgetItem {
                item: "Total Estimated Cost".to_string(),
                cost: "$0/mo".to_string(),
            }],
            build_steps: vec![],
            copy_paste_prompt: String::new(),
            detected_tools: vec![],
        }
    }

    #[test]
    fn search_query_names_idea_and_year() {
        let query = search_query("  a habit tracker ");
        assert!(query.starts_with("best no-code tools to build a habit tracker "));
        assert!(query.ends_with(&Utc::now().year().to_string()));
    }

    #[test]
    fn fallback_has_three_questions() {
        let qs = fallback_questions();
        assert_eq!(qs.len(), 3);
        assert!(qs.iter().all(|q| q.ends_with('?')));
    }

    #[test]
    fn missing_key_maps_to_config_error() {
        let err: SynthesisError = LlmError::MissingApiKey("GEMINI_API_KEY".into()).into();
        assert!(matches!(err, SynthesisError::Config(ref m) if m == "GEMINI_API_KEY missing"));

        let err: SynthesisError = LlmError::InvalidResponse("empty".into()).into();
        assert!(matches!(err, SynthesisError::Model(_)));
    }

    #[test]
    fn detection_ignores_case_and_keeps_catalog_order() {
        let catalog = Catalog::builtin().unwrap();
        let plan = plan_mentioning("use CLERK for auth and supabase for data");
        let names: Vec<_> = detect_tools(&catalog, &plan)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Supabase", "Clerk"]);
    }

    #[test]
    fn detection_ignores_previous_detections() {
        let catalog = Catalog::builtin().unwrap();
        let mut plan = plan_mentioning("nothing relevant");
        plan.detected_tools = catalog.detect("Clerk");
        assert!(detect_tools(&catalog, &plan).unwrap().is_empty());
    }

    #[test]
    fn default_options_follow_config_defaults() {
        let opts = SynthesizerOptions::default();
        assert_eq!(opts.plan_retries, 1);
        assert_eq!(opts.search_max_results, 3);
        assert!((opts.question_temperature - 0.9).abs() < f32::EPSILON);
    }
}
