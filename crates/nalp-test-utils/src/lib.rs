//! Shared test doubles for nalp integration tests.
//!
//! Provides a scripted language model, canned search providers and sample
//! plan payloads so tests never touch the network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nalp_core::llm::{GenerateRequest, LanguageModel, LlmError};
use nalp_core::search::{SearchError, SearchHit, SearchProvider};

/// A [`LanguageModel`] that replays queued responses in order.
///
/// Every request is recorded. Once the script runs out, calls fail with
/// [`LlmError::InvalidResponse`].
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    configured: bool,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            configured: true,
        }
    }

    /// A model with no API key; `generate` reports it missing.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Queue a successful response.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: Result<String, LlmError>) {
        self.responses
            .lock()
            .expect("script lock poisoned")
            .push_back(response);
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("request lock poisoned").len()
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().expect("request lock poisoned").clone()
    }

    /// Prompt of the most recent request.
    pub fn last_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .last()
            .map(|r| r.prompt.clone())
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted-model"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .push(request);
        if !self.configured {
            return Err(LlmError::MissingApiKey("GEMINI_API_KEY".to_string()));
        }
        self.responses
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }
}

/// A search provider returning fixed hits and counting calls.
pub struct StaticSearch {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(hits: &[(&str, &str)]) -> Self {
        Self {
            hits: hits
                .iter()
                .map(|(title, body)| SearchHit {
                    title: title.to_string(),
                    body: body.to_string(),
                })
                .collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received, oldest first.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("query lock poisoned").clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.queries
            .lock()
            .expect("query lock poisoned")
            .push(query.to_string());
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// A search provider that always fails with a non-success status.
#[derive(Default)]
pub struct FailingSearch {
    calls: AtomicUsize,
}

impl FailingSearch {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FailingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SearchError::Status(503))
    }
}

/// A well-formed plan for a budget fitness tracker, as the model would
/// return it.
pub fn sample_plan_json() -> String {
    serde_json::json!({
        "pro_tip": "Ship the workout log first; social features can wait.",
        "stack_reasoning": "FlutterFlow builds the mobile UI quickly and Supabase covers auth and data on the free tier, keeping you under $50.",
        "tools_list": ["FlutterFlow", "Supabase"],
        "budget_breakdown": [
            {"item": "FlutterFlow", "cost": "$30/mo"},
            {"item": "Supabase", "cost": "$0/mo"},
            {"item": "Total Estimated Cost", "cost": "$30/mo"}
        ],
        "build_steps": [
            "Step 1: Go to FlutterFlow and create a new mobile project.",
            "Step 2: Create a Supabase project with a workouts table.",
            "Step 3: Connect FlutterFlow to Supabase using the built-in integration."
        ],
        "copy_paste_prompt": "Build a fitness tracking app in FlutterFlow backed by Supabase..."
    })
    .to_string()
}

/// The sample plan wrapped in a markdown fence with commentary.
pub fn fenced_plan_json() -> String {
    format!(
        "Here is the plan you asked for:\n```json\n{}\n```\n",
        sample_plan_json()
    )
}
