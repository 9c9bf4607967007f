//! Request and result types for plan generation, plus markdown export.

use nalp_store::HistoryRecord;
use serde::{Deserialize, Serialize};

use crate::catalog::ToolEntry;
use crate::prompt::Persona;

/// Input to clarifying-question generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaRequest {
    pub app_idea: String,
}

fn default_vibe() -> String {
    Persona::default().label().to_string()
}

/// Input to plan generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub app_idea: String,
    #[serde(default)]
    pub questions: Vec<String>,
    /// Parallel to `questions`, or empty.
    #[serde(default)]
    pub answers: Vec<String>,
    pub budget: String,
    pub skill: String,
    pub priority: String,
    /// Persona label; unknown labels resolve to "Senior Engineer".
    #[serde(default = "default_vibe")]
    pub vibe: String,
}

impl PlanRequest {
    /// Check the request before any external call.
    ///
    /// Answers, when given alongside questions, must pair up one-to-one.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_idea.trim().is_empty() {
            return Err("app_idea must not be empty".to_string());
        }
        if !self.questions.is_empty()
            && !self.answers.is_empty()
            && self.questions.len() != self.answers.len()
        {
            return Err(format!(
                "got {} answers for {} questions",
                self.answers.len(),
                self.questions.len()
            ));
        }
        Ok(())
    }

    pub fn persona(&self) -> Persona {
        Persona::resolve(&self.vibe)
    }
}

/// One line of the cost breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub item: String,
    pub cost: String,
}

/// A synthesized build plan.
///
/// Every field but `detected_tools` comes from the model; `detected_tools`
/// is filled in afterwards from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResult {
    pub pro_tip: String,
    pub stack_reasoning: String,
    pub tools_list: Vec<String>,
    pub budget_breakdown: Vec<BudgetItem>,
    pub build_steps: Vec<String>,
    pub copy_paste_prompt: String,
    #[serde(default)]
    pub detected_tools: Vec<ToolEntry>,
}

impl PlanResult {
    /// The final budget line, expected to be the total.
    pub fn total_cost(&self) -> Option<&BudgetItem> {
        self.budget_breakdown.last()
    }

    /// Decode the plan embedded in a history record.
    pub fn from_history(record: &HistoryRecord) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&record.plan)
    }

    /// Wrap this plan in a new history record with a generated id and the
    /// current time.
    pub fn to_history(
        &self,
        app_idea: &str,
        budget: &str,
        skill: &str,
    ) -> Result<HistoryRecord, serde_json::Error> {
        let plan = serde_json::to_string(self)?;
        Ok(HistoryRecord::new_now(app_idea, budget, skill, plan))
    }

    /// Render a shareable markdown blueprint.
    pub fn to_markdown(&self, idea: &str) -> String {
        let mut md = String::with_capacity(1024);
        md.push_str(&format!("# Blueprint: {}\n\n", idea.trim()));
        md.push_str(&format!("### Pro Tip\n{}\n\n", self.pro_tip));
        md.push_str(&format!("### Recommended Stack\n{}\n\n", self.stack_reasoning));

        md.push_str("### Cost Breakdown\n");
        for line in &self.budget_breakdown {
            md.push_str(&format!("- **{}**: {}\n", line.item, line.cost));
        }

        md.push_str("\n### Build Steps\n");
        for step in &self.build_steps {
            md.push_str(&format!("- {step}\n"));
        }

        if !self.detected_tools.is_empty() {
            md.push_str("\n### Links\n");
            for tool in &self.detected_tools {
                md.push_str(&format!("- [{}]({}) ({}, {})\n", tool.name, tool.url, tool.category, tool.cost));
            }
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> PlanResult {
        PlanResult {
            pro_tip: "Start with the leaderboard.".to_string(),
            stack_reasoning: "FlutterFlow plus Supabase keeps you under budget.".to_string(),
            tools_list: vec!["FlutterFlow".to_string(), "Supabase".to_string()],
            budget_breakdown: vec![
                BudgetItem {
                    item: "FlutterFlow".to_string(),
                    cost: "$30/mo".to_string(),
                },
                BudgetItem {
                    item: "Total Estimated Cost".to_string(),
                    cost: "$30/mo".to_string(),
                },
            ],
            build_steps: vec![
                "Step 1: Create a FlutterFlow project.".to_string(),
                "Step 2: Connect FlutterFlow to Supabase.".to_string(),
            ],
            copy_paste_prompt: "Build a fitness tracker...".to_string(),
            detected_tools: vec![],
        }
    }

    fn request() -> PlanRequest {
        PlanRequest {
            app_idea: "a fitness tracking app".to_string(),
            questions: vec![],
            answers: vec![],
            budget: "$50".to_string(),
            skill: "Beginner".to_string(),
            priority: "Speed".to_string(),
            vibe: "Senior Engineer".to_string(),
        }
    }

    #[test]
    fn plan_request_defaults_vibe_and_lists() {
        let req: PlanRequest = serde_json::from_str(
            r#"{"app_idea":"x","budget":"Free","skill":"Pro","priority":"Scale"}"#,
        )
        .unwrap();
        assert_eq!(req.vibe, "Senior Engineer");
        assert!(req.questions.is_empty());
        assert!(req.answers.is_empty());
    }

    #[test]
    fn validate_accepts_matching_or_missing_answers() {
        let mut req = request();
        assert!(req.validate().is_ok());

        req.questions = vec!["a?".to_string(), "b?".to_string()];
        assert!(req.validate().is_ok(), "answers may be empty");

        req.answers = vec!["x".to_string(), "y".to_string()];
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validate_rejects_mismatched_answers() {
        let mut req = request();
        req.questions = vec!["a?".to_string(), "b?".to_string()];
        req.answers = vec!["x".to_string()];
        let err = req.validate().unwrap_err();
        assert_eq!(err, "got 1 answers for 2 questions");
    }

    #[test]
    fn validate_rejects_blank_idea() {
        let mut req = request();
        req.app_idea = "   ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn plan_result_requires_model_fields() {
        let missing_steps = r#"{"pro_tip":"a","stack_reasoning":"b","tools_list":[],
            "budget_breakdown":[],"copy_paste_prompt":"c"}"#;
        assert!(serde_json::from_str::<PlanResult>(missing_steps).is_err());
    }

    #[test]
    fn history_roundtrip_preserves_plan() {
        let plan = sample_plan();
        let record = plan.to_history("a fitness tracking app", "$50", "Beginner").unwrap();
        assert_eq!(record.app_idea, "a fitness tracking app");
        assert_eq!(PlanResult::from_history(&record).unwrap(), plan);
    }

    #[test]
    fn total_cost_is_last_budget_line() {
        assert_eq!(sample_plan().total_cost().unwrap().item, "Total Estimated Cost");
    }

    #[test]
    fn markdown_lists_costs_and_steps() {
        let md = sample_plan().to_markdown("a fitness tracking app");
        assert!(md.starts_with("# Blueprint: a fitness tracking app"));
        assert!(md.contains("### Pro Tip\nStart with the leaderboard."));
        assert!(md.contains("- **FlutterFlow**: $30/mo"));
        assert!(md.contains("- **Total Estimated Cost**: $30/mo"));
        assert!(md.contains("- Step 2: Connect FlutterFlow to Supabase."));
        assert!(!md.contains("### Links"));
    }
}
