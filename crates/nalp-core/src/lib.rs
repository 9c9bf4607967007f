//! Core logic for nalp: the tool catalog, the model and search
//! collaborators, prompt construction, and plan synthesis.

pub mod catalog;
pub mod llm;
pub mod plan;
pub mod prompt;
pub mod search;
pub mod synth;

pub use catalog::{Catalog, CatalogError, ToolEntry};
pub use plan::{BudgetItem, IdeaRequest, PlanRequest, PlanResult};
pub use synth::{SynthesisError, Synthesizer, SynthesizerOptions};
