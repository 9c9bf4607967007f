//! The tool catalog: the closed set of products a plan may recommend.
//!
//! The built-in catalog is defined in `tools.toml` and embedded in the
//! binary at compile time. A [`Catalog`] is built once at startup and shared
//! read-only (behind an `Arc`) with the prompt builder and the synthesizer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single recommendable tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Unique tool name (e.g. `Supabase`).
    pub name: String,
    /// Category such as `Database` or `Hosting`.
    #[serde(rename = "type")]
    pub category: String,
    /// Price tier (e.g. `Free Tier`, `$20/mo`).
    pub cost: String,
    /// Reference link.
    pub url: String,
    /// One-line description of what the tool is best at.
    pub best_for: String,
}

/// Errors from building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("duplicate tool name in catalog: {0:?}")]
    DuplicateName(String),

    #[error("catalog must contain at least one tool")]
    Empty,
}

/// Container for deserializing a catalog TOML document.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    tools: Vec<ToolEntry>,
}

/// The embedded catalog TOML.
static BUILTIN_TOOLS_TOML: &str = include_str!("tools.toml");

/// An immutable, ordered set of [`ToolEntry`] values with unique names.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ToolEntry>,
}

impl Catalog {
    /// Build a catalog from entries, rejecting duplicate names
    /// (compared case-insensitively, since detection is case-insensitive).
    pub fn new(entries: Vec<ToolEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name.to_lowercase()) {
                return Err(CatalogError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Parse a catalog from a TOML document with a `[[tools]]` array.
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.tools)
    }

    /// The catalog shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_TOOLS_TOML)
    }

    /// Look up a tool by name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&ToolEntry> {
        let wanted = name.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[ToolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the toolbox listing embedded in the plan prompt, one line per
    /// tool: `- {name}: {best_for} ({cost})`.
    pub fn toolbox_listing(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- {}: {} ({})", e.name, e.best_for, e.cost))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every tool whose name occurs in `text`, ignoring case.
    ///
    /// Results follow catalog order, not order of appearance, and each tool
    /// appears at most once however often it is mentioned.
    pub fn detect(&self, text: &str) -> Vec<ToolEntry> {
        let haystack = text.to_lowercase();
        self.entries
            .iter()
            .filter(|e| haystack.contains(&e.name.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Names from `names` that are not in the catalog.
    pub fn unknown_names<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .filter(|n| self.lookup(n).is_none())
            .map(String::as_str)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
