//! Axioms extracted from the active document.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Language;

/// Number of axioms requested per document.
pub const AXIOM_COUNT: usize = 6;

/// A titled statement anchored in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axiom {
    pub title: String,
    pub definition: String,
}

/// The axiom set for one (document, language) pair. Replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxiomSet {
    pub document: String,
    pub language: Language,
    pub items: Vec<Axiom>,
}

impl AxiomSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Deserialize)]
struct RawAxiom {
    #[serde(default)]
    title: String,
    #[serde(default)]
    definition: String,
}

/// Parse the model's JSON reply into axioms.
///
/// Accepts any count and an optional markdown fence around the JSON.
/// Entries without a title are dropped. Unparseable input yields no axioms.
pub fn parse_axioms(raw: &str) -> Vec<Axiom> {
    match serde_json::from_str::<Vec<RawAxiom>>(strip_json_fence(raw)) {
        Ok(entries) => entries
            .into_iter()
            .filter_map(|e| {
                let title = e.title.trim();
                (!title.is_empty()).then(|| Axiom {
                    title: title.to_string(),
                    definition: e.definition.trim().to_string(),
                })
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, len = raw.len(), "Failed to parse axioms");
            Vec::new()
        }
    }
}

fn strip_json_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
