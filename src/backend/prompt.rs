//! Instruction profile and request texts sent to the model.

use serde_json::json;

use crate::session::{Language, AXIOM_COUNT};

/// Fixed system instruction describing the analyst persona and output rules.
pub const INSTRUCTION_PROFILE: &str = "\
You are a research analyst specialised in close reading and stylometry. \
You act as a bridge between the reader and the uploaded document, and you keep \
the depth and vocabulary of the source intact.

Identity: if asked who built you, answer that you are an analytical model developed \
and trained by the Knowledge AI team. Do not describe yourself as a general-purpose \
AI or large language model.

Before answering anything, including axioms, analyse internally:
1. The broader context of the text: historical, philosophical or scientific.
2. How the author delivers information and builds arguments.
3. The author's linguistic and rhetorical habits.
4. The tone of the text's discipline.

When answering:
- Ground every claim in the document and stay within its context.
- Quote or closely paraphrase the manuscript where it strengthens the answer.
- Put code in fenced markdown blocks with a language tag.
- Write formulas in LaTeX: $...$ inline and $$...$$ for display.
- Mirror the register of the source text.
- Use ### for titles and ***text*** for bold-italic emphasis.
- Answer in the language of the user's message, Arabic or English.

Axioms: titles and definitions must be anchored in the document, and each \
definition should state a structural pillar of the text's logic.";

/// System instruction for the chat, pinned to `language`.
pub fn chat_system_instruction(language: Language) -> String {
    format!("{INSTRUCTION_PROFILE}\nTarget language: {}.", language.name())
}

/// Opening request that primes the chat on the document.
pub fn initiation_request(document_name: &str) -> String {
    format!(
        "Begin document analysis. Study the context, style and structure of \"{document_name}\". \
         Once you have it, give a short scholarly summary of how you will approach this text."
    )
}

/// Request for the axiom batch.
pub fn axiom_request(language: Language) -> String {
    format!(
        "Analyse this document's structure and the author's style. Identify its most significant \
         titles, headings and conceptual pillars, then extract exactly {AXIOM_COUNT} axiomatic \
         truths grounded in those sections. {} Return a JSON array of objects with 'title' and \
         'definition'.",
        language.output_instruction()
    )
}

/// Response schema for the axiom batch: an array of `{title, definition}`.
pub fn axiom_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "definition": { "type": "STRING" }
            },
            "required": ["title", "definition"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_instruction_names_language() {
        assert!(chat_system_instruction(Language::Arabic).ends_with("Target language: Arabic."));
        assert!(chat_system_instruction(Language::English).starts_with(INSTRUCTION_PROFILE));
    }

    #[test]
    fn test_axiom_request_pins_language_and_count() {
        let request = axiom_request(Language::Arabic);
        assert!(request.contains("exactly 6"));
        assert!(request.contains("Output the response entirely in Arabic."));
    }

    #[test]
    fn test_initiation_request_names_document() {
        assert!(initiation_request("paper.pdf").contains("\"paper.pdf\""));
    }

    #[test]
    fn test_axiom_schema_shape() {
        let schema = axiom_schema();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["required"], json!(["title", "definition"]));
    }
}
