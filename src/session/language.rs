//! Research language and localized labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output language for axioms, chat replies and UI labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en", alias = "EN", alias = "english")]
    English,
    #[serde(rename = "ar", alias = "AR", alias = "arabic")]
    Arabic,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown language '{0}' (expected en or ar)")]
pub struct ParseLanguageError(pub String);

/// Fixed UI strings for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub axioms_heading: &'static str,
    pub extracted_from: &'static str,
    pub axiom: &'static str,
    pub user: &'static str,
    pub assistant: &'static str,
    pub ready: &'static str,
    pub inquiry_hint: &'static str,
    pub synthesizing: &'static str,
    pub disclaimer: &'static str,
}

const ENGLISH_LABELS: Labels = Labels {
    axioms_heading: "Conceptual Axioms",
    extracted_from: "Extracted Wisdom",
    axiom: "AXIOM",
    user: "Researcher",
    assistant: "The Sanctuary",
    ready: "Analysis Protocol Ready",
    inquiry_hint: "Direct inquiry to the source...",
    synthesizing: "Deconstructing stylometry...",
    disclaimer: "Disclaimer: read and understand the document before using this tool. \
                 It organizes thoughts and supports brainstorming around the text; \
                 it does not replace direct reading.",
};

const ARABIC_LABELS: Labels = Labels {
    axioms_heading: "المسلّمات المعرفية",
    extracted_from: "الحكمة المستخلصة",
    axiom: "مسلّمة",
    user: "الباحث",
    assistant: "المعرفة",
    ready: "بروتوكول التحليل جاهز",
    inquiry_hint: "وجه استفساراً مباشراً للمصدر...",
    synthesizing: "جارٍ تفكيك الأسلوب...",
    disclaimer: "تنبيه: يجب قراءة الملف وفهمه جيداً قبل استخدام هذه الأداة. \
                 هذه المنصة لا تعوض عن القراءة المباشرة، وإنما تنظم الأفكار وتولد عصفاً ذهنياً حول بنية النص.",
};

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Arabic];

    /// Two-letter display code.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "EN",
            Language::Arabic => "AR",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Arabic => "Arabic",
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Language::Arabic)
    }

    /// Sentence appended to generation requests to pin the output language.
    pub fn output_instruction(self) -> &'static str {
        match self {
            Language::English => "Output the response entirely in English.",
            Language::Arabic => "Output the response entirely in Arabic.",
        }
    }

    pub fn labels(self) -> &'static Labels {
        match self {
            Language::English => &ENGLISH_LABELS,
            Language::Arabic => &ARABIC_LABELS,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "ar" | "arabic" | "عربي" | "العربية" => Ok(Language::Arabic),
            _ => Err(ParseLanguageError(s.trim().to_string())),
        }
    }
}
