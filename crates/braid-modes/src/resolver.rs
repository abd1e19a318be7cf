//! Pure, deterministic query classification. No model calls: category
//! keyword scoring in a fixed priority order, first match wins.

use braid_types::ChatMode;
use chrono::{Datelike, Utc};

const CODE_KEYWORDS: &[&str] = &[
    "code", "function", "bug", "debug", "compile", "error", "python", "javascript", "rust",
    "typescript", "java", "sql", "api", "regex", "script", "class", "refactor", "unit test",
    "stack trace", "algorithm",
];

const MATH_KEYWORDS: &[&str] = &[
    "calculate", "solve", "equation", "integral", "derivative", "proof", "theorem",
    "probability", "matrix", "algebra", "geometry", "arithmetic",
];

const RECENCY_KEYWORDS: &[&str] = &[
    "news", "latest", "today", "current", "recent", "this week", "yesterday", "price",
    "stock", "weather", "happening",
];

const RESEARCH_KEYWORDS: &[&str] = &[
    "research", "in depth", "comprehensive", "analysis", "literature", "survey",
    "deep dive", "compare and contrast", "pros and cons", "detailed report",
];

const CREATIVE_KEYWORDS: &[&str] = &[
    "story", "poem", "creative", "fiction", "novel", "lyrics", "screenplay", "haiku",
    "character", "plot",
];

const TRANSLATION_KEYWORDS: &[&str] = &[
    "translate", "translation", "in french", "in spanish", "in german", "in japanese",
    "in portuguese", "how do you say",
];

/// Minimum distinct-keyword matches per category.
const CODE_THRESHOLD: usize = 2;
const MATH_THRESHOLD: usize = 2;
const RECENCY_THRESHOLD: usize = 2;
const CREATIVE_THRESHOLD: usize = 2;
const TRANSLATION_THRESHOLD: usize = 1;

/// Token-count boundaries for the length-based rules.
const RESEARCH_TOKEN_THRESHOLD: usize = 80;
const TRANSLATION_TOKEN_BOUND: usize = 120;
const SHORT_QUERY_TOKENS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCategory {
    Multimodal,
    Coding,
    Math,
    Recency,
    Research,
    Creative,
    Translation,
    ShortDefault,
    LongDefault,
}

impl QueryCategory {
    /// Primary mode for the category.
    pub fn mode(&self) -> ChatMode {
        match self {
            QueryCategory::Multimodal => ChatMode::GeminiFlash,
            QueryCategory::Coding => ChatMode::ClaudeSonnet,
            QueryCategory::Math => ChatMode::DeepseekR1,
            QueryCategory::Recency => ChatMode::GeminiFlash,
            QueryCategory::Research => ChatMode::Gpt4oMini,
            QueryCategory::Creative => ChatMode::ClaudeSonnet,
            QueryCategory::Translation => ChatMode::Gpt4oMini,
            QueryCategory::ShortDefault => ChatMode::GeminiFlash,
            QueryCategory::LongDefault => ChatMode::Gpt4oMini,
        }
    }

    /// Same-family substitutes, tried in order when the primary mode's
    /// provider has no usable credentials.
    pub fn fallback_modes(&self) -> &'static [ChatMode] {
        match self {
            QueryCategory::Multimodal => &[
                ChatMode::GeminiFlash,
                ChatMode::Gpt4oMini,
                ChatMode::ClaudeSonnet,
            ],
            QueryCategory::Coding | QueryCategory::Creative => &[
                ChatMode::ClaudeSonnet,
                ChatMode::Gpt4oMini,
                ChatMode::GeminiFlash,
                ChatMode::DeepseekR1,
            ],
            QueryCategory::Math => &[
                ChatMode::DeepseekR1,
                ChatMode::O4Mini,
                ChatMode::ClaudeSonnet,
                ChatMode::GeminiFlash,
            ],
            QueryCategory::Recency | QueryCategory::ShortDefault => &[
                ChatMode::GeminiFlash,
                ChatMode::Gpt4oMini,
                ChatMode::ClaudeSonnet,
                ChatMode::DeepseekR1,
            ],
            QueryCategory::Research
            | QueryCategory::Translation
            | QueryCategory::LongDefault => &[
                ChatMode::Gpt4oMini,
                ChatMode::ClaudeSonnet,
                ChatMode::GeminiFlash,
                ChatMode::DeepseekR1,
            ],
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            QueryCategory::Multimodal => "Query includes an image attachment",
            QueryCategory::Coding => "Query looks like a coding task",
            QueryCategory::Math => "Query involves math or structured reasoning",
            QueryCategory::Recency => "Query asks about recent or time-sensitive information",
            QueryCategory::Research => "Query calls for long-form research",
            QueryCategory::Creative => "Query asks for creative writing",
            QueryCategory::Translation => "Query asks for a translation",
            QueryCategory::ShortDefault => "Short query routed to a fast model",
            QueryCategory::LongDefault => "Longer query routed to a balanced model",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeSelection {
    pub mode: ChatMode,
    pub category: QueryCategory,
    pub reason: String,
}

/// Classify a query and pick the mode that should handle it.
/// Deterministic and side-effect free.
pub fn resolve(query: &str, has_image: bool) -> ModeSelection {
    let category = classify(query, has_image, Utc::now().year());
    ModeSelection {
        mode: category.mode(),
        category,
        reason: category.reason().to_string(),
    }
}

pub fn select_mode(query: &str, has_image: bool) -> ChatMode {
    resolve(query, has_image).mode
}

pub fn selection_reason(query: &str, has_image: bool) -> String {
    resolve(query, has_image).reason
}

fn classify(query: &str, has_image: bool, current_year: i32) -> QueryCategory {
    if has_image {
        return QueryCategory::Multimodal;
    }

    let lowered = query.to_lowercase();
    let tokens = lowered.split_whitespace().count();

    if count_matches(&lowered, CODE_KEYWORDS) >= CODE_THRESHOLD {
        return QueryCategory::Coding;
    }
    if count_matches(&lowered, MATH_KEYWORDS) >= MATH_THRESHOLD {
        return QueryCategory::Math;
    }

    // A 4-digit year within the last two calendar years counts as one
    // extra recency match.
    let mut recency_score = count_matches(&lowered, RECENCY_KEYWORDS);
    if contains_recent_year(&lowered, current_year) {
        recency_score += 1;
    }
    if recency_score >= RECENCY_THRESHOLD {
        return QueryCategory::Recency;
    }

    if tokens >= RESEARCH_TOKEN_THRESHOLD || count_matches(&lowered, RESEARCH_KEYWORDS) >= 1 {
        return QueryCategory::Research;
    }
    if count_matches(&lowered, CREATIVE_KEYWORDS) >= CREATIVE_THRESHOLD {
        return QueryCategory::Creative;
    }
    if tokens <= TRANSLATION_TOKEN_BOUND
        && count_matches(&lowered, TRANSLATION_KEYWORDS) >= TRANSLATION_THRESHOLD
    {
        return QueryCategory::Translation;
    }

    if tokens < SHORT_QUERY_TOKENS {
        QueryCategory::ShortDefault
    } else {
        QueryCategory::LongDefault
    }
}

fn count_matches(lowered_query: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|keyword| lowered_query.contains(*keyword))
        .count()
}

fn contains_recent_year(query: &str, current_year: i32) -> bool {
    let bytes = query.as_bytes();
    let mut run = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
        } else {
            run = 0;
            continue;
        }
        if run == 4 {
            // Reject longer digit runs (e.g. 20251 is not a year).
            let followed_by_digit =
                bytes.get(i + 1).is_some_and(|next| next.is_ascii_digit());
            if !followed_by_digit {
                if let Ok(year) = query[i + 1 - 4..=i].parse::<i32>() {
                    if year == current_year || year == current_year - 1 {
                        return true;
                    }
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_bug_query_selects_coding_mode() {
        let selection = resolve("fix this bug in my python function", false);
        assert_eq!(selection.category, QueryCategory::Coding);
        assert_eq!(selection.mode, ChatMode::ClaudeSonnet);
        assert_eq!(selection.reason, "Query looks like a coding task");
    }

    #[test]
    fn two_code_keywords_without_image_select_coding() {
        assert_eq!(
            select_mode("debug this rust compile failure", false),
            QueryCategory::Coding.mode()
        );
    }

    #[test]
    fn image_takes_priority_over_everything() {
        let selection = resolve("fix this bug in my python function", true);
        assert_eq!(selection.category, QueryCategory::Multimodal);
    }

    #[test]
    fn recent_year_bolsters_recency() {
        let year = Utc::now().year();
        let query = format!("latest results from {}", year);
        assert_eq!(resolve(&query, false).category, QueryCategory::Recency);
    }

    #[test]
    fn old_year_does_not_count() {
        assert!(!contains_recent_year("the war ended in 1945", 2026));
        assert!(contains_recent_year("budget for 2026", 2026));
        assert!(contains_recent_year("recap of 2025", 2026));
        assert!(!contains_recent_year("serial 20261 is not a year", 2026));
    }

    #[test]
    fn short_query_defaults_to_fast_mode() {
        let selection = resolve("hello there", false);
        assert_eq!(selection.category, QueryCategory::ShortDefault);
        assert_eq!(selection.mode, ChatMode::GeminiFlash);
    }

    #[test]
    fn long_query_defaults_to_balanced_mode() {
        let query = "please help me plan a two week trip through three countries with \
                     a reasonable budget and some time outdoors";
        assert_eq!(resolve(query, false).category, QueryCategory::LongDefault);
    }

    #[test]
    fn translation_has_upper_token_bound() {
        assert_eq!(
            resolve("translate good morning in french", false).category,
            QueryCategory::Translation
        );

        let long_query = "translate ".to_string() + &"word ".repeat(200);
        assert_ne!(
            resolve(&long_query, false).category,
            QueryCategory::Translation
        );
    }
}
