//! Generated markup helpers: fence cleanup and a short summary.
//!
//! The generation endpoint returns LaTeX produced by a language model, which
//! occasionally wraps its answer in Markdown code fences (```` ```latex ````).
//! [`clean_markup`] removes those deterministically; the wizard applies it
//! only when [`crate::config::WizardConfig::clean_markup`] is set, so by
//! default the stored markup is exactly what the backend returned.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static RE_LATEX_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```latex").unwrap());

/// Strip every ```` ```latex ```` and ```` ``` ```` marker, then trim.
pub fn clean_markup(input: &str) -> String {
    let s = input.trim();
    let s = RE_LATEX_FENCE.replace_all(s, "");
    s.replace("```", "").trim().to_string()
}

/// Quick facts about a piece of generated markup, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupSummary {
    pub lines: usize,
    pub bytes: usize,
    /// Contains `\documentclass`, i.e. looks like a complete document.
    pub is_full_document: bool,
    /// Number of `\item` entries (exercises, in practice).
    pub items: usize,
}

/// Summarise `markup`.
pub fn summarize(markup: &str) -> MarkupSummary {
    MarkupSummary {
        lines: markup.lines().count(),
        bytes: markup.len(),
        is_full_document: markup.contains(r"\documentclass"),
        items: markup.matches(r"\item").count(),
    }
}
