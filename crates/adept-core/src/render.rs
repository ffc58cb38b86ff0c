// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Backend-agnostic description of what the display should show after a turn.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub use adept_gateway::StatusIndicator;

// ── Input mode ────────────────────────────────────────────────────────────────

/// Sub-context tag of the predictive-search overlay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum SearchContext {
    Problems,
    #[default]
    General,
    Other(String),
}

impl SearchContext {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "problems" => SearchContext::Problems,
            "" | "general" => SearchContext::General,
            other => SearchContext::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SearchContext::Problems => "problems",
            SearchContext::General => "general",
            SearchContext::Other(tag) => tag,
        }
    }

    pub fn is_problems(&self) -> bool {
        matches!(self, SearchContext::Problems)
    }
}

impl fmt::Display for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which affordances are currently valid.  Exactly one mode holds at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum InputMode {
    /// No session.
    #[default]
    Idle,
    /// Buttons shown, no text expected.
    AwaitingChoice,
    /// Free text expected; `context` is the engine's input-context tag.
    AwaitingText { context: Option<String> },
    /// Predictive search overlay live.
    SearchActive {
        context: SearchContext,
        placeholder: Option<String>,
    },
}

impl InputMode {
    pub fn name(&self) -> &'static str {
        match self {
            InputMode::Idle => "idle",
            InputMode::AwaitingChoice => "awaiting-choice",
            InputMode::AwaitingText { .. } => "awaiting-text",
            InputMode::SearchActive { .. } => "search-active",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InputMode::Idle)
    }

    pub fn is_search(&self) -> bool {
        matches!(self, InputMode::SearchActive { .. })
    }

    pub fn accepts_buttons(&self) -> bool {
        matches!(self, InputMode::AwaitingChoice | InputMode::SearchActive { .. })
    }

    pub fn accepts_text(&self) -> bool {
        matches!(self, InputMode::AwaitingText { .. } | InputMode::SearchActive { .. })
    }

    pub fn search_context(&self) -> Option<&SearchContext> {
        match self {
            InputMode::SearchActive { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::SearchActive { context, .. } => write!(f, "{}({context})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

// ── Message text ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TextSpan {
    Plain(String),
    Bold(String),
    LineBreak,
}

/// Reply text with the restricted markup resolved: `**bold**` and newlines.
/// Nothing else in the text is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MessageText {
    spans: Vec<TextSpan>,
}

fn bold_pattern() -> &'static Regex {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    BOLD.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold markup pattern is valid"))
}

impl MessageText {
    pub fn parse(raw: &str) -> Self {
        let mut spans = Vec::new();
        for (i, line) in raw.split('\n').enumerate() {
            if i > 0 {
                spans.push(TextSpan::LineBreak);
            }
            let mut last = 0;
            for caps in bold_pattern().captures_iter(line) {
                let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if whole.start() > last {
                    spans.push(TextSpan::Plain(line[last..whole.start()].to_string()));
                }
                spans.push(TextSpan::Bold(inner.as_str().to_string()));
                last = whole.end();
            }
            if last < line.len() {
                spans.push(TextSpan::Plain(line[last..].to_string()));
            }
        }
        Self { spans }
    }

    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }

    /// Text without markup; line breaks become `\n`.
    pub fn plain(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match span {
                TextSpan::Plain(t) | TextSpan::Bold(t) => out.push_str(t),
                TextSpan::LineBreak => out.push('\n'),
            }
        }
        out
    }

    /// HTML rendition using only `<strong>` and `<br>`.  Text content is
    /// escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match span {
                TextSpan::Plain(t) => out.push_str(&escape_html(t)),
                TextSpan::Bold(t) => {
                    out.push_str("<strong>");
                    out.push_str(&escape_html(t));
                    out.push_str("</strong>");
                }
                TextSpan::LineBreak => out.push_str("<br>"),
            }
        }
        out
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain())
    }
}

// ── Render instruction ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub label: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchActivation {
    pub context: SearchContext,
    pub placeholder: Option<String>,
}

/// Produced once per backend reply and consumed once by the display sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderInstruction {
    pub message: Option<MessageText>,
    pub status_indicators: Vec<StatusIndicator>,
    pub buttons: Vec<ActionButton>,
    pub next_mode: InputMode,
    pub search: Option<SearchActivation>,
}

impl RenderInstruction {
    pub fn button_labels(&self) -> Vec<&str> {
        self.buttons.iter().map(|b| b.label.as_str()).collect()
    }
}
