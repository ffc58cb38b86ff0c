// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ─── Channels ─────────────────────────────────────────────────────────────────

/// Logical request path to the dialogue engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Start,
    Action,
    Text,
    Search,
    CustomSubmission,
    TrackNoResults,
    Health,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Start => "start",
            Channel::Action => "action",
            Channel::Text => "text",
            Channel::Search => "search",
            Channel::CustomSubmission => "customSubmission",
            Channel::TrackNoResults => "trackNoResults",
            Channel::Health => "health",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Main-channel requests ────────────────────────────────────────────────────

/// A request that advances the dialogue by one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum MainRequest {
    /// Open a session for the named municipality.
    Start { session_name: String },
    /// A button tap.
    Action { action_token: String },
    /// A committed predictive-search suggestion (opaque backend payload).
    Selection { payload: Value },
    /// Free text typed by the user.
    Text { message: String },
    /// A long-form problem description submitted outside the suggestion flow.
    CustomSubmission { custom_input: String },
}

impl MainRequest {
    pub fn channel(&self) -> Channel {
        match self {
            MainRequest::Start { .. } => Channel::Start,
            MainRequest::Action { .. } | MainRequest::Selection { .. } => Channel::Action,
            MainRequest::Text { .. } => Channel::Text,
            MainRequest::CustomSubmission { .. } => Channel::CustomSubmission,
        }
    }

    /// JSON body sent to the engine.
    pub fn body(&self) -> Value {
        match self {
            MainRequest::Start { session_name } => json!({ "session_name": session_name }),
            MainRequest::Action { action_token } => json!({ "action_token": action_token }),
            MainRequest::Selection { payload } => json!({ "selection_payload": payload }),
            MainRequest::Text { message } => json!({ "message": message }),
            MainRequest::CustomSubmission { custom_input } => {
                json!({ "custom_input": custom_input, "kind": "problem" })
            }
        }
    }
}

// ─── Search-channel requests ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub search_context: String,
}

/// Best-effort report of a search that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoResultsReport {
    pub query: String,
    pub search_type: String,
}

// ─── Reply payloads ───────────────────────────────────────────────────────────

/// The `reply` object the engine returns for every main-channel turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_indicators: Vec<StatusIndicator>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ButtonPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_buttons: Vec<ButtonPayload>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub input_expected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_context: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_placeholder: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl ReplyPayload {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            text_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_button(mut self, label: impl Into<String>, action: impl Into<String>) -> Self {
        self.buttons.push(ButtonPayload::new(label, action));
        self
    }

    pub fn with_quick_button(mut self, label: impl Into<String>, action: impl Into<String>) -> Self {
        self.quick_buttons.push(ButtonPayload::new(label, action));
        self
    }

    pub fn with_status(
        mut self,
        label: impl Into<String>,
        color: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.status_indicators.push(StatusIndicator {
            label: label.into(),
            color: color.into(),
            value: value.into(),
        });
        self
    }

    pub fn expecting_input(mut self, context: impl Into<String>) -> Self {
        self.input_expected = true;
        self.input_context = Some(context.into());
        self
    }

    pub fn with_search(mut self, context: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.enable_search = true;
        self.search_context = Some(context.into());
        self.search_placeholder = Some(placeholder.into());
        self
    }

    pub fn text_contains(&self, marker: &str) -> bool {
        self.text_message
            .as_deref()
            .is_some_and(|t| t.contains(marker))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusIndicator {
    #[serde(alias = "name")]
    pub label: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPayload {
    #[serde(rename = "text", alias = "label")]
    pub label: String,
    pub action: String,
}

impl ButtonPayload {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self { label: label.into(), action: action.into() }
    }
}

/// One predictive-search candidate, in backend rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionItem {
    #[serde(default, alias = "id")]
    pub icon: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Opaque value handed back to the engine when the item is committed.
    #[serde(default, alias = "data")]
    pub payload: Value,
}

impl SuggestionItem {
    pub fn new(title: impl Into<String>, payload: Value) -> Self {
        Self {
            icon: String::new(),
            title: title.into(),
            subtitle: String::new(),
            detail: None,
            payload,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl HealthReport {
    pub fn supports(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

// ─── Envelopes ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReplyEnvelope {
    #[serde(default)]
    pub reply: Option<ReplyPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchEnvelope {
    #[serde(default)]
    pub suggestions: Vec<SuggestionItem>,
    #[serde(default)]
    pub error: Option<String>,
}
