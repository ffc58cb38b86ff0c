// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde default helper: `true`.
///
/// `#[serde(default)]` on a `bool` falls back to `false`, so fields that are
/// enabled unless switched off need a named function.
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

// ── Backend ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Root URL of the dialogue engine, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Transport-level timeout per request.  Unset means the request may
    /// hang until the transport gives up (the composing indicator stays up
    /// until then).
    pub request_timeout_secs: Option<u64>,
    pub endpoints: EndpointsConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            request_timeout_secs: None,
            endpoints: EndpointsConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Paths of the individual backend channels, relative to `base_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub start: String,
    /// Shared by button actions, suggestion commits and free text.
    pub send: String,
    pub search: String,
    pub custom: String,
    pub track_no_results: String,
    pub health: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            start: "/gmina-bot/start".into(),
            send: "/gmina-bot/send".into(),
            search: "/gmina-bot/search".into(),
            custom: "/gmina-bot/process-custom".into(),
            track_no_results: "/gmina-bot/track-no-results".into(),
            health: "/health".into(),
        }
    }
}

// ── Predictive search ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a search is issued.
    pub debounce_ms: u64,
    /// Queries shorter than this never reach the backend.
    pub min_query_chars: usize,
    /// In the `problems` sub-context, input of at least this many characters
    /// is sent as a custom submission instead of free text.
    pub custom_submission_min_chars: usize,
    /// In the `problems` sub-context, an empty result for a query of at least
    /// this many characters shows the custom-input hint.
    pub custom_hint_min_chars: usize,
    /// Report empty result sets to the backend's no-results endpoint.
    #[serde(default = "default_true")]
    pub track_no_results: bool,
    /// Minimum trimmed query length that is ever reported as a no-result.
    pub track_min_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_chars: 2,
            custom_submission_min_chars: 21,
            custom_hint_min_chars: 6,
            track_no_results: true,
            track_min_chars: 3,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Action token that resets the session locally instead of being sent.
    pub restart_action: String,
    /// Substring of a reply's text that marks the backend session as expired.
    pub expiry_marker: String,
    /// Delay between the session-expired notice and the automatic reset.
    pub expiry_reset_delay_ms: u64,
    /// Names offered by the static municipality autocomplete.
    pub municipalities: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restart_action: "restart".into(),
            expiry_marker: "Sesja wygasła".into(),
            expiry_reset_delay_ms: 2000,
            municipalities: [
                "Przykładowa Gmina",
                "Demo Gmina",
                "Warszawa",
                "Kraków",
                "Gdańsk",
                "Wrocław",
                "Poznań",
                "Łódź",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl SessionConfig {
    pub fn expiry_reset_delay(&self) -> Duration {
        Duration::from_millis(self.expiry_reset_delay_ms)
    }
}
