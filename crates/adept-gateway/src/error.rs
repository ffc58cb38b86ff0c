// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

use crate::ReplyPayload;

/// Every way a gateway call can fail, normalised to a human-readable cause.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx status.  The engine sometimes still attaches a `reply` (an
    /// expired session is answered with 400 plus an explanatory reply); it is
    /// kept so callers can inspect it.
    #[error("server returned HTTP {status}{}", detail_suffix(.message))]
    Status {
        status: u16,
        message: Option<String>,
        reply: Option<Box<ReplyPayload>>,
    },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("empty reply")]
    EmptyReply,

    #[error("malformed reply: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl GatewayError {
    /// Reply payload carried by a non-2xx answer, if any.
    pub fn reply(&self) -> Option<&ReplyPayload> {
        match self {
            GatewayError::Status { reply, .. } => reply.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}
