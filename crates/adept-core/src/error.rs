// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

use adept_gateway::GatewayError;

/// Why a controller operation was refused.  None of these mutate state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("{0}")]
    Validation(String),

    #[error("`{operation}` is not available in {mode} mode")]
    InvalidMode { operation: &'static str, mode: &'static str },

    #[error("a request is already in flight")]
    Busy,

    #[error("no active session")]
    NoSession,

    #[error("no suggestion to commit")]
    EmptySuggestions,

    #[error("no button at position {0}")]
    NoSuchButton(usize),

    #[error("nothing to retry")]
    NothingToRetry,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ControllerError {
    pub(crate) fn invalid_mode(operation: &'static str, mode: &crate::InputMode) -> Self {
        ControllerError::InvalidMode { operation, mode: mode.name() }
    }
}
