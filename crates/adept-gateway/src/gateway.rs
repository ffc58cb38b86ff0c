// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

use crate::{GatewayError, HealthReport, MainRequest, NoResultsReport, ReplyPayload, SearchQuery, SuggestionItem};

/// The only path through which the controller talks to the dialogue engine.
///
/// Implementations never panic on bad input from the wire; every failure is
/// returned as a [`GatewayError`].
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Send one main-channel turn and return the engine's reply.
    async fn send(&self, request: MainRequest) -> Result<ReplyPayload, GatewayError>;

    /// Ask for ranked suggestions.  Zero suggestions is a normal outcome.
    async fn search(&self, query: SearchQuery) -> Result<Vec<SuggestionItem>, GatewayError>;

    /// Report a search that produced nothing.
    ///
    /// The default implementation drops the report.
    async fn track_no_results(&self, _report: NoResultsReport) -> Result<(), GatewayError> {
        Ok(())
    }

    /// Read-only diagnostic probe.
    async fn health(&self) -> Result<HealthReport, GatewayError>;
}
