// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::{
    Channel, Gateway, GatewayError, HealthReport, MainRequest, NoResultsReport, ReplyPayload,
    SearchQuery, SuggestionItem,
};

/// A request observed by [`ScriptedGateway`], stamped with the tokio clock so
/// tests running on a paused clock can assert exact timings.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub channel: Channel,
    pub body: Value,
    pub at: Instant,
}

struct Scripted<T> {
    delay: Duration,
    outcome: T,
}

/// A pre-scripted in-memory gateway.  Each main-channel call pops the next
/// reply script from the front of the queue; each search call pops the next
/// search script.  Every call is recorded.
///
/// When the main queue runs dry `send` fails with a transport error; when the
/// search queue runs dry `search` returns no suggestions.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Scripted<Result<ReplyPayload, GatewayError>>>>,
    searches: Mutex<VecDeque<Scripted<Result<Vec<SuggestionItem>, GatewayError>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    health: HealthReport,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            searches: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            health: HealthReport {
                status: "OK".into(),
                service: "scripted".into(),
                version: "0".into(),
                features: vec!["predictive_search".into(), "custom_problems".into()],
            },
        }
    }

    /// Convenience: gateway whose first main-channel call returns `reply`.
    pub fn replying(reply: ReplyPayload) -> Self {
        let gw = Self::new();
        gw.push_reply(reply);
        gw
    }

    pub fn push_reply(&self, reply: ReplyPayload) {
        self.push_outcome(Duration::ZERO, Ok(reply));
    }

    pub fn push_reply_after(&self, delay: Duration, reply: ReplyPayload) {
        self.push_outcome(delay, Ok(reply));
    }

    pub fn push_error(&self, error: GatewayError) {
        self.push_outcome(Duration::ZERO, Err(error));
    }

    pub fn push_outcome(&self, delay: Duration, outcome: Result<ReplyPayload, GatewayError>) {
        self.replies.lock().unwrap().push_back(Scripted { delay, outcome });
    }

    pub fn push_suggestions(&self, items: Vec<SuggestionItem>) {
        self.push_search_outcome(Duration::ZERO, Ok(items));
    }

    pub fn push_suggestions_after(&self, delay: Duration, items: Vec<SuggestionItem>) {
        self.push_search_outcome(delay, Ok(items));
    }

    pub fn push_search_error(&self, error: GatewayError) {
        self.push_search_outcome(Duration::ZERO, Err(error));
    }

    pub fn push_search_outcome(
        &self,
        delay: Duration,
        outcome: Result<Vec<SuggestionItem>, GatewayError>,
    ) {
        self.searches.lock().unwrap().push_back(Scripted { delay, outcome });
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_on(&self, channel: Channel) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.channel == channel)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn record(&self, channel: Channel, body: Value) {
        self.requests.lock().unwrap().push(RecordedRequest {
            channel,
            body,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: MainRequest) -> Result<ReplyPayload, GatewayError> {
        self.record(request.channel(), request.body());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted { delay, outcome }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                outcome
            }
            None => Err(GatewayError::Transport("no scripted reply".into())),
        }
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<SuggestionItem>, GatewayError> {
        self.record(
            Channel::Search,
            serde_json::to_value(&query).unwrap_or(Value::Null),
        );
        let next = self.searches.lock().unwrap().pop_front();
        match next {
            Some(Scripted { delay, outcome }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                outcome
            }
            None => Ok(Vec::new()),
        }
    }

    async fn track_no_results(&self, report: NoResultsReport) -> Result<(), GatewayError> {
        self.record(
            Channel::TrackNoResults,
            serde_json::to_value(&report).unwrap_or(Value::Null),
        );
        Ok(())
    }

    async fn health(&self) -> Result<HealthReport, GatewayError> {
        self.record(Channel::Health, Value::Null);
        Ok(self.health.clone())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
