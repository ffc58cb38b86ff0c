// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! JSON-over-HTTP gateway for the dialogue engine.
//!
//! The engine keeps the conversation in a cookie-backed server session, so
//! the client is built with a cookie store and must be reused for the whole
//! session.

use adept_config::{BackendConfig, EndpointsConfig};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{
    types::{ReplyEnvelope, SearchEnvelope},
    Channel, Gateway, GatewayError, HealthReport, MainRequest, NoResultsReport, ReplyPayload,
    SearchQuery, SuggestionItem,
};

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    endpoints: EndpointsConfig,
}

impl HttpGateway {
    pub fn new(cfg: &BackendConfig) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            endpoints: cfg.endpoints.clone(),
        })
    }

    fn endpoint(&self, channel: Channel) -> &str {
        match channel {
            Channel::Start => &self.endpoints.start,
            Channel::Action | Channel::Text => &self.endpoints.send,
            Channel::Search => &self.endpoints.search,
            Channel::CustomSubmission => &self.endpoints.custom,
            Channel::TrackNoResults => &self.endpoints.track_no_results,
            Channel::Health => &self.endpoints.health,
        }
    }

    fn url(&self, channel: Channel) -> String {
        let path = self.endpoint(channel);
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn post(&self, channel: Channel, body: &Value) -> Result<(u16, Vec<u8>), GatewayError> {
        let url = self.url(channel);
        debug!(%channel, %url, "posting to dialogue engine");
        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        Ok((status, bytes.to_vec()))
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Normalise a main-channel answer.
pub(crate) fn decode_reply(status: u16, body: &[u8]) -> Result<ReplyPayload, GatewayError> {
    let parsed = serde_json::from_slice::<ReplyEnvelope>(body);

    if !is_success(status) {
        let envelope = parsed.unwrap_or_default();
        return Err(GatewayError::Status {
            status,
            message: envelope.error,
            reply: envelope.reply.map(Box::new),
        });
    }

    let envelope = parsed.map_err(|e| GatewayError::Decode(e.to_string()))?;
    if let Some(error) = envelope.error {
        return Err(GatewayError::Backend(error));
    }
    envelope.reply.ok_or(GatewayError::EmptyReply)
}

/// Normalise a search-channel answer.  A missing `suggestions` list counts as
/// an empty result.
pub(crate) fn decode_suggestions(status: u16, body: &[u8]) -> Result<Vec<SuggestionItem>, GatewayError> {
    if !is_success(status) {
        return Err(GatewayError::Status { status, message: None, reply: None });
    }
    let envelope: SearchEnvelope =
        serde_json::from_slice(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
    if let Some(error) = envelope.error {
        return Err(GatewayError::Backend(error));
    }
    Ok(envelope.suggestions)
}

#[async_trait]
impl Gateway for HttpGateway {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: MainRequest) -> Result<ReplyPayload, GatewayError> {
        let (status, body) = self.post(request.channel(), &request.body()).await?;
        decode_reply(status, &body)
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<SuggestionItem>, GatewayError> {
        let body = serde_json::to_value(&query).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let (status, body) = self.post(Channel::Search, &body).await?;
        decode_suggestions(status, &body)
    }

    async fn track_no_results(&self, report: NoResultsReport) -> Result<(), GatewayError> {
        let body = serde_json::to_value(&report).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let (status, _) = self.post(Channel::TrackNoResults, &body).await?;
        if !is_success(status) {
            return Err(GatewayError::Status { status, message: None, reply: None });
        }
        Ok(())
    }

    async fn health(&self) -> Result<HealthReport, GatewayError> {
        let resp = self.client.get(self.url(Channel::Health)).send().await?;
        let status = resp.status().as_u16();
        if !is_success(status) {
            return Err(GatewayError::Status { status, message: None, reply: None });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
