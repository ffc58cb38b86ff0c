// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Request/reply plumbing between the conversation controller and the
//! dialogue engine.
//!
//! Everything that crosses the wire is normalised here: callers only ever see
//! a decoded [`ReplyPayload`] / suggestion list or a [`GatewayError`].

mod error;
mod gateway;
mod http;
mod mock;
mod types;

use std::sync::Arc;

pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::HttpGateway;
pub use mock::{RecordedRequest, ScriptedGateway};
pub use types::*;

use adept_config::BackendConfig;
use anyhow::Context;

/// Construct the shared HTTP gateway from configuration.
pub fn from_config(cfg: &BackendConfig) -> anyhow::Result<Arc<dyn Gateway>> {
    let gateway = HttpGateway::new(cfg)
        .with_context(|| format!("building gateway for {}", cfg.base_url))?;
    Ok(Arc::new(gateway))
}
