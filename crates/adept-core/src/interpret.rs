// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use adept_gateway::ReplyPayload;

use crate::render::{
    ActionButton, InputMode, MessageText, RenderInstruction, SearchActivation, SearchContext,
};

/// Map one engine reply onto a render instruction.
///
/// `buttons` wins over `quick_buttons` when both are present, and
/// `enable_search` wins over `input_expected`.  A reply that asks for nothing
/// leaves the current mode in place.
pub fn interpret(reply: &ReplyPayload, current: &InputMode) -> RenderInstruction {
    let message = reply
        .text_message
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(MessageText::parse);

    let source = if !reply.buttons.is_empty() {
        &reply.buttons
    } else {
        &reply.quick_buttons
    };
    let buttons: Vec<ActionButton> = source
        .iter()
        .map(|b| ActionButton { label: b.label.clone(), action: b.action.clone() })
        .collect();

    let search = reply.enable_search.then(|| SearchActivation {
        context: SearchContext::parse(reply.search_context.as_deref().unwrap_or_default()),
        placeholder: reply.search_placeholder.clone(),
    });

    let next_mode = if let Some(activation) = &search {
        InputMode::SearchActive {
            context: activation.context.clone(),
            placeholder: activation.placeholder.clone(),
        }
    } else if reply.input_expected {
        InputMode::AwaitingText { context: reply.input_context.clone() }
    } else if !buttons.is_empty() {
        InputMode::AwaitingChoice
    } else {
        current.clone()
    };

    RenderInstruction {
        message,
        status_indicators: reply.status_indicators.clone(),
        buttons,
        next_mode,
        search,
    }
}
