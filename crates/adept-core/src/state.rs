// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Per-session state: identity, input mode and the main-channel flags.
//!
//! All transitions go through the methods below so that identity, mode and
//! the epoch never drift apart.  Fields are `pub` for read access only.

use crate::render::{ActionButton, InputMode};

pub struct SessionState {
    /// Selected municipality.  `None` means no session.
    pub identity: Option<String>,
    pub mode: InputMode,
    /// Bumped on every reset.  Main-channel completions carry the epoch they
    /// were issued under and are dropped when it no longer matches.
    pub epoch: u64,
    /// A main-channel request is outstanding.
    pub in_flight: bool,
    /// A session-expired notice was shown and a reset is scheduled.
    pub expiring: bool,
    /// Buttons from the last rendered reply.
    pub buttons: Vec<ActionButton>,
    /// Raw contents of the search box.
    pub search_input: String,
    /// Name of the last `start` that failed, kept for a retry.
    pub failed_start: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            identity: None,
            mode: InputMode::Idle,
            epoch: 0,
            in_flight: false,
            expiring: false,
            buttons: Vec::new(),
            search_input: String::new(),
            failed_start: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.identity.is_some()
    }

    pub fn begin(&mut self, session_name: String) {
        self.identity = Some(session_name);
        self.failed_start = None;
    }

    /// Mark a main-channel request as issued; returns the epoch to tag it with.
    pub fn begin_request(&mut self) -> u64 {
        self.in_flight = true;
        self.epoch
    }

    /// Whether a completion tagged with `epoch` still belongs to this session.
    pub fn accepts(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    pub fn finish_request(&mut self) {
        self.in_flight = false;
    }

    /// `start` failed: back to idle, remembering the name for a retry.
    pub fn start_failed(&mut self, session_name: String) {
        self.identity = None;
        self.mode = InputMode::Idle;
        self.failed_start = Some(session_name);
    }

    /// Leaving a text prompt on submission drops the input context; the reply
    /// decides what comes next.
    pub fn leave_text_prompt(&mut self) {
        if matches!(self.mode, InputMode::AwaitingText { .. }) {
            self.mode = InputMode::AwaitingChoice;
        }
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if !mode.is_search() {
            self.search_input.clear();
        }
        self.mode = mode;
    }

    /// Back to a blank idle session and invalidate everything in flight.
    pub fn reset(&mut self) {
        self.identity = None;
        self.mode = InputMode::Idle;
        self.epoch += 1;
        self.in_flight = false;
        self.expiring = false;
        self.buttons.clear();
        self.search_input.clear();
    }
}
