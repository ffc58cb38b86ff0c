// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::render::{InputMode, RenderInstruction};
use crate::suggestions::SuggestionView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
    Error,
    SessionExpired,
    Info,
}

/// Follow-up the user may trigger from a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NoticeAction {
    /// Replay the last failed `start` with the same name.
    RetryStart { session_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub action: Option<NoticeAction>,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into(), action: None }
    }

    pub fn with_action(mut self, action: NoticeAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Everything the controller tells the display, in order.
///
/// A `UserEcho` is provisional.  It is followed by a `Render` or a `Notice`
/// unless the session is reset first; echoes are never retracted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DisplayEvent {
    UserEcho(String),
    /// Typing indicator on/off.
    Composing(bool),
    /// Rendered buttons were withdrawn after a submission.
    ButtonsCleared,
    Render(RenderInstruction),
    Suggestions(SuggestionView),
    Notice(Notice),
    ModeChanged(InputMode),
    SessionStarted { session_name: String },
    SessionReset,
}

pub trait DisplaySink: Send {
    fn emit(&mut self, event: DisplayEvent);
}

/// Sink that stores every event; handy for tests and for replaying a
/// session.  Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut e) = self.events.lock() {
            e.clear();
        }
    }

    pub fn renders(&self) -> Vec<RenderInstruction> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Render(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn echoes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::UserEcho(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// The most recent suggestion view shown.
    pub fn last_suggestions(&self) -> Option<SuggestionView> {
        self.events().into_iter().rev().find_map(|e| match e {
            DisplayEvent::Suggestions(v) => Some(v),
            _ => None,
        })
    }
}

impl DisplaySink for RecordingSink {
    fn emit(&mut self, event: DisplayEvent) {
        if let Ok(mut e) = self.events.lock() {
            e.push(event);
        }
    }
}
