// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod controller;
mod debounce;
mod directory;
mod error;
mod interpret;
mod render;
mod sink;
mod state;
mod suggestions;
#[cfg(test)]
mod tests;

pub use controller::{Command, Completion, MainOrigin, SessionController};
pub use debounce::Debouncer;
pub use directory::{MunicipalityDirectory, StaticDirectory};
pub use error::ControllerError;
pub use interpret::interpret;
pub use render::{
    ActionButton, InputMode, MessageText, RenderInstruction, SearchActivation, SearchContext,
    StatusIndicator, TextSpan,
};
pub use sink::{DisplayEvent, DisplaySink, Notice, NoticeAction, NoticeKind, RecordingSink};
pub use state::SessionState;
pub use suggestions::{Direction, SuggestionSet, SuggestionView};
