// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Line-oriented terminal front end.
//!
//! `ConsoleSink` prints display events to stdout and mirrors the current
//! input mode into a shared cell so the stdin reader can interpret the next
//! line.  `parse_line` maps one typed line onto a controller command.

use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex};

use adept_core::{
    Command, Direction, DisplayEvent, DisplaySink, InputMode, Notice, NoticeAction, NoticeKind,
    RenderInstruction, SuggestionView, TextSpan,
};

pub type SharedMode = Arc<Mutex<InputMode>>;

/// What the stdin loop should do with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    Send(Command),
    Lookup(String),
    Help,
    Quit,
    Nothing,
}

pub fn parse_line(line: &str, mode: &InputMode) -> LineAction {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Nothing;
    }

    if let Some(cmd) = line.strip_prefix('/') {
        let (word, rest) = cmd.split_once(' ').unwrap_or((cmd, ""));
        return match (word, mode.is_search()) {
            ("quit" | "exit" | "q", _) => LineAction::Quit,
            ("help" | "h", _) => LineAction::Help,
            ("reset", _) => LineAction::Send(Command::Reset),
            ("retry", _) => LineAction::Send(Command::RetryStart),
            ("up", true) => LineAction::Send(Command::MoveSelection(Direction::Up)),
            ("down", true) => LineAction::Send(Command::MoveSelection(Direction::Down)),
            ("enter", true) => LineAction::Send(Command::SubmitKey),
            ("pick", true) => match one_based(rest.trim()) {
                Some(i) => LineAction::Send(Command::CommitSuggestion(Some(i))),
                None => LineAction::Help,
            },
            (n, _) => match one_based(n) {
                Some(i) => LineAction::Send(Command::PressButton(i)),
                None => LineAction::Help,
            },
        };
    }

    if let Some(query) = line.strip_prefix('?') {
        return match mode {
            InputMode::Idle => LineAction::Lookup(query.trim().to_string()),
            InputMode::SearchActive { .. } => LineAction::Send(Command::SearchInput(query.to_string())),
            _ => LineAction::Help,
        };
    }

    match mode {
        InputMode::Idle => LineAction::Send(Command::Start(line.to_string())),
        _ => LineAction::Send(Command::SubmitText(line.to_string())),
    }
}

fn one_based(s: &str) -> Option<usize> {
    s.parse::<usize>().ok().and_then(|n| n.checked_sub(1))
}

pub const HELP: &str = "\
  <name>      start a session for a municipality (when idle)
  ?<text>     look up municipalities (idle) or type into the search box
  <text>      answer the assistant
  /<n>        press button n
  /up /down   move through suggestions
  /enter      submit the search box (highlighted suggestion first)
  /pick <n>   choose suggestion n
  /retry      retry a failed start
  /reset      end the session
  /quit       leave";

pub struct ConsoleSink {
    mode: SharedMode,
    styled: bool,
}

impl ConsoleSink {
    pub fn new(mode: SharedMode) -> Self {
        Self { mode, styled: std::io::stdout().is_terminal() }
    }

    fn set_mode(&self, mode: &InputMode) {
        if let Ok(mut m) = self.mode.lock() {
            *m = mode.clone();
        }
    }

    fn render(&self, r: &RenderInstruction) -> String {
        let mut out = String::new();
        for s in &r.status_indicators {
            out.push_str(&format!("  [{}: {}]\n", s.label, s.value));
        }
        if let Some(msg) = &r.message {
            out.push_str("bot> ");
            for span in msg.spans() {
                match span {
                    TextSpan::Plain(t) => out.push_str(t),
                    TextSpan::Bold(t) if self.styled => out.push_str(&format!("\x1b[1m{t}\x1b[0m")),
                    TextSpan::Bold(t) => out.push_str(t),
                    TextSpan::LineBreak => out.push_str("\n     "),
                }
            }
            out.push('\n');
        }
        for (i, b) in r.buttons.iter().enumerate() {
            out.push_str(&format!("  /{} {}\n", i + 1, b.label));
        }
        if let Some(search) = &r.search {
            let hint = search.placeholder.as_deref().unwrap_or("type ?<text> to search");
            out.push_str(&format!("  ({} search) {hint}\n", search.context));
        }
        out
    }

    fn suggestions(view: &SuggestionView) -> String {
        match view {
            SuggestionView::Hidden => String::new(),
            SuggestionView::Items { items, selected } => {
                let mut out = String::new();
                for (i, item) in items.iter().enumerate() {
                    let marker = if *selected == Some(i) { '>' } else { ' ' };
                    out.push_str(&format!(" {marker} {}. {} {}", i + 1, item.icon, item.title));
                    if !item.subtitle.is_empty() {
                        out.push_str(&format!(" ({})", item.subtitle));
                    }
                    out.push('\n');
                }
                out
            }
            SuggestionView::CustomInputHint { query } => format!(
                "  no matches for \"{query}\"; describe the problem in more detail and press /enter\n"
            ),
        }
    }

    fn notice(n: &Notice) -> String {
        let prefix = match n.kind {
            NoticeKind::Error => "error",
            NoticeKind::SessionExpired => "session",
            NoticeKind::Info => "note",
        };
        let mut out = format!("{prefix}: {}\n", n.message);
        if let Some(NoticeAction::RetryStart { session_name }) = &n.action {
            out.push_str(&format!("  /retry to try \"{session_name}\" again\n"));
        }
        out
    }
}

impl DisplaySink for ConsoleSink {
    fn emit(&mut self, event: DisplayEvent) {
        let text = match &event {
            DisplayEvent::UserEcho(_) | DisplayEvent::ButtonsCleared => return,
            DisplayEvent::Composing(true) => "  ...\n".to_string(),
            DisplayEvent::Composing(false) => return,
            DisplayEvent::Render(r) => self.render(r),
            DisplayEvent::Suggestions(v) => Self::suggestions(v),
            DisplayEvent::Notice(n) => Self::notice(n),
            DisplayEvent::ModeChanged(m) => {
                self.set_mode(m);
                return;
            }
            DisplayEvent::SessionStarted { session_name } => format!("-- session: {session_name}\n"),
            DisplayEvent::SessionReset => "-- session closed; type a municipality name\n".to_string(),
        };
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}
