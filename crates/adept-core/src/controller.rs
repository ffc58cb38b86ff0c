// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The conversation controller.
//!
//! `SessionController` owns the session state, the suggestion list and the
//! debounce timer, and is only ever mutated through `&mut self`.  Network
//! calls and timers run as spawned tasks that post a [`Completion`] back over
//! an mpsc channel; [`SessionController::apply`] folds them in one at a time.
//!
//! Two counters keep late answers harmless:
//!
//! - main-channel replies carry the session epoch, which `reset` bumps;
//! - search timers and replies carry the debounce sequence number, and only
//!   the latest number is honoured.

use std::sync::Arc;

use adept_config::{Config, SearchConfig, SessionConfig};
use adept_gateway::{
    Gateway, GatewayError, HealthReport, MainRequest, NoResultsReport, ReplyPayload, SearchQuery,
    SuggestionItem,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    debounce::Debouncer,
    error::ControllerError,
    interpret::interpret,
    render::{InputMode, SearchContext},
    sink::{DisplayEvent, DisplaySink, Notice, NoticeAction, NoticeKind},
    state::SessionState,
    suggestions::{Direction, SuggestionSet, SuggestionView},
};

/// A user intent, as delivered to [`SessionController::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(String),
    RetryStart,
    PressButton(usize),
    SubmitButton { action: String, label: String },
    SubmitText(String),
    Reset,
    SearchInput(String),
    MoveSelection(Direction),
    CommitSuggestion(Option<usize>),
    /// Enter pressed in the search box.
    SubmitKey,
}

/// Which main-channel operation a reply answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainOrigin {
    Start(String),
    Turn,
}

/// Result of a spawned task, applied by the controller.
#[derive(Debug)]
pub enum Completion {
    MainReply {
        epoch: u64,
        origin: MainOrigin,
        outcome: Result<ReplyPayload, GatewayError>,
    },
    DebounceElapsed {
        seq: u64,
    },
    SearchReply {
        seq: u64,
        query: String,
        context: SearchContext,
        outcome: Result<Vec<SuggestionItem>, GatewayError>,
    },
    ExpiryElapsed {
        epoch: u64,
    },
}

pub struct SessionController {
    gateway: Arc<dyn Gateway>,
    sink: Box<dyn DisplaySink>,
    search_cfg: SearchConfig,
    session_cfg: SessionConfig,
    state: SessionState,
    suggestions: SuggestionSet,
    debouncer: Debouncer,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn Gateway>, sink: Box<dyn DisplaySink>, config: &Config) -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            gateway,
            sink,
            search_cfg: config.search.clone(),
            session_cfg: config.session.clone(),
            state: SessionState::new(),
            suggestions: SuggestionSet::new(),
            debouncer: Debouncer::new(config.search.debounce()),
            tx,
            rx,
        }
    }

    // ── Read access ───────────────────────────────────────────────────────────

    pub fn mode(&self) -> &InputMode {
        &self.state.mode
    }

    pub fn identity(&self) -> Option<&str> {
        self.state.identity.as_deref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn suggestions(&self) -> &SuggestionSet {
        &self.suggestions
    }

    pub fn is_busy(&self) -> bool {
        self.state.in_flight
    }

    // ── Operations ────────────────────────────────────────────────────────────

    /// Open a session for `session_name`.
    pub fn start(&mut self, session_name: &str) -> Result<(), ControllerError> {
        if !self.state.mode.is_idle() {
            return Err(ControllerError::invalid_mode("start", &self.state.mode));
        }
        let name = session_name.trim();
        if name.is_empty() {
            let err = ControllerError::Validation("municipality name must not be empty".into());
            self.emit(DisplayEvent::Notice(Notice::error(err.to_string())));
            return Err(err);
        }
        if self.state.in_flight {
            return Err(ControllerError::Busy);
        }

        let name = name.to_string();
        info!(session = %name, "starting session");
        self.state.begin(name.clone());
        self.emit(DisplayEvent::UserEcho(name.clone()));
        self.emit(DisplayEvent::Composing(true));
        self.spawn_main(
            MainOrigin::Start(name.clone()),
            MainRequest::Start { session_name: name },
        );
        Ok(())
    }

    /// Replay the last failed `start`.
    pub fn retry_start(&mut self) -> Result<(), ControllerError> {
        let name = self
            .state
            .failed_start
            .clone()
            .ok_or(ControllerError::NothingToRetry)?;
        self.start(&name)
    }

    /// Send a button's action token.  The restart token resets locally.
    pub fn submit_button(&mut self, action: &str, label: &str) -> Result<(), ControllerError> {
        if action == self.session_cfg.restart_action {
            self.reset();
            return Ok(());
        }
        if !self.state.mode.accepts_buttons() {
            return Err(ControllerError::invalid_mode("submit_button", &self.state.mode));
        }
        if !self.state.is_active() || self.state.expiring {
            return Err(ControllerError::NoSession);
        }
        if self.state.in_flight {
            return Err(ControllerError::Busy);
        }

        self.emit(DisplayEvent::UserEcho(label.to_string()));
        self.state.buttons.clear();
        self.emit(DisplayEvent::ButtonsCleared);
        self.emit(DisplayEvent::Composing(true));
        self.spawn_main(
            MainOrigin::Turn,
            MainRequest::Action { action_token: action.to_string() },
        );
        Ok(())
    }

    /// Press the `index`-th currently rendered button.
    pub fn press_button(&mut self, index: usize) -> Result<(), ControllerError> {
        let button = self
            .state
            .buttons
            .get(index)
            .cloned()
            .ok_or(ControllerError::NoSuchButton(index))?;
        self.submit_button(&button.action, &button.label)
    }

    /// Send free text.  Long `problems` search input becomes a custom
    /// submission.  Blank input is ignored.
    pub fn submit_text(&mut self, message: &str) -> Result<(), ControllerError> {
        if !self.state.mode.accepts_text() {
            return Err(ControllerError::invalid_mode("submit_text", &self.state.mode));
        }
        if self.state.expiring {
            return Err(ControllerError::NoSession);
        }
        let message = message.trim();
        if message.is_empty() {
            return Ok(());
        }
        if self.state.in_flight {
            return Err(ControllerError::Busy);
        }

        let request = if self.is_custom_submission(message) {
            MainRequest::CustomSubmission { custom_input: message.to_string() }
        } else {
            MainRequest::Text { message: message.to_string() }
        };

        self.emit(DisplayEvent::UserEcho(message.to_string()));
        if matches!(self.state.mode, InputMode::AwaitingText { .. }) {
            self.state.leave_text_prompt();
            self.emit(DisplayEvent::ModeChanged(self.state.mode.clone()));
        }
        if self.state.mode.is_search() {
            self.debouncer.cancel();
            self.state.search_input.clear();
            self.dismiss_suggestions();
        }
        self.emit(DisplayEvent::Composing(true));
        self.spawn_main(MainOrigin::Turn, request);
        Ok(())
    }

    /// Drop the session and everything pending.  Calling it twice is the same
    /// as calling it once.
    pub fn reset(&mut self) {
        let was_in_flight = self.state.in_flight;
        self.debouncer.cancel();
        self.suggestions.clear();
        self.state.reset();
        if was_in_flight {
            self.emit(DisplayEvent::Composing(false));
        }
        debug!(epoch = self.state.epoch, "session reset");
        self.emit(DisplayEvent::SessionReset);
        self.emit(DisplayEvent::ModeChanged(InputMode::Idle));
    }

    /// New contents of the search box.
    pub fn search_input(&mut self, text: &str) -> Result<(), ControllerError> {
        if !self.state.mode.is_search() {
            return Err(ControllerError::invalid_mode("search_input", &self.state.mode));
        }
        if self.state.expiring {
            return Err(ControllerError::NoSession);
        }
        self.state.search_input = text.to_string();

        if text.trim().chars().count() < self.search_cfg.min_query_chars {
            self.debouncer.cancel();
            self.dismiss_suggestions();
            return Ok(());
        }
        self.debouncer
            .schedule(&self.tx, |seq| Completion::DebounceElapsed { seq });
        Ok(())
    }

    pub fn move_selection(&mut self, direction: Direction) -> Result<(), ControllerError> {
        if !self.state.mode.is_search() {
            return Err(ControllerError::invalid_mode("move_selection", &self.state.mode));
        }
        if self.suggestions.is_empty() {
            return Ok(());
        }
        self.suggestions.move_cursor(direction);
        self.emit(DisplayEvent::Suggestions(self.suggestions.view()));
        Ok(())
    }

    /// Send the suggestion at `index`, or the highlighted one, as a selection.
    pub fn commit_suggestion(&mut self, index: Option<usize>) -> Result<(), ControllerError> {
        if !self.state.mode.is_search() {
            return Err(ControllerError::invalid_mode("commit_suggestion", &self.state.mode));
        }
        if self.state.expiring {
            return Err(ControllerError::NoSession);
        }
        if self.state.in_flight {
            return Err(ControllerError::Busy);
        }
        let item = self
            .suggestions
            .commit(index)
            .ok_or(ControllerError::EmptySuggestions)?;

        self.emit(DisplayEvent::UserEcho(item.title.clone()));
        self.debouncer.cancel();
        self.state.search_input.clear();
        self.emit(DisplayEvent::Suggestions(SuggestionView::Hidden));
        self.emit(DisplayEvent::Composing(true));
        self.spawn_main(MainOrigin::Turn, MainRequest::Selection { payload: item.payload });
        Ok(())
    }

    /// Enter in the search box: commit the highlighted suggestion if there is
    /// one, otherwise submit what was typed.
    pub fn submit_key(&mut self) -> Result<(), ControllerError> {
        if !self.state.mode.is_search() {
            return Err(ControllerError::invalid_mode("submit_key", &self.state.mode));
        }
        if self.suggestions.selected().is_some() {
            return self.commit_suggestion(None);
        }
        // Custom-submission length is measured on the trimmed text, so
        // surrounding whitespace never tips input over the threshold.
        let typed = self.state.search_input.clone();
        self.submit_text(&typed)
    }

    pub async fn probe_health(&self) -> Result<HealthReport, ControllerError> {
        Ok(self.gateway.health().await?)
    }

    pub fn dispatch(&mut self, command: Command) -> Result<(), ControllerError> {
        match command {
            Command::Start(name) => self.start(&name),
            Command::RetryStart => self.retry_start(),
            Command::PressButton(i) => self.press_button(i),
            Command::SubmitButton { action, label } => self.submit_button(&action, &label),
            Command::SubmitText(text) => self.submit_text(&text),
            Command::Reset => {
                self.reset();
                Ok(())
            }
            Command::SearchInput(text) => self.search_input(&text),
            Command::MoveSelection(d) => self.move_selection(d),
            Command::CommitSuggestion(i) => self.commit_suggestion(i),
            Command::SubmitKey => self.submit_key(),
        }
    }

    // ── Completions ───────────────────────────────────────────────────────────

    /// Wait for the next task result.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::MainReply { epoch, origin, outcome } => {
                self.apply_main_reply(epoch, origin, outcome)
            }
            Completion::DebounceElapsed { seq } => self.fire_search(seq),
            Completion::SearchReply { seq, query, context, outcome } => {
                self.apply_search_reply(seq, query, context, outcome)
            }
            Completion::ExpiryElapsed { epoch } => {
                if self.state.accepts(epoch) && self.state.expiring {
                    info!("expired session reset");
                    self.reset();
                }
            }
        }
    }

    /// Multiplex user commands and task results until the command channel
    /// closes.  Rejected commands are shown as informational notices.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    match self.dispatch(cmd) {
                        Ok(()) | Err(ControllerError::Validation(_)) => {}
                        Err(e) => {
                            debug!(error = %e, "command rejected");
                            self.emit(DisplayEvent::Notice(Notice {
                                kind: NoticeKind::Info,
                                message: e.to_string(),
                                action: None,
                            }));
                        }
                    }
                }
                Some(done) = self.rx.recv() => self.apply(done),
            }
        }
    }

    fn apply_main_reply(
        &mut self,
        epoch: u64,
        origin: MainOrigin,
        outcome: Result<ReplyPayload, GatewayError>,
    ) {
        if !self.state.accepts(epoch) {
            debug!(epoch, current = self.state.epoch, "dropping reply from a previous session");
            return;
        }
        self.state.finish_request();
        self.emit(DisplayEvent::Composing(false));

        let marker = self.session_cfg.expiry_marker.as_str();
        let expired = match &outcome {
            Ok(reply) => reply.text_contains(marker).then_some(reply),
            Err(e) => e.reply().filter(|r| r.text_contains(marker)),
        };
        if let Some(reply) = expired {
            let message = reply.text_message.clone().unwrap_or_default();
            self.begin_expiry(message);
            return;
        }

        match outcome {
            Ok(reply) => self.render_reply(&origin, &reply),
            Err(e) => self.main_failed(origin, e),
        }
    }

    fn render_reply(&mut self, origin: &MainOrigin, reply: &ReplyPayload) {
        let mut instruction = interpret(reply, &self.state.mode);
        if let MainOrigin::Start(name) = origin {
            // An opened session is never idle.
            if instruction.next_mode.is_idle() {
                instruction.next_mode = InputMode::AwaitingChoice;
            }
            self.emit(DisplayEvent::SessionStarted { session_name: name.clone() });
        }

        if instruction.search.is_some() || !instruction.next_mode.is_search() {
            self.debouncer.cancel();
            self.suggestions.clear();
            self.state.search_input.clear();
        }
        let changed = instruction.next_mode != self.state.mode;
        self.state.buttons = instruction.buttons.clone();
        self.state.set_mode(instruction.next_mode.clone());

        debug!(mode = %self.state.mode, buttons = self.state.buttons.len(), "reply applied");
        self.emit(DisplayEvent::Render(instruction));
        if changed {
            self.emit(DisplayEvent::ModeChanged(self.state.mode.clone()));
        }
    }

    fn main_failed(&mut self, origin: MainOrigin, error: GatewayError) {
        warn!(error = %error, "dialogue request failed");
        match origin {
            MainOrigin::Start(name) => {
                self.state.start_failed(name.clone());
                self.emit(DisplayEvent::Notice(
                    Notice::error(format!("could not start session: {error}"))
                        .with_action(NoticeAction::RetryStart { session_name: name }),
                ));
            }
            MainOrigin::Turn => {
                self.emit(DisplayEvent::Notice(Notice::error(error.to_string())));
            }
        }
    }

    fn begin_expiry(&mut self, message: String) {
        if self.state.expiring {
            return;
        }
        info!("session expired");
        self.state.expiring = true;
        self.emit(DisplayEvent::Notice(Notice {
            kind: NoticeKind::SessionExpired,
            message,
            action: None,
        }));

        let epoch = self.state.epoch;
        let delay = self.session_cfg.expiry_reset_delay();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Completion::ExpiryElapsed { epoch }).await;
        });
    }

    fn fire_search(&mut self, seq: u64) {
        let Some(context) = self.live_search_context(seq) else {
            debug!(seq, "dropping stale debounce tick");
            return;
        };
        let query = self.state.search_input.trim().to_string();
        debug!(seq, %query, %context, "searching");

        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = gateway
                .search(SearchQuery {
                    query: query.clone(),
                    search_context: context.as_str().to_string(),
                })
                .await;
            let _ = tx
                .send(Completion::SearchReply { seq, query, context, outcome })
                .await;
        });
    }

    fn apply_search_reply(
        &mut self,
        seq: u64,
        query: String,
        context: SearchContext,
        outcome: Result<Vec<SuggestionItem>, GatewayError>,
    ) {
        if self.live_search_context(seq).is_none() {
            debug!(seq, %query, "dropping stale search reply");
            return;
        }
        match outcome {
            Err(e) => {
                // An unreachable engine is not an empty result: no hint, no report.
                warn!(error = %e, %query, "search failed");
                self.suggestions.set_results(Vec::new());
            }
            Ok(items) if items.is_empty() => {
                self.report_no_results(&query, &context);
                if context.is_problems()
                    && query.chars().count() >= self.search_cfg.custom_hint_min_chars
                {
                    self.suggestions.show_hint(query);
                } else {
                    self.suggestions.set_results(items);
                }
            }
            Ok(items) => self.suggestions.set_results(items),
        }
        self.emit(DisplayEvent::Suggestions(self.suggestions.view()));
    }

    fn report_no_results(&self, query: &str, context: &SearchContext) {
        if !self.search_cfg.track_no_results
            || query.chars().count() < self.search_cfg.track_min_chars
        {
            return;
        }
        let report = NoResultsReport {
            query: query.to_string(),
            search_type: context.as_str().to_string(),
        };
        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(async move {
            if let Err(e) = gateway.track_no_results(report).await {
                warn!(error = %e, "failed to report empty search");
            }
        });
    }

    fn live_search_context(&self, seq: u64) -> Option<SearchContext> {
        if !self.debouncer.is_current(seq) {
            return None;
        }
        self.state.mode.search_context().cloned()
    }

    fn is_custom_submission(&self, message: &str) -> bool {
        self.state.mode.search_context().is_some_and(SearchContext::is_problems)
            && message.chars().count() >= self.search_cfg.custom_submission_min_chars
    }

    fn dismiss_suggestions(&mut self) {
        if self.suggestions.view() != SuggestionView::Hidden {
            self.suggestions.clear();
            self.emit(DisplayEvent::Suggestions(SuggestionView::Hidden));
        }
    }

    fn spawn_main(&mut self, origin: MainOrigin, request: MainRequest) {
        let epoch = self.state.begin_request();
        debug!(channel = %request.channel(), epoch, "dispatching");
        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = gateway.send(request).await;
            let _ = tx.send(Completion::MainReply { epoch, origin, outcome }).await;
        });
    }

    fn emit(&mut self, event: DisplayEvent) {
        self.sink.emit(event);
    }
}
