// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// Conversation scenarios for `SessionController`.
///
/// Uses `ScriptedGateway` so every scenario is deterministic and needs no
/// network; timing tests run on tokio's paused clock.
#[cfg(test)]
mod controller_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use adept_config::Config;
    use adept_gateway::{Channel, GatewayError, ReplyPayload, ScriptedGateway, SuggestionItem};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::{timeout, timeout_at, Instant};

    use crate::{
        Command, ControllerError, Direction, DisplayEvent, InputMode, NoticeAction, NoticeKind,
        RecordingSink, SearchContext, SessionController, SuggestionView,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn controller(gw: &Arc<ScriptedGateway>) -> (SessionController, RecordingSink) {
        let sink = RecordingSink::new();
        let ctl = SessionController::new(gw.clone(), Box::new(sink.clone()), &Config::default());
        (ctl, sink)
    }

    /// Apply completions until nothing arrives for a few virtual milliseconds.
    async fn settle(ctl: &mut SessionController) {
        while let Ok(Some(done)) = timeout(Duration::from_millis(5), ctl.next_completion()).await {
            ctl.apply(done);
        }
    }

    /// Apply completions for `span` of virtual time.
    async fn run_for(ctl: &mut SessionController, span: Duration) {
        let end = Instant::now() + span;
        while let Ok(Some(done)) = timeout_at(end, ctl.next_completion()).await {
            ctl.apply(done);
        }
    }

    fn welcome() -> ReplyPayload {
        ReplyPayload::text("Witaj").with_button("Zgłoś problem", "report")
    }

    fn problem_search() -> ReplyPayload {
        ReplyPayload::text("Opisz problem").with_search("problems", "Wpisz problem...")
    }

    fn items(titles: &[&str]) -> Vec<SuggestionItem> {
        titles
            .iter()
            .map(|t| SuggestionItem::new(*t, json!({ "action": format!("pick_{t}") })))
            .collect()
    }

    async fn started(gw: &Arc<ScriptedGateway>, first: ReplyPayload) -> (SessionController, RecordingSink) {
        gw.push_reply(first);
        let (mut ctl, sink) = controller(gw);
        ctl.start("Warszawa").unwrap();
        settle(&mut ctl).await;
        sink.clear();
        (ctl, sink)
    }

    // ── Start ─────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn blank_session_name_never_reaches_the_network() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = controller(&gw);

        for name in ["", "   ", "\t\n"] {
            let err = ctl.start(name).unwrap_err();
            assert!(matches!(err, ControllerError::Validation(_)));
        }
        settle(&mut ctl).await;

        assert_eq!(gw.request_count(), 0);
        assert_eq!(sink.notices().len(), 3);
        assert_eq!(*ctl.mode(), InputMode::Idle);
        assert!(ctl.identity().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_renders_welcome_buttons() {
        let gw = Arc::new(ScriptedGateway::replying(welcome()));
        let (mut ctl, sink) = controller(&gw);

        ctl.start("Warszawa").unwrap();
        settle(&mut ctl).await;

        let reqs = gw.requests_on(Channel::Start);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].body["session_name"], "Warszawa");

        assert_eq!(*ctl.mode(), InputMode::AwaitingChoice);
        assert_eq!(ctl.identity(), Some("Warszawa"));
        let renders = sink.renders();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].button_labels(), vec!["Zgłoś problem"]);

        let events = sink.events();
        assert_eq!(events[0], DisplayEvent::UserEcho("Warszawa".into()));
        assert_eq!(events[1], DisplayEvent::Composing(true));
        assert_eq!(events[2], DisplayEvent::Composing(false));
    }

    #[tokio::test(start_paused = true)]
    async fn start_outside_idle_is_rejected() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, welcome()).await;
        let before = gw.request_count();

        assert!(matches!(ctl.start("Kraków"), Err(ControllerError::InvalidMode { .. })));
        assert_eq!(gw.request_count(), before);
        assert_eq!(ctl.identity(), Some("Warszawa"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_offers_retry_with_same_name() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_error(GatewayError::Transport("connection refused".into()));
        let (mut ctl, sink) = controller(&gw);

        ctl.start("Demo Gmina").unwrap();
        settle(&mut ctl).await;

        assert_eq!(*ctl.mode(), InputMode::Idle);
        assert!(ctl.identity().is_none());
        let notice = &sink.notices()[0];
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(
            notice.action,
            Some(NoticeAction::RetryStart { session_name: "Demo Gmina".into() })
        );

        gw.push_reply(welcome());
        ctl.retry_start().unwrap();
        settle(&mut ctl).await;

        let starts = gw.requests_on(Channel::Start);
        assert_eq!(starts.len(), 2);
        assert_eq!(starts[1].body["session_name"], "Demo Gmina");
        assert_eq!(ctl.identity(), Some("Demo Gmina"));
        assert_eq!(*ctl.mode(), InputMode::AwaitingChoice);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_without_failure_is_rejected() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = controller(&gw);
        assert_eq!(ctl.retry_start(), Err(ControllerError::NothingToRetry));
    }

    #[tokio::test(start_paused = true)]
    async fn start_reply_without_affordances_still_opens_session() {
        let gw = Arc::new(ScriptedGateway::new());
        let (ctl, _sink) = started(&gw, ReplyPayload::text("Witaj")).await;
        assert_eq!(*ctl.mode(), InputMode::AwaitingChoice);
    }

    // ── Buttons ───────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn button_outside_choice_modes_is_rejected() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = controller(&gw);

        let err = ctl.submit_button("report", "Zgłoś problem").unwrap_err();
        assert!(matches!(err, ControllerError::InvalidMode { .. }));

        let (mut ctl2, _) = started(&gw, ReplyPayload::text("Podaj adres").expecting_input("address")).await;
        let before = gw.request_count();
        assert!(ctl2.submit_button("report", "Zgłoś problem").is_err());
        assert_eq!(gw.request_count(), before);
        assert!(matches!(ctl2.mode(), InputMode::AwaitingText { .. }));
        assert!(sink.echoes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_token_resets_from_any_mode() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut idle, _) = controller(&gw);
        idle.submit_button("restart", "Powrót").unwrap();
        assert_eq!(*idle.mode(), InputMode::Idle);

        let (mut ctl, _sink) =
            started(&gw, ReplyPayload::text("Podaj adres").expecting_input("address")).await;
        let before = gw.request_count();
        ctl.submit_button("restart", "Powrót do wyboru gminy").unwrap();
        settle(&mut ctl).await;

        assert_eq!(gw.request_count(), before);
        assert_eq!(*ctl.mode(), InputMode::Idle);
        assert!(ctl.identity().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pressing_a_button_echoes_and_sends_its_action() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, welcome()).await;
        gw.push_reply(ReplyPayload::text("Wybierz kategorię").with_button("Drogi", "cat_roads"));

        ctl.press_button(0).unwrap();
        settle(&mut ctl).await;

        let actions = gw.requests_on(Channel::Action);
        assert_eq!(actions[0].body, json!({"action_token": "report"}));
        let events = sink.events();
        assert_eq!(events[0], DisplayEvent::UserEcho("Zgłoś problem".into()));
        assert_eq!(events[1], DisplayEvent::ButtonsCleared);
        assert_eq!(sink.renders()[0].button_labels(), vec!["Drogi"]);
        assert_eq!(ctl.state().buttons[0].action, "cat_roads");
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_button_index_is_rejected() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, welcome()).await;
        assert_eq!(ctl.press_button(3), Err(ControllerError::NoSuchButton(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn second_submission_while_in_flight_is_busy() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, welcome().with_button("Menu", "main_menu")).await;
        gw.push_reply_after(Duration::from_millis(500), welcome());

        ctl.press_button(0).unwrap();
        assert!(ctl.is_busy());
        let before = gw.request_count();
        assert_eq!(ctl.submit_button("main_menu", "Menu"), Err(ControllerError::Busy));
        assert_eq!(gw.request_count(), before);
        assert_eq!(sink.echoes(), vec!["Zgłoś problem".to_string()]);

        run_for(&mut ctl, Duration::from_millis(600)).await;
        assert!(!ctl.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_turn_surfaces_notice_and_keeps_session() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, welcome()).await;
        gw.push_error(GatewayError::Backend("Błąd serwera".into()));

        ctl.press_button(0).unwrap();
        settle(&mut ctl).await;

        assert_eq!(sink.notices()[0].kind, NoticeKind::Error);
        assert!(sink.notices()[0].action.is_none());
        assert_eq!(ctl.identity(), Some("Warszawa"));
        assert!(!ctl.is_busy());
    }

    // ── Text ──────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn text_prompt_is_left_before_the_reply() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) =
            started(&gw, ReplyPayload::text("Podaj adres").expecting_input("address")).await;
        gw.push_reply_after(Duration::from_millis(100), welcome());

        ctl.submit_text("ul. Główna 15").unwrap();
        assert_eq!(*ctl.mode(), InputMode::AwaitingChoice);
        assert!(sink.events().contains(&DisplayEvent::ModeChanged(InputMode::AwaitingChoice)));

        run_for(&mut ctl, Duration::from_millis(200)).await;
        let texts = gw.requests_on(Channel::Text);
        assert_eq!(texts[0].body, json!({"message": "ul. Główna 15"}));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_text_is_silently_ignored() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) =
            started(&gw, ReplyPayload::text("Podaj adres").expecting_input("address")).await;
        let before = gw.request_count();

        ctl.submit_text("   ").unwrap();
        assert_eq!(gw.request_count(), before);
        assert!(sink.events().is_empty());
        assert!(matches!(ctl.mode(), InputMode::AwaitingText { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn text_in_choice_mode_is_rejected() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, welcome()).await;
        assert!(matches!(ctl.submit_text("hej"), Err(ControllerError::InvalidMode { .. })));
    }

    // ── Search ────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn keystrokes_collapse_into_one_search() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;
        let t0 = Instant::now();

        ctl.search_input("a").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctl.search_input("ab").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctl.search_input("abc").unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        ctl.search_input("abcd").unwrap();

        run_for(&mut ctl, Duration::from_millis(1000)).await;

        let searches = gw.requests_on(Channel::Search);
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].body["query"], "abcd");
        assert_eq!(searches[0].body["search_context"], "problems");
        let fired = searches[0].at - t0;
        assert!(fired >= Duration::from_millis(550) && fired < Duration::from_millis(560), "{fired:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_never_overwrites_newer_results() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, problem_search()).await;
        gw.push_suggestions_after(Duration::from_millis(500), items(&["Dziura w drodze"]));
        gw.push_suggestions(items(&["Nieodebrane śmieci", "Śmieci w lesie"]));

        ctl.search_input("dziura").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;
        ctl.search_input("śmieci").unwrap();
        run_for(&mut ctl, Duration::from_millis(1000)).await;

        assert_eq!(gw.requests_on(Channel::Search).len(), 2);
        let titles: Vec<_> = ctl.suggestions().items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Nieodebrane śmieci", "Śmieci w lesie"]);
        let shown = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, DisplayEvent::Suggestions(_)))
            .count();
        assert_eq!(shown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_clears_suggestions_without_searching() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, problem_search()).await;
        gw.push_suggestions(items(&["Dziura w drodze"]));

        ctl.search_input("dziu").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;
        assert_eq!(ctl.suggestions().len(), 1);

        ctl.search_input("d").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;
        assert!(ctl.suggestions().is_empty());
        assert_eq!(sink.last_suggestions(), Some(SuggestionView::Hidden));
        assert_eq!(gw.requests_on(Channel::Search).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn search_input_outside_search_mode_is_rejected() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, welcome()).await;
        assert!(matches!(ctl.search_input("dziura"), Err(ControllerError::InvalidMode { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn navigate_and_commit_sends_selection_payload() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, problem_search()).await;
        gw.push_suggestions(items(&["Dziura w drodze", "Zepsuta latarnia", "Nieodebrane śmieci"]));
        gw.push_reply(ReplyPayload::text("Podaj adres").expecting_input("address"));

        ctl.search_input("zgło").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;

        ctl.move_selection(Direction::Up).unwrap();
        assert_eq!(ctl.suggestions().selected(), Some(2));
        ctl.move_selection(Direction::Down).unwrap();
        assert_eq!(ctl.suggestions().selected(), Some(0));
        ctl.move_selection(Direction::Down).unwrap();

        ctl.submit_key().unwrap();
        settle(&mut ctl).await;

        let actions = gw.requests_on(Channel::Action);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].body["selection_payload"]["action"], "pick_Zepsuta latarnia");
        assert!(sink.echoes().contains(&"Zepsuta latarnia".to_string()));
        assert!(ctl.suggestions().is_empty());
        assert!(matches!(ctl.mode(), InputMode::AwaitingText { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn commit_with_no_suggestions_is_rejected() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;
        let before = gw.request_count();
        assert_eq!(ctl.commit_suggestion(None), Err(ControllerError::EmptySuggestions));
        assert_eq!(gw.request_count(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn long_problem_text_without_highlight_is_custom_submission() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;
        gw.push_reply(ReplyPayload::text("✅ **Zgłoszenie przyjęte**"));

        let text = "Dziura w chodniku na rogu";
        assert_eq!(text.chars().count(), 25);
        ctl.search_input(text).unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;
        ctl.submit_key().unwrap();
        settle(&mut ctl).await;

        let custom = gw.requests_on(Channel::CustomSubmission);
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].body["custom_input"], text);
        assert_eq!(custom[0].body["kind"], "problem");
        assert!(gw.requests_on(Channel::Text).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn short_problem_text_goes_to_text_channel() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;
        gw.push_reply(welcome());

        ctl.submit_text("dziura w drodze").unwrap();
        settle(&mut ctl).await;

        assert_eq!(gw.requests_on(Channel::Text).len(), 1);
        assert!(gw.requests_on(Channel::CustomSubmission).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn padding_does_not_count_towards_custom_submission() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;
        gw.push_reply(welcome());

        let text = "  Dziura przy szkole  ";
        assert_eq!(text.chars().count(), 22);
        ctl.search_input(text).unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;
        ctl.submit_key().unwrap();
        settle(&mut ctl).await;

        assert!(gw.requests_on(Channel::CustomSubmission).is_empty());
        let sent = gw.requests_on(Channel::Text);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body["message"], "Dziura przy szkole");
    }

    #[tokio::test(start_paused = true)]
    async fn long_text_in_general_search_stays_text() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) =
            started(&gw, ReplyPayload::text("Szukaj").with_search("general", "Szukaj...")).await;
        gw.push_reply(welcome());

        ctl.submit_text("Godziny otwarcia urzędu gminy").unwrap();
        settle(&mut ctl).await;
        assert_eq!(gw.requests_on(Channel::Text).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_problem_results_show_hint_and_are_tracked() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, problem_search()).await;

        ctl.search_input("dziwny problem").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;

        assert_eq!(
            sink.last_suggestions(),
            Some(SuggestionView::CustomInputHint { query: "dziwny problem".into() })
        );
        let tracked = gw.requests_on(Channel::TrackNoResults);
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].body, json!({"query": "dziwny problem", "search_type": "problems"}));
    }

    #[tokio::test(start_paused = true)]
    async fn short_empty_query_gets_no_hint_and_no_tracking() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, problem_search()).await;

        ctl.search_input("zz").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;

        assert_eq!(sink.last_suggestions(), Some(SuggestionView::Hidden));
        assert!(gw.requests_on(Channel::TrackNoResults).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn search_failure_degrades_to_no_suggestions() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, problem_search()).await;
        gw.push_search_error(GatewayError::Transport("timeout".into()));

        ctl.search_input("dziu").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;

        assert!(sink.notices().is_empty());
        assert!(ctl.suggestions().is_empty());
        assert!(ctl.mode().is_search());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_is_neither_hinted_nor_tracked() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, problem_search()).await;
        gw.push_search_error(GatewayError::Transport("connection refused".into()));

        ctl.search_input("dziwny problem").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;

        assert_eq!(gw.requests_on(Channel::Search).len(), 1);
        assert!(gw.requests_on(Channel::TrackNoResults).is_empty());
        assert_eq!(sink.last_suggestions(), Some(SuggestionView::Hidden));
        assert!(sink.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_search_cancels_pending_query() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;

        ctl.search_input("dziura").unwrap();
        ctl.reset();
        run_for(&mut ctl, Duration::from_millis(1000)).await;
        assert!(gw.requests_on(Channel::Search).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn search_activation_sets_context_and_placeholder() {
        let gw = Arc::new(ScriptedGateway::new());
        let (ctl, _sink) = started(&gw, problem_search()).await;
        assert_eq!(
            *ctl.mode(),
            InputMode::SearchActive {
                context: SearchContext::Problems,
                placeholder: Some("Wpisz problem...".into()),
            }
        );
    }

    // ── Expiry & reset ────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn expired_session_reply_resets_after_delay() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, welcome()).await;
        gw.push_reply(
            ReplyPayload::text("Sesja wygasła. Proszę wybrać gminę ponownie.")
                .with_button("Powrót do wyboru gminy", "restart"),
        );

        ctl.press_button(0).unwrap();
        settle(&mut ctl).await;
        let noticed = Instant::now();

        assert_eq!(sink.notices()[0].kind, NoticeKind::SessionExpired);
        assert!(sink.renders().is_empty(), "expiry reply must not be rendered");
        assert_eq!(ctl.identity(), Some("Warszawa"));

        let done = ctl.next_completion().await.unwrap();
        ctl.apply(done);
        let waited = Instant::now() - noticed;
        assert!(waited <= Duration::from_millis(2000), "{waited:?}");
        assert!(waited >= Duration::from_millis(1980), "{waited:?}");

        assert_eq!(*ctl.mode(), InputMode::Idle);
        assert!(ctl.identity().is_none());
        assert!(sink.events().contains(&DisplayEvent::SessionReset));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_refuses_further_turns() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, welcome()).await;
        gw.push_reply(ReplyPayload::text("Sesja wygasła. Proszę wybrać gminę ponownie."));

        ctl.press_button(0).unwrap();
        settle(&mut ctl).await;
        assert!(ctl.state().expiring);
        let before = gw.request_count();
        let echoes = sink.echoes().len();

        assert_eq!(ctl.submit_button("report", "Zgłoś problem"), Err(ControllerError::NoSession));
        assert!(ctl.submit_text("halo").is_err());
        settle(&mut ctl).await;

        assert_eq!(gw.request_count(), before);
        assert_eq!(sink.echoes().len(), echoes);
        assert!(!ctl.is_busy());

        run_for(&mut ctl, Duration::from_millis(2100)).await;
        assert_eq!(*ctl.mode(), InputMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_ignores_search_input() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;
        gw.push_reply(ReplyPayload::text("Sesja wygasła. Proszę wybrać gminę ponownie."));

        ctl.submit_text("dziura").unwrap();
        settle(&mut ctl).await;
        assert!(ctl.mode().is_search());

        assert_eq!(ctl.search_input("dziura w drodze"), Err(ControllerError::NoSession));
        assert_eq!(ctl.commit_suggestion(Some(0)), Err(ControllerError::NoSession));
        run_for(&mut ctl, Duration::from_millis(400)).await;
        assert!(gw.requests_on(Channel::Search).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_button_still_works_while_expiring() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, welcome()).await;
        gw.push_reply(ReplyPayload::text("Sesja wygasła. Proszę wybrać gminę ponownie."));

        ctl.press_button(0).unwrap();
        settle(&mut ctl).await;
        ctl.submit_button("restart", "Powrót do wyboru gminy").unwrap();
        assert_eq!(*ctl.mode(), InputMode::Idle);

        run_for(&mut ctl, Duration::from_millis(2100)).await;
        let resets = sink.events().iter().filter(|e| **e == DisplayEvent::SessionReset).count();
        assert_eq!(resets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_delivered_as_http_400_is_recognised() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, sink) = started(&gw, welcome()).await;
        gw.push_error(GatewayError::Status {
            status: 400,
            message: None,
            reply: Some(Box::new(ReplyPayload::text("Sesja wygasła. Proszę wybrać gminę ponownie."))),
        });

        ctl.press_button(0).unwrap();
        run_for(&mut ctl, Duration::from_millis(2100)).await;

        assert_eq!(sink.notices()[0].kind, NoticeKind::SessionExpired);
        assert_eq!(sink.notices().len(), 1);
        assert_eq!(*ctl.mode(), InputMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_twice_equals_once() {
        let gw = Arc::new(ScriptedGateway::new());
        let (mut ctl, _sink) = started(&gw, problem_search()).await;
        gw.push_suggestions(items(&["Dziura w drodze"]));
        ctl.search_input("dziu").unwrap();
        run_for(&mut ctl, Duration::from_millis(400)).await;

        ctl.reset();
        let once = (ctl.mode().clone(), ctl.identity().map(str::to_string), ctl.suggestions().len(), ctl.is_busy());
        ctl.reset();
        let twice = (ctl.mode().clone(), ctl.identity().map(str::to_string), ctl.suggestions().len(), ctl.is_busy());

        assert_eq!(once, twice);
        assert_eq!(once, (InputMode::Idle, None, 0, false));
    }

    #[tokio::test(start_paused = true)]
    async fn reply_arriving_after_reset_is_dropped() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_reply_after(Duration::from_millis(300), welcome());
        let (mut ctl, sink) = controller(&gw);

        ctl.start("Gdańsk").unwrap();
        ctl.reset();
        run_for(&mut ctl, Duration::from_millis(500)).await;

        assert!(sink.renders().is_empty());
        assert_eq!(*ctl.mode(), InputMode::Idle);
        assert!(ctl.identity().is_none());

        gw.push_reply(welcome());
        ctl.start("Gdańsk").unwrap();
        settle(&mut ctl).await;
        assert_eq!(*ctl.mode(), InputMode::AwaitingChoice);
    }

    #[tokio::test]
    async fn health_check_reports_features() {
        let gw = Arc::new(ScriptedGateway::new());
        let (ctl, _sink) = controller(&gw);
        let report = ctl.probe_health().await.unwrap();
        assert!(report.supports("predictive_search"));
        assert_eq!(gw.requests_on(Channel::Health).len(), 1);
    }

    // ── Dispatch loop ─────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn run_loop_dispatches_commands_and_reports_rejections() {
        let gw = Arc::new(ScriptedGateway::replying(welcome()));
        gw.push_reply(ReplyPayload::text("Wybierz kategorię").with_button("Drogi", "cat_roads"));
        let (ctl, sink) = controller(&gw);
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(ctl.run(rx));

        tx.send(Command::Start("Warszawa".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(Command::PressButton(0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(Command::SearchInput("dziura".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(tx);
        handle.await.unwrap();

        assert_eq!(gw.requests_on(Channel::Start).len(), 1);
        assert_eq!(gw.requests_on(Channel::Action).len(), 1);
        assert_eq!(sink.renders().len(), 2);
        let info: Vec<_> = sink
            .notices()
            .into_iter()
            .filter(|n| n.kind == NoticeKind::Info)
            .collect();
        assert_eq!(info.len(), 1);
    }
}
