/// Focus/break state machine. Single owner of the session state.
use crate::domain::{normalize_domain, normalize_domain_list};
use crate::notify::{NotificationChannel, Notifier, PhaseNotice, StatusLight};
use crate::protocol::{Request, Response};
use crate::session::{
    CheckUrlResponse, Phase, SessionState, Snapshot, StateView, StatusMode, TimerConfig,
};
use crate::storage::PersistentStore;

/// Cancellable once-per-second task that calls back into [`SessionStateMachine::tick`]
pub trait Ticker {
    fn start(&mut self);
    /// Must take effect before returning: no tick may fire after `cancel`.
    fn cancel(&mut self);
    fn is_running(&self) -> bool;
}

/// Everything the state machine talks to
pub struct Ports {
    pub store: Box<dyn PersistentStore>,
    pub channel: Box<dyn NotificationChannel>,
    pub status: Box<dyn StatusLight>,
    pub notifier: Box<dyn Notifier>,
    pub ticker: Box<dyn Ticker>,
}

pub struct SessionStateMachine {
    state: SessionState,
    config: TimerConfig,
    ports: Ports,
}

impl SessionStateMachine {
    /// Build the machine from whatever the store holds.
    ///
    /// A failed load starts from defaults. A session that was running when the
    /// process went away comes back stopped, and a stopped session sits at a fresh
    /// focus phase unless `preserve_on_stop` is set.
    pub fn restore(config: TimerConfig, ports: Ports) -> SessionStateMachine {
        let mut state = match ports.store.load() {
            Ok(data) => data.to_session_state(&config),
            Err(e) => {
                log::warn!("Failed to load stored state, using defaults: {}", e);
                SessionState::new(&config)
            }
        };

        state.focus_mode_active = false;
        if !config.preserve_on_stop {
            state.reset_to_focus(&config);
        }

        log::info!(
            "Session restored: {} completed sessions, {} focus domains",
            state.completed_focus_sessions,
            state.focus_domains.len()
        );

        SessionStateMachine {
            state,
            config,
            ports,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn snapshot(&self, url: Option<&str>) -> Snapshot {
        self.state.snapshot(&self.config, url)
    }

    /// Whether the countdown task is scheduled
    pub fn is_ticking(&self) -> bool {
        self.ports.ticker.is_running()
    }

    /// Start or resume focus mode
    pub fn start(&mut self, active_url: Option<&str>, now_ms: f64) {
        self.ports.ticker.cancel();

        if self.state.seconds_remaining == 0 {
            self.state.reset_to_focus(&self.config);
        }
        self.state.focus_mode_active = true;
        self.state.session_started_at = Some(now_ms);

        self.ports.ticker.start();
        log::info!(
            "Focus mode started in {:?} with {}s remaining",
            self.state.phase,
            self.state.seconds_remaining
        );

        self.persist_state();
        self.broadcast_full();
        self.send_status(self.state.status_mode_for(&self.config, active_url));
    }

    pub fn stop(&mut self) {
        self.ports.ticker.cancel();

        self.state.focus_mode_active = false;
        if !self.config.preserve_on_stop {
            self.state.reset_to_focus(&self.config);
        }
        log::info!("Focus mode stopped");

        self.persist_state();
        self.broadcast_full();
        self.send_status(StatusMode::Idle);
    }

    /// Advance the countdown by one second. Ticks that arrive while stopped are ignored.
    pub fn tick(&mut self) {
        if !self.state.focus_mode_active {
            log::debug!("Ignoring tick while stopped");
            return;
        }

        if self.state.seconds_remaining > 0 {
            self.state.seconds_remaining -= 1;
            self.persist_state();
            self.ports
                .channel
                .broadcast_timer_only(&self.state.timer_update(&self.config));

            if self.state.seconds_remaining > 0 {
                return;
            }
        }

        self.complete_phase();
    }

    fn complete_phase(&mut self) {
        let (notice, mode) = if self.state.phase == Phase::Focus {
            self.state.completed_focus_sessions += 1;
            let next = self.state.break_after_focus(&self.config);
            self.state.phase = next;
            self.state.seconds_remaining = self.state.total_seconds_for_phase(&self.config);

            (
                PhaseNotice::break_started(next, self.state.seconds_remaining / 60),
                StatusMode::Break,
            )
        } else {
            self.state.reset_to_focus(&self.config);
            (PhaseNotice::focus_resumed(), StatusMode::Focused)
        };

        log::info!(
            "Phase complete, now {:?} ({} focus sessions done)",
            self.state.phase,
            self.state.completed_focus_sessions
        );

        self.ports.notifier.notify(&notice);
        self.send_status(mode);
        self.persist_state();
        self.broadcast_full();
    }

    /// Stop and zero all progress; the allowlist and long-break setting are kept
    pub fn reset(&mut self) {
        self.ports.ticker.cancel();

        self.state.focus_mode_active = false;
        self.state.reset_to_focus(&self.config);
        self.state.completed_focus_sessions = 0;
        self.state.session_started_at = None;
        log::info!("Progress reset");

        self.persist_state();
        self.broadcast_full();
        self.send_status(StatusMode::Idle);
    }

    /// Add a focus domain. Empty input and duplicates are ignored.
    pub fn add_domain(&mut self, raw: &str) -> bool {
        let Some(domain) = normalize_domain(raw) else {
            log::debug!("Ignoring empty focus domain {:?}", raw);
            return false;
        };
        if self.state.focus_domains.contains(&domain) {
            log::debug!("Focus domain {} already present", domain);
            return false;
        }

        log::info!("Adding focus domain {}", domain);
        self.state.focus_domains.push(domain);
        self.domains_changed();
        true
    }

    pub fn remove_domain(&mut self, raw: &str) -> bool {
        let Some(domain) = normalize_domain(raw) else {
            return false;
        };

        let original_len = self.state.focus_domains.len();
        self.state.focus_domains.retain(|d| *d != domain);
        if self.state.focus_domains.len() == original_len {
            return false;
        }

        log::info!("Removed focus domain {}", domain);
        self.domains_changed();
        true
    }

    /// Re-read the allowlist record after an external edit
    pub fn reload_domains(&mut self) -> bool {
        match self.ports.store.load() {
            Ok(data) => {
                self.state.focus_domains =
                    normalize_domain_list(data.focus_urls.as_deref().unwrap_or_default());
                log::info!("Reloaded {} focus domains", self.state.focus_domains.len());
                self.persist_state();
                self.broadcast_full();
                true
            }
            Err(e) => {
                log::warn!("Failed to reload focus domains: {}", e);
                false
            }
        }
    }

    pub fn set_long_break_minutes(&mut self, minutes: u32) -> bool {
        if minutes == 0 {
            return false;
        }

        self.state.long_break_minutes = minutes;
        if self.state.phase == Phase::LongBreak {
            let total = self.state.long_break_seconds();
            self.state.seconds_remaining = self.state.seconds_remaining.min(total);
        }

        self.persist_state();
        self.broadcast_full();
        true
    }

    /// The user switched tabs or the active tab finished loading
    pub fn active_tab_changed(&mut self, url: &str) {
        if !self.state.focus_mode_active {
            return;
        }

        self.send_status(self.state.status_mode_for(&self.config, Some(url)));
        self.broadcast_full();
    }

    /// Answer a content script. An out-of-scope page during focus time lights the
    /// distracted mode; breaks leave the status page alone.
    pub fn check_url(&self, url: &str) -> CheckUrlResponse {
        let response = self.state.check_url(&self.config, url);
        if response.focus_mode && !response.is_break && !response.is_focused {
            self.send_status(StatusMode::Distracted);
        }
        response
    }

    /// Dispatch one message-bus request
    pub fn handle(&mut self, request: Request, now_ms: f64) -> Response {
        match request {
            Request::StartFocus { url } => {
                self.start(url.as_deref(), now_ms);
                Response::ack(true)
            }
            Request::StopFocus => {
                self.stop();
                Response::ack(true)
            }
            Request::ResetProgress => {
                self.reset();
                Response::ack(true)
            }
            Request::GetState { url } => Response::State(self.snapshot(url.as_deref())),
            Request::CheckUrl { url } => Response::Check(self.check_url(&url)),
            Request::ReloadDomains => Response::ack(self.reload_domains()),
            Request::AddDomain { domain } => Response::ack(self.add_domain(&domain)),
            Request::RemoveDomain { domain } => Response::ack(self.remove_domain(&domain)),
            Request::SetLongBreak { minutes } => Response::ack(self.set_long_break_minutes(minutes)),
        }
    }

    /// Cancel the countdown and flush the state record
    pub fn shutdown(&mut self) {
        self.ports.ticker.cancel();
        self.persist_state();
    }

    fn domains_changed(&mut self) {
        if let Err(e) = self.ports.store.save_domains(&self.state.focus_domains) {
            log::warn!("Failed to save focus domains: {}", e);
        }
        self.persist_state();
        self.broadcast_full();
    }

    fn persist_state(&self) {
        if let Err(e) = self.ports.store.save_state(&self.state) {
            log::warn!("Failed to save session state: {}", e);
        }
    }

    fn broadcast_full(&mut self) {
        let view = StateView::new(self.state.clone(), self.config.clone());
        self.ports.channel.broadcast_full(&view);
    }

    fn send_status(&self, mode: StatusMode) {
        log::debug!("Status page mode {}", mode.code());
        self.ports.status.send_mode(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::notify::{ObserverRegistry, Observer, Push};
    use crate::storage::{MemoryStore, StorageData};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct ManualTicker {
        running: Rc<Cell<bool>>,
        starts: Rc<Cell<usize>>,
    }

    impl Ticker for ManualTicker {
        fn start(&mut self) {
            self.running.set(true);
            self.starts.set(self.starts.get() + 1);
        }

        fn cancel(&mut self) {
            self.running.set(false);
        }

        fn is_running(&self) -> bool {
            self.running.get()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingStatus(Rc<RefCell<Vec<StatusMode>>>);

    impl StatusLight for RecordingStatus {
        fn send_mode(&self, mode: StatusMode) {
            self.0.borrow_mut().push(mode);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier(Rc<RefCell<Vec<PhaseNotice>>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: &PhaseNotice) {
            self.0.borrow_mut().push(notice.clone());
        }
    }

    struct TabObserver {
        url: String,
        received: RefCell<Vec<Push>>,
    }

    impl Observer for TabObserver {
        fn url(&self) -> Option<String> {
            Some(self.url.clone())
        }

        fn deliver(&self, push: &Push) -> Result<(), DeliveryError> {
            self.received.borrow_mut().push(push.clone());
            Ok(())
        }
    }

    struct Harness {
        machine: SessionStateMachine,
        store: MemoryStore,
        ticker: ManualTicker,
        status: RecordingStatus,
        notices: RecordingNotifier,
        tab: Rc<TabObserver>,
    }

    impl Harness {
        fn new() -> Harness {
            Self::with(MemoryStore::new(), TimerConfig::default())
        }

        fn with(store: MemoryStore, config: TimerConfig) -> Harness {
            let ticker = ManualTicker::default();
            let status = RecordingStatus::default();
            let notices = RecordingNotifier::default();
            let tab = Rc::new(TabObserver {
                url: "https://docs.school.edu/x".to_string(),
                received: RefCell::new(Vec::new()),
            });

            let mut registry = ObserverRegistry::new();
            registry.register(&tab);

            let machine = SessionStateMachine::restore(
                config,
                Ports {
                    store: Box::new(store.clone()),
                    channel: Box::new(registry),
                    status: Box::new(status.clone()),
                    notifier: Box::new(notices.clone()),
                    ticker: Box::new(ticker.clone()),
                },
            );

            Harness {
                machine,
                store,
                ticker,
                status,
                notices,
                tab,
            }
        }

        fn ticks(&mut self, n: u32) {
            for _ in 0..n {
                self.machine.tick();
            }
        }

        /// Run the current phase to completion
        fn finish_phase(&mut self) {
            let remaining = self.machine.state().seconds_remaining;
            self.ticks(remaining);
        }

        fn last_status(&self) -> Option<StatusMode> {
            self.status.0.borrow().last().copied()
        }

        fn full_updates(&self) -> usize {
            self.tab
                .received
                .borrow()
                .iter()
                .filter(|push| matches!(push, Push::UpdateState { .. }))
                .count()
        }

        fn timer_updates(&self) -> usize {
            self.tab
                .received
                .borrow()
                .iter()
                .filter(|push| matches!(push, Push::UpdateTimer { .. }))
                .count()
        }
    }

    #[test]
    fn test_start_from_defaults() {
        let mut h = Harness::new();

        h.machine.start(None, 1000.0);

        let state = h.machine.state();
        assert!(state.focus_mode_active);
        assert_eq!(state.phase, Phase::Focus);
        assert_eq!(state.seconds_remaining, 1500);
        assert_eq!(state.session_started_at, Some(1000.0));
        assert!(h.machine.is_ticking());
        assert_eq!(h.ticker.starts.get(), 1);
        assert_eq!(h.last_status(), Some(StatusMode::Focused));
        assert_eq!(h.full_updates(), 1);
    }

    #[test]
    fn test_start_reports_distracted_for_out_of_scope_tab() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");

        h.machine.start(Some("https://news.com"), 0.0);

        assert_eq!(h.last_status(), Some(StatusMode::Distracted));
    }

    #[test]
    fn test_tick_decrements_and_sends_timer_only() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);
        let full_before = h.full_updates();

        h.ticks(3);

        assert_eq!(h.machine.state().seconds_remaining, 1497);
        assert_eq!(h.timer_updates(), 3);
        assert_eq!(h.full_updates(), full_before);
        assert_eq!(
            h.store.data().state.map(|s| s.seconds_remaining),
            Some(1497)
        );
    }

    #[test]
    fn test_countdown_completes_exactly_once() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);

        h.ticks(1500);

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::ShortBreak);
        assert_eq!(state.seconds_remaining, 300);
        assert_eq!(state.completed_focus_sessions, 1);
        assert_eq!(h.notices.0.borrow().len(), 1);
        assert_eq!(h.notices.0.borrow()[0].title, "Break Time!");
        assert_eq!(h.last_status(), Some(StatusMode::Break));
    }

    #[test]
    fn test_start_with_nothing_left_begins_fresh_focus() {
        let mut state = SessionState::default();
        state.seconds_remaining = 0;
        state.phase = Phase::ShortBreak;
        let store = MemoryStore::with_data(StorageData {
            state: Some(state),
            focus_urls: None,
        });
        let config = TimerConfig {
            preserve_on_stop: true,
            ..TimerConfig::default()
        };
        let mut h = Harness::with(store, config);

        h.machine.start(None, 0.0);

        assert_eq!(h.machine.state().phase, Phase::Focus);
        assert_eq!(h.machine.state().seconds_remaining, 1500);
    }

    #[test]
    fn test_cycle_law_selects_long_break_fourth() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);

        let mut breaks = Vec::new();
        for _ in 0..4 {
            h.finish_phase();
            breaks.push(h.machine.state().phase);
            h.finish_phase();
        }

        assert_eq!(
            breaks,
            vec![
                Phase::ShortBreak,
                Phase::ShortBreak,
                Phase::ShortBreak,
                Phase::LongBreak
            ]
        );
        assert_eq!(h.machine.state().completed_focus_sessions, 4);
        assert_eq!(h.machine.state().phase, Phase::Focus);
    }

    #[test]
    fn test_fourth_completion_gives_long_break_seconds() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);

        for _ in 0..3 {
            h.finish_phase();
            h.finish_phase();
        }
        h.finish_phase();

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::LongBreak);
        assert_eq!(state.seconds_remaining, 900);
        assert_eq!(h.machine.snapshot(None).total_seconds_for_phase, 900);
        assert_eq!(h.notices.0.borrow().last().map(|n| n.title.as_str()), Some("Long Break Time!"));
    }

    #[test]
    fn test_break_end_returns_to_focus() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);
        h.finish_phase();

        h.finish_phase();

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::Focus);
        assert_eq!(state.seconds_remaining, 1500);
        assert_eq!(h.notices.0.borrow().last(), Some(&PhaseNotice::focus_resumed()));
        assert_eq!(h.last_status(), Some(StatusMode::Focused));
    }

    #[test]
    fn test_stop_then_start_is_fresh_focus() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);
        h.finish_phase();
        h.ticks(10);
        assert_eq!(h.machine.state().phase, Phase::ShortBreak);

        h.machine.stop();
        assert!(!h.ticker.is_running());
        assert_eq!(h.last_status(), Some(StatusMode::Idle));

        h.machine.start(None, 0.0);
        assert_eq!(h.machine.state().phase, Phase::Focus);
        assert_eq!(h.machine.state().seconds_remaining, 1500);
        assert_eq!(h.machine.state().completed_focus_sessions, 1);
    }

    #[test]
    fn test_preserve_on_stop_resumes_partial_time() {
        let config = TimerConfig {
            preserve_on_stop: true,
            ..TimerConfig::default()
        };
        let mut h = Harness::with(MemoryStore::new(), config);
        h.machine.start(None, 0.0);
        h.finish_phase();
        h.ticks(10);

        h.machine.stop();
        h.machine.start(None, 0.0);

        assert_eq!(h.machine.state().phase, Phase::ShortBreak);
        assert_eq!(h.machine.state().seconds_remaining, 290);
    }

    #[test]
    fn test_stale_tick_after_stop_is_ignored() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);
        h.ticks(5);
        h.machine.stop();
        let timer_updates = h.timer_updates();

        h.machine.tick();

        assert_eq!(h.machine.state().seconds_remaining, 1500);
        assert_eq!(h.timer_updates(), timer_updates);
    }

    #[test]
    fn test_reset_zeroes_progress_but_keeps_domains() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");
        h.machine.start(None, 0.0);
        h.finish_phase();

        h.machine.reset();

        let state = h.machine.state();
        assert!(!state.focus_mode_active);
        assert_eq!(state.phase, Phase::Focus);
        assert_eq!(state.seconds_remaining, 1500);
        assert_eq!(state.completed_focus_sessions, 0);
        assert_eq!(state.focus_domains, vec!["school.edu"]);
        assert!(!h.ticker.is_running());
        assert_eq!(h.last_status(), Some(StatusMode::Idle));
        assert_eq!(h.store.data().state.map(|s| s.completed_focus_sessions), Some(0));
    }

    #[test]
    fn test_add_domain_normalizes_and_rejects_duplicates() {
        let mut h = Harness::new();

        assert!(h.machine.add_domain("https://www.School.edu/courses"));
        assert!(!h.machine.add_domain("school.edu"));
        assert!(!h.machine.add_domain("   "));
        assert!(h.machine.add_domain("docs.rs"));

        assert_eq!(h.machine.state().focus_domains, vec!["school.edu", "docs.rs"]);
        assert_eq!(
            h.store.data().focus_urls,
            Some(vec!["school.edu".to_string(), "docs.rs".to_string()])
        );
        assert_eq!(h.full_updates(), 2);
    }

    #[test]
    fn test_domain_change_reannotates_observers() {
        let mut h = Harness::new();

        h.machine.add_domain("school.edu");

        match h.tab.received.borrow().last() {
            Some(Push::UpdateState { state }) => assert!(state.is_in_scope),
            other => panic!("expected full update, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_domain() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");
        h.machine.add_domain("docs.rs");

        assert!(h.machine.remove_domain("WWW.school.edu"));
        assert!(!h.machine.remove_domain("school.edu"));

        assert_eq!(h.machine.state().focus_domains, vec!["docs.rs"]);
        assert_eq!(h.store.data().focus_urls, Some(vec!["docs.rs".to_string()]));
    }

    #[test]
    fn test_reload_domains_reads_external_edit() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");

        h.store
            .put_domains(vec!["github.com".to_string(), "https://GitHub.com/x".to_string()]);

        assert!(h.machine.reload_domains());
        assert_eq!(h.machine.state().focus_domains, vec!["github.com"]);
    }

    #[test]
    fn test_reload_domains_failure_keeps_list() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");
        h.store.set_failing(true);

        assert!(!h.machine.reload_domains());
        assert_eq!(h.machine.state().focus_domains, vec!["school.edu"]);
    }

    #[test]
    fn test_store_failures_do_not_block_progress() {
        let mut h = Harness::new();
        h.store.set_failing(true);

        h.machine.start(None, 0.0);
        h.ticks(2);
        h.machine.add_domain("school.edu");

        assert_eq!(h.machine.state().seconds_remaining, 1498);
        assert_eq!(h.machine.state().focus_domains, vec!["school.edu"]);
        assert_eq!(h.store.write_count(), 0);
    }

    #[test]
    fn test_restore_falls_back_to_defaults_on_load_failure() {
        let store = MemoryStore::new();
        store.set_failing(true);

        let h = Harness::with(store, TimerConfig::default());

        assert_eq!(h.machine.state(), &SessionState::default());
    }

    #[test]
    fn test_restore_does_not_resume_countdown() {
        let mut saved = SessionState::default();
        saved.focus_mode_active = true;
        saved.phase = Phase::ShortBreak;
        saved.seconds_remaining = 120;
        saved.completed_focus_sessions = 2;
        let store = MemoryStore::with_data(StorageData {
            state: Some(saved),
            focus_urls: Some(vec!["school.edu".to_string()]),
        });

        let h = Harness::with(store, TimerConfig::default());

        let state = h.machine.state();
        assert!(!state.focus_mode_active);
        assert_eq!(state.phase, Phase::Focus);
        assert_eq!(state.seconds_remaining, 1500);
        assert_eq!(state.completed_focus_sessions, 2);
        assert_eq!(state.focus_domains, vec!["school.edu"]);
        assert!(!h.ticker.is_running());
    }

    #[test]
    fn test_restore_resets_stopped_break() {
        let mut saved = SessionState::default();
        saved.phase = Phase::ShortBreak;
        saved.seconds_remaining = 120;
        let store = MemoryStore::with_data(StorageData {
            state: Some(saved.clone()),
            focus_urls: None,
        });

        let mut h = Harness::with(store, TimerConfig::default());
        assert_eq!(h.machine.state().phase, Phase::Focus);
        assert_eq!(h.machine.state().seconds_remaining, 1500);

        h.machine.start(None, 0.0);
        assert_eq!(h.machine.state().phase, Phase::Focus);
        assert_eq!(h.machine.state().seconds_remaining, 1500);

        let config = TimerConfig {
            preserve_on_stop: true,
            ..TimerConfig::default()
        };
        let kept = Harness::with(
            MemoryStore::with_data(StorageData {
                state: Some(saved),
                focus_urls: None,
            }),
            config,
        );
        assert_eq!(kept.machine.state().phase, Phase::ShortBreak);
        assert_eq!(kept.machine.state().seconds_remaining, 120);
    }

    #[test]
    fn test_saved_state_round_trips_through_restore() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");
        h.machine.set_long_break_minutes(20);
        h.machine.start(None, 0.0);
        h.finish_phase();
        h.machine.stop();
        let before = h.machine.state().clone();

        let restored = Harness::with(h.store.clone(), TimerConfig::default());

        assert_eq!(restored.machine.state(), &before);
    }

    #[test]
    fn test_check_url_while_inactive() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");

        let response = h.machine.check_url("https://news.com");

        assert!(!response.focus_mode);
        assert!(!response.is_focused);
        assert!(h.status.0.borrow().is_empty());
    }

    #[test]
    fn test_check_url_while_running_flags_distraction() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");
        h.machine.start(Some("https://school.edu"), 0.0);

        let focused = h.machine.check_url("https://docs.school.edu/x");
        assert!(focused.focus_mode && focused.is_focused);
        assert_eq!(h.last_status(), Some(StatusMode::Focused));

        let distracted = h.machine.check_url("https://schoolX.edu");
        assert!(!distracted.is_focused);
        assert_eq!(distracted.total_seconds, 1500);
        assert_eq!(h.last_status(), Some(StatusMode::Distracted));
    }

    #[test]
    fn test_check_url_during_break_keeps_break_light() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");
        h.machine.start(Some("https://school.edu"), 0.0);
        h.finish_phase();
        assert_eq!(h.last_status(), Some(StatusMode::Break));

        let response = h.machine.check_url("https://news.com");

        assert!(response.focus_mode && response.is_break && !response.is_focused);
        assert_eq!(h.last_status(), Some(StatusMode::Break));
    }

    #[test]
    fn test_huge_long_break_setting_does_not_overflow() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);
        for _ in 0..3 {
            h.finish_phase();
            h.finish_phase();
        }
        h.finish_phase();
        assert_eq!(h.machine.state().phase, Phase::LongBreak);

        assert!(h.machine.set_long_break_minutes(80_000_000));

        assert_eq!(h.machine.state().seconds_remaining, 900);
        assert_eq!(h.machine.snapshot(None).total_seconds_for_phase, u32::MAX);
    }

    #[test]
    fn test_long_break_setting_clamps_running_long_break() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);
        for _ in 0..3 {
            h.finish_phase();
            h.finish_phase();
        }
        h.finish_phase();
        assert_eq!(h.machine.state().seconds_remaining, 900);

        assert!(h.machine.set_long_break_minutes(10));
        assert!(!h.machine.set_long_break_minutes(0));

        assert_eq!(h.machine.state().seconds_remaining, 600);
        assert_eq!(h.machine.state().long_break_minutes, 10);
    }

    #[test]
    fn test_active_tab_changed() {
        let mut h = Harness::new();
        h.machine.add_domain("school.edu");

        h.machine.active_tab_changed("https://news.com");
        assert!(h.status.0.borrow().is_empty());

        h.machine.start(Some("https://school.edu"), 0.0);
        h.machine.active_tab_changed("https://news.com");
        assert_eq!(h.last_status(), Some(StatusMode::Distracted));

        h.finish_phase();
        h.machine.active_tab_changed("https://news.com");
        assert_eq!(h.last_status(), Some(StatusMode::Break));
    }

    #[test]
    fn test_handle_dispatch() {
        let mut h = Harness::new();

        assert_eq!(
            h.machine.handle(Request::AddDomain { domain: "school.edu".to_string() }, 0.0),
            Response::ack(true)
        );
        assert_eq!(
            h.machine.handle(Request::StartFocus { url: None }, 5.0),
            Response::ack(true)
        );

        match h.machine.handle(
            Request::GetState {
                url: Some("https://docs.school.edu".to_string()),
            },
            0.0,
        ) {
            Response::State(snapshot) => {
                assert!(snapshot.focus_mode_active);
                assert!(snapshot.is_in_scope);
                assert_eq!(snapshot.total_seconds_for_phase, 1500);
            }
            other => panic!("expected state, got {:?}", other),
        }

        assert_eq!(h.machine.handle(Request::StopFocus, 0.0), Response::ack(true));
        match h.machine.handle(
            Request::CheckUrl {
                url: "https://docs.school.edu".to_string(),
            },
            0.0,
        ) {
            Response::Check(check) => assert!(!check.focus_mode),
            other => panic!("expected check response, got {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_cancels_and_flushes() {
        let mut h = Harness::new();
        h.machine.start(None, 0.0);
        h.ticks(7);
        let writes = h.store.write_count();

        h.machine.shutdown();

        assert!(!h.ticker.is_running());
        assert_eq!(h.store.write_count(), writes + 1);
        assert_eq!(h.store.data().state.map(|s| s.seconds_remaining), Some(1493));
    }
}
