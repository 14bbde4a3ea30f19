/// Session data structures for FocusBrowse
use crate::domain::{host_of, is_in_scope};
use serde::{Deserialize, Serialize};

/// Current phase of a focus session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "Focus Time",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

/// Mode code understood by the external status page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusMode {
    Idle = 0,
    Focused = 1,
    Distracted = 2,
    Break = 4,
}

impl StatusMode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Timer configuration supplied by the extension host. Missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerConfig {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub default_long_break_minutes: u32,
    pub sessions_per_long_break: u32,
    /// Keep phase and remaining time when focus mode is stopped
    pub preserve_on_stop: bool,
    pub status_page_url: String,
}

impl TimerConfig {
    pub fn focus_seconds(&self) -> u32 {
        self.focus_minutes.max(1).saturating_mul(60)
    }

    pub fn short_break_seconds(&self) -> u32 {
        self.short_break_minutes.max(1).saturating_mul(60)
    }

    fn long_break_every(&self) -> u32 {
        self.sessions_per_long_break.max(1)
    }

    /// Whether the status page itself is at `url`
    pub fn is_status_page(&self, url: &str) -> bool {
        match (host_of(url), host_of(&self.status_page_url)) {
            (Some(host), Some(status_host)) => host == status_host,
            _ => false,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            focus_minutes: 25,
            short_break_minutes: 5,
            default_long_break_minutes: 15,
            sessions_per_long_break: 4,
            preserve_on_stop: false,
            status_page_url: "https://mahirul101.github.io/".to_string(),
        }
    }
}

/// Canonical session state. The persisted `state` record is this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionState {
    pub focus_mode_active: bool,
    pub phase: Phase,
    pub seconds_remaining: u32,
    pub completed_focus_sessions: u32,
    pub focus_domains: Vec<String>,
    pub long_break_minutes: u32,
    /// Epoch millis of the last start, diagnostic only
    pub session_started_at: Option<f64>,
}

impl SessionState {
    pub fn new(config: &TimerConfig) -> SessionState {
        SessionState {
            focus_mode_active: false,
            phase: Phase::Focus,
            seconds_remaining: config.focus_seconds(),
            completed_focus_sessions: 0,
            focus_domains: Vec::new(),
            long_break_minutes: config.default_long_break_minutes.max(1),
            session_started_at: None,
        }
    }

    pub fn long_break_seconds(&self) -> u32 {
        self.long_break_minutes.max(1).saturating_mul(60)
    }

    pub fn total_seconds_for_phase(&self, config: &TimerConfig) -> u32 {
        match self.phase {
            Phase::Focus => config.focus_seconds(),
            Phase::ShortBreak => config.short_break_seconds(),
            Phase::LongBreak => self.long_break_seconds(),
        }
    }

    pub fn reset_to_focus(&mut self, config: &TimerConfig) {
        self.phase = Phase::Focus;
        self.seconds_remaining = config.focus_seconds();
    }

    /// Break selected after the focus phase that brought the counter to its current value
    pub fn break_after_focus(&self, config: &TimerConfig) -> Phase {
        let count = self.completed_focus_sessions;
        if count > 0 && count % config.long_break_every() == 0 {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }

    pub fn is_in_scope(&self, config: &TimerConfig, url: &str) -> bool {
        !config.is_status_page(url) && is_in_scope(url, &self.focus_domains)
    }

    pub fn snapshot(&self, config: &TimerConfig, url: Option<&str>) -> Snapshot {
        Snapshot {
            focus_mode_active: self.focus_mode_active,
            phase: self.phase,
            seconds_remaining: self.seconds_remaining,
            total_seconds_for_phase: self.total_seconds_for_phase(config),
            is_in_scope: url.is_some_and(|url| self.is_in_scope(config, url)),
            completed_focus_sessions: self.completed_focus_sessions,
            long_break_minutes: self.long_break_minutes,
            sessions_per_long_break: config.long_break_every(),
            focus_domains: self.focus_domains.clone(),
        }
    }

    pub fn timer_update(&self, config: &TimerConfig) -> TimerUpdate {
        TimerUpdate {
            seconds_remaining: self.seconds_remaining,
            total_seconds: self.total_seconds_for_phase(config),
            phase: self.phase,
        }
    }

    pub fn check_url(&self, config: &TimerConfig, url: &str) -> CheckUrlResponse {
        CheckUrlResponse {
            focus_mode: self.focus_mode_active,
            is_focused: self.is_in_scope(config, url),
            is_break: self.phase.is_break(),
            seconds_remaining: self.seconds_remaining,
            total_seconds: self.total_seconds_for_phase(config),
        }
    }

    /// Status page mode while running. An unknown active URL counts as focused.
    pub fn status_mode_for(&self, config: &TimerConfig, active_url: Option<&str>) -> StatusMode {
        if !self.focus_mode_active {
            StatusMode::Idle
        } else if self.phase.is_break() {
            StatusMode::Break
        } else {
            match active_url {
                Some(url) if !self.is_in_scope(config, url) => StatusMode::Distracted,
                _ => StatusMode::Focused,
            }
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::new(&TimerConfig::default())
    }
}

/// Point-in-time read of the session, annotated for one observer's URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub focus_mode_active: bool,
    pub phase: Phase,
    pub seconds_remaining: u32,
    pub total_seconds_for_phase: u32,
    pub is_in_scope: bool,
    pub completed_focus_sessions: u32,
    pub long_break_minutes: u32,
    pub sessions_per_long_break: u32,
    pub focus_domains: Vec<String>,
}

impl Snapshot {
    /// Fold a timer-only update into this snapshot
    pub fn apply_timer(&mut self, update: &TimerUpdate) {
        self.seconds_remaining = update.seconds_remaining;
        self.total_seconds_for_phase = update.total_seconds;
        self.phase = update.phase;
    }
}

/// Lightweight per-second update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdate {
    pub seconds_remaining: u32,
    pub total_seconds: u32,
    pub phase: Phase,
}

/// Reply to a content script asking about its own URL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUrlResponse {
    pub focus_mode: bool,
    pub is_focused: bool,
    pub is_break: bool,
    pub seconds_remaining: u32,
    pub total_seconds: u32,
}

/// Owned copy of the state and config, handed to notification channels so each
/// observer can be given its own snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StateView {
    pub state: SessionState,
    pub config: TimerConfig,
}

impl StateView {
    pub fn new(state: SessionState, config: TimerConfig) -> StateView {
        StateView { state, config }
    }

    pub fn snapshot_for(&self, url: Option<&str>) -> Snapshot {
        self.state.snapshot(&self.config, url)
    }
}

/// Format seconds as `MM:SS`
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
