/// Page nudges drawn by the content script: dimming, warning banner, coffee mug
use crate::notify::Push;
use crate::session::{CheckUrlResponse, Snapshot, TimerUpdate};
use serde::{Deserialize, Serialize};

/// The content script's local copy of the last state it was sent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageState {
    pub focus_mode: bool,
    pub is_focused: bool,
    pub is_break: bool,
    pub seconds_remaining: u32,
    pub total_seconds: u32,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            focus_mode: false,
            is_focused: true,
            is_break: false,
            seconds_remaining: 0,
            total_seconds: 25 * 60,
        }
    }
}

impl From<CheckUrlResponse> for PageState {
    fn from(response: CheckUrlResponse) -> Self {
        PageState {
            focus_mode: response.focus_mode,
            is_focused: response.is_focused,
            is_break: response.is_break,
            seconds_remaining: response.seconds_remaining,
            total_seconds: response.total_seconds,
        }
    }
}

impl From<&Snapshot> for PageState {
    fn from(snapshot: &Snapshot) -> Self {
        PageState {
            focus_mode: snapshot.focus_mode_active,
            is_focused: snapshot.is_in_scope,
            is_break: snapshot.phase.is_break(),
            seconds_remaining: snapshot.seconds_remaining,
            total_seconds: snapshot.total_seconds_for_phase,
        }
    }
}

impl PageState {
    /// Take a newer state. Returns true when the whole page must be redrawn rather
    /// than just the mug: focus mode just turned on, or the clock jumped.
    pub fn apply(&mut self, next: PageState) -> bool {
        let entered_focus = !self.focus_mode && next.focus_mode;
        let jumped = self.seconds_remaining.abs_diff(next.seconds_remaining) > 2;
        *self = next;
        entered_focus || jumped
    }

    pub fn apply_timer(&mut self, update: &TimerUpdate) {
        self.seconds_remaining = update.seconds_remaining;
        self.total_seconds = update.total_seconds;
        self.is_break = update.phase.is_break();
    }

    /// Apply a pushed message; returns whether a full redraw is needed
    pub fn apply_push(&mut self, push: &Push) -> bool {
        match push {
            Push::UpdateState { state } => self.apply(PageState::from(state)),
            Push::UpdateTimer { timer } => {
                self.apply_timer(timer);
                false
            }
        }
    }

    /// Local one-second step between syncs so the mug fills smoothly during focus
    pub fn local_tick(&mut self) -> bool {
        if self.focus_mode && !self.is_break && self.seconds_remaining > 0 {
            self.seconds_remaining -= 1;
            true
        } else {
            false
        }
    }

    pub fn effects(&self) -> PageEffects {
        if !self.focus_mode {
            return PageEffects::default();
        }

        let mug = Some(MugFill::new(self.seconds_remaining, self.total_seconds));
        if self.is_break {
            PageEffects {
                dim: false,
                banner: Some(Banner::Break),
                mug,
            }
        } else if !self.is_focused {
            PageEffects {
                dim: true,
                banner: Some(Banner::Distracted),
                mug,
            }
        } else {
            PageEffects {
                dim: false,
                banner: None,
                mug,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Banner {
    Distracted,
    Break,
}

impl Banner {
    pub fn text(self) -> &'static str {
        match self {
            Banner::Distracted => "Focus on study sites",
            Banner::Break => "Break Time!",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Banner::Distracted => "⚠️",
            Banner::Break => "☕",
        }
    }

    /// Icon and text as shown on the page
    pub fn line(self) -> String {
        format!("{} {}", self.icon(), self.text())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FillLevel {
    Empty,
    Quarter,
    Half,
    ThreeQuarter,
    NearlyFull,
}

/// How full the coffee mug is for the current phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MugFill {
    /// 0.0 at phase start, 1.0 when the phase is over
    pub progress: f64,
    pub level: FillLevel,
    pub tooltip: String,
}

impl MugFill {
    pub fn new(seconds_remaining: u32, total_seconds: u32) -> MugFill {
        let progress = if total_seconds > 0 {
            (1.0 - f64::from(seconds_remaining) / f64::from(total_seconds)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let level = if progress >= 0.9 {
            FillLevel::NearlyFull
        } else if progress >= 0.75 {
            FillLevel::ThreeQuarter
        } else if progress >= 0.5 {
            FillLevel::Half
        } else if progress >= 0.25 {
            FillLevel::Quarter
        } else {
            FillLevel::Empty
        };

        let tooltip = format!(
            "Study Progress: {}% complete\n{} / {} remaining",
            (progress * 100.0).round(),
            short_clock(seconds_remaining),
            short_clock(total_seconds)
        );

        MugFill {
            progress,
            level,
            tooltip,
        }
    }
}

/// What the content script should show on its page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEffects {
    pub dim: bool,
    pub banner: Option<Banner>,
    pub mug: Option<MugFill>,
}

fn short_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
