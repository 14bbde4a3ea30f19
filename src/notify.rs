/// Best-effort fan-out of session updates to observers
use crate::error::DeliveryError;
use crate::session::{Phase, Snapshot, StateView, StatusMode, TimerUpdate};
use serde::{Deserialize, Serialize};
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Messages pushed from the background service to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Push {
    UpdateState { state: Snapshot },
    UpdateTimer { timer: TimerUpdate },
}

/// Something that renders session updates: a tab, the popup, a status page
pub trait Observer {
    /// URL the observer is showing, used for the in-scope annotation
    fn url(&self) -> Option<String>;

    /// Whether the observer wants the per-second timer updates
    fn wants_timer_ticks(&self) -> bool {
        true
    }

    fn deliver(&self, push: &Push) -> Result<(), DeliveryError>;
}

/// Fire-and-forget broadcast. Implementations never report per-observer failures.
pub trait NotificationChannel {
    fn broadcast_full(&mut self, view: &StateView);
    fn broadcast_timer_only(&mut self, update: &TimerUpdate);
}

/// Side channel to the external status page
pub trait StatusLight {
    fn send_mode(&self, mode: StatusMode);
}

/// Desktop notifications on phase changes
pub trait Notifier {
    fn notify(&self, notice: &PhaseNotice);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseNotice {
    pub title: String,
    pub message: String,
}

impl PhaseNotice {
    pub fn break_started(phase: Phase, minutes: u32) -> PhaseNotice {
        match phase {
            Phase::LongBreak => PhaseNotice {
                title: "Long Break Time!".to_string(),
                message: format!("Great job! Take a {} minute break.", minutes),
            },
            _ => PhaseNotice {
                title: "Break Time!".to_string(),
                message: format!("Take a {} minute break.", minutes),
            },
        }
    }

    pub fn focus_resumed() -> PhaseNotice {
        PhaseNotice {
            title: "Back to Focus!".to_string(),
            message: "Break is over. Time to focus again!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn new() -> ObserverId {
        ObserverId(Uuid::new_v4())
    }
}

/// Registry of weak observer handles.
///
/// Dropped observers are pruned on the next broadcast. A failed delivery is logged
/// and the batch carries on.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(ObserverId, Weak<dyn Observer>)>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<O: Observer + 'static>(&mut self, observer: &Rc<O>) -> ObserverId {
        let id = ObserverId::new();
        let weak: Weak<dyn Observer> = Rc::downgrade(observer) as Weak<O>;
        self.observers.push((id, weak));
        id
    }

    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let original_len = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() < original_len
    }

    /// Number of observers still alive
    pub fn live_count(&self) -> usize {
        self.observers
            .iter()
            .filter(|(_, observer)| observer.strong_count() > 0)
            .count()
    }

    /// Deliver one push per live observer; returns how many deliveries succeeded
    fn deliver_all(&mut self, build: impl Fn(&dyn Observer) -> Option<Push>) -> usize {
        self.observers.retain(|(_, observer)| observer.strong_count() > 0);

        let mut delivered = 0;
        for (id, weak) in &self.observers {
            let Some(observer) = weak.upgrade() else {
                continue;
            };
            let Some(push) = build(&*observer) else {
                continue;
            };

            match observer.deliver(&push) {
                Ok(()) => delivered += 1,
                Err(e) => log::debug!("Delivery to observer {:?} failed: {}", id, e),
            }
        }
        delivered
    }

    pub fn send_full(&mut self, view: &StateView) -> usize {
        self.deliver_all(|observer| {
            let url = observer.url();
            Some(Push::UpdateState {
                state: view.snapshot_for(url.as_deref()),
            })
        })
    }

    pub fn send_timer(&mut self, update: &TimerUpdate) -> usize {
        self.deliver_all(|observer| {
            observer
                .wants_timer_ticks()
                .then_some(Push::UpdateTimer { timer: *update })
        })
    }
}

impl NotificationChannel for ObserverRegistry {
    fn broadcast_full(&mut self, view: &StateView) {
        let delivered = self.send_full(view);
        log::debug!("Full state delivered to {} observers", delivered);
    }

    fn broadcast_timer_only(&mut self, update: &TimerUpdate) {
        self.send_timer(update);
    }
}
