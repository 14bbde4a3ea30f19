/// Reusable UI components

use crate::session::{Phase, format_clock};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct TimerReadoutProps {
    pub phase: Phase,
    pub seconds_remaining: u32,
    pub total_seconds: u32,
    pub running: bool,
}

#[function_component(TimerReadout)]
pub fn timer_readout(props: &TimerReadoutProps) -> Html {
    let elapsed = props.total_seconds.saturating_sub(props.seconds_remaining);
    let progress = if props.total_seconds > 0 {
        (u64::from(elapsed) * 100 / u64::from(props.total_seconds)).min(100)
    } else {
        0
    };
    let color = if props.phase.is_break() { "#3E8635" } else { "#5B4FE8" };

    html! {
        <div class="timer-readout">
            <p class="timer-phase">
                {props.phase.label()}
                if !props.running {
                    {" (paused)"}
                }
            </p>
            <p class="timer-clock">{format_clock(props.seconds_remaining)}</p>
            <div class="progress-container">
                <div style={format!("width: {}%; background-color: {}; height: 100%; transition: width 0.3s ease;", progress, color)}>
                </div>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct CycleProgressProps {
    pub completed: u32,
    pub per_cycle: u32,
}

/// One dot per focus session until the next long break
#[function_component(CycleProgress)]
pub fn cycle_progress(props: &CycleProgressProps) -> Html {
    let per_cycle = props.per_cycle.max(1);
    let done_in_cycle = props.completed % per_cycle;

    html! {
        <div class="cycle-progress">
            {for (0..per_cycle).map(|i| {
                let class = if i < done_in_cycle { "cycle-dot cycle-dot-done" } else { "cycle-dot" };
                html! { <span class={class}></span> }
            })}
            <span class="cycle-count">
                {format!("{} sessions completed", props.completed)}
            </span>
        </div>
    }
}
