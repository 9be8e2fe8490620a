use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every state change of the countdown produces an Event.
/// Hosts forward them to the renderer; `SessionCompleted` is the
/// completion notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PresetSelected {
        preset_index: usize,
        preset_id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStarted {
        preset_index: usize,
        preset_id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        preset_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero while running.
    SessionCompleted {
        preset_index: usize,
        preset_id: String,
        completed_sessions: u64,
        at: DateTime<Utc>,
    },
    /// A command the engine refused; state is unchanged.
    CommandRejected {
        reason: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        preset_index: usize,
        preset_id: String,
        preset_label: String,
        remaining_secs: u64,
        total_secs: u64,
        minutes_left: u64,
        seconds_left: u64,
        progress: f64,
        completed_sessions: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Wire name of the variant, as written in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PresetSelected { .. } => "preset_selected",
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerReset { .. } => "timer_reset",
            Event::SessionCompleted { .. } => "session_completed",
            Event::CommandRejected { .. } => "command_rejected",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
