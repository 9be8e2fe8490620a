//! Countdown engine implementation.
//!
//! The engine is a tick-driven state machine over one preset catalog. It owns
//! no threads and reads no clock: the caller delivers one `tick()` per elapsed
//! second while the countdown runs (see [`super::driver`]).
//!
//! ## State Transitions
//!
//! ```text
//! Idle(t)      --toggle-->  Running(t)        (t > 0)
//! Running(t)   --toggle-->  Idle(t)
//! Running(t>1) --tick-->    Running(t-1)
//! Running(1)   --tick-->    Completed         (completed_sessions += 1)
//! Completed    --toggle-->  Running(full)
//! any          --reset-->   Idle(full)
//! Idle/Compl.  --select-->  Idle(full(i))
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CountdownEngine::new(PresetCatalog::standard());
//! engine.toggle_start_pause();
//! // Once per second:
//! engine.tick(); // Returns Some(Event::SessionCompleted) on the last second
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::preset::{Preset, PresetCatalog};
use crate::error::TimerError;
use crate::events::Event;

/// Observable phase of the countdown, derived from the running flag and the
/// remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    /// Reached zero; the next toggle restarts from the full duration.
    Completed,
}

/// Core countdown engine.
#[derive(Debug, Clone)]
pub struct CountdownEngine {
    catalog: PresetCatalog,
    selected_index: usize,
    remaining_secs: u64,
    is_running: bool,
    /// Set once the current countdown has been started; cleared by reset,
    /// preset switch, and completion.
    session_started: bool,
    completed_sessions: u64,
}

impl CountdownEngine {
    /// Create an engine seeded from the first preset's full duration.
    pub fn new(catalog: PresetCatalog) -> Self {
        let remaining_secs = catalog.get(0).map(Preset::duration_secs).unwrap_or(0);
        Self {
            catalog,
            selected_index: 0,
            remaining_secs,
            is_running: false,
            session_started: false,
            completed_sessions: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        if self.is_running {
            TimerState::Running
        } else if self.remaining_secs == 0 {
            TimerState::Completed
        } else {
            TimerState::Idle
        }
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn selected_preset(&self) -> Option<&Preset> {
        self.catalog.get(self.selected_index)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn completed_sessions(&self) -> u64 {
        self.completed_sessions
    }

    /// Full duration of the selected preset in seconds.
    pub fn total_secs(&self) -> u64 {
        self.selected_preset()
            .map(Preset::duration_secs)
            .unwrap_or(0)
    }

    /// Remaining time as `(minutes, seconds)`.
    pub fn display(&self) -> (u64, u64) {
        (self.remaining_secs / 60, self.remaining_secs % 60)
    }

    /// 0.0 .. 1.0 elapsed fraction of the selected preset.
    ///
    /// A zero-minute preset counts as already finished.
    pub fn progress_fraction(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 1.0;
        }
        (1.0 - self.remaining_secs as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let preset = self.selected_preset();
        let (minutes_left, seconds_left) = self.display();
        Event::StateSnapshot {
            state: self.state(),
            preset_index: self.selected_index,
            preset_id: preset.map(|p| p.id.clone()).unwrap_or_default(),
            preset_label: preset.map(|p| p.label.clone()).unwrap_or_default(),
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            minutes_left,
            seconds_left,
            progress: self.progress_fraction(),
            completed_sessions: self.completed_sessions,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch to preset `index`, stopping and refilling the countdown.
    ///
    /// Rejected without touching state while the countdown runs.
    pub fn select_preset(&mut self, index: usize) -> Result<Event, TimerError> {
        if index >= self.catalog.len() {
            return Err(TimerError::InvalidPreset {
                index,
                len: self.catalog.len(),
            });
        }
        if self.is_running {
            return Err(TimerError::PresetLockedWhileRunning);
        }
        self.selected_index = index;
        self.is_running = false;
        self.session_started = false;
        self.remaining_secs = self.total_secs();
        debug!(index, remaining_secs = self.remaining_secs, "preset selected");
        Ok(Event::PresetSelected {
            preset_index: index,
            preset_id: self.selected_preset().map(|p| p.id.clone()).unwrap_or_default(),
            duration_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Look the preset up by id, then [`select_preset`](Self::select_preset).
    pub fn select_preset_by_id(&mut self, id: &str) -> Result<Event, TimerError> {
        let index = self
            .catalog
            .position(id)
            .ok_or_else(|| TimerError::UnknownPresetId(id.to_string()))?;
        self.select_preset(index)
    }

    /// Select the next preset in catalog order, wrapping to the first.
    pub fn cycle_preset(&mut self) -> Result<Event, TimerError> {
        self.select_preset(self.catalog.next_index(self.selected_index))
    }

    /// Start, pause, resume, or restart after completion.
    ///
    /// Returns `None` only for a zero-minute preset, which can never run.
    pub fn toggle_start_pause(&mut self) -> Option<Event> {
        if self.remaining_secs == 0 {
            self.is_running = false;
            self.remaining_secs = self.total_secs();
            if self.remaining_secs == 0 {
                debug!(index = self.selected_index, "zero-duration preset, not starting");
                return None;
            }
            self.is_running = true;
            self.session_started = true;
            debug!(remaining_secs = self.remaining_secs, "countdown restarted");
            return Some(self.started_event());
        }

        if self.is_running {
            self.is_running = false;
            debug!(remaining_secs = self.remaining_secs, "countdown paused");
            return Some(Event::TimerPaused {
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            });
        }

        self.is_running = true;
        if !self.session_started {
            self.session_started = true;
            debug!(remaining_secs = self.remaining_secs, "countdown started");
            Some(self.started_event())
        } else {
            debug!(remaining_secs = self.remaining_secs, "countdown resumed");
            Some(Event::TimerResumed {
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            })
        }
    }

    /// Stop and refill to the selected preset's full duration. Idempotent.
    pub fn reset(&mut self) -> Event {
        self.is_running = false;
        self.session_started = false;
        self.remaining_secs = self.total_secs();
        debug!(remaining_secs = self.remaining_secs, "countdown reset");
        Event::TimerReset {
            preset_index: self.selected_index,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `Some(Event::SessionCompleted)` on the tick that reaches zero.
    /// Ticks while stopped, or a stray tick at zero, change nothing.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        match self.remaining_secs {
            0 => None,
            1 => {
                self.remaining_secs = 0;
                self.is_running = false;
                self.session_started = false;
                self.completed_sessions += 1;
                let preset_id = self.selected_preset().map(|p| p.id.clone()).unwrap_or_default();
                info!(
                    preset = %preset_id,
                    completed_sessions = self.completed_sessions,
                    "session completed"
                );
                Some(Event::SessionCompleted {
                    preset_index: self.selected_index,
                    preset_id,
                    completed_sessions: self.completed_sessions,
                    at: Utc::now(),
                })
            }
            _ => {
                self.remaining_secs -= 1;
                None
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn started_event(&self) -> Event {
        Event::TimerStarted {
            preset_index: self.selected_index,
            preset_id: self.selected_preset().map(|p| p.id.clone()).unwrap_or_default(),
            duration_secs: self.total_secs(),
            at: Utc::now(),
        }
    }
}

impl Default for CountdownEngine {
    fn default() -> Self {
        Self::new(PresetCatalog::standard())
    }
}

/// Render seconds as zero-padded `MM:SS`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CountdownEngine {
        CountdownEngine::default()
    }

    fn run_ticks(engine: &mut CountdownEngine, n: u64) -> Vec<Event> {
        (0..n).filter_map(|_| engine.tick()).collect()
    }

    #[test]
    fn starts_idle_on_first_preset() {
        let e = engine();
        assert_eq!(e.state(), TimerState::Idle);
        assert_eq!(e.selected_index(), 0);
        assert_eq!(e.remaining_secs(), 25 * 60);
        assert_eq!(e.completed_sessions(), 0);
        assert_eq!(e.progress_fraction(), 0.0);
    }

    #[test]
    fn start_pause_resume() {
        let mut e = engine();
        assert!(matches!(e.toggle_start_pause(), Some(Event::TimerStarted { .. })));
        assert_eq!(e.state(), TimerState::Running);

        e.tick();
        assert!(matches!(
            e.toggle_start_pause(),
            Some(Event::TimerPaused { remaining_secs: 1499, .. })
        ));
        assert_eq!(e.state(), TimerState::Idle);

        assert!(matches!(
            e.toggle_start_pause(),
            Some(Event::TimerResumed { remaining_secs: 1499, .. })
        ));
        assert!(e.is_running());
    }

    #[test]
    fn pause_before_first_tick_then_resume() {
        let mut e = engine();
        assert!(matches!(e.toggle_start_pause(), Some(Event::TimerStarted { .. })));
        assert!(matches!(
            e.toggle_start_pause(),
            Some(Event::TimerPaused { remaining_secs: 1500, .. })
        ));
        assert!(matches!(
            e.toggle_start_pause(),
            Some(Event::TimerResumed { remaining_secs: 1500, .. })
        ));

        e.reset();
        assert!(matches!(e.toggle_start_pause(), Some(Event::TimerStarted { .. })));
    }

    #[test]
    fn pause_preserves_remaining_time() {
        let mut e = engine();
        e.toggle_start_pause();
        e.tick();
        e.tick();
        e.toggle_start_pause();
        let paused_at = e.remaining_secs();
        run_ticks(&mut e, 10);
        e.toggle_start_pause();
        assert_eq!(e.remaining_secs(), paused_at);
        assert_eq!(paused_at, 25 * 60 - 2);
    }

    #[test]
    fn runs_to_completion_exactly_once() {
        let mut e = engine();
        e.toggle_start_pause();
        assert!(run_ticks(&mut e, 25 * 60 - 1).is_empty());
        assert_eq!(e.remaining_secs(), 1);
        assert!(e.is_running());
        assert_eq!(e.completed_sessions(), 0);

        let done = e.tick();
        assert!(matches!(
            done,
            Some(Event::SessionCompleted { completed_sessions: 1, .. })
        ));
        assert_eq!(e.remaining_secs(), 0);
        assert!(!e.is_running());
        assert_eq!(e.state(), TimerState::Completed);
        assert_eq!(e.progress_fraction(), 1.0);

        assert!(e.tick().is_none());
        assert_eq!(e.completed_sessions(), 1);
    }

    #[test]
    fn toggle_after_completion_restarts() {
        let mut e = engine();
        e.select_preset(2).unwrap();
        e.toggle_start_pause();
        run_ticks(&mut e, 5 * 60);
        assert_eq!(e.state(), TimerState::Completed);

        assert!(matches!(e.toggle_start_pause(), Some(Event::TimerStarted { .. })));
        assert!(e.is_running());
        assert_eq!(e.remaining_secs(), 5 * 60);
    }

    #[test]
    fn reset_goes_back_to_full_duration() {
        let mut e = engine();
        e.toggle_start_pause();
        run_ticks(&mut e, 30);
        e.reset();
        assert_eq!(e.remaining_secs(), 25 * 60);
        assert!(!e.is_running());
        e.reset();
        assert_eq!(e.remaining_secs(), 25 * 60);
        assert_eq!(e.completed_sessions(), 0);
    }

    #[test]
    fn select_preset_refills_and_stops() {
        let mut e = engine();
        let event = e.select_preset(1).unwrap();
        assert!(matches!(
            event,
            Event::PresetSelected { preset_index: 1, duration_secs: 3000, .. }
        ));
        assert_eq!(e.remaining_secs(), 50 * 60);
        assert!(!e.is_running());
    }

    #[test]
    fn select_preset_rejects_out_of_range() {
        let mut e = engine();
        assert_eq!(
            e.select_preset(3),
            Err(TimerError::InvalidPreset { index: 3, len: 3 })
        );
        assert_eq!(e.selected_index(), 0);
    }

    #[test]
    fn select_preset_locked_while_running() {
        let mut e = engine();
        e.toggle_start_pause();
        e.tick();
        assert_eq!(e.select_preset(2), Err(TimerError::PresetLockedWhileRunning));
        assert_eq!(e.selected_index(), 0);
        assert_eq!(e.remaining_secs(), 25 * 60 - 1);
        assert!(e.is_running());
    }

    #[test]
    fn select_preset_by_id_and_cycle() {
        let mut e = engine();
        e.select_preset_by_id("break").unwrap();
        assert_eq!(e.selected_index(), 2);
        e.cycle_preset().unwrap();
        assert_eq!(e.selected_index(), 0);
        assert_eq!(
            e.select_preset_by_id("nap"),
            Err(TimerError::UnknownPresetId("nap".into()))
        );
    }

    #[test]
    fn cycle_is_locked_while_running() {
        let mut e = engine();
        e.toggle_start_pause();
        assert_eq!(e.cycle_preset(), Err(TimerError::PresetLockedWhileRunning));
    }

    #[test]
    fn zero_minute_preset_never_runs() {
        let catalog = PresetCatalog::new(vec![Preset::new("empty", "Empty", 0)]).unwrap();
        let mut e = CountdownEngine::new(catalog);
        assert_eq!(e.state(), TimerState::Completed);
        assert_eq!(e.progress_fraction(), 1.0);
        assert!(e.toggle_start_pause().is_none());
        assert!(!e.is_running());
        assert!(e.tick().is_none());
        assert_eq!(e.completed_sessions(), 0);
    }

    #[test]
    fn display_splits_minutes_and_seconds() {
        let mut e = engine();
        e.toggle_start_pause();
        run_ticks(&mut e, 61);
        assert_eq!(e.display(), (23, 59));
        assert_eq!(format_clock(e.remaining_secs()), "23:59");
        assert_eq!(format_clock(5), "00:05");
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let e = engine();
        match e.snapshot() {
            Event::StateSnapshot {
                state,
                preset_index,
                remaining_secs,
                minutes_left,
                seconds_left,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(preset_index, 0);
                assert_eq!(remaining_secs, 25 * 60);
                assert_eq!((minutes_left, seconds_left), (25, 0));
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
