//! Periodic tick source for a [`CountdownEngine`].
//!
//! The driver owns the engine inside one tokio task. Commands and ticks are
//! serialized through a single `select!`, and the tick interval only exists
//! while the engine is running: it is created on the transition to running and
//! dropped on the iteration that observes pause, completion, reset, or a
//! preset switch. A late tick can therefore never reach a stopped engine.
//!
//! Delayed ticks are not caught up (`MissedTickBehavior::Delay`); a slow host
//! makes the countdown slower in wall-clock terms, it never skips seconds.
//!
//! The event channel is bounded. Per-tick snapshots are dropped while it is
//! full; transition and completion events wait for room, which holds the
//! driver until the host drains.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::engine::CountdownEngine;
use crate::error::TimerError;
use crate::events::Event;

/// Default tick period: one second.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 32;
/// Capacity of the event channel created by [`spawn`].
pub const EVENT_BUFFER: usize = 64;

/// Input accepted by a running driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleStartPause,
    Reset,
    SelectPreset(usize),
    SelectPresetById(String),
    CyclePreset,
    /// Emit a `StateSnapshot` without changing state.
    Snapshot,
    Shutdown,
}

/// Handle to a spawned driver task.
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    events: mpsc::Receiver<Event>,
    task: JoinHandle<CountdownEngine>,
}

impl DriverHandle {
    /// Queue a command. Returns false once the driver has stopped.
    pub async fn send(&self, command: Command) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Cloneable sender for feeding commands from another task.
    pub fn commands(&self) -> mpsc::Sender<Command> {
        self.commands.clone()
    }

    /// Next emitted event, or `None` after the driver stopped and the
    /// backlog is drained.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Stop the driver and hand back the engine in its final state.
    pub async fn shutdown(self) -> Result<CountdownEngine, tokio::task::JoinError> {
        // The driver may already have exited on its own.
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await
    }
}

/// Spawn a driver for `engine` on the current tokio runtime.
pub fn spawn(engine: CountdownEngine, period: Duration) -> DriverHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let task = tokio::spawn(drive(engine, period, cmd_rx, event_tx));
    DriverHandle {
        commands: cmd_tx,
        events: event_rx,
        task,
    }
}

/// Run the tick loop until `Shutdown` arrives or every command sender is
/// dropped, then return the engine.
///
/// Each applied tick emits a `StateSnapshot` (skipped when `events` is full),
/// followed by `SessionCompleted` on the tick that reaches zero.
pub async fn drive(
    mut engine: CountdownEngine,
    period: Duration,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<Event>,
) -> CountdownEngine {
    let period = period.max(Duration::from_millis(1));
    let mut ticker: Option<Interval> = None;

    loop {
        sync_ticker(&engine, &mut ticker, period);

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("command channel closed, stopping driver");
                    break;
                };
                if command == Command::Shutdown {
                    debug!("driver shutdown requested");
                    break;
                }
                if let Some(event) = apply(&mut engine, command) {
                    emit(&events, event).await;
                }
            }
            _ = next_tick(&mut ticker) => {
                let completed = engine.tick();
                emit_snapshot(&events, engine.snapshot());
                if let Some(event) = completed {
                    emit(&events, event).await;
                }
            }
        }
    }

    engine
}

/// Start or stop the interval so it exists exactly while the engine runs.
fn sync_ticker(engine: &CountdownEngine, ticker: &mut Option<Interval>, period: Duration) {
    match (engine.is_running(), ticker.is_some()) {
        (true, false) => {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            *ticker = Some(interval);
            debug!(?period, "tick source started");
        }
        (false, true) => {
            *ticker = None;
            debug!("tick source stopped");
        }
        _ => {}
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn apply(engine: &mut CountdownEngine, command: Command) -> Option<Event> {
    let result: Result<Option<Event>, TimerError> = match command {
        Command::ToggleStartPause => Ok(engine.toggle_start_pause()),
        Command::Reset => Ok(Some(engine.reset())),
        Command::SelectPreset(index) => engine.select_preset(index).map(Some),
        Command::SelectPresetById(id) => engine.select_preset_by_id(&id).map(Some),
        Command::CyclePreset => engine.cycle_preset().map(Some),
        Command::Snapshot => Ok(Some(engine.snapshot())),
        Command::Shutdown => Ok(None),
    };

    match result {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "command rejected");
            Some(Event::CommandRejected {
                reason: err.to_string(),
                at: Utc::now(),
            })
        }
    }
}

async fn emit(events: &mpsc::Sender<Event>, event: Event) {
    if events.send(event).await.is_err() {
        debug!("event receiver dropped");
    }
}

fn emit_snapshot(events: &mpsc::Sender<Event>, event: Event) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => debug!("event channel full, snapshot skipped"),
        Err(mpsc::error::TrySendError::Closed(_)) => debug!("event receiver dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Preset, PresetCatalog, TimerState};

    fn one_minute_engine() -> CountdownEngine {
        let catalog = PresetCatalog::new(vec![
            Preset::new("short", "Short", 1),
            Preset::new("long", "Long", 2),
        ])
        .unwrap();
        CountdownEngine::new(catalog)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion_on_schedule() {
        let mut handle = spawn(one_minute_engine(), Duration::from_secs(1));
        let start = Instant::now();
        assert!(handle.send(Command::ToggleStartPause).await);

        let mut snapshots = 0;
        loop {
            match handle.next_event().await.unwrap() {
                Event::StateSnapshot { .. } => snapshots += 1,
                Event::SessionCompleted { completed_sessions, .. } => {
                    assert_eq!(completed_sessions, 1);
                    break;
                }
                Event::TimerStarted { .. } => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(snapshots, 60);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(61));

        // No ticks are delivered after completion.
        time::sleep(Duration::from_secs(30)).await;
        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.state(), TimerState::Completed);
        assert_eq!(engine.completed_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_driver_does_not_tick() {
        let mut handle = spawn(one_minute_engine(), Duration::from_secs(1));
        handle.send(Command::ToggleStartPause).await;
        assert!(matches!(
            handle.next_event().await,
            Some(Event::TimerStarted { .. })
        ));
        time::sleep(Duration::from_millis(3500)).await;
        handle.send(Command::ToggleStartPause).await;

        let mut ticks = 0;
        loop {
            match handle.next_event().await.unwrap() {
                Event::StateSnapshot { .. } => ticks += 1,
                Event::TimerPaused { remaining_secs, .. } => {
                    assert_eq!(remaining_secs, 57);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(ticks, 3);

        time::sleep(Duration::from_secs(120)).await;
        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.remaining_secs(), 57);
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn preset_switch_while_running_is_rejected() {
        let mut handle = spawn(one_minute_engine(), Duration::from_secs(1));
        handle.send(Command::ToggleStartPause).await;
        handle.send(Command::SelectPreset(1)).await;

        assert!(matches!(
            handle.next_event().await,
            Some(Event::TimerStarted { .. })
        ));
        match handle.next_event().await {
            Some(Event::CommandRejected { reason, .. }) => {
                assert!(reason.contains("running"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.selected_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_ticking() {
        let mut handle = spawn(one_minute_engine(), Duration::from_secs(1));
        handle.send(Command::ToggleStartPause).await;
        time::sleep(Duration::from_millis(2500)).await;
        handle.send(Command::Reset).await;
        time::sleep(Duration::from_secs(10)).await;
        handle.send(Command::Snapshot).await;

        let mut last = None;
        while let Some(event) = handle.next_event().await {
            let done = matches!(event, Event::StateSnapshot { state: TimerState::Idle, .. });
            last = Some(event);
            if done {
                break;
            }
        }
        match last {
            Some(Event::StateSnapshot { remaining_secs, .. }) => assert_eq!(remaining_secs, 60),
            other => panic!("expected snapshot, got {other:?}"),
        }
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn dropping_senders_stops_driver() {
        let (tx, rx) = mpsc::channel(1);
        let (event_tx, _event_rx) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(drive(one_minute_engine(), DEFAULT_TICK_PERIOD, rx, event_tx));
        drop(tx);
        let engine = task.await.unwrap();
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn undrained_events_stay_bounded() {
        let (tx, rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(4);
        let task = tokio::spawn(drive(one_minute_engine(), Duration::from_secs(1), rx, event_tx));
        tx.send(Command::ToggleStartPause).await.unwrap();

        // Nobody reads events for well past the end of the session.
        time::sleep(Duration::from_secs(90)).await;

        let mut snapshots = 0;
        let mut completed = false;
        while let Ok(event) = event_rx.try_recv() {
            match event {
                Event::StateSnapshot { .. } => snapshots += 1,
                Event::SessionCompleted { .. } => completed = true,
                Event::TimerStarted { .. } => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(snapshots <= 4);
        // Completion waits for room instead of being dropped.
        if !completed {
            tokio::task::yield_now().await;
            assert!(matches!(
                event_rx.recv().await,
                Some(Event::SessionCompleted { completed_sessions: 1, .. })
            ));
        }

        drop(tx);
        let engine = task.await.unwrap();
        assert_eq!(engine.completed_sessions(), 1);
        assert_eq!(engine.state(), TimerState::Completed);
    }
}
