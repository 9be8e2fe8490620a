use std::time::Duration;

use clap::Subcommand;
use focusboard_core::timer::driver;
use focusboard_core::{format_clock, Command, Config, CountdownEngine, Event, TimerState};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Subcommand)]
pub enum TimerAction {
    /// List the configured presets as JSON
    Presets,
    /// Print the initial timer state as JSON
    Status {
        /// Preset id to select
        #[arg(long)]
        preset: Option<String>,
    },
    /// Run a countdown in the foreground.
    ///
    /// Reads commands from stdin, one per line: p (start/pause), r (reset),
    /// n (next preset), s <index|id> (select preset), status, q (quit).
    Run {
        /// Preset id to select before starting
        #[arg(long)]
        preset: Option<String>,
        /// Wait for a `p` command instead of starting immediately
        #[arg(long)]
        no_autostart: bool,
        /// Keep running after a session completes
        #[arg(long)]
        keep_going: bool,
        /// Override the tick period in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Print MM:SS lines instead of JSON events
        #[arg(long)]
        clock: bool,
    },
}

fn build_engine(config: &Config, preset: Option<&str>) -> Result<CountdownEngine, Box<dyn std::error::Error>> {
    let mut engine = CountdownEngine::new(config.presets.clone());
    if let Some(id) = preset {
        engine.select_preset_by_id(id)?;
    }
    Ok(engine)
}

/// Parse one stdin line. `Ok(None)` means the line is blank.
fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let command = match head {
        "p" | "toggle" | "start" | "pause" => Command::ToggleStartPause,
        "r" | "reset" => Command::Reset,
        "n" | "next" => Command::CyclePreset,
        "status" => Command::Snapshot,
        "q" | "quit" => Command::Shutdown,
        "s" | "select" => {
            let arg = words
                .next()
                .ok_or_else(|| "select needs a preset index or id".to_string())?;
            match arg.parse::<usize>() {
                Ok(index) => Command::SelectPreset(index),
                Err(_) => Command::SelectPresetById(arg.to_string()),
            }
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(command))
}

fn render(event: &Event, clock: bool) -> Result<String, serde_json::Error> {
    if !clock {
        return serde_json::to_string(event);
    }
    let line = match event {
        Event::StateSnapshot {
            preset_label,
            remaining_secs,
            state,
            completed_sessions,
            ..
        } => format!(
            "{} {preset_label} [{state:?}] done={completed_sessions}",
            format_clock(*remaining_secs)
        ),
        Event::SessionCompleted { preset_id, completed_sessions, .. } => {
            format!("session complete: {preset_id} (#{completed_sessions})")
        }
        Event::CommandRejected { reason, .. } => format!("rejected: {reason}"),
        other => other.kind().replace('_', " "),
    };
    Ok(line)
}

/// Running flag implied by `event`, or `current` when the event says nothing.
fn running_after(event: &Event, current: bool) -> bool {
    match event {
        Event::StateSnapshot { state, .. } => *state == TimerState::Running,
        Event::TimerStarted { .. } | Event::TimerResumed { .. } => true,
        Event::TimerPaused { .. }
        | Event::TimerReset { .. }
        | Event::PresetSelected { .. }
        | Event::SessionCompleted { .. } => false,
        Event::CommandRejected { .. } => current,
    }
}

/// Drive `engine` until a session completes (unless `keep_going`), the user
/// quits, or stdin closes while no countdown is running.
async fn run_countdown(
    mut engine: CountdownEngine,
    period: Duration,
    autostart: bool,
    keep_going: bool,
    clock: bool,
) -> Result<u64, Box<dyn std::error::Error>> {
    println!("{}", render(&engine.snapshot(), clock)?);
    if autostart {
        if let Some(event) = engine.toggle_start_pause() {
            println!("{}", render(&event, clock)?);
        }
    }
    let mut running = engine.is_running();

    let mut handle = driver::spawn(engine, period);

    let commands = handle.commands();
    let mut stdin_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Ok(Some(command)) => {
                    let quit = command == Command::Shutdown;
                    if commands.send(command).await.is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(msg) => eprintln!("{msg}"),
            }
        }
    });

    let mut stdin_open = true;
    // After EOF a snapshot is requested so every command read before it has
    // been applied before the running flag is trusted.
    let mut awaiting_sync = false;

    loop {
        if !stdin_open && !awaiting_sync && !running {
            tracing::debug!("stdin closed with no countdown running");
            break;
        }

        tokio::select! {
            _ = &mut stdin_task, if stdin_open => {
                stdin_open = false;
                awaiting_sync = handle.send(Command::Snapshot).await;
            }
            event = handle.next_event() => {
                let Some(event) = event else { break };
                println!("{}", render(&event, clock)?);
                running = running_after(&event, running);
                if matches!(event, Event::StateSnapshot { .. }) {
                    awaiting_sync = false;
                }
                if matches!(event, Event::SessionCompleted { .. }) && !keep_going {
                    break;
                }
            }
        }
    }

    stdin_task.abort();
    let engine = handle.shutdown().await?;
    tracing::info!(completed = engine.completed_sessions(), "countdown finished");
    Ok(engine.completed_sessions())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    match action {
        TimerAction::Presets => {
            let listing: Vec<serde_json::Value> = config
                .presets
                .iter()
                .enumerate()
                .map(|(index, p)| {
                    serde_json::json!({
                        "index": index,
                        "id": p.id,
                        "label": p.label,
                        "minutes": p.minutes,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        TimerAction::Status { preset } => {
            let engine = build_engine(&config, preset.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        TimerAction::Run {
            preset,
            no_autostart,
            keep_going,
            tick_ms,
            clock,
        } => {
            let engine = build_engine(&config, preset.as_deref())?;
            let period = tick_ms
                .map(|ms| Duration::from_millis(ms.max(1)))
                .unwrap_or_else(|| config.tick_period());
            let autostart = config.timer.autostart && !no_autostart;
            let keep_going = config.timer.keep_going || keep_going;

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let result = rt.block_on(run_countdown(engine, period, autostart, keep_going, clock));
            // A pending stdin read would otherwise block runtime drop.
            rt.shutdown_background();
            result?;
        }
    }
    Ok(())
}
