//! # Focusboard Core Library
//!
//! This library provides the focus-session countdown behind the Focusboard
//! dashboard's timer widget. The CLI binary and any GUI host are thin layers
//! over the same core.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: A tick-driven state machine over a preset catalog;
//!   the caller delivers one `tick()` per elapsed second
//! - **Tick Driver**: A tokio task that owns one engine and is its only tick
//!   source while it runs
//! - **Storage**: TOML-based configuration (preset catalog, tick period)
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Core countdown state machine
//! - [`PresetCatalog`]: Ordered presets the engine cycles through
//! - [`Config`]: Application configuration management
//! - [`Event`]: Transition and completion notifications

pub mod timer;
pub mod storage;
pub mod events;
pub mod error;

pub use timer::{format_clock, Command, CountdownEngine, Preset, PresetCatalog, TimerState};
pub use storage::Config;
pub use events::Event;
pub use error::{ConfigError, CoreError, TimerError};
