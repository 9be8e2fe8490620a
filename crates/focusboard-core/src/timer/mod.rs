pub mod driver;
mod engine;
mod preset;

pub use driver::{Command, DriverHandle, DEFAULT_TICK_PERIOD};
pub use engine::{format_clock, CountdownEngine, TimerState};
pub use preset::{Preset, PresetCatalog};
