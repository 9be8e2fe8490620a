mod config;

pub use config::{Config, TimerConfig};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the configuration directory.
///
/// `FOCUSBOARD_CONFIG_DIR` wins when set; otherwise `~/.config/focusboard[-dev]/`
/// based on FOCUSBOARD_ENV (set FOCUSBOARD_ENV=dev for the development directory).
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSBOARD_CONFIG_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FOCUSBOARD_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("focusboard-dev")
            } else {
                base_dir.join("focusboard")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
