use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;

pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_HISTORY_CAPACITY: usize = 5000;

/// Process-wide settings. Read once at load, never written back.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub wait_for_connection: bool,
    pub history_capacity: usize,
    pub break_on_error: bool,
    pub break_on_debug_output: bool,
    pub break_on_compile_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            wait_for_connection: false,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            break_on_error: false,
            break_on_debug_output: false,
            break_on_compile_error: false,
        }
    }
}

impl Config {
    /// `GLDBG_CONFIG` names an optional JSON file; `GLDBG_PORT` and
    /// `GLDBG_WAIT` override single fields on top of it.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("GLDBG_CONFIG") {
            Ok(path) => Self::from_json(&fs::read_to_string(path)?)?,
            Err(_) => Self::default(),
        };

        if let Ok(port) = std::env::var("GLDBG_PORT") {
            config.port = parse_port(&port)?;
        }

        if let Ok(wait) = std::env::var("GLDBG_WAIT") {
            config.wait_for_connection = parse_flag(&wait);
        }

        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn wait_for_connection(&self) -> bool {
        self.wait_for_connection
    }

    pub fn debugger_port(&self) -> u16 {
        self.port
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid GLDBG_PORT: {}", value)))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
