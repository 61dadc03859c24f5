use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{conversation::Platform, window};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Tunables for the sync engine. The window lengths default to the platform
/// policies but can be overridden for staging backends with shorter windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    pub page_size: usize,
    pub request_timeout_ms: u64,
    pub whatsapp_window_secs: u64,
    pub default_window_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            request_timeout_ms: 15_000,
            whatsapp_window_secs: window::WHATSAPP_WINDOW_SECS,
            default_window_secs: window::DEFAULT_WINDOW_SECS,
        }
    }
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn window_secs(&self, platform: Platform) -> u64 {
        match platform {
            Platform::Whatsapp => self.whatsapp_window_secs,
            _ => self.default_window_secs,
        }
    }
}
