use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::format::UserPreferences;
use crate::present::{PresentationBuilder, SlotRegistry, DEFAULT_PREVIEW_LIMIT, DEFAULT_TEXT_ROWS};

const MAX_PREVIEW_LIMIT: usize = 1024 * 1024;
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qpid-message-viewer")
}

fn config_path() -> PathBuf {
    config_dir().join("viewer.json")
}

// ---------------------------------------------------------------------------
// Viewer config
// ---------------------------------------------------------------------------

/// Persisted viewer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Bytes of body fetched for the inline preview.
    pub preview_limit: usize,
    /// IANA zone used to render timestamps; its name is appended to them.
    pub time_zone: String,
    /// Offset from UTC in minutes, used when `time_zone` is not a known zone.
    pub utc_offset_minutes: i32,
    /// Visible rows of the plain-text preview.
    pub text_preview_rows: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            time_zone: "UTC".into(),
            utc_offset_minutes: 0,
            text_preview_rows: DEFAULT_TEXT_ROWS,
        }
    }
}

impl ViewerConfig {
    /// Load from the config file, then apply `QPID_VIEWER_*` environment
    /// overrides. Missing or unreadable files yield defaults.
    pub fn load() -> Self {
        let path = config_path();
        let config = match fs::read_to_string(&path) {
            Ok(data) => Self::from_json_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid viewer config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn save(&self) -> Result<(), String> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create config dir: {e}"))?;
        }
        let data =
            serde_json::to_string_pretty(self).map_err(|e| format!("serialize config: {e}"))?;
        fs::write(&path, data).map_err(|e| format!("write config: {e}"))
    }

    /// Parse a config document, clamping values to sane ranges.
    pub fn from_json_str(data: &str) -> Result<Self, String> {
        let cfg: ViewerConfig =
            serde_json::from_str(data).map_err(|e| format!("parse config: {e}"))?;
        Ok(cfg.clamped())
    }

    /// Overlay environment variables looked up through `var`.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(limit) = var("QPID_VIEWER_PREVIEW_LIMIT").and_then(|v| v.parse().ok()) {
            self.preview_limit = limit;
        }
        if let Some(tz) = var("QPID_VIEWER_TIME_ZONE").filter(|v| !v.trim().is_empty()) {
            self.time_zone = tz.trim().to_string();
        }
        if let Some(offset) = var("QPID_VIEWER_UTC_OFFSET").and_then(|v| v.parse().ok()) {
            self.utc_offset_minutes = offset;
        }
        self.clamped()
    }

    fn clamped(self) -> Self {
        Self {
            preview_limit: self.preview_limit.clamp(1, MAX_PREVIEW_LIMIT),
            utc_offset_minutes: self
                .utc_offset_minutes
                .clamp(-MAX_UTC_OFFSET_MINUTES, MAX_UTC_OFFSET_MINUTES),
            text_preview_rows: self.text_preview_rows.max(1),
            ..self
        }
    }

    pub fn preferences(&self) -> UserPreferences {
        UserPreferences::new(self.time_zone.clone(), self.utc_offset_minutes)
    }

    /// Builder for the standard message dialog under these settings.
    pub fn presentation_builder(&self) -> PresentationBuilder {
        PresentationBuilder::new(SlotRegistry::standard(), self.preferences())
            .with_preview_limit(self.preview_limit)
            .with_text_rows(self.text_preview_rows)
    }
}
