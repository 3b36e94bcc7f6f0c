//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable consulted when no API key is configured on disk.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Connection settings for the coaching endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Websocket base URL of the endpoint.
    pub base_url: String,
    /// API key — `None` defers to the `GEMINI_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Model identifier sent in the session setup.
    pub model: String,
    /// Maximum seconds to wait for connect + setup acknowledgement.
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "wss://generativelanguage.googleapis.com".into(),
            api_key: None,
            model: "models/gemini-2.5-flash-native-audio-preview-12-2025".into(),
            connect_timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    /// The key from the config file, falling back to the environment.
    pub fn resolve_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// CoachConfig
// ---------------------------------------------------------------------------

/// The coach persona: which voice speaks and how it behaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Prebuilt voice name used for synthesized speech.
    pub voice: String,
    /// System instruction establishing the coaching persona.
    pub system_instruction: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            voice: "Zephyr".into(),
            system_instruction: "You are an elite, motivating personal trainer and nutritionist \
                                 named Zephyr. Be energetic, concise, and professional. Respond \
                                 to the user with actionable fitness and diet advice."
                .into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and playback.
///
/// Sample rates are fixed by the wire protocol (16 kHz out, 24 kHz in) and
/// are not configurable; the devices may run at any native rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Input device name — `None` means the system default.
    pub input_device: Option<String>,
    /// Output device name — `None` means the system default.
    pub output_device: Option<String>,
    /// Samples per outbound capture block (at 16 kHz).
    pub block_samples: usize,
    /// Cap on scheduled-but-unfinished playback buffers; payloads beyond the
    /// cap are dropped.
    pub max_active_buffers: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            block_samples: 4096,
            max_active_buffers: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` means
    /// let the window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Endpoint connection settings.
    pub api: ApiConfig,
    /// Coach voice and persona.
    pub coach: CoachConfig,
    /// Capture / playback settings.
    pub audio: AudioConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.api.base_url, loaded.api.base_url);
        assert_eq!(original.api.api_key, loaded.api.api_key);
        assert_eq!(original.api.model, loaded.api.model);
        assert_eq!(
            original.api.connect_timeout_secs,
            loaded.api.connect_timeout_secs
        );
        assert_eq!(original.coach.voice, loaded.coach.voice);
        assert_eq!(
            original.coach.system_instruction,
            loaded.coach.system_instruction
        );
        assert_eq!(original.audio.block_samples, loaded.audio.block_samples);
        assert_eq!(
            original.audio.max_active_buffers,
            loaded.audio.max_active_buffers
        );
        assert_eq!(original.ui.always_on_top, loaded.ui.always_on_top);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.api.model, default.api.model);
        assert_eq!(config.coach.voice, default.coach.voice);
        assert_eq!(config.audio.block_samples, default.audio.block_samples);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.api.base_url, "wss://generativelanguage.googleapis.com");
        assert!(cfg.api.api_key.is_none());
        assert_eq!(cfg.api.connect_timeout_secs, 15);
        assert_eq!(cfg.coach.voice, "Zephyr");
        assert!(cfg.coach.system_instruction.contains("Zephyr"));
        assert_eq!(cfg.audio.block_samples, 4096);
        assert_eq!(cfg.audio.max_active_buffers, 64);
        assert!(cfg.audio.input_device.is_none());
        assert!(cfg.audio.output_device.is_none());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.api.api_key = Some("k-test".into());
        cfg.api.connect_timeout_secs = 5;
        cfg.coach.voice = "Aoede".into();
        cfg.audio.input_device = Some("USB Microphone".into());
        cfg.audio.block_samples = 2048;
        cfg.ui.window_position = Some((100.0, 200.0));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.api.api_key, Some("k-test".into()));
        assert_eq!(loaded.api.connect_timeout_secs, 5);
        assert_eq!(loaded.coach.voice, "Aoede");
        assert_eq!(loaded.audio.input_device, Some("USB Microphone".into()));
        assert_eq!(loaded.audio.block_samples, 2048);
        assert_eq!(loaded.ui.window_position, Some((100.0, 200.0)));
    }

    #[test]
    fn resolve_key_prefers_configured_value() {
        let cfg = ApiConfig {
            api_key: Some("from-config".into()),
            ..ApiConfig::default()
        };
        assert_eq!(cfg.resolve_key(), Some("from-config".into()));
    }

    #[test]
    fn resolve_key_ignores_empty_configured_value() {
        let cfg = ApiConfig {
            api_key: Some(String::new()),
            ..ApiConfig::default()
        };
        // Falls through to the environment; either way the empty string must
        // not be treated as a usable key.
        assert_ne!(cfg.resolve_key(), Some(String::new()));
    }
}
