//! Configuration for the backend service.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rds_core::{InputOptions, SessionConfig, SizeLimits, SizePolicy};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub network: NetworkConfig,
    pub display: DisplayConfig,
    pub input: InputConfig,
    pub sync: SyncConfig,
    pub prompt: PromptConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP address clients connect to.
    pub listen_addr: String,
}

/// Framebuffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Colour depth: 8, 15, 16, 24 or 32.
    pub depth: u32,
    /// Largest width a client may request. 0 means unlimited.
    pub max_width: u32,
    /// Largest height a client may request. 0 means unlimited.
    pub max_height: u32,
    /// "ratchet" raises the maximum on larger requests, "clamp" shrinks
    /// the request.
    pub size_policy: SizePolicy,
    /// Render tick in milliseconds.
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Keep keypad navigation keys as keypad keys. `false` rewrites them
    /// to the cursor block.
    pub keypad_cursors: bool,
    /// Turn host autorepeat off around injected keys.
    pub suppress_autorepeat: bool,
    /// Accept multi-touch input.
    pub touch: bool,
}

/// Sync buffer settings for the in-process buffer provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Rectangles a sync buffer can describe before damage is collapsed.
    pub buffer_max_rects: usize,
    /// Spare bytes allocated beyond the frame size.
    pub buffer_slack: usize,
}

/// External message prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub enabled: bool,
    /// Program run for each message request.
    pub program: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7340".into(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            depth: 24,
            max_width: 0,
            max_height: 0,
            size_policy: SizePolicy::Ratchet,
            tick_ms: 16,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            keypad_cursors: true,
            suppress_autorepeat: true,
            touch: true,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            buffer_max_rects: 128,
            buffer_slack: 0,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "ogon-message".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

const DEPTHS: [u32; 5] = [8, 15, 16, 24, 32];

impl BackendConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Render tick, at least one millisecond.
    pub fn tick(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.display.tick_ms.max(1))
    }

    /// Convert into the session settings, replacing values the core
    /// cannot use.
    pub fn to_session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        let depth = if DEPTHS.contains(&self.display.depth) {
            self.display.depth
        } else {
            tracing::warn!(depth = self.display.depth, "unsupported depth, using 24");
            defaults.depth
        };
        SessionConfig {
            width: self.display.width.max(1),
            height: self.display.height.max(1),
            depth,
            limits: SizeLimits::new(self.display.max_width, self.display.max_height),
            size_policy: self.display.size_policy,
            input: InputOptions {
                keypad_remap: !self.input.keypad_cursors,
                suppress_autorepeat: self.input.suppress_autorepeat,
                touch: self.input.touch,
            },
            ..defaults
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = BackendConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("listen_addr"));
        assert!(text.contains("size_policy = \"ratchet\""));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = BackendConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: BackendConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.listen_addr, "127.0.0.1:7340");
        assert_eq!(parsed.display.width, 1024);
        assert_eq!(parsed.sync.buffer_max_rects, 128);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: BackendConfig = toml::from_str(
            "[display]\nwidth = 1920\nsize_policy = \"clamp\"\n[input]\nkeypad_cursors = false\n",
        )
        .unwrap();
        assert_eq!(parsed.display.width, 1920);
        assert_eq!(parsed.display.height, 768);

        let session = parsed.to_session_config();
        assert_eq!(session.size_policy, SizePolicy::Clamp);
        assert!(session.input.keypad_remap);
        assert!(session.input.touch);
    }

    #[test]
    fn to_session_config_sanitizes() {
        let mut cfg = BackendConfig::default();
        cfg.display.depth = 12;
        cfg.display.tick_ms = 0;
        assert_eq!(cfg.to_session_config().depth, 24);
        assert_eq!(cfg.tick(), std::time::Duration::from_millis(1));
    }
}
