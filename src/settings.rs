use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Show the overlay automatically when an editable control takes focus.
    #[serde(default = "default_auto_show")]
    pub auto_show: bool,
    /// Suppression window after a hide, in milliseconds. Prevents the overlay
    /// from bouncing straight back when hiding itself shifts focus.
    #[serde(default = "default_auto_show_cooldown_ms")]
    pub auto_show_cooldown_ms: u64,
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Also write log output to a rolling file next to the settings.
    #[serde(default)]
    pub log_to_file: bool,
    /// Hold time before a repeat-capable key starts repeating.
    #[serde(default = "default_repeat_initial_delay_ms")]
    pub repeat_initial_delay_ms: u64,
    /// Interval between repeats once repeating.
    #[serde(default = "default_repeat_interval_ms")]
    pub repeat_interval_ms: u64,
    /// Last known window position. If absent, the overlay docks to the bottom
    /// of the work area.
    #[serde(default)]
    pub window_pos: Option<(i32, i32)>,
    /// Last known window size. If absent, a default size is used.
    #[serde(default)]
    pub window_size: Option<(i32, i32)>,
    /// Re-dock to the bottom of the work area on every show.
    #[serde(default = "default_dock_to_work_area")]
    pub dock_to_work_area: bool,
}

fn default_auto_show() -> bool {
    true
}

fn default_auto_show_cooldown_ms() -> u64 {
    500
}

fn default_repeat_initial_delay_ms() -> u64 {
    400
}

fn default_repeat_interval_ms() -> u64 {
    80
}

fn default_dock_to_work_area() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_show: default_auto_show(),
            auto_show_cooldown_ms: default_auto_show_cooldown_ms(),
            debug_logging: false,
            log_to_file: false,
            repeat_initial_delay_ms: default_repeat_initial_delay_ms(),
            repeat_interval_ms: default_repeat_interval_ms(),
            window_pos: None,
            window_size: Some((900, 320)),
            dock_to_work_area: default_dock_to_work_area(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.auto_show_cooldown_ms)
    }
}

/// Per-user settings location, falling back to the working directory when the
/// platform offers no config dir.
pub fn default_path() -> String {
    dirs_next::config_dir()
        .map(|dir| dir.join("overkey").join("settings.json"))
        .unwrap_or_else(|| PathBuf::from("settings.json"))
        .to_string_lossy()
        .to_string()
}
