//! TOML-based configuration persistence for the touch engine.
//!
//! Reads and writes [`EngineConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\TouchSynth\config.toml`
//! - Linux:    `~/.config/touchsynth/config.toml`
//! - macOS:    `~/Library/Application Support/TouchSynth/config.toml`
//!
//! ```toml
//! [engine]
//! max_touches = 10
//! log_level = "info"
//!
//! [timing]
//! tap_hold_ms = 100
//! step_interval_ms = 10
//!
//! [gesture]
//! drag_steps = 3
//! finger_spacing = 40.0
//! max_steps = 10000
//! ```
//!
//! Every field carries `#[serde(default = ...)]`, so a file containing only
//! the keys a user cares about still loads, and a missing file yields
//! [`EngineConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touch_core::{CompileOptions, DEFAULT_MAX_STEPS, DEFAULT_MAX_TOUCHES};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level engine configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub gesture: GestureSection,
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// Size of the bounded touch identifier space.
    #[serde(default = "default_max_touches")]
    pub max_touches: usize,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingSection {
    #[serde(default = "default_tap_hold_ms")]
    pub tap_hold_ms: u64,
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureSection {
    /// Step count used by the CLI when none is given.
    #[serde(default = "default_drag_steps")]
    pub drag_steps: usize,
    #[serde(default = "default_finger_spacing")]
    pub finger_spacing: f64,
    #[serde(default = "default_rotate_radius")]
    pub rotate_radius: f64,
    #[serde(default = "default_rotate_degrees_per_step")]
    pub rotate_degrees_per_step: f64,
    /// Gestures expanding to more interpolation steps are refused.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsSection {
    #[serde(default)]
    pub trace_enabled: bool,
    /// Trace log location; `touches.log` next to the config file when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_path: Option<PathBuf>,
    #[serde(default = "default_trace_rollover_lines")]
    pub trace_rollover_lines: usize,
    #[serde(default)]
    pub debug_overlay: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_max_touches() -> usize {
    DEFAULT_MAX_TOUCHES
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_tap_hold_ms() -> u64 {
    100
}
fn default_step_interval_ms() -> u64 {
    10
}
fn default_drag_steps() -> usize {
    3
}
fn default_finger_spacing() -> f64 {
    40.0
}
fn default_rotate_radius() -> f64 {
    80.0
}
fn default_rotate_degrees_per_step() -> f64 {
    2.0
}
fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}
fn default_trace_rollover_lines() -> usize {
    60_000
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_touches: default_max_touches(),
            log_level: default_log_level(),
        }
    }
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            tap_hold_ms: default_tap_hold_ms(),
            step_interval_ms: default_step_interval_ms(),
        }
    }
}

impl Default for GestureSection {
    fn default() -> Self {
        Self {
            drag_steps: default_drag_steps(),
            finger_spacing: default_finger_spacing(),
            rotate_radius: default_rotate_radius(),
            rotate_degrees_per_step: default_rotate_degrees_per_step(),
            max_steps: default_max_steps(),
        }
    }
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            trace_enabled: false,
            trace_path: None,
            trace_rollover_lines: default_trace_rollover_lines(),
            debug_overlay: false,
        }
    }
}

impl EngineConfig {
    /// Timing and geometry options for the gesture compiler.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            tap_hold: Duration::from_millis(self.timing.tap_hold_ms),
            step_interval: Duration::from_millis(self.timing.step_interval_ms),
            finger_spacing: self.gesture.finger_spacing,
            rotate_radius: self.gesture.rotate_radius,
            rotate_degrees_per_step: self.gesture.rotate_degrees_per_step,
            max_steps: self.gesture.max_steps,
        }
    }

    /// Slot table capacity; the table itself clamps it to the supported range.
    pub fn table_capacity(&self) -> usize {
        self.engine.max_touches
    }

    /// Where the touch trace log is written.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformConfigDir`] when no explicit path is
    /// configured and the platform directory is unknown.
    pub fn trace_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.diagnostics.trace_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("touches.log")),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the platform directory, returning defaults if the
/// file does not yet exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &EngineConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Resolves the platform config directory, including the `TouchSynth` leaf.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TouchSynth"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("touchsynth"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TouchSynth")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("touchsynth-test-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_engine_config_default_matches_documented_values() {
        // Arrange / Act
        let cfg = EngineConfig::default();

        // Assert
        assert_eq!(cfg.engine.max_touches, 10);
        assert_eq!(cfg.engine.log_level, "info");
        assert_eq!(cfg.timing.tap_hold_ms, 100);
        assert_eq!(cfg.timing.step_interval_ms, 10);
        assert_eq!(cfg.gesture.drag_steps, 3);
        assert_eq!(cfg.diagnostics.trace_rollover_lines, 60_000);
        assert!(!cfg.diagnostics.trace_enabled);
    }

    #[test]
    fn test_default_config_compiles_to_default_options() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.compile_options(), CompileOptions::default());
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: EngineConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_partial_timing_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[timing]
tap_hold_ms = 250
"#;

        // Act
        let cfg: EngineConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.compile_options().tap_hold, Duration::from_millis(250));
        // Unspecified fields keep their defaults
        assert_eq!(cfg.compile_options().step_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_step_limit_flows_into_compile_options() {
        let toml_str = r#"
[gesture]
max_steps = 64
"#;

        let cfg: EngineConfig = toml::from_str(toml_str).expect("deserialize step limit");

        assert_eq!(cfg.compile_options().max_steps, 64);
        assert_eq!(cfg.gesture.drag_steps, 3);
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result: Result<EngineConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_absent_trace_path_is_omitted_from_output() {
        let toml_str = toml::to_string_pretty(&EngineConfig::default()).expect("serialize");
        assert!(!toml_str.contains("trace_path"));
    }

    #[test]
    fn test_explicit_trace_path_wins() {
        let mut cfg = EngineConfig::default();
        cfg.diagnostics.trace_path = Some(PathBuf::from("/tmp/touches.log"));
        assert_eq!(cfg.trace_path().unwrap(), PathBuf::from("/tmp/touches.log"));
    }

    // ── File repository ───────────────────────────────────────────────────────

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = scratch_path("absent.toml");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_save_then_load_restores_config() {
        // Arrange
        let path = scratch_path("config.toml");
        let mut cfg = EngineConfig::default();
        cfg.engine.max_touches = 5;
        cfg.gesture.finger_spacing = 60.0;
        cfg.diagnostics.debug_overlay = true;

        // Act
        save_config_to(&cfg, &path).expect("save");
        let restored = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(restored, cfg);
        assert_eq!(restored.table_capacity(), 5);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_malformed_file_returns_parse_error() {
        let path = scratch_path("bad.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[engine\nmax_touches = ").unwrap();

        let err = load_config_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
