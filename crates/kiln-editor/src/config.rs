//! Layered editor configuration
//!
//! Config is loaded with four layers of precedence (highest wins):
//! 1. An explicit file passed by the caller
//! 2. Project-local: `.kiln/config.toml`
//! 3. Global: `~/.kiln/config.toml`
//! 4. Built-in defaults
//!
//! Layers are merged key by key, so a file only needs the values it changes.

use kiln_core::{KilnError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_undo")]
    pub max_undo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: default_max_undo(),
        }
    }
}

fn default_max_undo() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_unused_timeout")]
    pub unused_timeout_secs: u64,
    #[serde(default = "default_max_cache_bytes")]
    pub max_cache_bytes: usize,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            unused_timeout_secs: default_unused_timeout(),
            max_cache_bytes: default_max_cache_bytes(),
        }
    }
}

impl AssetsConfig {
    pub fn unused_timeout(&self) -> Duration {
        Duration::from_secs(self.unused_timeout_secs)
    }
}

fn default_unused_timeout() -> u64 {
    60
}
fn default_max_cache_bytes() -> usize {
    512 * 1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Radians per pixel of mouse motion
    #[serde(default = "default_orbit_sensitivity")]
    pub orbit_sensitivity: f32,
    /// Target offset per pixel, before scaling by distance and scene radius
    #[serde(default = "default_pan_sensitivity")]
    pub pan_sensitivity: f32,
    /// Distance change per pixel of right-drag
    #[serde(default = "default_zoom_sensitivity")]
    pub zoom_sensitivity: f32,
    /// Distance change per wheel notch
    #[serde(default = "default_wheel_sensitivity")]
    pub wheel_sensitivity: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orbit_sensitivity: default_orbit_sensitivity(),
            pan_sensitivity: default_pan_sensitivity(),
            zoom_sensitivity: default_zoom_sensitivity(),
            wheel_sensitivity: default_wheel_sensitivity(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            fov: default_fov(),
        }
    }
}

fn default_orbit_sensitivity() -> f32 {
    0.01
}
fn default_pan_sensitivity() -> f32 {
    0.002
}
fn default_zoom_sensitivity() -> f32 {
    0.01
}
fn default_wheel_sensitivity() -> f32 {
    0.1
}
fn default_min_distance() -> f32 {
    0.1
}
fn default_max_distance() -> f32 {
    10.0
}
fn default_fov() -> f32 {
    45.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GizmoConfig {
    #[serde(default)]
    pub snap: bool,
    #[serde(default = "default_translate_snap")]
    pub translate_snap: f32,
    /// Degrees
    #[serde(default = "default_rotate_snap")]
    pub rotate_snap: f32,
    #[serde(default = "default_scale_snap")]
    pub scale_snap: f32,
}

impl Default for GizmoConfig {
    fn default() -> Self {
        Self {
            snap: false,
            translate_snap: default_translate_snap(),
            rotate_snap: default_rotate_snap(),
            scale_snap: default_scale_snap(),
        }
    }
}

fn default_translate_snap() -> f32 {
    0.5
}
fn default_rotate_snap() -> f32 {
    15.0
}
fn default_scale_snap() -> f32 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_true")]
    pub show_grid: bool,
    #[serde(default = "default_true")]
    pub shadows: bool,
    #[serde(default = "default_true")]
    pub post_process: bool,
    #[serde(default)]
    pub shader_hot_reload: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            show_grid: true,
            shadows: true,
            post_process: true,
            shader_hot_reload: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Resolved editor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub gizmo: GizmoConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

impl EditorConfig {
    /// Load config with layered precedence: defaults < global < project < explicit
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut layers = Vec::new();
        if let Some(global) = Self::global_config_path() {
            layers.push(global);
        }
        layers.push(Self::project_config_path());
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(KilnError::ConfigError(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            layers.push(path.to_path_buf());
        }
        Self::load_layers(&layers)
    }

    /// Merge the given files in order; missing files are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        for path in paths {
            if !path.exists() {
                continue;
            }
            log::debug!("Loading config layer {}", path.display());
            let layer = Self::load_value(path)?;
            merge_values(&mut merged, layer);
        }
        merged
            .try_into()
            .map_err(|e: toml::de::Error| KilnError::ConfigError(e.to_string()))
    }

    /// Parse a single TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| KilnError::ConfigError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".kiln").join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".kiln").join("config.toml")
    }

    fn load_value(path: &Path) -> Result<toml::Value> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            KilnError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }
}

/// Recursively overlay `overlay` onto `base`; tables merge, everything else replaces
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
