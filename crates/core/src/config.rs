//! Layered application configuration.
//!
//! Compiled defaults are overlaid by an optional JSON file in the user's
//! config directory and then by `PARKLOT__SECTION__KEY` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config, Environment, File};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    billing::BillingPolicy,
    geometry::{centered_grid, Rect},
    vehicle::VehicleKind,
};

/// Directory under the platform config dir holding our files.
pub const CONFIG_DIR_NAME: &str = "parklot";
/// File name of the JSON config.
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PARKLOT";

/// Reasons a configuration is rejected after loading.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The slot grid has no rows or no columns.
    #[error("slot grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid {
        /// Configured rows.
        rows: u32,
        /// Configured columns.
        cols: u32,
    },
    /// A size that must be positive is not.
    #[error("{field} must be positive (got {value})")]
    NonPositive {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: i64,
    },
    /// The grid is larger than the window or overlaps the HUD bar.
    #[error("slot grid of {grid_w}x{grid_h} does not fit below the HUD in a {window_w}x{window_h} window")]
    GridDoesNotFit {
        /// Total grid width.
        grid_w: i32,
        /// Total grid height.
        grid_h: i32,
        /// Window width.
        window_w: i32,
        /// Window height.
        window_h: i32,
    },
    /// An amount or duration is negative, not finite, or out of range.
    #[error("{field} must be a finite, non-negative number in range (got {value})")]
    InvalidAmount {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Geometry of the window and the slot grid, in logical pixels.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub window_width: i32,
    pub window_height: i32,
    /// Height of the status bar along the top edge.
    pub hud_height: i32,
    pub slot_width: i32,
    pub slot_height: i32,
    pub grid_cols: u32,
    pub grid_rows: u32,
    pub gap_x: i32,
    pub gap_y: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            window_width: 1000,
            window_height: 900,
            hud_height: 80,
            slot_width: 280,
            slot_height: 280,
            grid_cols: 3,
            grid_rows: 2,
            gap_x: 50,
            gap_y: 80,
        }
    }
}

impl LayoutConfig {
    /// The whole logical window.
    pub fn window_rect(&self) -> Rect {
        Rect::new(0, 0, self.window_width, self.window_height)
    }

    /// The HUD bar along the top.
    pub fn hud_rect(&self) -> Rect {
        Rect::new(0, 0, self.window_width, self.hud_height)
    }

    /// Slot rectangles, row-major, centred in the window.
    pub fn slot_rects(&self) -> Vec<Rect> {
        centered_grid(
            self.window_rect(),
            self.grid_rows,
            self.grid_cols,
            (self.slot_width, self.slot_height),
            (self.gap_x, self.gap_y),
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_rows == 0 || self.grid_cols == 0 {
            return Err(ConfigError::EmptyGrid {
                rows: self.grid_rows,
                cols: self.grid_cols,
            });
        }
        for (field, value) in [
            ("layout.window_width", self.window_width),
            ("layout.window_height", self.window_height),
            ("layout.slot_width", self.slot_width),
            ("layout.slot_height", self.slot_height),
        ] {
            if value <= 0 {
                return Err(ConfigError::NonPositive {
                    field,
                    value: value.into(),
                });
            }
        }

        let grid_w = grid_extent(self.grid_cols, self.slot_width, self.gap_x);
        let grid_h = grid_extent(self.grid_rows, self.slot_height, self.gap_y);
        match (grid_w, grid_h) {
            (Some(w), Some(h))
                if w > 0
                    && h > 0
                    && w <= self.window_width
                    && h <= self.window_height
                    && (self.window_height - h) / 2 >= self.hud_height => {}
            _ => {
                return Err(ConfigError::GridDoesNotFit {
                    grid_w: grid_w.unwrap_or(i32::MAX),
                    grid_h: grid_h.unwrap_or(i32::MAX),
                    window_w: self.window_width,
                    window_h: self.window_height,
                });
            }
        }
        Ok(())
    }
}

/// `count` cells of `cell` separated by `gap`; `None` on overflow.
fn grid_extent(count: u32, cell: i32, gap: i32) -> Option<i32> {
    let count = i32::try_from(count).ok()?;
    count
        .checked_mul(cell)?
        .checked_add(count.checked_sub(1)?.checked_mul(gap)?)
}

/// Timing of the interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long the removal message stays on screen.
    pub message_display_secs: f64,
    /// Interval between refresh ticks.
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            message_display_secs: 5.0,
            tick_rate_ms: 33,
        }
    }
}

impl UiConfig {
    /// Status message lifetime.
    pub fn message_display(&self) -> Duration {
        Duration::try_from_secs_f64(self.message_display_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Tick interval, never zero.
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }
}

/// Where vehicle artwork lives.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub directory: PathBuf,
    pub car: String,
    pub bike: String,
    pub truck: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            car: "car.png".to_string(),
            bike: "bike.png".to_string(),
            truck: "truck.png".to_string(),
        }
    }
}

impl AssetConfig {
    /// Image file name for `kind`, relative to [`AssetConfig::directory`].
    pub fn file_for(&self, kind: VehicleKind) -> &str {
        match kind {
            VehicleKind::Car => &self.car,
            VehicleKind::Bike => &self.bike,
            VehicleKind::Truck => &self.truck,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Billing constants.
    pub billing: BillingPolicy,
    /// Window and slot geometry.
    pub layout: LayoutConfig,
    /// Interface timing.
    pub ui: UiConfig,
    /// Vehicle artwork.
    pub assets: AssetConfig,
}

impl AppConfig {
    /// Load from the default config path and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Some(&config_path()), ENV_PREFIX)
    }

    /// Load from an optional JSON file plus environment variables carrying
    /// `env_prefix`, on top of the compiled defaults.
    pub fn load_from(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&AppConfig::default()).context("failed to encode default config")?,
        );
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()?;
        for (field, value) in [
            ("billing.threshold_secs", self.billing.threshold_secs),
            ("billing.base_fee", self.billing.base_fee),
            ("billing.penalty_per_sec", self.billing.penalty_per_sec),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidAmount { field, value });
            }
        }
        let message_secs = self.ui.message_display_secs;
        if !message_secs.is_finite()
            || message_secs < 0.0
            || Duration::try_from_secs_f64(message_secs).is_err()
        {
            return Err(ConfigError::InvalidAmount {
                field: "ui.message_display_secs",
                value: message_secs,
            });
        }
        if self.ui.tick_rate_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "ui.tick_rate_ms",
                value: 0,
            });
        }
        Ok(())
    }
}

/// Default location of the JSON config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Write the default config to [`config_path`] unless a file already exists.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default config")?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}
