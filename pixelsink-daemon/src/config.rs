//! Daemon configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pixelsink_core::{AcquireMode, IdlePolicy, LifecycleOptions, MatrixConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Panel wiring.
    pub matrix: MatrixSection,
    /// Device lifecycle policy.
    pub lifecycle: LifecycleSection,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the inbound socket on.
    pub bind_address: String,
    /// UDP port frames arrive on.
    pub listen_port: u16,
}

/// Panel wiring, mirrored into [`MatrixConfig`] at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixSection {
    /// Rows per panel.
    pub rows: u32,
    /// Declared columns per panel.
    pub cols: u32,
    /// Panels daisy-chained on one channel.
    pub chain_length: u32,
    /// Parallel chains.
    pub parallel: u32,
    /// Brightness percentage, 0-100.
    pub brightness: u8,
    /// Name of the GPIO mapping in use.
    pub hardware_mapping: String,
    /// Print the achieved refresh rate.
    pub show_refresh_rate: bool,
    /// Panels with inverted colors.
    pub inverse_colors: bool,
    /// Skip hardware pin-pulse generation.
    pub disable_hardware_pulsing: bool,
}

/// Device lifecycle policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSection {
    /// When the device is first acquired: "lazy" or "eager".
    pub acquire: AcquireSetting,
    /// What the idle deadline does: "release" or "blank".
    pub on_idle: IdleSetting,
    /// Seconds without traffic before the idle action runs.
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquireSetting {
    Lazy,
    Eager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleSetting {
    Release,
    Blank,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            matrix: MatrixSection::default(),
            lifecycle: LifecycleSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            listen_port: 1337,
        }
    }
}

impl Default for MatrixSection {
    fn default() -> Self {
        Self {
            rows: 16,
            cols: 32,
            chain_length: 2,
            parallel: 1,
            brightness: 100,
            hardware_mapping: "regular".into(),
            show_refresh_rate: false,
            inverse_colors: false,
            disable_hardware_pulsing: false,
        }
    }
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            acquire: AcquireSetting::Lazy,
            on_idle: IdleSetting::Release,
            idle_timeout_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl DaemonConfig {
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

    /// Mirror the `[matrix]` section into the core configuration type.
    pub fn to_matrix_config(&self) -> MatrixConfig {
        MatrixConfig {
            rows: self.matrix.rows,
            cols: self.matrix.cols,
            chain_length: self.matrix.chain_length,
            parallel: self.matrix.parallel,
            brightness: self.matrix.brightness,
            hardware_mapping: self.matrix.hardware_mapping.clone(),
            show_refresh_rate: self.matrix.show_refresh_rate,
            inverse_colors: self.matrix.inverse_colors,
            disable_hardware_pulsing: self.matrix.disable_hardware_pulsing,
        }
    }

    /// Convert the `[lifecycle]` section into supervisor options.
    pub fn to_lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            idle_timeout: Duration::from_secs(self.lifecycle.idle_timeout_secs),
            idle_policy: match self.lifecycle.on_idle {
                IdleSetting::Release => IdlePolicy::Release,
                IdleSetting::Blank => IdlePolicy::Blank,
            },
            acquire: match self.lifecycle.acquire {
                AcquireSetting::Lazy => AcquireMode::Lazy,
                AcquireSetting::Eager => AcquireMode::Eager,
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
