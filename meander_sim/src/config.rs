use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use bevy::prelude::Resource;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_RIVER_CONFIG: &str = include_str!("data/river_config.json");
pub const RIVER_CONFIG_ENV: &str = "RIVER_CONFIG_PATH";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DiagnosticFlags: u8 {
        const TRACE_TOPOLOGY = 0b0000_0001;
        const DRAW_EDGES = 0b0000_0010;
    }
}

/// Tuning shared by every river in the network.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    /// One-shot request: the next river to flow splits in half and clears it.
    pub split: bool,
    pub min_sample_interval: f32,
    pub max_sample_interval: f32,
    pub tangent_coeff: f32,
    pub binormal_coeff: f32,
    pub normal_coeff: f32,
    pub total_coeff: f32,
    pub momentum_base: f32,
    pub momentum_depth: u32,
    pub debug: bool,
    pub debug_draw: bool,
    pub point_radius: f32,
    pub river_volume: f32,
    pub river_capacity: f32,
    pub oxbow_volume: f32,
    pub oxbow_capacity: f32,
    pub sink_rate: f32,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            split: false,
            min_sample_interval: 0.5,
            max_sample_interval: 1.1,
            tangent_coeff: 5.0,
            binormal_coeff: -0.2,
            normal_coeff: 0.1,
            total_coeff: 0.001,
            momentum_base: 0.5,
            momentum_depth: 5,
            debug: false,
            debug_draw: false,
            point_radius: 0.5,
            river_volume: 1.0,
            river_capacity: 5.0,
            oxbow_volume: 1.0,
            oxbow_capacity: 1.0,
            sink_rate: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RiverConfigError {
    #[error("failed to parse river config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read river config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("river config field `{field}` has invalid value {value}")]
    InvalidParameter { field: &'static str, value: f32 },
}

impl RiverConfig {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_RIVER_CONFIG).unwrap_or_else(|err| {
            tracing::error!(
                target: "meander::config",
                error = %err,
                "river_config.builtin_invalid"
            );
            Self::default()
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, RiverConfigError> {
        let config: RiverConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.check_sample_intervals();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, RiverConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| RiverConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn diagnostics(&self) -> DiagnosticFlags {
        let mut flags = DiagnosticFlags::empty();
        flags.set(DiagnosticFlags::TRACE_TOPOLOGY, self.debug);
        flags.set(DiagnosticFlags::DRAW_EDGES, self.debug_draw);
        flags
    }

    pub fn validate(&self) -> Result<(), RiverConfigError> {
        let coefficients = [
            ("tangent_coeff", self.tangent_coeff),
            ("binormal_coeff", self.binormal_coeff),
            ("normal_coeff", self.normal_coeff),
            ("total_coeff", self.total_coeff),
            ("momentum_base", self.momentum_base),
            ("river_volume", self.river_volume),
            ("river_capacity", self.river_capacity),
            ("oxbow_volume", self.oxbow_volume),
            ("oxbow_capacity", self.oxbow_capacity),
        ];
        for (field, value) in coefficients {
            if !value.is_finite() {
                return Err(RiverConfigError::InvalidParameter { field, value });
            }
        }
        let strictly_positive = [
            ("min_sample_interval", self.min_sample_interval),
            ("max_sample_interval", self.max_sample_interval),
            ("point_radius", self.point_radius),
            ("sink_rate", self.sink_rate),
        ];
        for (field, value) in strictly_positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(RiverConfigError::InvalidParameter { field, value });
            }
        }
        Ok(())
    }

    /// Warns when insertions and removals could chase each other every tick.
    pub fn check_sample_intervals(&self) -> bool {
        let stable = self.max_sample_interval >= 2.0 * self.min_sample_interval;
        if !stable {
            tracing::warn!(
                target: "meander::config",
                min = self.min_sample_interval,
                max = self.max_sample_interval,
                "river_config.sample_interval_oscillation"
            );
        }
        stable
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct RiverConfigMetadata {
    path: Option<PathBuf>,
}

impl RiverConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

pub fn load_river_config_from_env() -> (RiverConfig, RiverConfigMetadata) {
    if let Some(path) = env::var(RIVER_CONFIG_ENV).ok().map(PathBuf::from) {
        match RiverConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "meander::config",
                    path = %path.display(),
                    "river_config.loaded=file"
                );
                return (config, RiverConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "meander::config",
                    path = %path.display(),
                    error = %err,
                    "river_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "meander::config", "river_config.loaded=builtin");
    (RiverConfig::builtin(), RiverConfigMetadata::new(None))
}
