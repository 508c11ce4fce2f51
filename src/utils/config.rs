use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::anchors::{seed_anchors, AnchorRegistry};
use crate::core::{
    AnchorPoint, BeaconId, DEFAULT_CALIBRATED_POWER_DBM, DEFAULT_COORDINATE_UNITS_PER_METER,
    DEFAULT_INITIAL_COVARIANCE, DEFAULT_INITIAL_ESTIMATE, DEFAULT_OBSERVATION_NOISE,
    MIN_SAMPLES_TO_SOLVE, SAMPLE_WINDOW_CAPACITY,
};

/// Which per-beacon distance is handed to the solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceSource {
    /// Filter estimate after replaying the window
    #[default]
    Filtered,
    /// Latest converted sample, unsmoothed
    Raw,
}

/// Tunables for one positioning session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    /// Beacon transmit power measured at one meter (dBm)
    pub calibrated_power_dbm: f64,
    /// Measurement noise R of the distance filter
    pub observation_noise: f64,
    /// Process noise Q of the distance filter
    pub process_noise: f64,
    /// Filter prior the window is replayed from every tick
    pub initial_estimate: f64,
    pub initial_covariance: f64,
    /// Samples retained per beacon
    pub window_capacity: usize,
    /// Samples every tracked beacon needs before a solve runs
    pub min_samples_to_solve: usize,
    /// Floor-plan units per meter of estimated range
    pub coordinate_units_per_meter: f64,
    pub distance_source: DistanceSource,
    /// Keep the registry pending until an anchor feed is staged
    pub await_anchor_feed: bool,
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            calibrated_power_dbm: DEFAULT_CALIBRATED_POWER_DBM,
            observation_noise: DEFAULT_OBSERVATION_NOISE,
            process_noise: 0.0,
            initial_estimate: DEFAULT_INITIAL_ESTIMATE,
            initial_covariance: DEFAULT_INITIAL_COVARIANCE,
            window_capacity: SAMPLE_WINDOW_CAPACITY,
            min_samples_to_solve: MIN_SAMPLES_TO_SOLVE,
            coordinate_units_per_meter: DEFAULT_COORDINATE_UNITS_PER_METER,
            distance_source: DistanceSource::Filtered,
            await_anchor_feed: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter '{parameter}' = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("anchor {beacon_id}: {reason}")]
    AnchorConflict { beacon_id: BeaconId, reason: String },

    #[error("config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no file path set for saving configuration")]
    NoFilePath,
}

/// Outcome of validating a configuration
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn finish(mut self) -> Self {
        self.is_valid = self.errors.is_empty();
        self
    }

    /// First error, if any
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next()
    }
}

/// On-disk layout of a configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFileData {
    #[serde(default)]
    pub positioning: PositioningConfig,
    #[serde(default = "seed_anchors")]
    pub anchors: Vec<AnchorPoint>,
}

impl Default for ConfigFileData {
    fn default() -> Self {
        Self {
            positioning: PositioningConfig::default(),
            anchors: seed_anchors(),
        }
    }
}

#[derive(Debug)]
pub struct ConfigurationManager {
    positioning: PositioningConfig,
    anchors: Vec<AnchorPoint>,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationManager {
    /// Defaults with the seed anchors
    pub fn new() -> Self {
        let data = ConfigFileData::default();
        Self {
            positioning: data.positioning,
            anchors: data.anchors,
            config_file_path: None,
            is_modified: false,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn positioning(&self) -> &PositioningConfig {
        &self.positioning
    }

    pub fn anchors(&self) -> &[AnchorPoint] {
        &self.anchors
    }

    /// Replace the positioning parameters after validating them
    pub fn update_positioning(&mut self, config: PositioningConfig) -> Result<(), ConfigError> {
        if let Some(err) = validate_positioning(&config).into_error() {
            return Err(err);
        }
        self.positioning = config;
        self.is_modified = true;
        Ok(())
    }

    /// Add an anchor or replace the one with the same beacon id
    pub fn set_anchor(&mut self, anchor: AnchorPoint) -> Result<(), ConfigError> {
        check_anchor(&anchor)?;
        match self.anchors.iter_mut().find(|a| a.beacon_id == anchor.beacon_id) {
            Some(existing) => *existing = anchor,
            None => self.anchors.push(anchor),
        }
        self.is_modified = true;
        Ok(())
    }

    pub fn remove_anchor(&mut self, beacon_id: BeaconId) -> Option<AnchorPoint> {
        let index = self.anchors.iter().position(|a| a.beacon_id == beacon_id)?;
        self.is_modified = true;
        Some(self.anchors.remove(index))
    }

    /// Registry for a new session, pending when the feed is awaited
    pub fn build_registry(&self) -> AnchorRegistry {
        let anchors = self.anchors.iter().cloned();
        if self.positioning.await_anchor_feed {
            AnchorRegistry::awaiting_feed(anchors)
        } else {
            AnchorRegistry::from_anchors(anchors)
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let data: ConfigFileData = serde_json::from_str(&content)?;

        if let Some(err) = validate(&data).into_error() {
            return Err(err);
        }

        debug!(path = %path_str, anchors = data.anchors.len(), "configuration loaded");
        self.positioning = data.positioning;
        self.anchors = data.anchors;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let data = ConfigFileData {
            positioning: self.positioning.clone(),
            anchors: self.anchors.clone(),
        };
        let content = serde_json::to_string_pretty(&data)?;

        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        info!(path = %path_str, "configuration saved");
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save back to the file this configuration was loaded from
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::NoFilePath),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn validate(&self) -> ValidationResult {
        validate(&ConfigFileData {
            positioning: self.positioning.clone(),
            anchors: self.anchors.clone(),
        })
    }
}

/// Validate a whole configuration file
pub fn validate(data: &ConfigFileData) -> ValidationResult {
    let mut result = validate_positioning(&data.positioning);

    let mut seen = HashSet::new();
    for anchor in &data.anchors {
        if let Err(err) = check_anchor(anchor) {
            result.errors.push(err);
        }
        if !seen.insert(anchor.beacon_id) {
            result.errors.push(ConfigError::AnchorConflict {
                beacon_id: anchor.beacon_id,
                reason: "duplicate beacon id".to_string(),
            });
        }
    }

    if data.anchors.len() < 3 && !data.positioning.await_anchor_feed {
        result.warnings.push(format!(
            "only {} anchors configured; a solve needs three",
            data.anchors.len()
        ));
    }

    result.finish()
}

pub fn validate_positioning(config: &PositioningConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let mut reject = |parameter: &str, value: String, reason: &str| {
        result.errors.push(ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value,
            reason: reason.to_string(),
        });
    };

    if !config.calibrated_power_dbm.is_finite() || config.calibrated_power_dbm >= 0.0 {
        reject(
            "calibrated_power_dbm",
            config.calibrated_power_dbm.to_string(),
            "must be a negative dBm value",
        );
    }
    if !config.observation_noise.is_finite() || config.observation_noise < 0.0 {
        reject(
            "observation_noise",
            config.observation_noise.to_string(),
            "must be finite and non-negative",
        );
    }
    if !config.process_noise.is_finite() || config.process_noise < 0.0 {
        reject(
            "process_noise",
            config.process_noise.to_string(),
            "must be finite and non-negative",
        );
    }
    if !config.initial_estimate.is_finite() {
        reject(
            "initial_estimate",
            config.initial_estimate.to_string(),
            "must be finite",
        );
    }
    if !config.initial_covariance.is_finite() || config.initial_covariance < 0.0 {
        reject(
            "initial_covariance",
            config.initial_covariance.to_string(),
            "must be finite and non-negative",
        );
    }
    if config.window_capacity < 2 {
        reject(
            "window_capacity",
            config.window_capacity.to_string(),
            "must hold at least two samples",
        );
    }
    if config.min_samples_to_solve == 0 || config.min_samples_to_solve > config.window_capacity {
        reject(
            "min_samples_to_solve",
            config.min_samples_to_solve.to_string(),
            "must be between 1 and window_capacity",
        );
    }
    if !config.coordinate_units_per_meter.is_finite() || config.coordinate_units_per_meter <= 0.0 {
        reject(
            "coordinate_units_per_meter",
            config.coordinate_units_per_meter.to_string(),
            "must be positive",
        );
    }

    if config.observation_noise == 0.0 && config.initial_covariance == 0.0 {
        result
            .warnings
            .push("zero observation noise and zero prior covariance make the filter diverge".to_string());
    }

    result.finish()
}

fn check_anchor(anchor: &AnchorPoint) -> Result<(), ConfigError> {
    if !anchor.x.is_finite() || !anchor.z.is_finite() {
        return Err(ConfigError::AnchorConflict {
            beacon_id: anchor.beacon_id,
            reason: format!("non-finite coordinate ({}, {})", anchor.x, anchor.z),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_configuration_is_valid() {
        let manager = ConfigurationManager::new();
        let result = manager.validate();
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(manager.anchors().len(), 3);
        assert_eq!(manager.positioning().calibrated_power_dbm, -59.0);
        assert_eq!(manager.positioning().distance_source, DistanceSource::Filtered);
        assert_eq!(DistanceSource::default(), DistanceSource::Filtered);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let file = NamedTempFile::new().unwrap();

        let mut manager = ConfigurationManager::new();
        let mut config = manager.positioning().clone();
        config.distance_source = DistanceSource::Raw;
        config.coordinate_units_per_meter = 2.0;
        manager.update_positioning(config).unwrap();
        manager.set_anchor(AnchorPoint::new(4700, 3.0, -1.0)).unwrap();
        assert!(manager.is_modified());
        manager.save_to_file(file.path()).unwrap();
        assert!(!manager.is_modified());

        let loaded = ConfigurationManager::from_file(file.path()).unwrap();
        assert_eq!(loaded.positioning().distance_source, DistanceSource::Raw);
        assert_eq!(loaded.positioning().coordinate_units_per_meter, 2.0);
        assert_eq!(loaded.anchors().len(), 4);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{ "positioning": { "distance_source": "raw" } }"#).unwrap();

        let manager = ConfigurationManager::from_file(file.path()).unwrap();
        assert_eq!(manager.positioning().distance_source, DistanceSource::Raw);
        assert_eq!(manager.positioning().window_capacity, 6);
        assert_eq!(manager.anchors().len(), 3);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{ "positioning": { "calibrated_power_dbm": 5.0 } }"#).unwrap();

        let err = ConfigurationManager::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { ref parameter, .. } if parameter == "calibrated_power_dbm"));
    }

    #[test]
    fn test_duplicate_anchor_ids_rejected() {
        let data = ConfigFileData {
            positioning: PositioningConfig::default(),
            anchors: vec![AnchorPoint::new(1, 0.0, 0.0), AnchorPoint::new(1, 1.0, 1.0)],
        };
        let result = validate(&data);
        assert!(!result.is_valid);
        assert!(matches!(result.errors[0], ConfigError::AnchorConflict { beacon_id: 1, .. }));
    }

    #[test]
    fn test_solve_threshold_bounded_by_capacity() {
        let config = PositioningConfig {
            window_capacity: 4,
            min_samples_to_solve: 5,
            ..Default::default()
        };
        assert!(!validate_positioning(&config).is_valid);
    }

    #[test]
    fn test_set_anchor_replaces_same_id() {
        let mut manager = ConfigurationManager::new();
        manager.set_anchor(AnchorPoint::new(4660, 9.0, 9.0)).unwrap();
        assert_eq!(manager.anchors().len(), 3);
        assert!(manager.remove_anchor(4660).is_some());
        assert!(manager.remove_anchor(4660).is_none());
    }

    #[test]
    fn test_build_registry_honours_feed_wait() {
        let mut manager = ConfigurationManager::new();
        assert!(manager.build_registry().is_loaded());

        let config = PositioningConfig {
            await_anchor_feed: true,
            ..Default::default()
        };
        manager.update_positioning(config).unwrap();
        assert!(!manager.build_registry().is_loaded());
    }

    #[test]
    fn test_save_without_path() {
        let mut manager = ConfigurationManager::new();
        assert!(matches!(manager.save(), Err(ConfigError::NoFilePath)));
    }
}
