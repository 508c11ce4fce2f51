//! Configuration loading and validation

pub mod config;

pub use config::{
    ConfigError, ConfigFileData, ConfigurationManager, DistanceSource, PositioningConfig,
    ValidationResult,
};
