//! Error types of the positioning core

pub mod error;

pub use error::{ErrorKind, PositioningError, PositioningResult, SampleIssue};
