//! Decoding of the anchor metadata service response.
//!
//! The service returns a JSON array of rows. Numeric columns come back either
//! as JSON numbers or as numeric strings depending on the backend; both forms
//! are accepted by the field deserializers in `flexible`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::{AnchorPayload, AnchorPoint, BeaconId};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read anchor feed '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed anchor feed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("anchor feed row {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// One row of the metadata service response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorFeedRecord {
    #[serde(alias = "beaconMajorId", alias = "beacon_major_id", deserialize_with = "flexible::beacon_id")]
    pub major: BeaconId,
    #[serde(deserialize_with = "flexible::number")]
    pub x: f64,
    #[serde(deserialize_with = "flexible::number")]
    pub z: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub advisor: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl From<AnchorFeedRecord> for AnchorPoint {
    fn from(record: AnchorFeedRecord) -> Self {
        let payload = AnchorPayload {
            name: record.name.unwrap_or_default(),
            developer: record.developer.unwrap_or_default(),
            advisor: record.advisor.unwrap_or_default(),
            tool: record.tool.unwrap_or_default(),
            motivation: record.motivation.unwrap_or_default(),
            summary: record.summary.unwrap_or_default(),
        };
        AnchorPoint::new(record.major, record.x, record.z).with_payload(payload)
    }
}

/// Decode a feed response body into anchors, in response order
pub fn parse_anchor_feed(body: &str) -> Result<Vec<AnchorPoint>, FeedError> {
    let records: Vec<AnchorFeedRecord> = serde_json::from_str(body)?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            if !record.x.is_finite() || !record.z.is_finite() {
                return Err(FeedError::InvalidRecord {
                    index,
                    reason: format!("non-finite coordinate ({}, {})", record.x, record.z),
                });
            }
            Ok(AnchorPoint::from(record))
        })
        .collect()
}

/// Read a saved feed response from disk
pub fn read_anchor_feed<P: AsRef<Path>>(path: P) -> Result<Vec<AnchorPoint>, FeedError> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let body = fs::read_to_string(&path).map_err(|source| FeedError::Io {
        path: path_str,
        source,
    })?;
    parse_anchor_feed(&body)
}

mod flexible {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;

    use crate::core::BeaconId;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(value) => Ok(value),
            NumberOrText::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|e| D::Error::custom(format!("invalid number '{}': {}", text, e))),
        }
    }

    pub fn beacon_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BeaconId, D::Error> {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(value) => {
                if value.fract() == 0.0 && value >= 0.0 && value <= f64::from(BeaconId::MAX) {
                    Ok(value as BeaconId)
                } else {
                    Err(D::Error::custom(format!("beacon major {} out of range", value)))
                }
            }
            NumberOrText::Text(text) => text
                .trim()
                .parse::<BeaconId>()
                .map_err(|e| D::Error::custom(format!("invalid beacon major '{}': {}", text, e))),
        }
    }
}
