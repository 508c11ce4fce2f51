use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::ranging::{RangingBundle, RangingError, RangingResult, RangingSource, RangingStatus};

/// Plays back a fixed sequence of bundles.
///
/// Recordings are JSON arrays of ticks, each tick an array of
/// `{"beacon_id": .., "rssi": ..}` objects.
pub struct ReplaySource {
    recording: Vec<RangingBundle>,
    queue: VecDeque<RangingBundle>,
    status: RangingStatus,
}

impl ReplaySource {
    pub fn new(recording: Vec<RangingBundle>) -> Self {
        Self {
            queue: recording.iter().cloned().collect(),
            recording,
            status: RangingStatus {
                connected: true,
                ..Default::default()
            },
        }
    }

    pub fn from_json(body: &str) -> RangingResult<Self> {
        let recording: Vec<RangingBundle> = serde_json::from_str(body)?;
        Ok(Self::new(recording))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> RangingResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let body = fs::read_to_string(&path).map_err(|source| RangingError::Io {
            path: path_str.clone(),
            source,
        })?;
        let source = Self::from_json(&body)?;
        debug!(path = %path_str, ticks = source.recording.len(), "ranging recording loaded");
        Ok(source)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Simulate the scanner going away
    pub fn disconnect(&mut self) {
        self.status.connected = false;
    }
}

impl RangingSource for ReplaySource {
    fn next_bundle(&mut self) -> RangingResult<Option<RangingBundle>> {
        if !self.status.connected {
            self.status.error_count += 1;
            return Err(RangingError::Disconnected);
        }
        let bundle = self.queue.pop_front();
        if bundle.is_some() {
            self.status.bundles_delivered += 1;
        }
        Ok(bundle)
    }

    fn status(&self) -> RangingStatus {
        self.status.clone()
    }

    fn is_connected(&self) -> bool {
        self.status.connected
    }

    fn reset(&mut self) -> RangingResult<()> {
        self.queue = self.recording.iter().cloned().collect();
        self.status = RangingStatus {
            connected: true,
            ..Default::default()
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BeaconSample;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RECORDING: &str = r#"[
        [{"beacon_id": 4660, "rssi": -60}, {"beacon_id": 4663, "rssi": -65}, {"beacon_id": 4661, "rssi": -70}],
        [{"beacon_id": 4660, "rssi": 0}]
    ]"#;

    #[test]
    fn test_plays_back_in_order() {
        let mut source = ReplaySource::from_json(RECORDING).unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.next_bundle().unwrap().unwrap();
        assert_eq!(first[1], BeaconSample::new(4663, -65));
        let second = source.next_bundle().unwrap().unwrap();
        assert_eq!(second, vec![BeaconSample::new(4660, 0)]);
        assert!(source.next_bundle().unwrap().is_none());
        assert_eq!(source.status().bundles_delivered, 2);
    }

    #[test]
    fn test_reset_rewinds() {
        let mut source = ReplaySource::from_json(RECORDING).unwrap();
        while source.next_bundle().unwrap().is_some() {}
        source.reset().unwrap();
        assert_eq!(source.remaining(), 2);
    }

    #[test]
    fn test_disconnected_source_errors() {
        let mut source = ReplaySource::new(Vec::new());
        source.disconnect();
        assert!(matches!(source.next_bundle(), Err(RangingError::Disconnected)));
        assert!(!source.status().is_healthy());
        source.reset().unwrap();
        assert!(source.is_connected());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(RECORDING.as_bytes()).unwrap();
        let source = ReplaySource::from_file(file.path()).unwrap();
        assert_eq!(source.remaining(), 2);

        assert!(matches!(
            ReplaySource::from_json("[[{\"beacon_id\": 1}]]"),
            Err(RangingError::Malformed(_))
        ));
    }
}
