//! Rendering of position updates for logs and the command line

use crate::api::types::{OutputFormat, PositionUpdate};

/// Human-readable text formatter
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// One line per update instead of a block
    pub compact: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_text(&self, update: &PositionUpdate) -> String {
        if self.compact {
            return format!(
                "#{} x={:.3} y={:.3} nearest={}",
                update.sequence, update.estimate.x, update.estimate.y, update.nearest_beacon
            );
        }

        let mut output = String::new();
        output.push_str(&format!("Position #{}:\n", update.sequence));
        output.push_str(&format!("  x: {:.3}\n", update.estimate.x));
        output.push_str(&format!("  y: {:.3}\n", update.estimate.y));
        output.push_str(&format!("  Nearest beacon: {}\n", update.nearest_beacon));
        output.push_str("Distances:\n");
        for d in &update.distances {
            output.push_str(&format!(
                "  {}: raw {:.3} m, filtered {:.3} m\n",
                d.beacon_id, d.raw_distance, d.filtered_distance
            ));
        }
        output
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_json(&self, update: &PositionUpdate) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(update)
        } else {
            serde_json::to_string(update)
        }
    }
}

/// CSV formatter for data logging
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    pub include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self { include_header: true }
    }
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> String {
        let mut columns = vec!["sequence", "x", "y", "nearest_beacon"].join(",");
        for i in 1..=3 {
            columns.push_str(&format!(",beacon_{i},raw_{i},filtered_{i}"));
        }
        columns
    }

    pub fn format_csv(&self, update: &PositionUpdate) -> String {
        let mut row = format!(
            "{},{:.6},{:.6},{}",
            update.sequence, update.estimate.x, update.estimate.y, update.nearest_beacon
        );
        for d in &update.distances {
            row.push_str(&format!(",{},{:.6},{:.6}", d.beacon_id, d.raw_distance, d.filtered_distance));
        }
        row
    }
}

/// Renders updates in one output format, emitting the CSV header once
#[derive(Debug, Clone)]
pub struct UpdateFormatter {
    format: OutputFormat,
    text: TextFormatter,
    json: JsonFormatter,
    csv: CsvFormatter,
    header_written: bool,
}

impl UpdateFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            text: TextFormatter::new(),
            json: JsonFormatter::new(),
            csv: CsvFormatter::new(),
            header_written: false,
        }
    }

    /// Indented JSON objects instead of one object per line
    pub fn pretty(mut self) -> Self {
        self.json = JsonFormatter::pretty();
        self
    }

    pub fn format(&mut self, update: &PositionUpdate) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Text => Ok(self.text.format_text(update)),
            OutputFormat::Json => self.json.format_json(update),
            OutputFormat::Csv => {
                let row = self.csv.format_csv(update);
                if self.csv.include_header && !self.header_written {
                    self.header_written = true;
                    Ok(format!("{}\n{}", self.csv.header(), row))
                } else {
                    Ok(row)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BeaconDistance, PositionEstimate};

    fn update() -> PositionUpdate {
        PositionUpdate {
            sequence: 4,
            estimate: PositionEstimate::new(-0.25, 0.125),
            nearest_beacon: 4660,
            distances: [
                BeaconDistance { beacon_id: 4660, raw_distance: 0.52, filtered_distance: 0.51 },
                BeaconDistance { beacon_id: 4663, raw_distance: 0.63, filtered_distance: 0.62 },
                BeaconDistance { beacon_id: 4661, raw_distance: 0.77, filtered_distance: 0.75 },
            ],
        }
    }

    #[test]
    fn test_compact_text() {
        let formatter = TextFormatter { compact: true };
        assert_eq!(
            formatter.format_text(&update()),
            "#4 x=-0.250 y=0.125 nearest=4660"
        );
    }

    #[test]
    fn test_full_text_lists_distances() {
        let text = TextFormatter::new().format_text(&update());
        assert!(text.starts_with("Position #4:"));
        assert!(text.contains("4663: raw 0.630 m, filtered 0.620 m"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = JsonFormatter::new().format_json(&update()).unwrap();
        let parsed: PositionUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, update());
    }

    #[test]
    fn test_text_is_default_format() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        let mut formatter = UpdateFormatter::new(OutputFormat::default());
        assert!(formatter.format(&update()).unwrap().starts_with("Position #4:"));
    }

    #[test]
    fn test_pretty_json_spans_lines() {
        let mut compact = UpdateFormatter::new(OutputFormat::Json);
        let mut pretty = UpdateFormatter::new(OutputFormat::Json).pretty();

        assert_eq!(compact.format(&update()).unwrap().lines().count(), 1);
        let json = pretty.format(&update()).unwrap();
        assert!(json.lines().count() > 1);
        let parsed: PositionUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, update());
    }

    #[test]
    fn test_csv_header_written_once() {
        let mut formatter = UpdateFormatter::new(OutputFormat::Csv);
        let first = formatter.format(&update()).unwrap();
        let second = formatter.format(&update()).unwrap();

        let mut lines = first.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.split(',').count(), 13);
        assert_eq!(lines.next().unwrap().split(',').count(), 13);
        assert!(second.starts_with("4,"));
    }
}
