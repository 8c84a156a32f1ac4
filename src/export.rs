// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image_funcs::Projections;
use crate::parameters::ParameterRecord;

/// Measurement name used for the line protocol export.
pub const MEASUREMENT: &str = "spot_metrics";

/// Measured parameters of one image file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsEntry {
    /// Image file stem.
    pub filename: String,
    #[serde(flatten)]
    pub parameters: ParameterRecord,
}

pub fn write_metrics_json(path: &Path, entries: &[MetricsEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json).map_err(|e| Error::io(path, e))?;
    info!("Wrote {} entries to {:?}", entries.len(), path);
    Ok(())
}

// Tag values escape commas, equals signs and spaces.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Formats `entry` as a line of InfluxDB line protocol, tagged by filename,
/// with fields `std`, `dispersion`, `position_x` and `position_y`. Absent
/// values are left out; returns None if no field remains, since a point must
/// carry at least one field.
pub fn to_line_protocol(entry: &MetricsEntry) -> Option<String> {
    let p = &entry.parameters;
    let fields: Vec<String> = [("std", p.std),
                               ("dispersion", p.dispersion),
                               ("position_x", p.position_x()),
                               ("position_y", p.position_y())]
        .iter()
        .filter_map(|(name, value)| value.map(|v| format!("{}={}", name, v)))
        .collect();
    if fields.is_empty() {
        return None;
    }
    Some(format!("{},filename={} {}", MEASUREMENT, escape_tag(&entry.filename),
                 fields.join(",")))
}

/// Writes one line protocol line per entry. Entries without any values are
/// skipped. Returns the number of lines written.
pub fn write_line_protocol(path: &Path, entries: &[MetricsEntry]) -> Result<usize> {
    let mut text = String::new();
    let mut lines = 0;
    for entry in entries {
        match to_line_protocol(entry) {
            Some(line) => {
                text.push_str(&line);
                text.push('\n');
                lines += 1;
            },
            None => warn!("No metrics for {}; not exported", entry.filename),
        }
    }
    fs::write(path, text).map_err(|e| Error::io(path, e))?;
    info!("Wrote {} line protocol points to {:?}", lines, path);
    Ok(lines)
}

pub fn format_projections(name: &str, projections: &Projections) -> String {
    let join = |values: &[u64]| values.iter()
        .map(|v| v.to_string())
        .collect::<Vec<String>>()
        .join(" ");
    let mut text = String::new();
    let _ = writeln!(text, "{}:", name);
    let _ = writeln!(text, "projection_x: [{}]", join(&projections.x));
    let _ = writeln!(text, "projection_y: [{}]", join(&projections.y));
    text
}

/// Writes the projections of several images, in order, to one text file.
pub fn write_projections(path: &Path, named: &[(String, Projections)]) -> Result<()> {
    let text: String = named.iter()
        .map(|(name, projections)| format_projections(name, projections))
        .collect();
    fs::write(path, text).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(filename: &str, parameters: ParameterRecord) -> MetricsEntry {
        MetricsEntry{filename: filename.to_string(), parameters}
    }

    #[test]
    fn test_metrics_entry_json() {
        let value = serde_json::to_value(
            entry("center", ParameterRecord::from_measurement(2.5, (1.0, -3.0)))).unwrap();
        assert_eq!(value, json!({"filename": "center", "std": 2.5,
                                 "dispersion": 6.25, "position": [1.0, -3.0]}));
        let value = serde_json::to_value(
            entry("empty", ParameterRecord::absent())).unwrap();
        assert_eq!(value, json!({"filename": "empty", "std": null,
                                 "dispersion": null, "position": [null, null]}));
    }

    #[test]
    fn test_to_line_protocol() {
        let line = to_line_protocol(
            &entry("center", ParameterRecord::from_measurement(2.5, (1.0, -3.0))));
        assert_eq!(line.as_deref(),
                   Some("spot_metrics,filename=center \
                         std=2.5,dispersion=6.25,position_x=1,position_y=-3"));
        assert_eq!(to_line_protocol(&entry("empty", ParameterRecord::absent())), None);
        let line = to_line_protocol(
            &entry("my spot,1", ParameterRecord::from_measurement(1.0, (0.0, 0.0))))
            .unwrap();
        assert!(line.starts_with("spot_metrics,filename=my\\ spot\\,1 "));
    }

    #[test]
    fn test_format_projections() {
        let projections = Projections{x: vec![5, 7, 9], y: vec![6, 15]};
        assert_eq!(format_projections("tiny", &projections),
                   "tiny:\nprojection_x: [5 7 9]\nprojection_y: [6 15]\n");
    }

    #[test]
    fn test_write_files() {
        let dir = std::env::temp_dir().join(
            format!("spot_detect_export_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let entries = vec![
            entry("center", ParameterRecord::from_measurement(2.0, (0.0, 0.0))),
            entry("empty", ParameterRecord::absent())];

        let json_path = dir.join("image_metrics.json");
        write_metrics_json(&json_path, &entries).unwrap();
        let read_back: Vec<MetricsEntry> =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(read_back, entries);

        let lp_path = dir.join("metrics.lp");
        assert_eq!(write_line_protocol(&lp_path, &entries).unwrap(), 1);
        assert_eq!(fs::read_to_string(&lp_path).unwrap(),
                   "spot_metrics,filename=center \
                    std=2,dispersion=4,position_x=0,position_y=0\n");

        let proj_path = dir.join("projections.txt");
        write_projections(&proj_path,
                          &[("a".to_string(), Projections{x: vec![1], y: vec![1]})])
            .unwrap();
        assert_eq!(fs::read_to_string(&proj_path).unwrap(),
                   "a:\nprojection_x: [1]\nprojection_y: [1]\n");
        fs::remove_dir_all(&dir).unwrap();
    }
}
