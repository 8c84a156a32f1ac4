// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use serde::{Deserialize, Serialize};

/// Measured (or expected) parameters of a spot.
///
/// When a spot is present all three fields are populated; when no spot was
/// found they are all `None`. The serialized form is
/// `{std, dispersion, position: [x, y]}`, with `null` standing in for absent
/// values (an absent position is written as `[null, null]`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Radius of the spot at its 1-sigma intensity level, in pixels.
    #[serde(default)]
    pub std: Option<f64>,

    /// Always `std * std`.
    #[serde(default)]
    pub dispersion: Option<f64>,

    /// Spot center relative to the image center. X increases to the right and
    /// Y increases upward.
    #[serde(default, with = "position_pair")]
    pub position: Option<(f64, f64)>,
}

impl ParameterRecord {
    /// The record reported when there is no spot.
    pub fn absent() -> Self {
        ParameterRecord{std: None, dispersion: None, position: None}
    }

    /// Builds a record from a spread and a position. The dispersion is derived
    /// from `std` so that `dispersion == std * std` holds exactly.
    pub fn from_measurement(std: f64, position: (f64, f64)) -> Self {
        ParameterRecord{std: Some(std),
                        dispersion: Some(std * std),
                        position: Some(position)}
    }

    pub fn is_absent(&self) -> bool {
        self.std.is_none() && self.dispersion.is_none() && self.position.is_none()
    }

    pub fn position_x(&self) -> Option<f64> {
        self.position.map(|(x, _)| x)
    }

    pub fn position_y(&self) -> Option<f64> {
        self.position.map(|(_, y)| y)
    }
}

// The position is always a two element list on the wire, even when absent.
mod position_pair {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(position: &Option<(f64, f64)>, serializer: S)
                        -> Result<S::Ok, S::Error>
    where S: Serializer {
        let pair: [Option<f64>; 2] = match position {
            Some((x, y)) => [Some(*x), Some(*y)],
            None => [None, None],
        };
        pair.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<(f64, f64)>, D::Error>
    where D: Deserializer<'de> {
        match <[Option<f64>; 2]>::deserialize(deserializer)? {
            [Some(x), Some(y)] => Ok(Some((x, y))),
            [None, None] => Ok(None),
            partial => Err(D::Error::custom(format!(
                "position must have both coordinates or neither, got {:?}", partial))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_measurement() {
        let record = ParameterRecord::from_measurement(1.5, (3.0, -2.0));
        assert_eq!(record.std, Some(1.5));
        assert_eq!(record.dispersion, Some(2.25));
        assert_eq!(record.position_x(), Some(3.0));
        assert_eq!(record.position_y(), Some(-2.0));
        assert!(!record.is_absent());
        assert!(ParameterRecord::absent().is_absent());
        assert_eq!(ParameterRecord::default(), ParameterRecord::absent());
    }

    #[test]
    fn test_absent_position_serializes_as_null_pair() {
        let json = serde_json::to_string(&ParameterRecord::absent()).unwrap();
        assert_eq!(json, r#"{"std":null,"dispersion":null,"position":[null,null]}"#);
    }

    #[test]
    fn test_yaml_fixture_with_integer_position() {
        let yaml = "std: 15.0\ndispersion: 225.0\nposition:\n- 0\n- -10\n";
        let record: ParameterRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record, ParameterRecord::from_measurement(15.0, (0.0, -10.0)));
    }

    #[test]
    fn test_yaml_fixture_absent() {
        let yaml = "std: null\ndispersion: null\nposition:\n- null\n- null\n";
        let record: ParameterRecord = serde_yaml::from_str(yaml).unwrap();
        assert!(record.is_absent());
    }

    #[test]
    fn test_half_position_rejected() {
        let result = serde_json::from_str::<ParameterRecord>(
            r#"{"std":1.0,"dispersion":1.0,"position":[2.0,null]}"#);
        assert!(result.is_err());
    }
}
