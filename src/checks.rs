// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Validation of measured spot parameters against reference fixtures.
//!
//! Each check produces a [CheckOutcome] via [summarize()] and hands it to a
//! [ResultCollector] owned by whoever is running the checks. The collector can
//! then be written out as a JSON results file.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use serde::Serialize;

use crate::algorithm::{estimate_with_config, EstimatorConfig};
use crate::error::{Error, Result};
use crate::fixtures::{find_files, fixture_name, load_fixture};
use crate::image_funcs::load_grayscale;
use crate::parameters::ParameterRecord;

/// Default fraction of agreement required between measured and expected
/// floating point values.
pub const DEFAULT_ACCURACY: f64 = 0.95;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CheckKind {
    /// The whole record must match; used for images without a spot.
    Empty,
    PositionX,
    PositionY,
    Std,
    Dispersion,
    /// The measured dispersion must be the square of the measured std.
    StdDispersionCongruence,
}

impl CheckKind {
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::Empty => "test_empty",
            CheckKind::PositionX => "test_position_x",
            CheckKind::PositionY => "test_position_y",
            CheckKind::Std => "test_std",
            CheckKind::Dispersion => "test_dispersion",
            CheckKind::StdDispersionCongruence => "test_std_dispersion_congruence",
        }
    }
}

/// Result of a single check on a single fixture.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckOutcome {
    /// Check name and fixture, e.g. `test_std[center]`.
    pub test_type: String,
    /// The measured value.
    pub input: serde_json::Value,
    pub expected: serde_json::Value,
    pub result: Verdict,
    /// Present only on failure.
    pub error_message: Option<String>,
    /// When the check ran, as fractional seconds since the Unix epoch (a JSON
    /// number such as `1760880000.25`, not an ISO-8601 string).
    pub timestamp: f64,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.result == Verdict::Pass
    }
}

fn now_seconds() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Builds the outcome record for one check. `message` is reported only when
/// `condition` is false.
pub fn summarize<A, E>(condition: bool, message: &str, kind: CheckKind,
                       filename: &str, actual: &A, expected: &E)
                       -> Result<CheckOutcome>
where A: Serialize + ?Sized, E: Serialize + ?Sized {
    Ok(CheckOutcome{
        test_type: format!("{}[{}]", kind.name(), filename),
        input: serde_json::to_value(actual)?,
        expected: serde_json::to_value(expected)?,
        result: if condition { Verdict::Pass } else { Verdict::Fail },
        error_message: if condition { None } else { Some(message.to_string()) },
        timestamp: now_seconds(),
    })
}

/// Accumulates check outcomes for a run.
#[derive(Debug, Default)]
pub struct ResultCollector {
    outcomes: Vec<CheckOutcome>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `outcome`, returning whether it passed.
    pub fn record(&mut self, outcome: CheckOutcome) -> bool {
        let passed = outcome.passed();
        if passed {
            debug!("{} passed", outcome.test_type);
        } else {
            warn!("{} failed: {}", outcome.test_type,
                  outcome.error_message.as_deref().unwrap_or(""));
        }
        self.outcomes.push(outcome);
        passed
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.passed_count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Writes all outcomes as a pretty-printed JSON array.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.outcomes)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }
}

/// Whether `actual` agrees with `expected` to within `accuracy`. Values agree
/// when their difference is at most `1 - accuracy`, either relative to
/// `expected` or in absolute terms (the latter covers expected values at or
/// near zero). Two absent values agree; one absent value does not.
///
/// The comparison is symmetric: an overestimate beyond the tolerance fails
/// just like an underestimate. Fixtures validated by a one-sided check (where
/// any overestimate passes) may therefore fail here.
pub fn within_tolerance(expected: Option<f64>, actual: Option<f64>, accuracy: f64)
                        -> bool {
    match (expected, actual) {
        (None, None) => true,
        (Some(expected), Some(actual)) => {
            let tolerance = 1.0 - accuracy;
            let diff = (expected - actual).abs();
            diff <= tolerance ||
                (expected != 0.0 && diff / expected.abs() <= tolerance)
        },
        _ => false,
    }
}

/// Whether the record's dispersion is exactly its std squared.
pub fn is_congruent(record: &ParameterRecord) -> bool {
    match (record.std, record.dispersion) {
        (Some(std), Some(dispersion)) => dispersion == std * std,
        (None, None) => true,
        _ => false,
    }
}

pub fn check_empty(collector: &mut ResultCollector, filename: &str,
                   expected: &ParameterRecord, actual: &ParameterRecord)
                   -> Result<bool> {
    let outcome = summarize(expected == actual, "Values are not all absent",
                            CheckKind::Empty, filename, actual, expected)?;
    Ok(collector.record(outcome))
}

pub fn check_position_x(collector: &mut ResultCollector, filename: &str,
                        expected: &ParameterRecord, actual: &ParameterRecord)
                        -> Result<bool> {
    let (expected, actual) = (expected.position_x(), actual.position_x());
    let outcome = summarize(expected == actual, "X coordinates differ",
                            CheckKind::PositionX, filename, &actual, &expected)?;
    Ok(collector.record(outcome))
}

pub fn check_position_y(collector: &mut ResultCollector, filename: &str,
                        expected: &ParameterRecord, actual: &ParameterRecord)
                        -> Result<bool> {
    let (expected, actual) = (expected.position_y(), actual.position_y());
    let outcome = summarize(expected == actual, "Y coordinates differ",
                            CheckKind::PositionY, filename, &actual, &expected)?;
    Ok(collector.record(outcome))
}

pub fn check_std(collector: &mut ResultCollector, filename: &str,
                 expected: &ParameterRecord, actual: &ParameterRecord,
                 accuracy: f64) -> Result<bool> {
    let message = format!(
        "Standard deviations do not agree to within {}% (or an absolute {:.2})",
        accuracy * 100.0, 1.0 - accuracy);
    let outcome = summarize(within_tolerance(expected.std, actual.std, accuracy),
                            &message, CheckKind::Std, filename,
                            &actual.std, &expected.std)?;
    Ok(collector.record(outcome))
}

pub fn check_dispersion(collector: &mut ResultCollector, filename: &str,
                        expected: &ParameterRecord, actual: &ParameterRecord,
                        accuracy: f64) -> Result<bool> {
    let message = format!(
        "Dispersions do not agree to within {}% (or an absolute {:.2})",
        accuracy * 100.0, 1.0 - accuracy);
    let condition = within_tolerance(expected.dispersion, actual.dispersion, accuracy);
    let outcome = summarize(condition, &message, CheckKind::Dispersion, filename,
                            &actual.dispersion, &expected.dispersion)?;
    Ok(collector.record(outcome))
}

pub fn check_std_dispersion_congruence(collector: &mut ResultCollector,
                                       filename: &str, actual: &ParameterRecord)
                                       -> Result<bool> {
    const CONGRUENT: &str = "dispersion == std^2";
    let congruent = is_congruent(actual);
    let observed = if congruent { CONGRUENT } else { "dispersion != std^2" };
    let outcome = summarize(congruent, "Dispersion is not the square of std",
                            CheckKind::StdDispersionCongruence, filename,
                            observed, CONGRUENT)?;
    Ok(collector.record(outcome))
}

/// Runs the checks that apply to a fixture, as determined by its expected
/// record:
/// * nothing expected: [CheckKind::Empty];
/// * a position: [CheckKind::PositionX] and [CheckKind::PositionY];
/// * a std: [CheckKind::Std], [CheckKind::Dispersion] and
///   [CheckKind::StdDispersionCongruence].
///
/// Returns whether all of them passed.
pub fn check_fixture(collector: &mut ResultCollector, filename: &str,
                     expected: &ParameterRecord, actual: &ParameterRecord,
                     accuracy: f64) -> Result<bool> {
    if expected.is_absent() {
        return check_empty(collector, filename, expected, actual);
    }
    let mut all_passed = true;
    if expected.position.is_some() {
        all_passed &= check_position_x(collector, filename, expected, actual)?;
        all_passed &= check_position_y(collector, filename, expected, actual)?;
    }
    if expected.std.is_some() {
        all_passed &= check_std(collector, filename, expected, actual, accuracy)?;
        all_passed &= check_dispersion(collector, filename, expected, actual, accuracy)?;
        all_passed &= check_std_dispersion_congruence(collector, filename, actual)?;
    }
    Ok(all_passed)
}

/// Measures the image of every fixture under `dir` and checks it against the
/// fixture's expected record. Returns the number of fixtures processed.
pub fn run_fixture_checks(dir: &Path, config: &EstimatorConfig, accuracy: f64,
                          collector: &mut ResultCollector) -> Result<usize> {
    let fixtures = find_files(dir, "yaml")?;
    for yaml_path in &fixtures {
        let filename = fixture_name(yaml_path);
        let expected = load_fixture(yaml_path)?;
        let image = load_grayscale(&yaml_path.with_extension("png"))?;
        let actual = estimate_with_config(&image, config)?;
        debug!("{}: expected {:?} actual {:?}", filename, expected, actual);
        check_fixture(collector, &filename, &expected, &actual, accuracy)?;
    }
    info!("Checked {} fixtures: {} passed, {} failed",
          fixtures.len(), collector.passed_count(), collector.failed_count());
    Ok(fixtures.len())
}
