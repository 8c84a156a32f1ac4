// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Reference fixtures: a `<name>.yaml` file holding the expected
//! [ParameterRecord] next to a `<name>.png` spot image rendered from it.

use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::image_funcs::gaussian_spot;
use crate::parameters::ParameterRecord;

pub const DEFAULT_WIDTH: u32 = 100;
pub const DEFAULT_HEIGHT: u32 = 100;

/// Requested spot parameters for a new fixture. Any missing parameter makes
/// the fixture describe an image without a spot.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FixtureSpec {
    pub x0: Option<f64>,
    pub y0: Option<f64>,
    pub std: Option<f64>,
}

impl FixtureSpec {
    pub fn from_record(record: &ParameterRecord) -> Self {
        FixtureSpec{x0: record.position_x(),
                    y0: record.position_y(),
                    std: record.std}
    }

    /// The values a correct measurement of the rendered image should report.
    /// The dispersion is always `std^2`; the position is only recorded when
    /// both coordinates were given.
    pub fn expected_record(&self) -> ParameterRecord {
        ParameterRecord{
            std: self.std,
            dispersion: self.std.map(|s| s * s),
            position: match (self.x0, self.y0) {
                (Some(x), Some(y)) => Some((x, y)),
                _ => None,
            },
        }
    }

    pub fn render(&self, width: u32, height: u32) -> GrayImage {
        gaussian_spot(self.x0, self.y0, self.std, width, height)
    }
}

pub fn load_fixture(path: &Path) -> Result<ParameterRecord> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let record: ParameterRecord = serde_yaml::from_str(&contents).map_err(
        |e| Error::Yaml{path: path.to_path_buf(), source: e})?;
    if let (Some(std), Some(dispersion)) = (record.std, record.dispersion) {
        if dispersion < 0.0 || std < 0.0 {
            return Err(Error::InvalidFixture(format!(
                "{:?}: negative std {} or dispersion {}", path, std, dispersion)));
        }
    }
    Ok(record)
}

pub fn save_fixture(path: &Path, record: &ParameterRecord) -> Result<()> {
    let yaml = serde_yaml::to_string(record).map_err(
        |e| Error::Yaml{path: path.to_path_buf(), source: e})?;
    fs::write(path, yaml).map_err(|e| Error::io(path, e))
}

fn save_image(path: &Path, image: &GrayImage) -> Result<()> {
    image.save(path).map_err(|e| Error::Encode{path: path.to_path_buf(), source: e})
}

/// Writes `<dir>/<name>.yaml` and `<dir>/<name>.png` for `spec`. Returns the
/// path of the YAML file.
pub fn create_fixture(dir: &Path, name: &str, spec: &FixtureSpec,
                      width: u32, height: u32) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(Error::InvalidFixture("fixture name is empty".to_string()));
    }
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let yaml_path = dir.join(format!("{}.yaml", name));
    save_fixture(&yaml_path, &spec.expected_record())?;
    save_image(&yaml_path.with_extension("png"), &spec.render(width, height))?;
    info!("Created fixture {:?} for {:?}", yaml_path, spec);
    Ok(yaml_path)
}

/// Re-renders the `.png` image of every fixture found under `dir`. Returns the
/// number of images written.
pub fn regenerate_images(dir: &Path, width: u32, height: u32) -> Result<usize> {
    let fixtures = find_files(dir, "yaml")?;
    for yaml_path in &fixtures {
        let spec = FixtureSpec::from_record(&load_fixture(yaml_path)?);
        let png_path = yaml_path.with_extension("png");
        save_image(&png_path, &spec.render(width, height))?;
        debug!("Rendered {:?}", png_path);
    }
    info!("Regenerated {} fixture images under {:?}", fixtures.len(), dir);
    Ok(fixtures.len())
}

/// Lists files under `dir` (recursively) whose extension is `extension`, in
/// sorted order.
pub fn find_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::<PathBuf>::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).map_err(|e| Error::io(&current, e))? {
            let path = entry.map_err(|e| Error::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == extension) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Fixture name: the file stem.
pub fn fixture_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
