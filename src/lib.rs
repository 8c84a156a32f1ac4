// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! SpotDetect measures the position and size of a single bright spot on a dark
//! background in a grayscale image, and validates such measurements against
//! reference fixtures.
//!
//! Given an image, [estimate()] returns a [ParameterRecord] holding:
//!
//! * `position`: the spot center relative to the image center, in whole
//!   pixels, with x increasing to the right and y increasing **upward**.
//! * `std`: the spot radius at its 1-sigma intensity level.
//! * `dispersion`: `std` squared.
//!
//! If the image contains no spot, all three are absent. This is a normal
//! outcome, not an error.
//!
//! # Algorithm
//!
//! 1. The image is binarized at `exp(-1/2)` times its peak value; a pixel is
//!    foreground if it is strictly brighter than this threshold. For a
//!    Gaussian spot this is the intensity one standard deviation away from
//!    the center.
//! 2. The outer border of the first foreground region (in raster order) is
//!    traced, and straight runs of the border are compressed to their end
//!    points.
//! 3. The spot center is the centroid of the region enclosed by the border,
//!    truncated to whole pixels. A border that encloses no area (a single
//!    pixel or a one pixel wide line) uses the image center instead.
//! 4. `std` is the mean distance from the center to the border points.
//!
//! # Caveats
//!
//! ## Single spot only
//!
//! When several disjoint bright regions are present, the one reached first
//! scanning rows from the top is measured. It is not necessarily the largest
//! or brightest one. This also differs from OpenCV's `findContours`, whose
//! result list starts with the region discovered *last*; for an image with a
//! block near the top and a lone pixel near the bottom, OpenCV-based tools
//! would measure the pixel while [estimate()] measures the block.
//!
//! ## Geometric spread
//!
//! `std` is a radius derived from boundary geometry, not a statistical
//! standard deviation of pixel intensities. It is slightly biased low for
//! Gaussian spots because the traced border consists of the outermost pixels
//! still above threshold.
//!
//! ## Precision
//!
//! Positions are whole pixels. No sub-pixel fitting and no noise modeling is
//! attempted.
//!
//! # Fixtures and checks
//!
//! The [fixtures] module renders Gaussian test spots and stores their expected
//! parameters as YAML; [checks] compares measurements against them and
//! collects the outcomes; [export] writes measurements as JSON, as line
//! protocol, and as intensity projections.

pub mod algorithm;
pub mod checks;
pub mod contour_funcs;
pub mod error;
pub mod export;
pub mod fixtures;
pub mod image_funcs;
pub mod parameters;

pub use algorithm::{estimate, estimate_with_config, EstimatorConfig};
pub use contour_funcs::ContourApproximation;
pub use error::{Error, Result};
pub use parameters::ParameterRecord;
