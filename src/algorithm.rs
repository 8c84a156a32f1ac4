// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::time::Instant;

use image::{GrayImage, Luma};
use imageproc::point::Point;
use log::{debug, info};

use crate::contour_funcs::{approximate, find_external_contours, polygon_moments,
                           ContourApproximation};
use crate::error::{Error, Result};
use crate::parameters::ParameterRecord;

/// Tunables for [estimate_with_config()].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EstimatorConfig {
    /// The binarization threshold is this fraction of the image's peak value.
    /// The default, exp(-1/2), is the 1-sigma level of a Gaussian profile, so
    /// the traced boundary sits at one standard deviation from the center.
    pub threshold_factor: f64,

    /// Which boundary points participate in the spread estimate.
    pub approximation: ContourApproximation,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig{threshold_factor: (-0.5_f64).exp(),
                        approximation: ContourApproximation::Simple}
    }
}

/// Returns the brightest pixel value of `image`.
pub fn peak_value(image: &GrayImage) -> u8 {
    image.as_raw().iter().copied().max().unwrap_or(0)
}

/// Marks pixels strictly brighter than `threshold` as foreground (255); all
/// others are background (0). A threshold of zero on an all-black image thus
/// yields an empty mask.
pub fn binarize(image: &GrayImage, threshold: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[0] as f64 > threshold {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}

/// Mean Euclidean distance from `center` to the contour points.
pub fn mean_radius(contour: &[Point<i32>], center: (i64, i64)) -> f64 {
    if contour.is_empty() {
        return 0.0;
    }
    let (cx, cy) = (center.0 as f64, center.1 as f64);
    let total: f64 = contour.iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum();
    total / contour.len() as f64
}

/// Measures the spot in `image` using the default [EstimatorConfig].
pub fn estimate(image: &GrayImage) -> Result<ParameterRecord> {
    estimate_with_config(image, &EstimatorConfig::default())
}

/// Measures the single bright spot of `image`.
///
/// The image is binarized at `threshold_factor` times its peak value and the
/// first external contour of the result (in raster order) is taken as the
/// spot boundary. The spot center is the centroid of the region enclosed by
/// that contour, truncated to whole pixels; if the contour encloses no area
/// the image center is used instead. The spread is the mean distance from the
/// center to the contour points.
///
/// # Returns
/// [ParameterRecord] with the position expressed relative to the image center,
/// y axis pointing up. If no pixel exceeds the threshold, all fields are
/// `None`.
///
/// # Errors
/// [Error::EmptyImage] if `image` has zero width or height.
pub fn estimate_with_config(image: &GrayImage, config: &EstimatorConfig)
                            -> Result<ParameterRecord> {
    let estimate_start = Instant::now();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage{width, height});
    }

    let peak = peak_value(image);
    let threshold = peak as f64 * config.threshold_factor;
    let mask = binarize(image, threshold);
    debug!("Peak {} threshold {:.3}", peak, threshold);

    // Only the first contour is considered. With several disjoint bright
    // regions this is the one discovered first in raster order, not
    // necessarily the largest.
    let Some(contour) = find_external_contours(&mask).into_iter().next() else {
        info!("No spot found in {:?}", estimate_start.elapsed());
        return Ok(ParameterRecord::absent());
    };
    let contour = approximate(contour, config.approximation);

    let (cx, cy) = match polygon_moments(&contour).centroid() {
        // Truncate to whole pixels.
        Some((mx, my)) => (mx as i64, my as i64),
        None => {
            debug!("Contour of {} points encloses no area; using image center",
                   contour.len());
            ((width / 2) as i64, (height / 2) as i64)
        },
    };
    let std = mean_radius(&contour, (cx, cy));
    let position = ((cx - (width / 2) as i64) as f64,
                    ((height / 2) as i64 - cy) as f64);

    info!("Spot at {:?} std {:.3} from {} contour points in {:?}",
          position, std, contour.len(), estimate_start.elapsed());
    Ok(ParameterRecord::from_measurement(std, position))
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;
    use imageproc::gray_image;
    use super::*;
    use crate::image_funcs::gaussian_spot;

    fn spot(x0: f64, y0: f64, std: f64) -> GrayImage {
        gaussian_spot(Some(x0), Some(y0), Some(std), 100, 100)
    }

    fn assert_consistent(record: &ParameterRecord) {
        let std = record.std.unwrap();
        assert_eq!(record.dispersion.unwrap(), std * std);
    }

    #[test]
    fn test_binarize_strict() {
        let image = gray_image!(
            0, 100, 154;
            155, 200, 255);
        let mask = binarize(&image, 255.0 * (-0.5_f64).exp());
        assert_eq!(mask, gray_image!(
            0, 0, 0;
            255, 255, 255));
        // Pixels equal to the threshold are background.
        assert_eq!(binarize(&image, 100.0).get_pixel(1, 0).0[0], 0);
        assert_eq!(binarize(&GrayImage::new(3, 3), 0.0), GrayImage::new(3, 3));
    }

    #[test]
    fn test_peak_value() {
        assert_eq!(peak_value(&gray_image!(3, 9; 7, 1)), 9);
        assert_eq!(peak_value(&GrayImage::new(4, 4)), 0);
    }

    #[test]
    fn test_mean_radius() {
        let square = vec![Point::new(1, 1), Point::new(1, 3),
                          Point::new(3, 3), Point::new(3, 1)];
        assert_abs_diff_eq!(mean_radius(&square, (2, 2)), 2.0_f64.sqrt(),
                            epsilon = 1e-12);
        assert_eq!(mean_radius(&[], (0, 0)), 0.0);
    }

    #[test]
    fn test_empty_image_is_error() {
        let empty_image = gray_image!();
        assert!(matches!(estimate(&empty_image),
                         Err(Error::EmptyImage{width: 0, height: 0})));
    }

    #[test]
    fn test_no_spot() {
        let record = estimate(&GrayImage::new(100, 100)).unwrap();
        assert_eq!(record, ParameterRecord::absent());
        assert_eq!(record.std, None);
        assert_eq!(record.dispersion, None);
        assert_eq!(record.position, None);
    }

    #[test]
    fn test_uniform_nonzero_image() {
        // Every pixel exceeds the threshold, so the contour is the image
        // border.
        let mut image = GrayImage::new(10, 6);
        for pixel in image.pixels_mut() {
            *pixel = Luma([40]);
        }
        let record = estimate(&image).unwrap();
        // Corners (0,0), (0,5), (9,5), (9,0); centroid (4.5, 2.5) truncates to
        // (4, 2).
        assert_eq!(record.position, Some((-1.0, 1.0)));
        assert_consistent(&record);
    }

    #[test]
    fn test_centered_spot() {
        let record = estimate(&spot(0.0, 0.0, 15.0)).unwrap();
        assert_eq!(record.position, Some((0.0, 0.0)));
        let std = record.std.unwrap();
        assert!((std - 15.0).abs() / 15.0 <= 0.05, "std {}", std);
        assert_consistent(&record);
    }

    #[test]
    fn test_shifted_spots() {
        for (x0, y0) in [(20.0, 0.0), (-20.0, 0.0), (0.0, 20.0), (0.0, -20.0),
                         (10.0, -15.0)] {
            let record = estimate(&spot(x0, y0, 10.0)).unwrap();
            assert_eq!(record.position, Some((x0, y0)));
            assert_consistent(&record);
        }
    }

    #[test]
    fn test_shift_sign() {
        let right = estimate(&spot(7.0, 0.0, 5.0)).unwrap();
        assert!(right.position_x().unwrap() > 0.0);
        assert_eq!(right.position_y(), Some(0.0));

        let left = estimate(&spot(-7.0, 0.0, 5.0)).unwrap();
        assert!(left.position_x().unwrap() < 0.0);
        assert_eq!(left.position_y(), Some(0.0));

        let up = estimate(&spot(0.0, 7.0, 5.0)).unwrap();
        assert_eq!(up.position_x(), Some(0.0));
        assert!(up.position_y().unwrap() > 0.0);

        let down = estimate(&spot(0.0, -7.0, 5.0)).unwrap();
        assert_eq!(down.position_x(), Some(0.0));
        assert!(down.position_y().unwrap() < 0.0);
    }

    #[test]
    fn test_spread_is_monotonic() {
        let narrow = estimate(&spot(0.0, 0.0, 5.0)).unwrap().std.unwrap();
        let wide = estimate(&spot(0.0, 0.0, 20.0)).unwrap().std.unwrap();
        assert!(wide > narrow);
        assert!((narrow - 5.0).abs() / 5.0 <= 0.15, "narrow {}", narrow);
        assert!((wide - 20.0).abs() / 20.0 <= 0.05, "wide {}", wide);
    }

    #[test]
    fn test_single_pixel_spot() {
        let record = estimate(&spot(0.0, 0.0, 0.1)).unwrap();
        assert!(record.std.unwrap() < 0.05);
        assert_eq!(record.position, Some((0.0, 0.0)));
        assert_consistent(&record);
    }

    #[test]
    fn test_off_center_single_pixel_falls_back_to_image_center() {
        // A lone pixel encloses no area, so the center falls back to the image
        // center and the spread is the pixel's distance from it.
        let mut image = GrayImage::new(9, 9);
        image.put_pixel(7, 4, Luma([200]));
        let record = estimate(&image).unwrap();
        assert_eq!(record.position, Some((0.0, 0.0)));
        assert_abs_diff_eq!(record.std.unwrap(), 3.0);
        assert_consistent(&record);
    }

    #[test]
    fn test_line_spot() {
        // One pixel wide horizontal line: collinear contour.
        let image = gray_image!(
            0, 0, 0, 0, 0;
            0, 90, 90, 90, 0;
            0, 0, 0, 0, 0);
        let record = estimate(&image).unwrap();
        // Compressed contour is (1,1), (3,1); image center is (2,1).
        assert_eq!(record.position, Some((0.0, 0.0)));
        assert_abs_diff_eq!(record.std.unwrap(), 1.0);
    }

    #[test]
    fn test_first_contour_is_used() {
        let mut image = GrayImage::new(40, 40);
        // Small spot near the top, larger spot near the bottom.
        image.put_pixel(30, 5, Luma([255]));
        for y in 25..35 {
            for x in 5..15 {
                image.put_pixel(x, y, Luma([255]));
            }
        }
        let record = estimate(&image).unwrap();
        // The single pixel at (30, 5) is found first.
        assert_eq!(record.position, Some((0.0, 0.0)));
        assert_abs_diff_eq!(record.std.unwrap(),
                            (10.0_f64 * 10.0 + 15.0 * 15.0).sqrt(),
                            epsilon = 1e-12);
    }

    #[test]
    fn test_topmost_region_is_measured() {
        let mut image = GrayImage::new(10, 10);
        for (x, y) in [(7, 1), (8, 1), (7, 2), (8, 2)] {
            image.put_pixel(x, y, Luma([255]));
        }
        image.put_pixel(2, 8, Luma([255]));
        let record = estimate(&image).unwrap();
        // Block centroid (7.5, 1.5) truncates to (7, 1).
        assert_eq!(record.position, Some((2.0, 4.0)));
        assert_abs_diff_eq!(record.std.unwrap(), (2.0 + 2.0_f64.sqrt()) / 4.0,
                            epsilon = 1e-12);
    }

    #[test]
    fn test_approximation_none_uses_all_points() {
        let image = spot(0.0, 0.0, 15.0);
        let config = EstimatorConfig{approximation: ContourApproximation::None,
                                     ..Default::default()};
        let full = estimate_with_config(&image, &config).unwrap();
        let simple = estimate(&image).unwrap();
        assert_eq!(full.position, simple.position);
        assert!(full.std.unwrap() != simple.std.unwrap());
        assert!((full.std.unwrap() - 15.0).abs() / 15.0 <= 0.05);
    }

    #[test]
    fn test_threshold_factor() {
        // A lower threshold traces a wider boundary.
        let image = spot(0.0, 0.0, 8.0);
        let config = EstimatorConfig{threshold_factor: 0.1, ..Default::default()};
        let wide = estimate_with_config(&image, &config).unwrap().std.unwrap();
        let default = estimate(&image).unwrap().std.unwrap();
        assert!(wide > default);
    }
}
