// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use log::debug;

/// How the points of a traced contour are reported.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ContourApproximation {
    /// Straight horizontal, vertical and diagonal runs are compressed to their
    /// end points.
    #[default]
    Simple,
    /// Every boundary pixel is reported.
    None,
}

impl fmt::Display for ContourApproximation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContourApproximation::Simple => write!(f, "simple"),
            ContourApproximation::None => write!(f, "none"),
        }
    }
}

impl FromStr for ContourApproximation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(ContourApproximation::Simple),
            "none" => Ok(ContourApproximation::None),
            _ => Err(format!("unknown contour approximation '{}'; \
                              expected 'simple' or 'none'", s)),
        }
    }
}

/// Returns the outer borders of the 8-connected foreground regions of `mask`
/// (non-zero pixels are foreground). Borders of regions nested inside holes
/// are not returned. Contours are in raster order of their first pixel.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Vec<Point<i32>>> {
    // The border follower only starts an outer border at a foreground pixel
    // that has a background pixel to its left, so regions touching column 0
    // would be missed. Surround the mask with a one pixel background frame.
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] != 0 {
            padded.put_pixel(x + 1, y + 1, Luma([255]));
        }
    }
    let contours: Vec<Vec<Point<i32>>> = find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points.into_iter()
             .map(|p| Point::new(p.x - 1, p.y - 1))
             .collect())
        .collect();
    debug!("Found {} external contours", contours.len());
    contours
}

/// Compresses a closed contour so that each straight run (horizontal, vertical
/// or diagonal) is represented by its end points only. The starting point is
/// always retained.
pub fn approximate_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut kept = Vec::<Point<i32>>::with_capacity(n);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        if i == 0 || cur - prev != next - cur {
            kept.push(cur);
        }
    }
    kept
}

/// Applies `approximation` to a traced contour.
pub fn approximate(points: Vec<Point<i32>>, approximation: ContourApproximation)
                   -> Vec<Point<i32>> {
    match approximation {
        ContourApproximation::Simple => approximate_chain(&points),
        ContourApproximation::None => points,
    }
}

/// Spatial moments of the region enclosed by a contour polygon.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ContourMoments {
    /// Enclosed area.
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl ContourMoments {
    /// Center of mass of the enclosed region, or None if the contour encloses
    /// no area (a single point, or points that are all collinear).
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Computes area and first moments of the polygon whose vertices are
/// `points`, using Green's theorem over the closed polygon. The result does
/// not depend on traversal direction. Polygons whose area is within f32
/// epsilon of zero yield all-zero moments.
pub fn polygon_moments(points: &[Point<i32>]) -> ContourMoments {
    let Some(last) = points.last() else {
        return ContourMoments::default();
    };
    let mut a00 = 0.0_f64;
    let mut a10 = 0.0_f64;
    let mut a01 = 0.0_f64;
    let mut prev_x = last.x as f64;
    let mut prev_y = last.y as f64;
    for point in points {
        let x = point.x as f64;
        let y = point.y as f64;
        let cross = prev_x * y - x * prev_y;
        a00 += cross;
        a10 += cross * (prev_x + x);
        a01 += cross * (prev_y + y);
        prev_x = x;
        prev_y = y;
    }
    if a00.abs() <= f32::EPSILON as f64 {
        return ContourMoments::default();
    }
    if a00 < 0.0 {
        // Clockwise traversal.
        a00 = -a00;
        a10 = -a10;
        a01 = -a01;
    }
    ContourMoments{m00: a00 / 2.0, m10: a10 / 6.0, m01: a01 / 6.0}
}
