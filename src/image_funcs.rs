// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::Path;

use image::{GrayImage, ImageReader, Luma};
use log::debug;

use crate::error::{Error, Result};

/// Reads the image at `path` and converts it to 8-bit grayscale. Color images
/// are reduced to luma.
pub fn load_grayscale(path: &Path) -> Result<GrayImage> {
    let reader = ImageReader::open(path).map_err(|e| Error::io(path, e))?;
    let img = reader.decode().map_err(|e| Error::Decode{path: path.to_path_buf(),
                                                         source: e})?;
    let img_u8 = img.into_luma8();
    let (width, height) = img_u8.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage{width, height});
    }
    debug!("Loaded {:?} WxH {}x{}", path, width, height);
    Ok(img_u8)
}

/// Renders a Gaussian spot.
///
/// `x0`, `y0` Spot center relative to the image center; y increases upward.
/// `std` Spot width expressed as a standard deviation, in pixels.
///
/// Pixel values are `255 * exp(-r^2 / (2 std^2))`, truncated. If any
/// parameter is missing, or `std` is not positive, the image is black.
///
/// The spot is written as 8-bit luma peaking at 255. It is not a color image
/// with the spot in one channel, so its PNG differs from fixtures rendered
/// that way (whose grayscale peak is about 150).
pub fn gaussian_spot(x0: Option<f64>, y0: Option<f64>, std: Option<f64>,
                     width: u32, height: u32) -> GrayImage {
    let mut image = GrayImage::new(width, height);
    let (Some(x0), Some(y0), Some(std)) = (x0, y0, std) else {
        return image;
    };
    if !(std > 0.0) {
        return image;
    }
    let center_x = x0 + (width / 2) as f64;
    let center_y = y0 + (height / 2) as f64;
    let two_var = 2.0 * std * std;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f64 - center_x;
        // Rows run downward, so flip to get an upward y axis.
        let dy = (height - y) as f64 - center_y;
        let g = (-(dx * dx + dy * dy) / two_var).exp();
        *pixel = Luma([(g * 255.0) as u8]);
    }
    image
}

/// Intensity sums along each image axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projections {
    /// Sum of each column. Size is the image width.
    pub x: Vec<u64>,
    /// Sum of each row. Size is the image height.
    pub y: Vec<u64>,
}

pub fn projections(image: &GrayImage) -> Projections {
    let (width, height) = image.dimensions();
    let mut x = vec![0_u64; width as usize];
    let mut y = vec![0_u64; height as usize];
    for (col, row, pixel) in image.enumerate_pixels() {
        let value = pixel.0[0] as u64;
        x[col as usize] += value;
        y[row as usize] += value;
    }
    Projections{x, y}
}
