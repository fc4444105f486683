//! PNG output for the pipeline's visual products: the averaged power
//! spectrum, the reconstructed modulus/phase, and the final speckle-masked
//! image, each either as grayscale or through a false-color lookup table.

use crate::array2::Array2;
use crate::error::{Result, SmipError};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;

fn min_max(data: &Array2<'_, f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in data.iter() {
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
    }
    if !(hi > lo) {
        (lo, lo + 1.0)
    } else {
        (lo, hi)
    }
}

fn normalize(v: f64, lo: f64, hi: f64) -> f64 {
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Writes `data` as an 8-bit grayscale PNG, linearly stretching its value
/// range to `[0, 255]`.
pub fn write_grayscale_png(path: impl AsRef<Path>, data: &Array2<'_, f64>) -> Result<()> {
    let (lo, hi) = min_max(data);
    let mut img = GrayImage::new(data.xsize() as u32, data.ysize() as u32);
    for y in 0..data.ysize() {
        for x in 0..data.xsize() {
            let v = normalize(*data.get(x, y)?, lo, hi);
            img.put_pixel(x as u32, y as u32, Luma([(v * 255.0).round() as u8]));
        }
    }
    img.save(path)
        .map_err(|e| SmipError::Io(std::io::Error::other(format!("png write: {e}"))))
}

/// A piecewise-linear false-color lookup table over `[0, 1]`, sampled at
/// evenly spaced control points.
pub struct ColorLut {
    stops: Vec<(f64, [u8; 3])>,
}

impl ColorLut {
    /// The blue-cyan-yellow-red heatmap with breakpoints at 0.25/0.5/0.75;
    /// values above the last breakpoint clamp to red.
    pub fn heatmap() -> Self {
        ColorLut {
            stops: vec![
                (0.00, [0, 0, 255]),
                (0.25, [0, 255, 255]),
                (0.50, [255, 255, 0]),
                (0.75, [255, 0, 0]),
            ],
        }
    }

    fn sample(&self, t: f64) -> [u8; 3] {
        let t = t.clamp(0.0, 1.0);
        for window in self.stops.windows(2) {
            let (t0, c0) = window[0];
            let (t1, c1) = window[1];
            if t <= t1 {
                let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                let mut out = [0u8; 3];
                for k in 0..3 {
                    out[k] = (c0[k] as f64 + f * (c1[k] as f64 - c0[k] as f64)).round() as u8;
                }
                return out;
            }
        }
        self.stops.last().unwrap().1
    }
}

/// Writes `data` as a false-color PNG through `lut`, linearly stretching
/// its value range to `[0, 1]` first.
pub fn write_false_color_png(path: impl AsRef<Path>, data: &Array2<'_, f64>, lut: &ColorLut) -> Result<()> {
    let (lo, hi) = min_max(data);
    let mut img: RgbImage = RgbImage::new(data.xsize() as u32, data.ysize() as u32);
    for y in 0..data.ysize() {
        for x in 0..data.xsize() {
            let v = normalize(*data.get(x, y)?, lo, hi);
            img.put_pixel(x as u32, y as u32, Rgb(lut.sample(v)));
        }
    }
    img.save(path)
        .map_err(|e| SmipError::Io(std::io::Error::other(format!("png write: {e}"))))
}
