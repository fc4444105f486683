//! Separable generalized-Hamming apodization windows.

use crate::array2::Array2;
use crate::error::{Result, SmipError};
use std::f64::consts::PI;

/// A separable `(alpha + (1-alpha)*cos(2*pi*i/aperture))` window evaluated
/// over a signed-centered grid of size `(xsize, ysize)`.
///
/// `aperture` sets the cosine's period independently of the grid size
/// (the original C++ exposed it as a separate template parameter); most
/// callers pass `aperture == xsize.max(ysize)`.
pub fn general_hamming(xsize: usize, ysize: usize, aperture: usize, alpha: f64) -> Result<Array2<'static, f64>> {
    if aperture == 0 {
        return Err(SmipError::Domain(
            "window aperture must be positive".to_string(),
        ));
    }
    let mut out = Array2::new(xsize, ysize);
    let trigarg = 2.0 * PI / aperture as f64;
    let c1 = alpha;
    let c2 = 1.0 - alpha;

    let (min_x, min_y) = out.min_sidx();
    let (max_x, max_y) = out.max_sidx();
    for j in min_y..=max_y {
        let wy = c1 + c2 * (trigarg * j as f64).cos();
        for i in min_x..=max_x {
            let wx = c1 + c2 * (trigarg * i as f64).cos();
            out.set_signed(i, j, wx * wy)?;
        }
    }
    Ok(out)
}

/// Hann window: `general_hamming` with `alpha = 0.5`.
pub fn hann(xsize: usize, ysize: usize, aperture: usize) -> Result<Array2<'static, f64>> {
    general_hamming(xsize, ysize, aperture, 0.5)
}

/// Hamming window: `general_hamming` with `alpha = 0.54`.
pub fn hamming(xsize: usize, ysize: usize, aperture: usize) -> Result<Array2<'static, f64>> {
    general_hamming(xsize, ysize, aperture, 0.54)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_peaks_at_dc() {
        let w = hann(8, 8, 8).unwrap();
        let dc = w.get_signed(0, 0).unwrap();
        for y in w.min_sidx().1..=w.max_sidx().1 {
            for x in w.min_sidx().0..=w.max_sidx().0 {
                assert!(*w.get_signed(x, y).unwrap() <= *dc + 1e-12);
            }
        }
    }

    #[test]
    fn zero_aperture_is_domain_error() {
        assert!(matches!(hann(4, 4, 0), Err(SmipError::Domain(_))));
    }

    #[test]
    fn window_is_separable_product() {
        let w = general_hamming(6, 6, 6, 0.5).unwrap();
        let wx1 = *w.get_signed(1, 0).unwrap();
        let wy1 = *w.get_signed(0, 1).unwrap();
        let w11 = *w.get_signed(1, 1).unwrap();
        let dc = *w.get_signed(0, 0).unwrap();
        assert!((w11 - (wx1 * wy1 / dc)).abs() < 1e-9);
    }
}
