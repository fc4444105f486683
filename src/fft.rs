//! 2-D FFT oracle: row-then-column decomposition of 1-D transforms from
//! `realfft` (real-to-complex) and `rustfft` (complex-to-complex).
//!
//! All transforms here are **unscaled**, matching `rustfft`'s own
//! convention: a forward transform followed by its inverse multiplies the
//! input by `nx * ny`, not the identity. Callers that need a normalized
//! round trip divide by that factor themselves.

use crate::array2::Array2;
use crate::error::{Result, SmipError};
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub use rustfft::FftDirection;

/// Double-precision complex sample, used throughout the frequency-domain
/// stages of the reconstruction pipeline.
pub type Complex64 = Complex<f64>;

/// A reusable pair of FFT plans bound to one fixed frame size `(nx, ny)`.
///
/// Constructing a `Fft2D` amortizes planner setup; a single instance is
/// meant to be reused across every frame of a video sequence.
pub struct Fft2D {
    nx: usize,
    ny: usize,
    r2c: Arc<dyn RealToComplex<f64>>,
    c2r: Arc<dyn ComplexToReal<f64>>,
    row_fwd: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_fwd: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
    r2c_scratch: Vec<Complex64>,
    c2r_scratch: Vec<Complex64>,
}

impl Fft2D {
    /// Plans every transform needed for `nx`-by-`ny` frames. Both `nx` and
    /// `ny` must be positive.
    pub fn new(nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(SmipError::Domain(format!(
                "Fft2D requires nonzero dimensions, got {nx}x{ny}"
            )));
        }
        let mut real_planner = RealFftPlanner::<f64>::new();
        let r2c = real_planner.plan_fft_forward(nx);
        let c2r = real_planner.plan_fft_inverse(nx);
        let r2c_scratch = r2c.make_scratch_vec();
        let c2r_scratch = c2r.make_scratch_vec();

        let mut complex_planner = FftPlanner::<f64>::new();
        let row_fwd = complex_planner.plan_fft_forward(nx);
        let row_inv = complex_planner.plan_fft_inverse(nx);
        let col_fwd = complex_planner.plan_fft_forward(ny);
        let col_inv = complex_planner.plan_fft_inverse(ny);

        Ok(Fft2D {
            nx,
            ny,
            r2c,
            c2r,
            row_fwd,
            row_inv,
            col_fwd,
            col_inv,
            r2c_scratch,
            c2r_scratch,
        })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Width of the half-spectrum produced by [`Self::r2c_2d`]: `nx/2 + 1`.
    pub fn half_nx(&self) -> usize {
        self.nx / 2 + 1
    }

    fn check_shape<T>(&self, a: &Array2<'_, T>, expect_x: usize, expect_y: usize) -> Result<()> {
        if a.xsize() != expect_x || a.ysize() != expect_y {
            return Err(SmipError::DimensionMismatch(format!(
                "expected {expect_x}x{expect_y}, got {}x{}",
                a.xsize(),
                a.ysize()
            )));
        }
        Ok(())
    }

    /// Real-to-complex forward transform: rows via `realfft`, then columns
    /// of the resulting half-spectrum via `rustfft`. Output is `(nx/2+1,
    /// ny)`.
    pub fn r2c_2d(&mut self, input: &Array2<'_, f64>) -> Result<Array2<'static, Complex64>> {
        self.check_shape(input, self.nx, self.ny)?;
        let half = self.half_nx();
        let mut freq = Array2::new_with(half, self.ny, Complex64::new(0.0, 0.0));

        let mut row = vec![0.0f64; self.nx];
        let mut row_out = vec![Complex64::new(0.0, 0.0); half];
        for y in 0..self.ny {
            for x in 0..self.nx {
                row[x] = *input.get(x, y)?;
            }
            self.r2c
                .process_with_scratch(&mut row, &mut row_out, &mut self.r2c_scratch)
                .map_err(|e| SmipError::Domain(format!("r2c row {y} failed: {e}")))?;
            for x in 0..half {
                *freq.get_mut(x, y)? = row_out[x];
            }
        }

        let mut col = vec![Complex64::new(0.0, 0.0); self.ny];
        for x in 0..half {
            for y in 0..self.ny {
                col[y] = *freq.get(x, y)?;
            }
            self.col_fwd.process(&mut col);
            for y in 0..self.ny {
                *freq.get_mut(x, y)? = col[y];
            }
        }
        Ok(freq)
    }

    /// Inverse of [`Self::r2c_2d`]: columns inverse-transformed first, then
    /// rows via `realfft`'s complex-to-real. Unscaled — the result is
    /// `nx * ny` times the original real frame.
    pub fn c2r_2d(&mut self, freq: &Array2<'_, Complex64>) -> Result<Array2<'static, f64>> {
        let half = self.half_nx();
        self.check_shape(freq, half, self.ny)?;
        let mut work = freq.clone();

        let mut col = vec![Complex64::new(0.0, 0.0); self.ny];
        for x in 0..half {
            for y in 0..self.ny {
                col[y] = *work.get(x, y)?;
            }
            self.col_inv.process(&mut col);
            for y in 0..self.ny {
                *work.get_mut(x, y)? = col[y];
            }
        }

        let mut out = Array2::new(self.nx, self.ny);
        let mut row = vec![Complex64::new(0.0, 0.0); half];
        let mut row_out = vec![0.0f64; self.nx];
        for y in 0..self.ny {
            for x in 0..half {
                row[x] = *work.get(x, y)?;
            }
            self.c2r
                .process_with_scratch(&mut row, &mut row_out, &mut self.c2r_scratch)
                .map_err(|e| SmipError::Domain(format!("c2r row {y} failed: {e}")))?;
            for x in 0..self.nx {
                *out.get_mut(x, y)? = row_out[x];
            }
        }
        Ok(out)
    }

    /// Full complex-to-complex 2-D transform, rows then columns, in the
    /// given `direction`. Unscaled in both directions.
    pub fn c2c_2d(
        &mut self,
        input: &Array2<'_, Complex64>,
        direction: FftDirection,
    ) -> Result<Array2<'static, Complex64>> {
        self.check_shape(input, self.nx, self.ny)?;
        let mut work = input.clone();
        let row_fft: &Arc<dyn Fft<f64>> = match direction {
            FftDirection::Forward => &self.row_fwd,
            FftDirection::Inverse => &self.row_inv,
        };
        let col_fft: &Arc<dyn Fft<f64>> = match direction {
            FftDirection::Forward => &self.col_fwd,
            FftDirection::Inverse => &self.col_inv,
        };

        let mut row = vec![Complex64::new(0.0, 0.0); self.nx];
        for y in 0..self.ny {
            for x in 0..self.nx {
                row[x] = *work.get(x, y)?;
            }
            row_fft.process(&mut row);
            for x in 0..self.nx {
                *work.get_mut(x, y)? = row[x];
            }
        }

        let mut col = vec![Complex64::new(0.0, 0.0); self.ny];
        for x in 0..self.nx {
            for y in 0..self.ny {
                col[y] = *work.get(x, y)?;
            }
            col_fft.process(&mut col);
            for y in 0..self.ny {
                *work.get_mut(x, y)? = col[y];
            }
        }
        Ok(work)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r2c_of_constant_frame_is_dc_spike() {
        let mut fft = Fft2D::new(8, 4).unwrap();
        let input = Array2::new_with(8, 4, 2.0f64);
        let freq = fft.r2c_2d(&input).unwrap();
        let dc = freq.get(0, 0).unwrap();
        assert!((dc.re - 2.0 * 8.0 * 4.0).abs() < 1e-9);
        for y in 0..4 {
            for x in 0..freq.xsize() {
                if (x, y) != (0, 0) {
                    let v = freq.get(x, y).unwrap();
                    assert!(v.norm() < 1e-9, "unexpected energy at ({x},{y}): {v}");
                }
            }
        }
    }

    #[test]
    fn r2c_then_c2r_round_trips_up_to_scale() {
        let mut fft = Fft2D::new(6, 5).unwrap();
        let mut input = Array2::new(6, 5);
        let mut seed = 1u64;
        for v in input.iter_mut() {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            *v = ((seed >> 16) % 1000) as f64 / 37.0;
        }
        let freq = fft.r2c_2d(&input).unwrap();
        let back = fft.c2r_2d(&freq).unwrap();
        let scale = (6 * 5) as f64;
        for y in 0..5 {
            for x in 0..6 {
                let expected = input.get(x, y).unwrap() * scale;
                let got = back.get(x, y).unwrap();
                assert!((got - expected).abs() < 1e-6, "mismatch at ({x},{y})");
            }
        }
    }

    #[test]
    fn c2c_forward_then_inverse_round_trips_up_to_scale() {
        let mut fft = Fft2D::new(5, 7).unwrap();
        let mut input = Array2::new_with(5, 7, Complex64::new(0.0, 0.0));
        for (i, v) in input.iter_mut().enumerate() {
            *v = Complex64::new(i as f64, -(i as f64) * 0.5);
        }
        let freq = fft.c2c_2d(&input, FftDirection::Forward).unwrap();
        let back = fft.c2c_2d(&freq, FftDirection::Inverse).unwrap();
        let scale = (5 * 7) as f64;
        for y in 0..7 {
            for x in 0..5 {
                let expected = input.get(x, y).unwrap() * scale;
                let got = back.get(x, y).unwrap();
                assert!((got - expected).norm() < 1e-6, "mismatch at ({x},{y})");
            }
        }
    }
}
