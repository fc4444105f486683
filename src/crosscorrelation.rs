//! FFT-based cross-correlation for frame-to-frame registration.

use crate::array2::Array2;
use crate::error::{Result, SmipError};
use crate::fft::Fft2D;

/// How far the correlation/displacement computation has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Readiness {
    None,
    Correlated,
    ShiftComputed,
}

/// Registers frames against a fixed reference via FFT cross-correlation.
///
/// Built once per reference frame and reused across every subsequent
/// frame: `correlate` is the expensive step (two forward FFTs plus one
/// inverse), `displacement` is a cheap argmax over the cached result.
pub struct CrossCorrelation {
    fft: Fft2D,
    correlation: Array2<'static, f64>,
    shift: (i64, i64),
    readiness: Readiness,
}

impl CrossCorrelation {
    /// Builds a correlator bound to `reference`'s shape. `reference` is
    /// re-transformed on every `correlate` call (matching the original's
    /// choice to keep the reference frame re-usable across many `correlate`
    /// calls rather than caching its spectrum).
    pub fn new(reference: &Array2<'_, f64>) -> Result<Self> {
        let fft = Fft2D::new(reference.xsize(), reference.ysize())?;
        Ok(CrossCorrelation {
            fft,
            correlation: Array2::new(reference.xsize(), reference.ysize()),
            shift: (0, 0),
            readiness: Readiness::None,
        })
    }

    /// Computes `conj(FFT(reference)) * FFT(frame)` and its inverse
    /// transform, caching the (unscaled) result as the correlation array.
    pub fn correlate(&mut self, reference: &Array2<'_, f64>, frame: &Array2<'_, f64>) -> Result<()> {
        if (frame.xsize(), frame.ysize()) != (reference.xsize(), reference.ysize()) {
            return Err(SmipError::DimensionMismatch(
                "cross-correlation frame must match the reference shape".to_string(),
            ));
        }
        let fft_ref = self.fft.r2c_2d(reference)?;
        let fft_frame = self.fft.r2c_2d(frame)?;

        let mut product = fft_ref;
        for (p, f) in product.iter_mut().zip(fft_frame.iter()) {
            *p = p.conj() * f;
        }
        self.correlation = self.fft.c2r_2d(&product)?;
        self.readiness = Readiness::Correlated;
        Ok(())
    }

    /// The cached correlation array. Errors with `InvalidState` if
    /// `correlate` has not yet run.
    pub fn correlation_array(&self) -> Result<&Array2<'static, f64>> {
        if self.readiness < Readiness::Correlated {
            return Err(SmipError::InvalidState(
                "no correlation array available; call correlate() first".to_string(),
            ));
        }
        Ok(&self.correlation)
    }

    /// The `(dx, dy)` displacement of `frame` relative to `reference`: the
    /// argmax of the correlation array, unwrapped from unsigned row-major
    /// position into a signed half-range shift.
    pub fn displacement(&mut self) -> Result<(i64, i64)> {
        if self.readiness < Readiness::Correlated {
            return Err(SmipError::InvalidState(
                "no correlation array available; call correlate() first".to_string(),
            ));
        }
        if self.readiness == Readiness::Correlated {
            self.calculate_displacement();
        }
        Ok(self.shift)
    }

    fn calculate_displacement(&mut self) {
        let xsize = self.correlation.xsize();
        let ysize = self.correlation.ysize();
        let (mut best_idx, mut best_val) = (0usize, f64::NEG_INFINITY);
        for (idx, &v) in self.correlation.iter().enumerate() {
            if v > best_val {
                best_val = v;
                best_idx = idx;
            }
        }
        let mut x = (best_idx % xsize) as i64;
        let mut y = (best_idx / xsize) as i64;
        if x >= ((xsize as i64 + 1) / 2) {
            x -= xsize as i64;
        }
        if y >= ((ysize as i64 + 1) / 2) {
            y -= ysize as i64;
        }
        self.shift = (x, y);
        self.readiness = Readiness::ShiftComputed;
    }

    /// One-shot convenience: `correlate` then `displacement`.
    pub fn get_displacement(reference: &Array2<'_, f64>, frame: &Array2<'_, f64>) -> Result<(i64, i64)> {
        let mut cc = CrossCorrelation::new(reference)?;
        cc.correlate(reference, frame)?;
        cc.displacement()
    }
}
