//! 4-D symmetry-folded bispectrum accumulator.
//!
//! A real-valued image's bispectrum `B(i,j,k,l) = F(i,j)·F(k,l)·conj(F(i+k,j+l))`
//! obeys the Hermitian symmetry `B(i,j,k,l) = conj(B(-i,-j,-k,-l))` and the
//! triple-product swap symmetry `B(i,j,k,l) = B(k,l,i,j)`. Together these
//! fold the logical 4-D domain down to a single "fundamental wedge" of
//! roughly a quarter of its volume, which is all this type stores.

use crate::array2::Array2;
use crate::error::{Result, SmipError};
use rustfft::num_complex::Complex;
use std::io::{Read, Write};
use std::path::Path;

/// Storage element type: 32-bit complex, halving memory relative to the
/// `f64` frames the bispectrum is accumulated from.
pub type Complex32 = Complex<f32>;
/// Frame element type fed into [`Bispectrum::accumulate_from_fft`].
pub type Complex64 = Complex<f64>;

/// Four-dimensional signed index `(i, j, k, l)`.
pub type Index4 = (i64, i64, i64, i64);

/// A 4-D complex bispectrum accumulator, storing only the fundamental
/// wedge of orbit representatives under the Hermitian/swap symmetry.
pub struct Bispectrum {
    dims: [usize; 4], // (Nx, Ny, Dz, Dw) as supplied at construction
    data: Vec<Complex32>,
}

impl Bispectrum {
    /// Allocates a zero-filled bispectrum for frame size `(nx, ny)` and
    /// third/fourth-axis interaction depth `(dz, dw)`.
    pub fn new(nx: usize, ny: usize, dz: usize, dw: usize) -> Self {
        let dims = [nx, ny, dz, dw];
        let base = Self::base_sizes_of(dims);
        let base_size = base[0] * base[1] * base[2] * base[3];
        Bispectrum {
            dims,
            data: vec![Complex32::new(0.0, 0.0); base_size],
        }
    }

    fn full_size(n: usize) -> usize {
        2 * (n / 2) + 1
    }

    /// True per-axis sizes `(Sx, Sy, Sz, Sw)`: `2*floor(dim/2)+1`.
    pub fn sizes(&self) -> [usize; 4] {
        [
            Self::full_size(self.dims[0]),
            Self::full_size(self.dims[1]),
            Self::full_size(self.dims[2]),
            Self::full_size(self.dims[3]),
        ]
    }

    fn base_sizes_of(dims: [usize; 4]) -> [usize; 4] {
        let sx = Self::full_size(dims[0]);
        let sy = Self::full_size(dims[1]);
        let sz = Self::full_size(dims[2]);
        let sw = Self::full_size(dims[3]);
        [sx.div_ceil(2), sy, sz.div_ceil(2), sw]
    }

    /// Storage sizes of the fundamental wedge `(Bx, By, Bz, Bw)`.
    pub fn base_sizes(&self) -> [usize; 4] {
        Self::base_sizes_of(self.dims)
    }

    /// Total number of complex samples physically stored.
    pub fn base_size(&self) -> usize {
        self.data.len()
    }

    /// Lower bound of the logical signed index range on each axis.
    pub fn min_indices(&self) -> [i64; 4] {
        let sizes = self.sizes();
        [
            -((sizes[0] / 2) as i64),
            -((sizes[1] / 2) as i64),
            -((sizes[2] / 2) as i64),
            -((sizes[3] / 2) as i64),
        ]
    }

    /// Upper bound of the logical signed index range on each axis.
    pub fn max_indices(&self) -> [i64; 4] {
        let min = self.min_indices();
        let sizes = self.sizes();
        [
            min[0] + sizes[0] as i64 - 1,
            min[1] + sizes[1] as i64 - 1,
            min[2] + sizes[2] as i64 - 1,
            min[3] + sizes[3] as i64 - 1,
        ]
    }

    /// Flat offset of the canonical wedge coordinate `(i, j, k, l)` with
    /// `i <= 0` and `k <= 0` (the caller must already have canonicalized).
    fn calc_offset(&self, i: i64, j: i64, k: i64, l: i64) -> usize {
        let sizes = self.sizes();
        let base = self.base_sizes();
        let ii = (-i) as usize;
        let jj = if j < 0 { (j + sizes[1] as i64) as usize } else { j as usize };
        let kk = (-k) as usize;
        let ll = if l < 0 { (l + sizes[3] as i64) as usize } else { l as usize };
        ((ii * base[1] + jj) * base[2] + kk) * base[3] + ll
    }

    /// Inverse of [`Self::calc_offset`]: recovers the canonical `(i,j,k,l)`
    /// (with `i <= 0`, `k <= 0`) stored at flat offset `addr`.
    pub fn calc_indices(&self, addr: usize) -> Index4 {
        let sizes = self.sizes();
        let base = self.base_sizes();
        let t0 = base[1] * base[2] * base[3];
        let ii = addr / t0;
        let rest = addr % t0;
        let t1 = base[2] * base[3];
        let jj = rest / t1;
        let rest = rest % t1;
        let kk = rest / base[3];
        let ll = rest % base[3];

        let unwrap = |v: usize, size: usize| -> i64 {
            let m = (size / 2) as i64;
            if v as i64 > m { v as i64 - size as i64 } else { v as i64 }
        };
        (-(ii as i64), unwrap(jj, sizes[1]), -(kk as i64), unwrap(ll, sizes[3]))
    }

    /// Canonicalizes an arbitrary in-range query `(i,j,k,l)` to a wedge
    /// coordinate `(ux,uy,vx,vy)` plus a flag saying whether the stored
    /// value must be conjugated to answer the query.
    fn canonicalize(&self, indices: Index4) -> Result<(Index4, bool)> {
        let (mut i, mut j, mut k, mut l) = indices;
        let max = self.max_indices();

        if k.abs() > max[2] || l.abs() > max[3] {
            std::mem::swap(&mut i, &mut k);
            std::mem::swap(&mut j, &mut l);
        }
        if k.abs() > max[2] || l.abs() > max[3] {
            return Err(SmipError::Bounds(format!(
                "bispectrum index {indices:?} out of range"
            )));
        }

        let (mut uv, conj) = if i <= 0 && k <= 0 {
            // T1
            ((i, j, k, l), false)
        } else if i > 0 && k > 0 {
            // T7
            ((-i, -j, -k, -l), true)
        } else if i > 0 && k <= 0 {
            if i + k > 0 {
                // T6
                ((-i - k, -j - l, k, l), false)
            } else {
                // T9
                ((-i, -j, k + i, l + j), true)
            }
        } else if i <= 0 && k > 0 {
            if i + k > 0 {
                // T3
                ((i, j, -i - k, -j - l), false)
            } else {
                // T12
                ((k + i, l + j, -k, -l), true)
            }
        } else {
            return Err(SmipError::Bounds(format!(
                "bispectrum index {indices:?} unaccounted for by canonicalization"
            )));
        };

        if uv.2.abs() > max[2] || uv.3.abs() > max[3] {
            uv = (uv.2, uv.3, uv.0, uv.1);
        }
        Ok((uv, conj))
    }

    /// Returns `B(i,j,k,l)`, honoring the Hermitian/swap symmetry.
    pub fn get(&self, indices: Index4) -> Result<Complex32> {
        let ((ux, uy, vx, vy), conj) = self.canonicalize(indices)?;
        let addr = self.calc_offset(ux, uy, vx, vy);
        if addr >= self.data.len() {
            return Err(SmipError::Bounds(format!(
                "bispectrum offset {addr} out of range for {indices:?}"
            )));
        }
        Ok(if conj { self.data[addr].conj() } else { self.data[addr] })
    }

    /// Writes a wedge-representative element directly (no canonicalization
    /// or conjugation — `indices` must already be a wedge coordinate).
    fn put_wedge(&mut self, indices: Index4, value: Complex32) {
        let addr = self.calc_offset(indices.0, indices.1, indices.2, indices.3);
        self.data[addr] = value;
    }

    fn check_same_dims(&self, other: &Bispectrum) -> Result<()> {
        if self.dims != other.dims {
            return Err(SmipError::DimensionMismatch(format!(
                "{:?} vs {:?}",
                self.dims, other.dims
            )));
        }
        Ok(())
    }

    pub fn add_assign(&mut self, other: &Bispectrum) -> Result<()> {
        self.check_same_dims(other)?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        Ok(())
    }

    pub fn sub_assign(&mut self, other: &Bispectrum) -> Result<()> {
        self.check_same_dims(other)?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a -= b;
        }
        Ok(())
    }

    pub fn mul_assign(&mut self, other: &Bispectrum) -> Result<()> {
        self.check_same_dims(other)?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a *= b;
        }
        Ok(())
    }

    pub fn div_assign(&mut self, other: &Bispectrum) -> Result<()> {
        self.check_same_dims(other)?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a /= b;
        }
        Ok(())
    }

    pub fn scale(&mut self, factor: Complex32) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    pub fn scale_inv(&mut self, divisor: Complex32) {
        for v in &mut self.data {
            *v /= divisor;
        }
    }

    /// Accumulates the triple product `F(i,j)·F(k,l)·conj(F(i+k,j+l))` over
    /// the first-orthant slice (`i <= 0, k <= 0`) of the wedge, for one FFT
    /// frame `F`.
    pub fn accumulate_from_fft(&mut self, frame: &Array2<'_, Complex64>) -> Result<()> {
        let (fmin_x, fmin_y) = frame.min_sidx();
        let (fmax_x, fmax_y) = frame.max_sidx();
        let bmin = self.min_indices();
        let bmax = self.max_indices();

        let min1 = fmin_x.max(bmin[0]);
        let min2 = fmin_y.max(bmin[1]);
        let min3 = fmin_x.max(bmin[2]);
        let min4 = fmin_y.max(bmin[3]);
        let max1 = fmax_x.min(bmax[0]);
        let max2 = fmax_y.min(bmax[1]);
        let max4 = fmax_y.min(bmax[3]);

        for i in min1..=0 {
            for j in min2..=max2 {
                for k in min3..=0 {
                    for l in min4..=max4 {
                        let (si, sj) = (i + k, j + l);
                        if si < min1 || sj < min2 || si > max1 || sj > max2 {
                            continue;
                        }
                        let fij = *frame.get_signed(i, j)?;
                        let fkl = *frame.get_signed(k, l)?;
                        let fsum = *frame.get_signed(si, sj)?;
                        let t64 = fij * fkl * fsum.conj();
                        let t = Complex32::new(t64.re as f32, t64.im as f32);
                        let ((ux, uy, vx, vy), conj) = self.canonicalize((i, j, k, l))?;
                        let addr = self.calc_offset(ux, uy, vx, vy);
                        let contrib = if conj { t.conj() } else { t };
                        self.data[addr] += contrib;
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes the binary dump: `u64 base_size`, four `u64` dim sizes, then
    /// `base_size` complex samples in native byte order.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut f = std::fs::File::create(path)?;
        f.write_all(&(self.data.len() as u64).to_ne_bytes())?;
        for d in self.dims {
            f.write_all(&(d as u64).to_ne_bytes())?;
        }
        for c in &self.data {
            f.write_all(&c.re.to_ne_bytes())?;
            f.write_all(&c.im.to_ne_bytes())?;
        }
        Ok(())
    }

    /// Reads a binary dump written by [`Self::write_to_file`], validating
    /// `base_size == product(dim sizes)` before allocating.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut f = std::fs::File::open(path)?;
        let mut u64buf = [0u8; 8];

        f.read_exact(&mut u64buf)?;
        let base_size = u64::from_ne_bytes(u64buf) as usize;

        let mut dims_u64 = [0u64; 4];
        for d in &mut dims_u64 {
            f.read_exact(&mut u64buf)?;
            *d = u64::from_ne_bytes(u64buf);
        }
        let dims = [
            dims_u64[0] as usize,
            dims_u64[1] as usize,
            dims_u64[2] as usize,
            dims_u64[3] as usize,
        ];
        let expected = Self::base_sizes_of(dims);
        let expected_size = expected[0] * expected[1] * expected[2] * expected[3];
        if base_size != expected_size {
            return Err(SmipError::Io(std::io::Error::other(format!(
                "bispectrum dump declares base_size={base_size} but dims {dims:?} imply {expected_size}"
            ))));
        }

        let mut data = Vec::with_capacity(base_size);
        let mut f32buf = [0u8; 4];
        for _ in 0..base_size {
            f.read_exact(&mut f32buf)?;
            let re = f32::from_ne_bytes(f32buf);
            f.read_exact(&mut f32buf)?;
            let im = f32::from_ne_bytes(f32buf);
            data.push(Complex32::new(re, im));
        }
        if data.len() != base_size {
            return Err(SmipError::Io(std::io::Error::other(
                "bispectrum dump truncated before base_size samples were read",
            )));
        }
        Ok(Bispectrum { dims, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bispectrum() -> Bispectrum {
        Bispectrum::new(4, 4, 4, 4)
    }

    #[test]
    fn symmetry_hermitian_and_swap() {
        let mut b = test_bispectrum();
        let ((ux, uy, vx, vy), conj) = b.canonicalize((-1, 2, -1, 1)).unwrap();
        assert!(!conj);
        b.put_wedge((ux, uy, vx, vy), Complex32::new(1.0, 2.0));

        let got = b.get((1, -2, 1, -1)).unwrap();
        assert!((got.re - 1.0).abs() < 1e-6);
        assert!((got.im - (-2.0)).abs() < 1e-6);

        let swapped = b.get((-1, 1, -1, 2)).unwrap();
        let direct = b.get((-1, 2, -1, 1)).unwrap();
        assert!((swapped.re - direct.re).abs() < 1e-6);
        assert!((swapped.im - direct.im).abs() < 1e-6);
    }

    #[test]
    fn canonical_t7_case() {
        let mut b = test_bispectrum();
        let ((ux, uy, vx, vy), conj) = b.canonicalize((-1, 0, -2, 0)).unwrap();
        assert!(!conj);
        b.put_wedge((ux, uy, vx, vy), Complex32::new(3.0, -1.0));

        let got = b.get((1, 0, 2, 0)).unwrap();
        assert!((got.re - 3.0).abs() < 1e-6);
        assert!((got.im - 1.0).abs() < 1e-6);
    }

    #[test]
    fn offset_bijection_over_wedge() {
        let b = test_bispectrum();
        for addr in 0..b.base_size() {
            let (i, j, k, l) = b.calc_indices(addr);
            assert!(i <= 0 && k <= 0);
            let back = b.calc_offset(i, j, k, l);
            assert_eq!(back, addr, "calc_offset(calc_indices({addr})) != {addr}");
        }
    }

    #[test]
    fn accumulation_linearity() {
        let mut f1 = Array2::<Complex64>::new_with(4, 4, Complex64::new(0.0, 0.0));
        let mut f2 = Array2::<Complex64>::new_with(4, 4, Complex64::new(0.0, 0.0));
        for y in 0..4i64 {
            for x in 0..4i64 {
                let (sx, sy) = (x - 2, y - 2);
                f1.set_signed(sx, sy, Complex64::new((sx + 1) as f64, (sy - 1) as f64))
                    .unwrap();
                f2.set_signed(sx, sy, Complex64::new((sx - 2) as f64, (sy + 3) as f64))
                    .unwrap();
            }
        }

        let mut separate = Bispectrum::new(4, 4, 4, 4);
        separate.accumulate_from_fft(&f1).unwrap();
        separate.accumulate_from_fft(&f2).unwrap();
        separate.scale_inv(Complex32::new(2.0, 0.0));

        let mut once1 = Bispectrum::new(4, 4, 4, 4);
        once1.accumulate_from_fft(&f1).unwrap();
        let mut once2 = Bispectrum::new(4, 4, 4, 4);
        once2.accumulate_from_fft(&f2).unwrap();
        once1.add_assign(&once2).unwrap();
        once1.scale_inv(Complex32::new(2.0, 0.0));

        for addr in 0..separate.base_size() {
            let a = separate.data[addr];
            let b = once1.data[addr];
            assert!((a - b).norm() < 1e-4, "mismatch at {addr}: {a} vs {b}");
        }
    }

    #[test]
    fn dump_round_trip() {
        let mut b = Bispectrum::new(6, 6, 4, 4);
        for (idx, v) in b.data.iter_mut().enumerate() {
            *v = Complex32::new(idx as f32 * 0.5, -(idx as f32));
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bispectrum.dat");
        b.write_to_file(&path).unwrap();
        let read_back = Bispectrum::read_from_file(&path).unwrap();
        assert_eq!(read_back.dims, b.dims);
        assert_eq!(read_back.data, b.data);
    }
}
