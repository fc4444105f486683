//! A 2-D contiguous numeric grid with unsigned and signed-centered
//! addressing, used throughout the reconstruction pipeline for frames,
//! power spectra, phase maps and windows.

use crate::error::{Result, SmipError};

/// Backing storage for an [`Array2`]: either an owned buffer, or a
/// mutable view into a buffer owned elsewhere. Only an owned array may be
/// resized or reassigned wholesale; a borrowed view may still have its
/// elements mutated in place.
enum Storage<'a, T> {
    Owned(Vec<T>),
    Borrowed(&'a mut [T]),
}

impl<T> Storage<'_, T> {
    fn as_slice(&self) -> &[T] {
        match self {
            Storage::Owned(v) => v,
            Storage::Borrowed(s) => s,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Storage::Owned(v) => v,
            Storage::Borrowed(s) => s,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self, Storage::Owned(_))
    }
}

/// A row-major 2-D array with unit x-stride and y-stride `nx`.
///
/// `(0, 0)` is the top-left element under unsigned addressing. Under
/// signed-centered addressing, `(0, 0)` denotes the DC term: the valid
/// range along each axis is `[-floor(n/2), -floor(n/2) + n - 1]`, and
/// negative coordinates alias to unsigned indices by modular wrap.
pub struct Array2<'a, T> {
    storage: Storage<'a, T>,
    nx: usize,
    ny: usize,
}

impl<'a, T> Array2<'a, T> {
    /// Number of columns.
    pub fn xsize(&self) -> usize {
        self.nx
    }

    /// Number of rows.
    pub fn ysize(&self) -> usize {
        self.ny
    }

    /// Whether this array owns its buffer (and is therefore resizable).
    pub fn is_owned(&self) -> bool {
        self.storage.is_owned()
    }

    fn min_sidx_axis(n: usize) -> i64 {
        -((n / 2) as i64)
    }

    fn max_sidx_axis(n: usize) -> i64 {
        Self::min_sidx_axis(n) + n as i64 - 1
    }

    /// Lower bound of the signed-centered range on each axis: `(-floor(nx/2), -floor(ny/2))`.
    pub fn min_sidx(&self) -> (i64, i64) {
        (Self::min_sidx_axis(self.nx), Self::min_sidx_axis(self.ny))
    }

    /// Upper bound of the signed-centered range on each axis.
    pub fn max_sidx(&self) -> (i64, i64) {
        (Self::max_sidx_axis(self.nx), Self::max_sidx_axis(self.ny))
    }

    fn unsigned_index(&self, col: usize, row: usize) -> Result<usize> {
        if col >= self.nx || row >= self.ny {
            return Err(SmipError::Bounds(format!(
                "({col}, {row}) out of range for {}x{} array",
                self.nx, self.ny
            )));
        }
        Ok(row * self.nx + col)
    }

    /// Unsigned element access; fails if `col >= nx` or `row >= ny`.
    pub fn get(&self, col: usize, row: usize) -> Result<&T> {
        let idx = self.unsigned_index(col, row)?;
        Ok(&self.storage.as_slice()[idx])
    }

    /// Mutable unsigned element access.
    pub fn get_mut(&mut self, col: usize, row: usize) -> Result<&mut T> {
        let idx = self.unsigned_index(col, row)?;
        Ok(&mut self.storage.as_mut_slice()[idx])
    }

    fn signed_to_unsigned(&self, sx: i64, sy: i64) -> Result<(usize, usize)> {
        let (min_x, max_x) = (Self::min_sidx_axis(self.nx), Self::max_sidx_axis(self.nx));
        let (min_y, max_y) = (Self::min_sidx_axis(self.ny), Self::max_sidx_axis(self.ny));
        if sx < min_x || sx > max_x || sy < min_y || sy > max_y {
            return Err(SmipError::Bounds(format!(
                "signed index ({sx}, {sy}) out of range [{min_x}..{max_x}] x [{min_y}..{max_y}]"
            )));
        }
        let ux = if sx < 0 { sx + self.nx as i64 } else { sx } as usize;
        let uy = if sy < 0 { sy + self.ny as i64 } else { sy } as usize;
        Ok((ux, uy))
    }

    /// Signed-centered element access; negative coordinates wrap modularly.
    pub fn get_signed(&self, sx: i64, sy: i64) -> Result<&T> {
        let (ux, uy) = self.signed_to_unsigned(sx, sy)?;
        self.get(ux, uy)
    }

    /// Mutable signed-centered element access.
    pub fn get_signed_mut(&mut self, sx: i64, sy: i64) -> Result<&mut T> {
        let (ux, uy) = self.signed_to_unsigned(sx, sy)?;
        self.get_mut(ux, uy)
    }

    /// Set an element by signed-centered index.
    pub fn set_signed(&mut self, sx: i64, sy: i64, value: T) -> Result<()> {
        *self.get_signed_mut(sx, sy)? = value;
        Ok(())
    }

    /// Fill every element with `value`. Works on both owned arrays and
    /// borrowed views, since it never changes the buffer's length.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        for v in self.storage.as_mut_slice() {
            *v = value.clone();
        }
    }

    /// Replace this array's contents with a copy of `src`. If the shapes
    /// differ, the array must own its buffer so it can be resized;
    /// otherwise this fails with `ReferenceArrayResize`.
    pub fn assign_from(&mut self, src: &Array2<'_, T>) -> Result<()>
    where
        T: Clone,
    {
        if (self.nx, self.ny) != (src.nx, src.ny) {
            if !self.storage.is_owned() {
                return Err(SmipError::ReferenceArrayResize(
                    "cannot resize a borrowed Array2 view".to_string(),
                ));
            }
            self.storage = Storage::Owned(src.storage.as_slice().to_vec());
            self.nx = src.nx;
            self.ny = src.ny;
        } else {
            self.storage
                .as_mut_slice()
                .clone_from_slice(src.storage.as_slice());
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.storage.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.storage.as_mut_slice().iter_mut()
    }

    /// Returns a new owned copy of the rectangle
    /// `[left, left+width) x [top, top+height)`.
    pub fn subarray(&self, left: usize, top: usize, width: usize, height: usize) -> Result<Array2<'static, T>>
    where
        T: Clone + Default,
    {
        if left + width > self.nx || top + height > self.ny {
            return Err(SmipError::Bounds(format!(
                "subarray rect [{left}..{}, {top}..{}] exceeds {}x{} extents",
                left + width,
                top + height,
                self.nx,
                self.ny
            )));
        }
        let mut out = Array2::new(width, height, T::default());
        for y in 0..height {
            for x in 0..width {
                let v = self.get(left + x, top + y)?.clone();
                *out.get_mut(x, y)? = v;
            }
        }
        Ok(out)
    }

    /// Returns a new array of identical shape in which the source is
    /// translated by `(dx, dy)`; cells uncovered by the translation are
    /// filled with `T::default()`.
    pub fn shift(&self, dx: i64, dy: i64) -> Array2<'static, T>
    where
        T: Clone + Default,
    {
        let mut out = Array2::new(self.nx, self.ny, T::default());
        let nx = self.nx as i64;
        let ny = self.ny as i64;
        for dst_y in 0..ny {
            let src_y = dst_y - dy;
            if src_y < 0 || src_y >= ny {
                continue;
            }
            for dst_x in 0..nx {
                let src_x = dst_x - dx;
                if src_x < 0 || src_x >= nx {
                    continue;
                }
                let v = self.get(src_x as usize, src_y as usize).unwrap().clone();
                *out.get_mut(dst_x as usize, dst_y as usize).unwrap() = v;
            }
        }
        out
    }

    /// Resizes in place (owned arrays only) and transforms each element
    /// of `src` with `conv`.
    pub fn import_from<U>(&mut self, src: &Array2<'_, U>, conv: impl Fn(&U) -> T) -> Result<()>
    where
        T: Clone + Default,
    {
        if !self.storage.is_owned() && (self.nx, self.ny) != (src.nx, src.ny) {
            return Err(SmipError::ReferenceArrayResize(
                "cannot resize a borrowed Array2 view".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(src.nx * src.ny);
        for v in src.storage.as_slice() {
            data.push(conv(v));
        }
        self.storage = Storage::Owned(data);
        self.nx = src.nx;
        self.ny = src.ny;
        Ok(())
    }

    /// Elementwise `self += other`; fails on shape mismatch.
    pub fn add_assign_array(&mut self, other: &Array2<'_, T>) -> Result<()>
    where
        T: std::ops::AddAssign<T> + Copy,
    {
        self.zip_assign(other, |a, b| *a += b)
    }

    /// Elementwise `self -= other`; fails on shape mismatch.
    pub fn sub_assign_array(&mut self, other: &Array2<'_, T>) -> Result<()>
    where
        T: std::ops::SubAssign<T> + Copy,
    {
        self.zip_assign(other, |a, b| *a -= b)
    }

    /// Elementwise `self *= other`; fails on shape mismatch.
    pub fn mul_assign_array(&mut self, other: &Array2<'_, T>) -> Result<()>
    where
        T: std::ops::MulAssign<T> + Copy,
    {
        self.zip_assign(other, |a, b| *a *= b)
    }

    /// Elementwise `self /= other`; fails on shape mismatch.
    pub fn div_assign_array(&mut self, other: &Array2<'_, T>) -> Result<()>
    where
        T: std::ops::DivAssign<T> + Copy,
    {
        self.zip_assign(other, |a, b| *a /= b)
    }

    fn zip_assign(&mut self, other: &Array2<'_, T>, op: impl Fn(&mut T, T)) -> Result<()>
    where
        T: Copy,
    {
        if (self.nx, self.ny) != (other.nx, other.ny) {
            return Err(SmipError::DimensionMismatch(format!(
                "{}x{} vs {}x{}",
                self.nx, self.ny, other.nx, other.ny
            )));
        }
        for (a, &b) in self
            .storage
            .as_mut_slice()
            .iter_mut()
            .zip(other.storage.as_slice())
        {
            op(a, b);
        }
        Ok(())
    }

    /// Scales every element by a scalar of a (possibly different,
    /// explicitly narrowed) arithmetic type `U`.
    pub fn scale<U: Copy>(&mut self, factor: U, cast: impl Fn(U) -> T)
    where
        T: std::ops::MulAssign<T> + Copy,
    {
        let t = cast(factor);
        for v in self.storage.as_mut_slice() {
            *v *= t;
        }
    }

    /// Adds a scalar to every element.
    pub fn add_scalar(&mut self, value: T)
    where
        T: std::ops::AddAssign<T> + Copy,
    {
        for v in self.storage.as_mut_slice() {
            *v += value;
        }
    }
}

impl<T: Clone + Default> Array2<'static, T> {
    /// Creates a new owned array filled with `T::default()`.
    pub fn new(nx: usize, ny: usize) -> Self {
        Self::new_with(nx, ny, T::default())
    }

    /// Creates a new owned array filled with `init`.
    pub fn new_with(nx: usize, ny: usize, init: T) -> Self {
        Array2 {
            storage: Storage::Owned(vec![init; nx * ny]),
            nx,
            ny,
        }
    }

    /// Builds an array from a nested sequence of equal-length rows.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        if rows.is_empty() {
            return Ok(Array2::new(0, 0));
        }
        let ny = rows.len();
        let nx = rows[0].len();
        if rows.iter().any(|r| r.len() != nx) {
            return Err(SmipError::DimensionMismatch(
                "from_rows: all rows must have equal length".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(nx * ny);
        for row in rows {
            data.extend(row.iter().cloned());
        }
        Ok(Array2 {
            storage: Storage::Owned(data),
            nx,
            ny,
        })
    }
}

impl<'a, T> Array2<'a, T> {
    /// Binds an `Array2` view to an externally owned mutable buffer. The
    /// view's lifetime is tied to the buffer's; it may be read and
    /// mutated element-wise but never resized.
    pub fn from_view(data: &'a mut [T], nx: usize, ny: usize) -> Result<Self> {
        if data.len() != nx * ny {
            return Err(SmipError::DimensionMismatch(format!(
                "view buffer has {} elements, expected {}",
                data.len(),
                nx * ny
            )));
        }
        Ok(Array2 {
            storage: Storage::Borrowed(data),
            nx,
            ny,
        })
    }
}

impl<'a, T: Clone> Clone for Array2<'a, T> {
    fn clone(&self) -> Self {
        Array2 {
            storage: Storage::Owned(self.storage.as_slice().to_vec()),
            nx: self.nx,
            ny: self.ny,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_matches_unsigned_modular() {
        let mut a = Array2::new(5, 4);
        for y in 0..4 {
            for x in 0..5 {
                *a.get_mut(x, y).unwrap() = (y * 5 + x) as i32;
            }
        }
        let (min_x, min_y) = a.min_sidx();
        let (max_x, max_y) = a.max_sidx();
        for sy in min_y..=max_y {
            for sx in min_x..=max_x {
                let ux = ((sx + 5) % 5) as usize;
                let uy = ((sy + 4) % 4) as usize;
                assert_eq!(
                    *a.get_signed(sx, sy).unwrap(),
                    *a.get(ux, uy).unwrap(),
                    "mismatch at signed ({sx},{sy})"
                );
            }
        }
    }

    #[test]
    fn shift_matches_intersection_fill() {
        let a = Array2::from_rows(&[
            vec![1, 2, 3],
            vec![4, 5, 6],
            vec![7, 8, 9],
        ])
        .unwrap();
        let shifted = a.shift(-1, 1);
        // row 1 = [2,3,0]
        assert_eq!(
            (0..3).map(|x| *shifted.get(x, 1).unwrap()).collect::<Vec<_>>(),
            vec![2, 3, 0]
        );
        // col 1 = [0,3,6]
        assert_eq!(
            (0..3).map(|y| *shifted.get(1, y).unwrap()).collect::<Vec<_>>(),
            vec![0, 3, 6]
        );
    }

    #[test]
    fn shift_nonzero_area_matches_formula() {
        let a: Array2<'static, i32> = Array2::new_with(10, 8, 1);
        let (dx, dy) = (3i64, -2i64);
        let shifted = a.shift(dx, dy);
        let nonzero = shifted.iter().filter(|&&v| v != 0).count();
        let expected = (10 - dx.unsigned_abs() as usize) * (8 - dy.unsigned_abs() as usize);
        assert_eq!(nonzero, expected);
    }

    #[test]
    fn borrowed_view_rejects_resize() {
        let mut buf = vec![0i32; 6];
        let mut view = Array2::from_view(&mut buf, 3, 2).unwrap();
        let other = Array2::new_with(2, 2, 5);
        let err = view.assign_from(&other).unwrap_err();
        assert!(matches!(err, SmipError::ReferenceArrayResize(_)));
    }

    #[test]
    fn borrowed_view_allows_fill_and_elementwise_mutation() {
        let mut buf = vec![0i32; 4];
        let mut view = Array2::from_view(&mut buf, 2, 2).unwrap();
        view.fill(7);
        assert_eq!(buf, vec![7, 7, 7, 7]);
    }

    #[test]
    fn out_of_range_unsigned_access_is_bounds_error() {
        let a: Array2<'static, i32> = Array2::new(2, 2);
        assert!(matches!(a.get(5, 0), Err(SmipError::Bounds(_))));
    }
}
