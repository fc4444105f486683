//! Bispectrum-driven (Weigelt) phase reconstruction.
//!
//! Starting from five seeded DC-adjacent phases, a radial walk visits every
//! pixel of the reconstructed spectrum in order of increasing distance from
//! the origin. At each new pixel, [`calc_phase`] averages every
//! `bispectrum(ux,uy,vx,vy)`-derived phase estimate whose two operands
//! (`(ux,uy)` and `(vx,vy) = (wx-ux, wy-uy)`) are already resolved.

use crate::array2::Array2;
use crate::bispectrum::{Bispectrum, Complex64};
use crate::error::Result;
use std::f64::consts::TAU;

/// Per-pixel bookkeeping for the phase walk: whether a phase estimate has
/// been committed, and how self-consistent the averaged estimate was.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseMapElement {
    pub flag: bool,
    pub consistency: f64,
}

/// Signed-centered grid of [`PhaseMapElement`], tracking reconstruction
/// progress one-to-one with the phase array it accompanies.
pub type PhaseMap = Array2<'static, PhaseMapElement>;

/// Generates the sequence of integer `(i, j)` lattice points in order of
/// non-decreasing radius, mirroring a polar sweep with unit radial step.
///
/// The radius-zero origin is never revisited by the walk (the five
/// DC-adjacent seeds already cover it); `r == 0` is therefore handled as a
/// distinct first step rather than by evaluating `dphi = 1/(2*pi*r)`, which
/// would otherwise divide by zero.
pub struct RadialWalk {
    r: f64,
    phi: f64,
    i: i64,
    j: i64,
    started: bool,
}

impl Default for RadialWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl RadialWalk {
    pub fn new() -> Self {
        RadialWalk { r: 0.0, phi: 0.0, i: 0, j: 0, started: false }
    }

    /// Current radius (the radius of the last point returned by `advance`).
    pub fn r(&self) -> f64 {
        self.r
    }

    /// Advances to the next lattice point, returning `(r, i, j)`.
    pub fn advance(&mut self) -> (f64, i64, i64) {
        const DR: f64 = 1.0;

        if !self.started {
            self.started = true;
            self.r = 1.0;
            self.phi = 0.0;
            self.i = 1;
            self.j = 0;
            return (self.r, self.i, self.j);
        }

        let (i0, j0) = (self.i, self.j);
        loop {
            let dphi = 1.0 / (TAU * self.r);
            self.phi += dphi;
            if self.phi > TAU {
                self.phi = 0.0;
                self.r += DR;
            }
            let ii = (self.r * self.phi.cos()) as i64;
            let jj = (self.r * self.phi.sin()) as i64;
            if ii != i0 || jj != j0 {
                self.i = ii;
                self.j = jj;
                break;
            }
        }
        (self.r, self.i, self.j)
    }
}

const SEEDS: [(i64, i64); 5] = [(0, 0), (1, 0), (0, 1), (-1, 0), (0, -1)];

fn seed(phases: &mut Array2<'static, Complex64>, pm: &mut PhaseMap) -> Result<()> {
    let unit = Complex64::new(1.0, 0.0);
    phases.set_signed(0, 0, unit)?;
    phases.set_signed(1, 0, unit)?;
    phases.set_signed(0, 1, unit)?;
    // Numerically conj(1+0i) == 1+0i, but this is conjugated explicitly
    // rather than re-seeded with the same literal, since these two points
    // are the negative-axis partners of (1,0) and (0,1) and the relation
    // should stay visible even where it is a no-op for this particular seed.
    phases.set_signed(-1, 0, unit.conj())?;
    phases.set_signed(0, -1, unit.conj())?;
    for &(x, y) in &SEEDS {
        pm.set_signed(x, y, PhaseMapElement { flag: true, consistency: 1.0 })?;
    }
    Ok(())
}

/// Resolves the phase at `(wx, wy)` by averaging every bispectrum-derived
/// estimate from pairs `(ux,uy)`, `(vx,vy) = (wx-ux, wy-uy)` that are
/// already flagged resolved. No-op if `(wx,wy)` is a seed point or falls
/// outside the bispectrum's first- or second-axis index range.
pub fn calc_phase(
    bispec: &Bispectrum,
    phases: &mut Array2<'static, Complex64>,
    pm: &mut PhaseMap,
    wx: i64,
    wy: i64,
) -> Result<()> {
    const EPSILON: f64 = 1e-25;

    if SEEDS.contains(&(wx, wy)) {
        return Ok(());
    }
    let bmin = bispec.min_indices();
    let bmax = bispec.max_indices();
    if wx < bmin[0] || wx > bmax[0] || wy < bmin[1] || wy > bmax[1] {
        return Ok(());
    }

    let (x_lo, y_lo) = pm.min_sidx();
    let (x_hi, y_hi) = pm.max_sidx();

    let mut phaselist: Vec<Complex64> = Vec::new();
    for ux in x_lo..=x_hi {
        for uy in y_lo..=y_hi {
            let vx = wx - ux;
            let vy = wy - uy;
            if vx < bmin[2] || vx > bmax[2] || vy < bmin[3] || vy > bmax[3] {
                continue;
            }
            if !pm.get_signed(ux, uy)?.flag || !pm.get_signed(vx, vy)?.flag {
                continue;
            }
            let raw = bispec.get((ux, uy, vx, vy))?;
            let mut temp = Complex64::new(raw.re as f64, raw.im as f64);
            if temp.norm() <= EPSILON {
                continue;
            }
            let mut ph = *phases.get_signed(ux, uy)? * *phases.get_signed(vx, vy)?;
            temp = (temp / temp.norm()).conj();
            ph *= temp;
            phaselist.push(ph / ph.norm());
        }
    }

    if phaselist.is_empty() {
        return Ok(());
    }
    let mut mean_phase: Complex64 = phaselist.iter().copied().sum();
    mean_phase /= phaselist.len() as f64;
    let consistency = mean_phase.norm();
    let resolved = if consistency > EPSILON {
        mean_phase / consistency
    } else {
        Complex64::new(0.0, 0.0)
    };
    pm.set_signed(wx, wy, PhaseMapElement { flag: true, consistency })?;
    phases.set_signed(wx, wy, resolved)?;
    Ok(())
}

/// Drives the radial walk out to `reco_radius`, seeding the five
/// DC-adjacent phases and filling in every other pixel via [`calc_phase`].
/// Returns the reconstructed phase array and the map recording which
/// pixels were resolved (and how consistently).
pub fn reconstruct_phases(
    bispec: &Bispectrum,
    xsize: usize,
    ysize: usize,
    reco_radius: f64,
) -> Result<(Array2<'static, Complex64>, PhaseMap)> {
    let mut phases = Array2::new_with(xsize, ysize, Complex64::new(0.0, 0.0));
    let mut pm: PhaseMap = Array2::new(xsize, ysize);
    seed(&mut phases, &mut pm)?;

    let (x_lo, y_lo) = pm.min_sidx();
    let (x_hi, y_hi) = pm.max_sidx();

    let mut walk = RadialWalk::new();
    let mut r = 0.0;
    let mut bucket_count = 0usize;
    let mut bucket_consistency_sum = 0.0;

    while r <= reco_radius {
        let old_r = r;
        let (new_r, i, j) = walk.advance();
        r = new_r;
        if r != old_r && bucket_count > 0 {
            log::trace!(
                "radial reconstruction: r={old_r} mean consistency={:.4} over {bucket_count} pixels",
                bucket_consistency_sum / bucket_count as f64
            );
            bucket_count = 0;
            bucket_consistency_sum = 0.0;
        }
        if i < x_lo || i > x_hi || j < y_lo || j > y_hi {
            continue;
        }
        if !pm.get_signed(i, j)?.flag {
            calc_phase(bispec, &mut phases, &mut pm, i, j)?;
        }
        let elem = pm.get_signed(i, j)?;
        if elem.flag {
            bucket_count += 1;
            bucket_consistency_sum += elem.consistency;
        }
    }
    Ok((phases, pm))
}
