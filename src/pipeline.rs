//! End-to-end speckle-masking reconstruction: ingest, accumulate, phase
//! reconstruction, apodize, invert, persist.

use crate::array2::Array2;
use crate::bispectrum::{Bispectrum, Complex64 as BispecComplex64};
use crate::crosscorrelation::CrossCorrelation;
use crate::error::Result;
use crate::fft::{Complex64, Fft2D, FftDirection};
use crate::image_sink::{self, ColorLut};
use crate::phase::{self, PhaseMap};
use crate::settings::PipelineConfig;
use crate::video::{apply_channel_policy, ColorChannel, VideoSource};
use crate::window;
use log::{debug, info};

/// Drives the ten-stage reconstruction described in the module overview,
/// writing its products to a fixed set of PNG (and one binary dump)
/// filenames in the current directory.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    fn extract(&self, frame: &crate::video::Frame) -> Result<Array2<'static, f64>> {
        let channel: ColorChannel = self.config.color_channel.into();
        let grid = apply_channel_policy(frame, channel);
        match self.config.crop {
            Some(c) => grid.subarray(c.left, c.top, c.width, c.height),
            None => Ok(grid),
        }
    }

    /// Runs the full pipeline against `source`, writing every product
    /// `--calcsum`/`--specklemasking` leaves enabled.
    pub fn run(&self, source: &mut dyn VideoSource) -> Result<()> {
        info!("opening video source ({}x{})", source.width(), source.height());

        info!("reading reference frame {}", self.config.ref_frame);
        let mut reference = None;
        for i in 0..=self.config.ref_frame {
            let frame = source
                .next_frame()?
                .ok_or_else(|| crate::error::SmipError::Io(std::io::Error::other(
                    format!("video exhausted before reaching reference frame {i}"),
                )))?;
            reference = Some(self.extract(&frame)?);
        }
        let reference = reference.expect("ref_frame loop runs at least once");
        let (nx, ny) = (reference.xsize(), reference.ysize());

        info!(
            "creating bispectrum [{} {} {} {}]",
            nx, ny, self.config.bispectrum_depth, self.config.bispectrum_depth
        );
        let mut bispec = Bispectrum::new(nx, ny, self.config.bispectrum_depth, self.config.bispectrum_depth);
        let mut sum = Array2::new(nx, ny);
        let mut powerspec = Array2::new(nx, ny);
        let mut fft = Fft2D::new(nx, ny)?;
        let mut cc = CrossCorrelation::new(&reference)?;

        let mut n: u64 = 0;
        let mut grid = Some(reference.clone());
        let mut frames_seen = 0u32;
        loop {
            if frames_seen >= self.config.max_frames {
                break;
            }
            let current = match grid.take() {
                Some(g) => g,
                None => match source.next_frame()? {
                    Some(f) => self.extract(&f)?,
                    None => break,
                },
            };
            frames_seen += 1;
            debug!("accumulating frame {frames_seen}/{}", self.config.max_frames);

            if self.config.calc_sum {
                cc.correlate(&reference, &current)?;
                let (dx, dy) = cc.displacement()?;
                let registered = current.shift(-dx, -dy);
                sum.add_assign_array(&registered)?;
            }

            let mut complex_frame = Array2::<Complex64>::new_with(nx, ny, Complex64::new(0.0, 0.0));
            complex_frame.import_from(&current, |&v| Complex64::new(v, 0.0))?;
            let spectrum = fft.c2c_2d(&complex_frame, FftDirection::Forward)?;

            bispec.accumulate_from_fft(&spectrum)?;
            for (ps, f) in powerspec.iter_mut().zip(spectrum.iter()) {
                *ps += f.norm_sqr();
            }
            n += 1;
        }

        if n == 0 {
            return Err(crate::error::SmipError::Domain(
                "no frames were accumulated".to_string(),
            ));
        }
        info!("normalizing sum image, power spectrum and bispectrum over {n} frames");
        if self.config.calc_sum {
            sum.scale(1.0 / n as f64, |x| x);
        }
        let ps_norm = 1.0 / (n as f64 * (nx * ny) as f64);
        powerspec.scale(ps_norm, |x| x);
        bispec.scale_inv(crate::bispectrum::Complex32::new(n as f32, 0.0));

        info!("writing bispectrum to file 'bispectrum.dat'");
        bispec.write_to_file("bispectrum.dat")?;

        if self.config.calc_sum {
            write_products(&sum, "sum_image")?;
        }
        write_products(&powerspec, "powerspec")?;

        if !self.config.speckle_masking {
            return Ok(());
        }

        info!("reconstructing fourier phases from bispectrum");
        let (mut phases, pm) = phase::reconstruct_phases(&bispec, nx, ny, self.config.reco_radius)?;

        info!("applying window function to phase map");
        let aperture = (2.0 * self.config.reco_radius).round().max(1.0) as usize;
        let hann = window::hann(nx, ny, aperture)?;
        let (min_x, min_y) = phases.min_sidx();
        let (max_x, max_y) = phases.max_sidx();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let w = *hann.get_signed(x, y)?;
                let p = phases.get_signed_mut(x, y)?;
                *p *= w;
            }
        }

        info!("combining power spectrum with phases");
        let mut result = Array2::<Complex64>::new_with(nx, ny, Complex64::new(0.0, 0.0));
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let amp = (*powerspec.get_signed(x, y)?).max(0.0).sqrt();
                let ph = *phases.get_signed(x, y)?;
                result.set_signed(x, y, ph * amp)?;
            }
        }

        info!("fft back transform of combined spectrum");
        let reconstructed = fft.c2c_2d(&result, FftDirection::Inverse)?;

        let mut magnitude: Array2<'static, f64> = Array2::new(nx, ny);
        for (m, c) in magnitude.iter_mut().zip(reconstructed.iter()) {
            *m = c.norm();
        }
        let peak = magnitude.iter().copied().fold(0.0f64, f64::max);
        if peak > 0.0 {
            magnitude.scale(1.0 / peak, |x| x);
        }

        let phase_angles = phase_angle_map(&phases);
        let consistency = consistency_map(&pm);

        write_products(&phase_angles, "phases")?;
        image_sink::write_grayscale_png("phasecons.png", &consistency)?;
        write_products(&magnitude, "reco_image")?;

        Ok(())
    }
}

fn write_products(data: &Array2<'_, f64>, stem: &str) -> Result<()> {
    image_sink::write_grayscale_png(format!("{stem}.png"), data)?;
    image_sink::write_false_color_png(format!("{stem}_falsecolor.png"), data, &ColorLut::heatmap())?;
    Ok(())
}

fn phase_angle_map(phases: &Array2<'static, BispecComplex64>) -> Array2<'static, f64> {
    let mut out = Array2::new(phases.xsize(), phases.ysize());
    for (dst, src) in out.iter_mut().zip(phases.iter()) {
        *dst = src.arg();
    }
    out
}

fn consistency_map(pm: &PhaseMap) -> Array2<'static, f64> {
    let mut out = Array2::new(pm.xsize(), pm.ysize());
    for (dst, src) in out.iter_mut().zip(pm.iter()) {
        *dst = if src.flag { src.consistency } else { 0.0 };
    }
    out
}
