use speckle_stacker::array2::Array2;
use speckle_stacker::bispectrum::{Bispectrum, Complex64 as BispecComplex64};
use speckle_stacker::crosscorrelation::CrossCorrelation;
use speckle_stacker::phase::{self, RadialWalk};
use speckle_stacker::pipeline::Pipeline;
use speckle_stacker::settings::PipelineConfig;
use speckle_stacker::video::{Frame, VideoSource};

fn gaussian(xsize: usize, ysize: usize, cx: i64, cy: i64, sigma: f64) -> Array2<'static, f64> {
    let mut a = Array2::new(xsize, ysize);
    let (min_x, min_y) = a.min_sidx();
    let (max_x, max_y) = a.max_sidx();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = (x - cx) as f64;
            let dy = (y - cy) as f64;
            a.set_signed(x, y, (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp())
                .unwrap();
        }
    }
    a
}

#[test]
fn bispectrum_symmetry_holds_for_a_synthetic_frame() {
    let mut frame = Array2::new_with(12, 12, BispecComplex64::new(0.0, 0.0));
    let (min_x, min_y) = frame.min_sidx();
    let (max_x, max_y) = frame.max_sidx();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            frame
                .set_signed(x, y, BispecComplex64::new(1.0 + 0.1 * x as f64, 0.3 * y as f64))
                .unwrap();
        }
    }
    let mut bispec = Bispectrum::new(12, 12, 6, 6);
    bispec.accumulate_from_fft(&frame).unwrap();

    for &(i, j, k, l) in &[(2i64, -1i64, -3i64, 4i64), (0, 0, 1, 1), (-2, 3, 1, -1)] {
        let direct = bispec.get((i, j, k, l)).unwrap();
        let hermitian = bispec.get((-i, -j, -k, -l)).unwrap();
        assert!(
            (direct - hermitian.conj()).norm() < 1e-4,
            "Hermitian symmetry violated at ({i},{j},{k},{l})"
        );
        let swapped = bispec.get((k, l, i, j)).unwrap();
        assert!(
            (direct - swapped).norm() < 1e-4,
            "triple-product swap symmetry violated at ({i},{j},{k},{l})"
        );
    }
}

#[test]
fn cross_correlation_recovers_synthetic_shift() {
    let reference = gaussian(40, 40, 0, 0, 3.0);
    for &(dx, dy) in &[(5i64, -7i64), (-11, 2), (0, 0), (13, 13)] {
        let shifted = gaussian(40, 40, dx, dy, 3.0);
        let got = CrossCorrelation::get_displacement(&reference, &shifted).unwrap();
        assert_eq!(got, (dx, dy), "displacement mismatch for shift ({dx},{dy})");
    }
}

#[test]
fn radial_walk_never_decreases_and_covers_every_integer_radius_band() {
    let mut walk = RadialWalk::new();
    let mut last_r = 0.0;
    let mut max_seen = 0i64;
    for _ in 0..2000 {
        let (r, i, j) = walk.advance();
        assert!(r >= last_r);
        last_r = r;
        max_seen = max_seen.max(i.abs()).max(j.abs());
    }
    assert!(max_seen > 5, "walk should have covered more than a tiny neighborhood");
}

#[test]
fn pipeline_reconstructs_constant_frames_without_phase_distortion() {
    struct ConstantSource {
        remaining: usize,
    }
    impl VideoSource for ConstantSource {
        fn width(&self) -> usize {
            11
        }
        fn height(&self) -> usize {
            11
        }
        fn next_frame(&mut self) -> speckle_stacker::error::Result<Option<Frame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(Frame {
                width: 11,
                height: 11,
                channels: 1,
                bytes_per_sample: 1,
                data: vec![128u8; 11 * 11],
            }))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let prev = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let mut config = PipelineConfig::default();
    config.max_frames = 10;
    config.bispectrum_depth = 4;
    config.reco_radius = 5.0;
    let pipeline = Pipeline::new(config);
    let mut source = ConstantSource { remaining: 10 };
    pipeline.run(&mut source).unwrap();

    for name in [
        "bispectrum.dat",
        "sum_image.png",
        "sum_image_falsecolor.png",
        "powerspec.png",
        "powerspec_falsecolor.png",
        "phases.png",
        "phasecons.png",
        "reco_image.png",
    ] {
        assert!(dir.path().join(name).exists(), "missing output {name}");
    }

    std::env::set_current_dir(prev).unwrap();
}

#[test]
fn phase_seeds_are_exactly_the_five_dc_adjacent_points() {
    let mut bispec = Bispectrum::new(9, 9, 4, 4);
    let mut frame = Array2::new_with(9, 9, BispecComplex64::new(0.0, 0.0));
    for y in 0..9i64 {
        for x in 0..9i64 {
            frame
                .set_signed(x - 4, y - 4, BispecComplex64::new(1.0, 0.2 * (x - 4) as f64))
                .unwrap();
        }
    }
    bispec.accumulate_from_fft(&frame).unwrap();
    let (phases, pm) = phase::reconstruct_phases(&bispec, 9, 9, 3.0).unwrap();

    let expected_seeds = [(0i64, 0i64), (1, 0), (0, 1), (-1, 0), (0, -1)];
    for y in pm.min_sidx().1..=pm.max_sidx().1 {
        for x in pm.min_sidx().0..=pm.max_sidx().0 {
            let at_seed = expected_seeds.contains(&(x, y));
            let flag = pm.get_signed(x, y).unwrap().flag;
            if at_seed {
                assert!(flag, "seed ({x},{y}) should be flagged");
                let p = phases.get_signed(x, y).unwrap();
                assert!((p.norm() - 1.0).abs() < 1e-9);
            }
        }
    }
}
