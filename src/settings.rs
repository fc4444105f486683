//! Pipeline configuration: the resolved form of the CLI flags, with the
//! same defaults as the original tool.

use crate::video::ColorChannel;
use serde::{Deserialize, Serialize};

/// A `left:top` / `width:height` crop rectangle applied to every frame
/// before registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

/// Resolved pipeline configuration. Built from CLI flags by the binary;
/// kept serializable so a run's effective configuration can be logged or
/// dumped alongside its outputs for reproducibility, even though nothing
/// in this crate reads it back from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of frames to process.
    pub max_frames: u32,
    /// Index of the reference frame within the video.
    pub ref_frame: usize,
    /// Half-width of the accumulated bispectrum's third and fourth axes.
    pub bispectrum_depth: usize,
    /// Radius out to which phases are reconstructed.
    pub reco_radius: f64,
    /// Which channel of each frame feeds the reconstruction.
    pub color_channel: ColorChannelConfig,
    /// Optional crop applied before registration.
    pub crop: Option<CropRect>,
    /// Whether to accumulate and persist the plain (non-speckle) sum image.
    pub calc_sum: bool,
    /// Whether to run the speckle-masking reconstruction at all.
    pub speckle_masking: bool,
}

/// A serializable mirror of [`ColorChannel`] (which itself carries no
/// serde derive, since it is a pure domain type used deep in the pixel
/// path where that dependency would be out of place).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorChannelConfig {
    Red,
    Green,
    Blue,
    White,
    Black,
}

impl From<ColorChannelConfig> for ColorChannel {
    fn from(c: ColorChannelConfig) -> Self {
        match c {
            ColorChannelConfig::Red => ColorChannel::Red,
            ColorChannelConfig::Green => ColorChannel::Green,
            ColorChannelConfig::Blue => ColorChannel::Blue,
            ColorChannelConfig::White => ColorChannel::White,
            ColorChannelConfig::Black => ColorChannel::Black,
        }
    }
}

impl From<ColorChannel> for ColorChannelConfig {
    fn from(c: ColorChannel) -> Self {
        match c {
            ColorChannel::Red => ColorChannelConfig::Red,
            ColorChannel::Green => ColorChannelConfig::Green,
            ColorChannel::Blue => ColorChannelConfig::Blue,
            ColorChannel::White => ColorChannelConfig::White,
            ColorChannel::Black => ColorChannelConfig::Black,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let bispectrum_depth = 15;
        Self {
            max_frames: 400,
            ref_frame: 0,
            bispectrum_depth,
            reco_radius: (2 * bispectrum_depth) as f64,
            color_channel: ColorChannelConfig::White,
            crop: None,
            calc_sum: true,
            speckle_masking: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_tool() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_frames, 400);
        assert_eq!(cfg.ref_frame, 0);
        assert_eq!(cfg.bispectrum_depth, 15);
        assert_eq!(cfg.reco_radius, 30.0);
        assert_eq!(cfg.color_channel, ColorChannelConfig::White);
        assert!(cfg.crop.is_none());
        assert!(cfg.calc_sum);
        assert!(cfg.speckle_masking);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = PipelineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_frames, cfg.max_frames);
        assert_eq!(back.color_channel, cfg.color_channel);
    }
}
