//! Sequential frame sources for the speckle-masking pipeline.

use crate::array2::Array2;
use crate::error::{Result, SmipError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One decoded video frame: tightly packed samples, `channels` per pixel
/// in BGR order when `channels == 3`, `bytes_per_sample` bytes per sample
/// in native (little-endian) order.
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub bytes_per_sample: usize,
    pub data: Vec<u8>,
}

impl Frame {
    fn sample(&self, channel: usize, x: usize, y: usize) -> f64 {
        let pixel_stride = self.channels * self.bytes_per_sample;
        let row_stride = self.width * pixel_stride;
        let offset = y * row_stride + x * pixel_stride + channel * self.bytes_per_sample;
        match self.bytes_per_sample {
            1 => self.data[offset] as f64,
            _ => u16::from_le_bytes([self.data[offset], self.data[offset + 1]]) as f64,
        }
    }
}

/// Which of a frame's channels feeds the reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
    /// Channel 0, regardless of how many channels the frame carries.
    White,
    /// Always zero, independent of the frame's contents.
    Black,
}

impl ColorChannel {
    /// Parses the `-c`/`--channel` selector character (`r|g|b|i`).
    pub fn from_flag(c: char) -> Result<Self> {
        match c {
            'r' => Ok(ColorChannel::Red),
            'g' => Ok(ColorChannel::Green),
            'b' => Ok(ColorChannel::Blue),
            'i' => Ok(ColorChannel::White),
            other => Err(SmipError::Domain(format!(
                "unknown color channel selector '{other}' (expected r, g, b or i)"
            ))),
        }
    }
}

/// Extracts a real-valued `(width, height)` grid from `frame` per
/// `channel`. Red/green/blue index into a 3-channel BGR frame (2, 1 and 0
/// respectively); a single-channel frame only has index 0, so those
/// selectors degrade to it.
pub fn apply_channel_policy(frame: &Frame, channel: ColorChannel) -> Array2<'static, f64> {
    let mut out = Array2::new(frame.width, frame.height);
    if channel == ColorChannel::Black {
        return out;
    }
    let idx = match channel {
        ColorChannel::Red => if frame.channels >= 3 { 2 } else { 0 },
        ColorChannel::Green => if frame.channels >= 2 { 1 } else { 0 },
        ColorChannel::Blue | ColorChannel::White => 0,
        ColorChannel::Black => unreachable!(),
    };
    for y in 0..frame.height {
        for x in 0..frame.width {
            *out.get_mut(x, y).unwrap() = frame.sample(idx, x, y);
        }
    }
    out
}

/// A sequential supplier of decoded frames, abstracting over the concrete
/// decoder backend.
pub trait VideoSource {
    /// Frame width in pixels.
    fn width(&self) -> usize;
    /// Frame height in pixels.
    fn height(&self) -> usize;
    /// Decodes and returns the next frame. Returns `Ok(None)` once the
    /// underlying stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Decodes a YUV4MPEG2 (`.y4m`) stream. Only the luma plane is exposed (a
/// single-channel, one-byte-per-sample frame); chroma is ignored, matching
/// the reconstruction pipeline's grayscale-only treatment of `white`/`red`/
/// `green`/`blue` channel selection.
pub struct Y4mSource<R: Read> {
    decoder: y4m::Decoder<R>,
}

impl Y4mSource<File> {
    /// Opens a `.y4m` file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<R: Read> Y4mSource<R> {
    /// Wraps an already-open reader positioned at the start of a Y4M
    /// stream header.
    pub fn new(reader: R) -> Result<Self> {
        let decoder = y4m::decode(reader)
            .map_err(|e| SmipError::Io(std::io::Error::other(format!("y4m header: {e}"))))?;
        Ok(Y4mSource { decoder })
    }
}

impl<R: Read> VideoSource for Y4mSource<R> {
    fn width(&self) -> usize {
        self.decoder.get_width()
    }

    fn height(&self) -> usize {
        self.decoder.get_height()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.decoder.read_frame() {
            Ok(frame) => {
                let (w, h) = (self.decoder.get_width(), self.decoder.get_height());
                let plane = frame.get_y_plane();
                if plane.len() != w * h {
                    return Err(SmipError::DimensionMismatch(format!(
                        "y4m luma plane has {} samples, expected {}x{}={}",
                        plane.len(),
                        w,
                        h,
                        w * h
                    )));
                }
                Ok(Some(Frame {
                    width: w,
                    height: h,
                    channels: 1,
                    bytes_per_sample: 1,
                    data: plane.to_vec(),
                }))
            }
            Err(y4m::Error::EOF) => Ok(None),
            Err(e) => Err(SmipError::Io(std::io::Error::other(format!(
                "y4m frame read: {e}"
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_y4m(path: &Path, w: usize, h: usize, frames: &[Vec<u8>]) {
        let mut f = File::create(path).unwrap();
        writeln!(f, "YUV4MPEG2 W{w} H{h} F25:1 Ip A1:1 C420jpeg").unwrap();
        let csize = (w / 2) * (h / 2);
        for frame in frames {
            writeln!(f, "FRAME").unwrap();
            f.write_all(frame).unwrap();
            f.write_all(&vec![128u8; csize]).unwrap();
            f.write_all(&vec![128u8; csize]).unwrap();
        }
    }

    #[test]
    fn decodes_luma_plane_and_reports_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.y4m");
        let (w, h) = (4, 2);
        let frame0: Vec<u8> = (0..(w * h) as u8).collect();
        write_test_y4m(&path, w, h, &[frame0.clone()]);

        let mut source = Y4mSource::open(&path).unwrap();
        assert_eq!(source.width(), w);
        assert_eq!(source.height(), h);

        let frame = source.next_frame().unwrap().expect("one frame");
        assert_eq!(frame.channels, 1);
        let grid = apply_channel_policy(&frame, ColorChannel::White);
        for (i, &v) in frame0.iter().enumerate() {
            assert_eq!(*grid.get(i % w, i / w).unwrap(), v as f64);
        }
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn black_channel_is_always_zero() {
        let frame = Frame { width: 2, height: 2, channels: 1, bytes_per_sample: 1, data: vec![9, 9, 9, 9] };
        let grid = apply_channel_policy(&frame, ColorChannel::Black);
        assert!(grid.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn from_flag_rejects_unknown_selector() {
        assert!(ColorChannel::from_flag('x').is_err());
        assert_eq!(ColorChannel::from_flag('i').unwrap(), ColorChannel::White);
    }
}
