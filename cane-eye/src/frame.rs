//! Buffer snapshotting
//!
//! Sensor drivers recycle their buffers as soon as the frame callback
//! returns, so everything downstream works on owned copies taken here.

use crate::depth::DepthGrid;
use crate::error::VisionError;
use bytes::{Bytes, BytesMut};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pixel layout of a color buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Bgra8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Borrowed color buffer as handed over by the sensor driver
#[derive(Debug, Clone, Copy)]
pub struct ColorView<'a> {
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes, may include driver padding
    pub bytes_per_row: usize,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> ColorView<'a> {
    /// View over a tightly packed buffer
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            bytes_per_row: width as usize * format.bytes_per_pixel(),
            format,
            data,
        }
    }
}

/// Borrowed single-channel depth buffer (meters)
#[derive(Debug, Clone, Copy)]
pub struct DepthView<'a> {
    pub width: usize,
    pub height: usize,
    /// Row pitch in elements
    pub stride: usize,
    pub data: &'a [f32],
}

impl<'a> DepthView<'a> {
    pub fn packed(width: usize, height: usize, data: &'a [f32]) -> Self {
        Self {
            width,
            height,
            stride: width,
            data,
        }
    }
}

/// Owned, tightly packed copy of a color buffer
#[derive(Debug, Clone)]
pub struct ColorSnapshot {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Bytes,
}

impl ColorSnapshot {
    /// Wrap already packed pixel data
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Bytes) -> Result<Self, VisionError> {
        let expected = packed_len(width as usize, height as usize, format.bytes_per_pixel())?;
        if data.len() != expected {
            return Err(VisionError::Snapshot(format!(
                "Color data is {} bytes, expected {}",
                data.len(),
                expected
            )));
        }
        Ok(Self { width, height, format, data })
    }

    /// Copy a (possibly padded) sensor buffer
    pub fn copy_from(view: &ColorView<'_>) -> Result<Self, VisionError> {
        let bpp = view.format.bytes_per_pixel();
        let (width, height) = (view.width as usize, view.height as usize);
        let row_len = checked_row(width, height, bpp, view.bytes_per_row, view.data.len())?;

        let mut out = BytesMut::with_capacity(row_len * height);
        for row in view.data.chunks(view.bytes_per_row).take(height) {
            out.extend_from_slice(&row[..row_len]);
        }

        Ok(Self {
            width: view.width,
            height: view.height,
            format: view.format,
            data: out.freeze(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Convert to an 8-bit RGB image for model preprocessing
    pub fn to_rgb_image(&self) -> Result<RgbImage, VisionError> {
        let pixels = self.data.chunks_exact(self.format.bytes_per_pixel());
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in pixels {
            match self.format {
                PixelFormat::Rgb8 | PixelFormat::Rgba8 => rgb.extend_from_slice(&px[..3]),
                PixelFormat::Bgra8 => rgb.extend_from_slice(&[px[2], px[1], px[0]]),
                PixelFormat::Gray8 => rgb.extend_from_slice(&[px[0], px[0], px[0]]),
            }
        }
        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| VisionError::Processing("RGB buffer does not match frame size".to_string()))
    }
}

/// Owned copies of one sensor frame, in flight through the pipeline
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub id: u64,
    pub color: ColorSnapshot,
    /// Absent when the sensor delivered no depth for this frame
    pub depth: Option<DepthGrid>,
    pub captured_at: Instant,
}

impl FrameSnapshot {
    /// Snapshot both buffers of a sensor frame
    pub fn capture(id: u64, color: &ColorView<'_>, depth: Option<&DepthView<'_>>) -> Result<Self, VisionError> {
        let color = ColorSnapshot::copy_from(color)?;
        let depth = depth.map(DepthGrid::copy_from).transpose()?;
        Ok(Self {
            id,
            color,
            depth,
            captured_at: Instant::now(),
        })
    }
}

impl DepthGrid {
    /// Copy a (possibly padded) depth buffer
    pub fn copy_from(view: &DepthView<'_>) -> Result<Self, VisionError> {
        let row_len = checked_row(view.width, view.height, 1, view.stride, view.data.len())?;
        let mut data = Vec::with_capacity(row_len * view.height);
        for row in view.data.chunks(view.stride).take(view.height) {
            data.extend_from_slice(&row[..row_len]);
        }
        DepthGrid::new(view.width, view.height, data)
    }
}

fn packed_len(width: usize, height: usize, bpp: usize) -> Result<usize, VisionError> {
    width
        .checked_mul(height)
        .and_then(|p| p.checked_mul(bpp))
        .ok_or_else(|| VisionError::Snapshot("Frame dimensions overflow".to_string()))
}

/// Validate a strided buffer and return the packed row length in elements
fn checked_row(width: usize, height: usize, bpp: usize, pitch: usize, len: usize) -> Result<usize, VisionError> {
    if width == 0 || height == 0 {
        return Err(VisionError::Snapshot("Frame has zero size".to_string()));
    }
    let row_len = width
        .checked_mul(bpp)
        .ok_or_else(|| VisionError::Snapshot("Row length overflow".to_string()))?;
    if pitch < row_len {
        return Err(VisionError::Snapshot(format!(
            "Row pitch {} shorter than row length {}",
            pitch, row_len
        )));
    }
    // last row only needs its pixels, not the trailing padding
    let required = pitch
        .checked_mul(height - 1)
        .and_then(|p| p.checked_add(row_len))
        .ok_or_else(|| VisionError::Snapshot("Buffer size overflow".to_string()))?;
    if len < required {
        return Err(VisionError::Snapshot(format!(
            "Buffer holds {} elements, frame needs {}",
            len, required
        )));
    }
    Ok(row_len)
}
