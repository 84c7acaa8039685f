use ndarray::{ArrayView2, ArrayView3};

/// Pixel layout of a frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorFormat {
    Rgb,
    Bgr,
    Rgba,
    Gray,
    /// Camera preview layout: full-resolution Y plane followed by
    /// interleaved, subsampled V/U.
    YuvNv21,
}

impl ColorFormat {
    /// Bytes per pixel for packed formats, `None` for planar ones.
    pub fn channels(self) -> Option<u8> {
        match self {
            ColorFormat::Rgb | ColorFormat::Bgr => Some(3),
            ColorFormat::Rgba => Some(4),
            ColorFormat::Gray => Some(1),
            ColorFormat::YuvNv21 => None,
        }
    }

    /// Expected buffer length for a `width` x `height` image.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self.channels() {
            Some(c) => w * h * c as usize,
            None => w * h + 2 * w.div_ceil(2) * h.div_ceil(2),
        }
    }
}

/// Rotation the detector should apply to bring the image upright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Upright,
    Cw90,
    Ccw90,
    Half,
}

impl Rotation {
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Ccw90)
    }
}

/// A single camera or image frame.
///
/// The dispatcher never looks inside the pixel data; only the detector
/// capability interprets it.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: ColorFormat,
    rotation: Rotation,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: ColorFormat) -> Self {
        debug_assert_eq!(
            data.len(),
            format.buffer_len(width, height),
            "data length must match width, height and color format"
        );
        Self {
            data,
            width,
            height,
            format,
            rotation: Rotation::Upright,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ColorFormat {
        self.format
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Width and height after the target rotation is applied.
    pub fn oriented_dimensions(&self) -> (u32, u32) {
        if self.rotation.is_quarter_turn() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// `(height, width, channels)` view for packed formats.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        let channels = self.format.channels()?;
        let shape = (
            self.height as usize,
            self.width as usize,
            channels as usize,
        );
        ArrayView3::from_shape(shape, &self.data).ok()
    }

    /// Luminance plane of an NV21 frame.
    pub fn luma_plane(&self) -> Option<ArrayView2<'_, u8>> {
        if self.format != ColorFormat::YuvNv21 {
            return None;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        ArrayView2::from_shape((h, w), self.data.get(..w * h)?).ok()
    }
}

/// A frame paired with the capture timestamp (seconds) it is submitted under.
#[derive(Clone, Debug)]
pub struct FrameUnit {
    pub frame: Frame,
    pub timestamp: f64,
}

impl FrameUnit {
    pub fn new(frame: Frame, timestamp: f64) -> Self {
        Self { frame, timestamp }
    }
}
