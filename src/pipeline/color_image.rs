use crate::{
    sensor::SensorError,
    types::{BgraImage, Bgr, ColorFrame, FrameDescription},
};

use super::{draw, overlay::Canvas};

/// Fixed-size BGRA buffer sized once from the color stream description.
///
/// Starts empty; becomes non-empty with the first frame written into it and
/// never changes dimensions afterwards.
#[derive(Clone, Debug)]
pub struct ColorImage {
    image: BgraImage,
    has_frame: bool,
}

impl ColorImage {
    pub fn new(description: FrameDescription) -> Self {
        Self {
            image: BgraImage::new(description.width, description.height),
            has_frame: false,
        }
    }

    /// Replaces the entire contents with `frame`.
    pub fn overwrite(&mut self, frame: &ColorFrame) -> Result<(), SensorError> {
        let expected = self.image.data.len();
        if frame.width != self.image.width
            || frame.height != self.image.height
            || frame.bgra.len() != expected
        {
            return Err(SensorError::BufferSize {
                got: frame.bgra.len(),
                expected,
            });
        }
        self.image.data.copy_from_slice(&frame.bgra);
        self.has_frame = true;
        Ok(())
    }

    /// Copies another image of the same dimensions, including its emptiness.
    pub fn copy_from(&mut self, other: &ColorImage) {
        if other.image.data.len() == self.image.data.len() {
            self.image.data.copy_from_slice(&other.image.data);
            self.has_frame = other.has_frame;
        }
    }

    pub fn as_bgra(&self) -> &BgraImage {
        &self.image
    }
}

impl Canvas for ColorImage {
    fn width(&self) -> u32 {
        self.image.width
    }

    fn height(&self) -> u32 {
        self.image.height
    }

    fn is_empty(&self) -> bool {
        !self.has_frame || self.image.data.is_empty()
    }

    fn fill_circle(&mut self, center: (i32, i32), radius: i32, color: Bgr) {
        draw::fill_circle(
            &mut self.image.data,
            self.image.width,
            self.image.height,
            center,
            radius,
            color,
        );
    }

    fn stroke_circle(&mut self, center: (i32, i32), radius: i32, thickness: i32, color: Bgr) {
        draw::stroke_circle(
            &mut self.image.data,
            self.image.width,
            self.image.height,
            center,
            radius,
            thickness,
            color,
        );
    }
}
