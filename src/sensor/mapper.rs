use crate::types::{CameraSpacePoint, ColorSpacePoint, FrameDescription};

use super::{CoordinateMapper, SensorError};

// Color camera intrinsics of a 1920x1080 time-of-flight sensor.
const REFERENCE_WIDTH: f32 = 1920.0;
const REFERENCE_FOCAL: f32 = 1081.37;

/// Projects camera space (x right, y up, z forward, meters) onto the color
/// image with a pinhole model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinholeMapper {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl PinholeMapper {
    /// Reference intrinsics rescaled to the stream's width.
    pub fn for_description(description: &FrameDescription) -> Self {
        let scale = description.width as f32 / REFERENCE_WIDTH;
        let focal = REFERENCE_FOCAL * scale;
        Self {
            fx: focal,
            fy: focal,
            cx: description.width as f32 / 2.0 - 0.5,
            cy: description.height as f32 / 2.0 - 0.5,
        }
    }
}

impl CoordinateMapper for PinholeMapper {
    fn map_camera_point_to_color_space(
        &self,
        point: CameraSpacePoint,
    ) -> Result<ColorSpacePoint, SensorError> {
        let unmappable = SensorError::Mapping {
            x: point.x,
            y: point.y,
            z: point.z,
        };
        if !(point.z > 0.0) {
            return Err(unmappable);
        }

        let x = self.cx + self.fx * point.x / point.z;
        let y = self.cy - self.fy * point.y / point.z;
        if !x.is_finite() || !y.is_finite() {
            return Err(unmappable);
        }

        Ok(ColorSpacePoint { x, y })
    }
}
