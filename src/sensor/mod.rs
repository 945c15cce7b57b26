//! Sensor runtime seam.
//!
//! Everything the overlay pipeline needs from a depth sensor goes through the
//! traits in this module: device lifecycle, the color and body frame readers,
//! per-body handles and the camera-to-color coordinate mapper. Concrete
//! backends live in the submodules.

pub mod bgra_converter;
mod channel;
#[cfg(test)]
pub mod fake;
pub mod mapper;
pub mod synthetic;
#[cfg(feature = "camera-nokhwa")]
pub mod webcam;

use std::sync::Arc;

use thiserror::Error;

use crate::types::{
    CameraSpacePoint, ColorFrame, ColorSpacePoint, FrameDescription, HandReading, HandSide,
    JointSet,
};

pub use mapper::PinholeMapper;
pub use synthetic::{SyntheticConfig, SyntheticSensor};
#[cfg(feature = "camera-nokhwa")]
pub use webcam::WebcamSensor;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("no sensor device found")]
    DeviceNotFound,
    #[error("failed to open sensor: {0}")]
    OpenFailed(String),
    #[error("sensor did not report open")]
    NotOpen,
    #[error("{0} stream unavailable")]
    StreamUnavailable(&'static str),
    #[error("no new frame available")]
    FramePending,
    #[error("cannot map camera point ({x}, {y}, {z}) to color space")]
    Mapping { x: f32, y: f32, z: f32 },
    #[error("body query failed: {0}")]
    Query(String),
    #[error("frame buffer size mismatch: got {got}, expected {expected}")]
    BufferSize { got: usize, expected: usize },
    #[error("sensor stream disconnected")]
    Disconnected,
}

/// Device lifecycle plus access to the streams it exposes.
pub trait SensorDevice: Send {
    fn name(&self) -> &str;
    fn open(&mut self) -> Result<(), SensorError>;
    fn is_open(&self) -> bool;
    fn close(&mut self);
    fn coordinate_mapper(&self) -> Result<Arc<dyn CoordinateMapper>, SensorError>;
    /// Description of the color stream converted to BGRA.
    fn color_frame_description(&self) -> Result<FrameDescription, SensorError>;
    fn open_color_reader(&mut self) -> Result<Box<dyn ColorFrameReader>, SensorError>;
    fn open_body_reader(&mut self) -> Result<Box<dyn BodyFrameReader>, SensorError>;
}

/// Hands out the newest color frame. Returns [`SensorError::FramePending`]
/// without blocking when nothing new arrived since the last call.
pub trait ColorFrameReader: Send {
    fn acquire_latest_frame(&mut self) -> Result<ColorFrame, SensorError>;
}

/// Hands out the newest body frame; same non-blocking contract as
/// [`ColorFrameReader`].
pub trait BodyFrameReader: Send {
    fn acquire_latest_frame(&mut self) -> Result<BodyFrame, SensorError>;
}

/// Read access to one tracked body.
///
/// Implementations are resources owned by the sensor runtime; dropping the
/// handle returns it.
pub trait BodyHandle: Send {
    fn is_tracked(&self) -> Result<bool, SensorError>;
    fn joints(&self) -> Result<JointSet, SensorError>;
    fn hand(&self, side: HandSide) -> Result<HandReading, SensorError>;
}

pub trait CoordinateMapper: Send + Sync {
    fn map_camera_point_to_color_space(
        &self,
        point: CameraSpacePoint,
    ) -> Result<ColorSpacePoint, SensorError>;
}

/// One body frame: a handle per tracking slot the runtime filled.
pub struct BodyFrame {
    pub bodies: Vec<Option<Box<dyn BodyHandle>>>,
}

impl BodyFrame {
    pub fn new(bodies: Vec<Option<Box<dyn BodyHandle>>>) -> Self {
        Self { bodies }
    }
}

impl std::fmt::Debug for BodyFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyFrame")
            .field(
                "bodies",
                &self.bodies.iter().filter(|b| b.is_some()).count(),
            )
            .field("slots", &self.bodies.len())
            .finish()
    }
}

/// Session with one opened sensor: the device, its mapper and stream shape.
///
/// Constructed once at startup and closed once at shutdown; closing is
/// idempotent and also happens on drop.
pub struct SensorContext {
    device: Box<dyn SensorDevice>,
    mapper: Arc<dyn CoordinateMapper>,
    color_description: FrameDescription,
    closed: bool,
}

impl SensorContext {
    pub fn open(mut device: Box<dyn SensorDevice>) -> Result<Self, SensorError> {
        log::info!("opening sensor {}", device.name());
        device.open()?;

        if !device.is_open() {
            device.close();
            return Err(SensorError::NotOpen);
        }

        let opened = (|| {
            let mapper = device.coordinate_mapper()?;
            let color_description = device.color_frame_description()?;
            Ok::<_, SensorError>((mapper, color_description))
        })();

        let (mapper, color_description) = match opened {
            Ok(parts) => parts,
            Err(err) => {
                device.close();
                return Err(err);
            }
        };

        log::info!(
            "color stream {}x{} @ {} bytes/pixel",
            color_description.width,
            color_description.height,
            color_description.bytes_per_pixel
        );

        Ok(Self {
            device,
            mapper,
            color_description,
            closed: false,
        })
    }

    pub fn mapper(&self) -> &dyn CoordinateMapper {
        self.mapper.as_ref()
    }

    pub fn color_description(&self) -> FrameDescription {
        self.color_description
    }

    pub fn open_color_reader(&mut self) -> Result<Box<dyn ColorFrameReader>, SensorError> {
        self.device.open_color_reader()
    }

    pub fn open_body_reader(&mut self) -> Result<Box<dyn BodyFrameReader>, SensorError> {
        self.device.open_body_reader()
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.device.close();
        log::info!("sensor {} closed", self.device.name());
    }
}

impl Drop for SensorContext {
    fn drop(&mut self) {
        self.close();
    }
}
