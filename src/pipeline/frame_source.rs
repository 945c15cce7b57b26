use crate::{
    sensor::{BodyFrame, BodyFrameReader, ColorFrameReader, SensorContext, SensorError},
    types::ColorFrame,
};

/// Non-blocking access to the newest color and body frames.
///
/// `Ok(None)` means no new frame since the last successful acquisition;
/// callers keep whatever they already hold. An `Err` means the stream is
/// gone for good.
pub struct FrameSource {
    color: Option<Box<dyn ColorFrameReader>>,
    bodies: Option<Box<dyn BodyFrameReader>>,
}

impl FrameSource {
    pub fn open(context: &mut SensorContext) -> Result<Self, SensorError> {
        let color = context.open_color_reader()?;
        let bodies = context.open_body_reader()?;
        Ok(Self::new(color, bodies))
    }

    pub fn new(color: Box<dyn ColorFrameReader>, bodies: Box<dyn BodyFrameReader>) -> Self {
        Self {
            color: Some(color),
            bodies: Some(bodies),
        }
    }

    pub fn try_acquire_color(&mut self) -> Result<Option<ColorFrame>, SensorError> {
        let Some(reader) = self.color.as_mut() else {
            return Ok(None);
        };
        latest("color", reader.acquire_latest_frame())
    }

    pub fn try_acquire_bodies(&mut self) -> Result<Option<BodyFrame>, SensorError> {
        let Some(reader) = self.bodies.as_mut() else {
            return Ok(None);
        };
        latest("body", reader.acquire_latest_frame())
    }

    /// Drops both readers, and with them any frames still queued behind them.
    /// Later acquisitions report no frame.
    pub fn close(&mut self) {
        let had_readers = self.color.take().is_some() | self.bodies.take().is_some();
        if had_readers {
            log::debug!("frame readers closed");
        }
    }
}

fn latest<T>(stream: &str, result: Result<T, SensorError>) -> Result<Option<T>, SensorError> {
    match result {
        Ok(frame) => Ok(Some(frame)),
        Err(SensorError::FramePending) => {
            log::trace!("no new {stream} frame");
            Ok(None)
        }
        Err(SensorError::Disconnected) => {
            log::warn!("{stream} stream disconnected");
            Err(SensorError::Disconnected)
        }
        Err(err) => {
            log::debug!("{stream} frame unavailable: {err}");
            Ok(None)
        }
    }
}
