//! Color stream from a regular camera via nokhwa, paired with the synthetic
//! body animation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};
use nokhwa::{
    Buffer, Camera,
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
};

use super::{
    BodyFrame, BodyFrameReader, ColorFrameReader, CoordinateMapper, PinholeMapper, SensorDevice,
    SensorError,
    bgra_converter::{self, PixelLayout},
    channel::{ChannelReader, ProducerThreads},
    synthetic::{BodyAnimator, DEFAULT_FRAME_INTERVAL, spawn_body_producer},
};
use crate::types::{ColorFrame, FrameDescription};

// Ordered by conversion cost into BGRA: a BGR payload is a plain copy, the
// YUV layouts need one pass, MJPEG a full decode.
const BGRA_FRIENDLY_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWBGR,
    FrameFormat::RAWRGB,
    FrameFormat::GRAY,
    FrameFormat::NV12,
    FrameFormat::YUYV,
    FrameFormat::MJPEG,
];

/// Format requests tried in order. The overlay is drawn at color-stream
/// resolution, so resolution wins over frame rate.
fn format_requests() -> impl Iterator<Item = RequestedFormat<'static>> {
    [
        RequestedFormatType::AbsoluteHighestResolution,
        RequestedFormatType::AbsoluteHighestFrameRate,
    ]
    .into_iter()
    .map(|kind| RequestedFormat::with_formats(kind, BGRA_FRIENDLY_FORMATS))
    .chain([RequestedFormat::new::<RgbFormat>(RequestedFormatType::None)])
}

fn open_camera(index: &CameraIndex) -> Result<Camera> {
    let mut failures = Vec::new();

    for (attempt_no, requested) in format_requests().enumerate() {
        let attempt = Camera::new(index.clone(), requested).and_then(|mut camera| {
            camera.open_stream()?;
            Ok(camera)
        });
        match attempt {
            Ok(camera) => {
                log::info!(
                    "camera {index} streaming {} as {:?}",
                    camera.resolution(),
                    camera.frame_format()
                );
                return Ok(camera);
            }
            Err(err) => {
                log::debug!("camera {index} rejected format request {attempt_no}: {err}");
                failures.push(err.to_string());
            }
        }
    }

    Err(anyhow!(
        "camera {index} accepted none of the requested formats: {}",
        failures.join("; ")
    ))
}

fn pixel_layout(format: FrameFormat) -> PixelLayout {
    match format {
        FrameFormat::NV12 => PixelLayout::Nv12,
        FrameFormat::YUYV => PixelLayout::Yuyv,
        FrameFormat::MJPEG => PixelLayout::Mjpeg,
        FrameFormat::RAWRGB => PixelLayout::RawRgb,
        FrameFormat::RAWBGR => PixelLayout::RawBgr,
        FrameFormat::GRAY => PixelLayout::Gray,
    }
}

fn convert_camera_frame(frame: &Buffer) -> Result<ColorFrame> {
    let resolution = frame.resolution();
    let width = resolution.width_x;
    let height = resolution.height_y;
    let bgra = bgra_converter::to_bgra(
        pixel_layout(frame.source_frame_format()),
        frame.buffer(),
        width,
        height,
    )?;

    Ok(ColorFrame {
        bgra,
        width,
        height,
    })
}

pub struct WebcamSensor {
    index: u32,
    tracked_bodies: usize,
    body_capacity: usize,
    description: Option<FrameDescription>,
    producers: Option<ProducerThreads>,
    color_rx: Option<Receiver<ColorFrame>>,
    body_rx: Option<Receiver<BodyFrame>>,
    leases: Arc<AtomicUsize>,
}

impl WebcamSensor {
    pub fn new(index: u32, tracked_bodies: usize, body_capacity: usize) -> Self {
        Self {
            index,
            tracked_bodies,
            body_capacity,
            description: None,
            producers: None,
            color_rx: None,
            body_rx: None,
            leases: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SensorDevice for WebcamSensor {
    fn name(&self) -> &str {
        "webcam"
    }

    fn open(&mut self) -> Result<(), SensorError> {
        if self.producers.is_some() {
            return Ok(());
        }

        let cameras =
            query(ApiBackend::Auto).map_err(|err| SensorError::OpenFailed(err.to_string()))?;
        if cameras.is_empty() {
            return Err(SensorError::DeviceNotFound);
        }

        let index = CameraIndex::Index(self.index);
        // Fail fast before spawning the capture thread.
        let resolution = open_camera(&index)
            .map_err(|err| SensorError::OpenFailed(format!("{err:#}")))?
            .resolution();
        let description = FrameDescription::bgra(resolution.width_x, resolution.height_y);

        let mut producers = ProducerThreads::new();

        let (color_tx, color_rx) = bounded(1);
        producers.push(spawn_capture(index, color_tx, producers.stop_flag()));

        let (body_tx, body_rx) = bounded(1);
        let animator = BodyAnimator::new(
            self.tracked_bodies,
            self.body_capacity,
            self.leases.clone(),
        );
        producers.push(spawn_body_producer(
            animator,
            body_tx,
            DEFAULT_FRAME_INTERVAL,
            producers.stop_flag(),
        ));

        self.description = Some(description);
        self.color_rx = Some(color_rx);
        self.body_rx = Some(body_rx);
        self.producers = Some(producers);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.producers.is_some()
    }

    fn close(&mut self) {
        if let Some(mut producers) = self.producers.take() {
            producers.stop();
        }
        self.color_rx = None;
        self.body_rx = None;
    }

    fn coordinate_mapper(&self) -> Result<Arc<dyn CoordinateMapper>, SensorError> {
        let description = self.description.ok_or(SensorError::NotOpen)?;
        Ok(Arc::new(PinholeMapper::for_description(&description)))
    }

    fn color_frame_description(&self) -> Result<FrameDescription, SensorError> {
        self.description.ok_or(SensorError::StreamUnavailable("color"))
    }

    fn open_color_reader(&mut self) -> Result<Box<dyn ColorFrameReader>, SensorError> {
        let rx = self
            .color_rx
            .clone()
            .ok_or(SensorError::StreamUnavailable("color"))?;
        Ok(Box::new(ChannelReader::new(rx)))
    }

    fn open_body_reader(&mut self) -> Result<Box<dyn BodyFrameReader>, SensorError> {
        let rx = self
            .body_rx
            .clone()
            .ok_or(SensorError::StreamUnavailable("body"))?;
        Ok(Box::new(ChannelReader::new(rx)))
    }
}

impl Drop for WebcamSensor {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_capture(
    index: CameraIndex,
    frame_tx: Sender<ColorFrame>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut camera = match open_camera(&index) {
            Ok(cam) => cam,
            Err(err) => {
                log::error!("failed to open camera, color stream ends: {err:#}");
                return;
            }
        };

        while !stop.load(Ordering::Relaxed) {
            let frame_start = Instant::now();
            let frame = match camera.frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!(
                        "camera frame read failed (after {:?}): {err:?}",
                        frame_start.elapsed()
                    );
                    thread::sleep(Duration::from_millis(5));
                    continue;
                }
            };

            match convert_camera_frame(&frame) {
                // Drop if the reader has not consumed the previous frame.
                Ok(converted) => {
                    let _ = frame_tx.try_send(converted);
                }
                Err(err) => log::warn!("failed to decode camera frame {err:?}"),
            }
        }

        if let Err(err) = camera.stop_stream() {
            log::warn!("failed to stop camera stream: {err:?}");
        }
    })
}
