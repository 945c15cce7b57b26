//! Simulated depth sensor.
//!
//! Publishes an animated color stream and a body stream with scripted
//! skeletons so the overlay can run without hardware.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, bounded};
use image::imageops::FilterType;
use rayon::prelude::*;

use super::{
    BodyFrame, BodyFrameReader, BodyHandle, ColorFrameReader, CoordinateMapper, PinholeMapper,
    SensorDevice, SensorError,
    bgra_converter::swap_red_blue,
    channel::{ChannelReader, ProducerThreads},
};
use crate::types::{
    BODY_COUNT, CameraSpacePoint, ColorFrame, FrameDescription, HandReading, HandSide, HandState,
    Joint, JointSet, JointType, TrackingConfidence, TrackingState,
};

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub frame_interval: Duration,
    /// Still image used as the color stream instead of the test pattern.
    pub background: Option<PathBuf>,
    /// Bodies the animation tracks; the rest of the slots stay untracked.
    pub tracked_bodies: usize,
    pub body_capacity: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            background: None,
            tracked_bodies: 2,
            body_capacity: BODY_COUNT,
        }
    }
}

pub struct SyntheticSensor {
    config: SyntheticConfig,
    description: FrameDescription,
    producers: Option<ProducerThreads>,
    color_rx: Option<crossbeam_channel::Receiver<ColorFrame>>,
    body_rx: Option<crossbeam_channel::Receiver<BodyFrame>>,
    leases: Arc<AtomicUsize>,
}

impl SyntheticSensor {
    pub fn new(config: SyntheticConfig) -> Self {
        let description = FrameDescription::bgra(config.width, config.height);
        Self {
            config,
            description,
            producers: None,
            color_rx: None,
            body_rx: None,
            leases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Body handles handed out and not yet returned.
    pub fn outstanding_bodies(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn body_leases(&self) -> Arc<AtomicUsize> {
        self.leases.clone()
    }
}

impl SensorDevice for SyntheticSensor {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&mut self) -> Result<(), SensorError> {
        if self.producers.is_some() {
            return Ok(());
        }
        if self.config.width == 0 || self.config.height == 0 {
            return Err(SensorError::OpenFailed(format!(
                "invalid color resolution {}x{}",
                self.config.width, self.config.height
            )));
        }

        let background = match &self.config.background {
            Some(path) => Some(
                load_background(path, self.config.width, self.config.height)
                    .map_err(|err| SensorError::OpenFailed(format!("{err:#}")))?,
            ),
            None => None,
        };

        let mut producers = ProducerThreads::new();

        let (color_tx, color_rx) = bounded(1);
        let pattern = ColorPattern {
            width: self.config.width,
            height: self.config.height,
            background,
        };
        producers.push(spawn_color_producer(
            pattern,
            color_tx,
            self.config.frame_interval,
            producers.stop_flag(),
        ));

        let (body_tx, body_rx) = bounded(1);
        let animator = BodyAnimator::new(
            self.config.tracked_bodies,
            self.config.body_capacity,
            self.leases.clone(),
        );
        producers.push(spawn_body_producer(
            animator,
            body_tx,
            self.config.frame_interval,
            producers.stop_flag(),
        ));

        self.color_rx = Some(color_rx);
        self.body_rx = Some(body_rx);
        self.producers = Some(producers);
        log::info!(
            "synthetic sensor streaming {}x{} with {} tracked bodies",
            self.config.width,
            self.config.height,
            self.config.tracked_bodies.min(self.config.body_capacity)
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.producers.is_some()
    }

    fn close(&mut self) {
        if let Some(mut producers) = self.producers.take() {
            producers.stop();
        }
        // Queued frames still hold body handles.
        self.color_rx = None;
        self.body_rx = None;
        let outstanding = self.outstanding_bodies();
        if outstanding > 0 {
            log::warn!("synthetic sensor closed with {outstanding} body handles still held");
        }
    }

    fn coordinate_mapper(&self) -> Result<Arc<dyn CoordinateMapper>, SensorError> {
        Ok(Arc::new(PinholeMapper::for_description(&self.description)))
    }

    fn color_frame_description(&self) -> Result<FrameDescription, SensorError> {
        Ok(self.description)
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

impl Drop for SyntheticSensor {
    fn drop(&mut self) {
        self.close();
    }
}

fn load_background(path: &Path, width: u32, height: u32) -> Result<Vec<u8>> {
    let img = image::open(path)
        .with_context(|| format!("failed to load background {}", path.display()))?
        .to_rgba8();
    let resized = image::imageops::resize(&img, width, height, FilterType::Triangle);
    let mut bgra = resized.into_raw();
    swap_red_blue(&mut bgra);
    Ok(bgra)
}

struct ColorPattern {
    width: u32,
    height: u32,
    background: Option<Vec<u8>>,
}

impl ColorPattern {
    fn render(&self, t: f32) -> Vec<u8> {
        if let Some(background) = &self.background {
            return background.clone();
        }

        let width = self.width as usize;
        let height = self.height.max(1) as f32;
        let shift = (t * 60.0) as usize;
        let mut bgra = vec![0u8; width * self.height as usize * 4];
        bgra.par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| {
                let g = (y as f32 / height * 160.0) as u8 + 40;
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    px[0] = ((x + shift) % 256) as u8 / 2 + 48;
                    px[1] = g;
                    px[2] = 48;
                    px[3] = 255;
                }
            });
        bgra
    }
}

fn spawn_color_producer(
    pattern: ColorPattern,
    tx: Sender<ColorFrame>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            let frame = ColorFrame {
                bgra: pattern.render(start.elapsed().as_secs_f32()),
                width: pattern.width,
                height: pattern.height,
            };
            // Drop the frame if the previous one has not been picked up yet.
            let _ = tx.try_send(frame);
            thread::sleep(interval);
        }
    })
}

pub(super) fn spawn_body_producer(
    animator: BodyAnimator,
    tx: Sender<BodyFrame>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            let frame = animator.frame(start.elapsed().as_secs_f32());
            let _ = tx.try_send(frame);
            thread::sleep(interval);
        }
    })
}

// Standing pose relative to the spine base, in meters (x right, y up).
const POSE: [(JointType, f32, f32); 25] = [
    (JointType::SpineBase, 0.0, 0.0),
    (JointType::SpineMid, 0.0, 0.30),
    (JointType::Neck, 0.0, 0.62),
    (JointType::Head, 0.0, 0.78),
    (JointType::ShoulderLeft, -0.19, 0.55),
    (JointType::ElbowLeft, -0.30, 0.30),
    (JointType::WristLeft, -0.34, 0.08),
    (JointType::HandLeft, -0.35, 0.0),
    (JointType::ShoulderRight, 0.19, 0.55),
    (JointType::ElbowRight, 0.36, 0.62),
    (JointType::WristRight, 0.40, 0.86),
    (JointType::HandRight, 0.41, 0.94),
    (JointType::HipLeft, -0.09, -0.04),
    (JointType::KneeLeft, -0.11, -0.45),
    (JointType::AnkleLeft, -0.12, -0.85),
    (JointType::FootLeft, -0.13, -0.90),
    (JointType::HipRight, 0.09, -0.04),
    (JointType::KneeRight, 0.11, -0.45),
    (JointType::AnkleRight, 0.12, -0.85),
    (JointType::FootRight, 0.13, -0.90),
    (JointType::SpineShoulder, 0.0, 0.55),
    (JointType::HandTipLeft, -0.36, -0.08),
    (JointType::ThumbLeft, -0.31, 0.01),
    (JointType::HandTipRight, 0.42, 1.03),
    (JointType::ThumbRight, 0.36, 0.95),
];

const HAND_CYCLE: [HandState; 4] = [
    HandState::Open,
    HandState::Closed,
    HandState::Lasso,
    HandState::Unknown,
];

const SPINE_BASE_HEIGHT: f32 = -0.25;
const BODY_DEPTH: f32 = 2.6;
const BODY_SPACING: f32 = 0.9;

/// Generates body frames for a fixed set of animated bodies.
pub struct BodyAnimator {
    tracked: usize,
    capacity: usize,
    leases: Arc<AtomicUsize>,
}

impl BodyAnimator {
    pub fn new(tracked: usize, capacity: usize, leases: Arc<AtomicUsize>) -> Self {
        Self {
            tracked: tracked.min(capacity),
            capacity,
            leases,
        }
    }

    pub fn frame(&self, t: f32) -> BodyFrame {
        let bodies = (0..self.capacity)
            .map(|slot| {
                let body = if slot < self.tracked {
                    self.animate(slot, t)
                } else {
                    SyntheticBody::untracked(self.leases.clone())
                };
                Some(Box::new(body) as Box<dyn BodyHandle>)
            })
            .collect();
        BodyFrame::new(bodies)
    }

    fn animate(&self, slot: usize, t: f32) -> SyntheticBody {
        let phase = t + slot as f32 * 1.7;
        let center = (slot as f32 - (self.tracked as f32 - 1.0) / 2.0) * BODY_SPACING;
        let sway = (phase * 0.8).sin() * 0.12;
        let wave = (phase * 3.0).sin() * 0.08;

        let mut joints = crate::types::untracked_joints();
        for (joint_type, dx, dy) in POSE {
            let raised = matches!(
                joint_type,
                JointType::WristRight
                    | JointType::HandRight
                    | JointType::HandTipRight
                    | JointType::ThumbRight
            );
            let x = center + sway + dx + if raised { wave } else { 0.0 };
            let tracking_state = match joint_type {
                JointType::FootLeft | JointType::FootRight => TrackingState::Inferred,
                JointType::HandTipLeft | JointType::ThumbLeft if phase.sin() > 0.6 => {
                    TrackingState::NotTracked
                }
                _ => TrackingState::Tracked,
            };
            joints[joint_type.index()] = Joint {
                joint_type,
                position: CameraSpacePoint {
                    x,
                    y: SPINE_BASE_HEIGHT + dy,
                    z: BODY_DEPTH,
                },
                tracking_state,
            };
        }

        let step = (phase / 2.0).max(0.0) as usize;
        let confidence = |offset: f32| {
            if (phase + offset).fract() < 0.15 {
                TrackingConfidence::Low
            } else {
                TrackingConfidence::High
            }
        };
        let left = HandReading::new(HAND_CYCLE[(step + 2) % HAND_CYCLE.len()], confidence(0.5));
        let right = HandReading::new(HAND_CYCLE[step % HAND_CYCLE.len()], confidence(0.0));

        SyntheticBody {
            tracked: true,
            joints,
            left,
            right,
            _lease: Lease::new(self.leases.clone()),
        }
    }
}

/// Counts a body handle as outstanding until it is dropped.
struct Lease {
    counter: Arc<AtomicUsize>,
}

impl Lease {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SyntheticBody {
    tracked: bool,
    joints: JointSet,
    left: HandReading,
    right: HandReading,
    _lease: Lease,
}

impl SyntheticBody {
    fn untracked(leases: Arc<AtomicUsize>) -> Self {
        let not_tracked = HandReading::new(HandState::NotTracked, TrackingConfidence::Low);
        Self {
            tracked: false,
            joints: crate::types::untracked_joints(),
            left: not_tracked,
            right: not_tracked,
            _lease: Lease::new(leases),
        }
    }
}

impl BodyHandle for SyntheticBody {
    fn is_tracked(&self) -> Result<bool, SensorError> {
        Ok(self.tracked)
    }

    fn joints(&self) -> Result<JointSet, SensorError> {
        Ok(self.joints)
    }

    fn hand(&self, side: HandSide) -> Result<HandReading, SensorError> {
        Ok(match side {
            HandSide::Left => self.left,
            HandSide::Right => self.right,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_fill_every_slot_and_track_the_first_bodies() {
        let leases = Arc::new(AtomicUsize::new(0));
        let animator = BodyAnimator::new(2, BODY_COUNT, leases.clone());
        let frame = animator.frame(0.4);
        assert_eq!(frame.bodies.len(), BODY_COUNT);
        let tracked: Vec<bool> = frame
            .bodies
            .iter()
            .map(|b| b.as_ref().unwrap().is_tracked().unwrap())
            .collect();
        assert_eq!(tracked, vec![true, true, false, false, false, false]);
        assert_eq!(leases.load(Ordering::SeqCst), BODY_COUNT);
        drop(frame);
        assert_eq!(leases.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn animated_joints_project_inside_the_color_frame() {
        let description = FrameDescription::bgra(1920, 1080);
        let mapper = PinholeMapper::for_description(&description);
        let animator = BodyAnimator::new(1, 1, Arc::new(AtomicUsize::new(0)));
        for step in 0..20 {
            let frame = animator.frame(step as f32 * 0.37);
            let joints = frame.bodies[0].as_ref().unwrap().joints().unwrap();
            for joint in joints.iter().filter(|j| j.is_tracked()) {
                let (x, y) = mapper
                    .map_camera_point_to_color_space(joint.position)
                    .unwrap()
                    .to_pixel()
                    .unwrap();
                assert!((0..1920).contains(&x), "{:?} x={x}", joint.joint_type);
                assert!((0..1080).contains(&y), "{:?} y={y}", joint.joint_type);
            }
        }
    }

    #[test]
    fn closing_stops_streams_and_returns_handles() {
        let mut sensor = SyntheticSensor::new(SyntheticConfig {
            width: 32,
            height: 16,
            frame_interval: Duration::from_millis(1),
            ..SyntheticConfig::default()
        });
        sensor.open().unwrap();
        assert!(sensor.is_open());
        let mut color = sensor.open_color_reader().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let frame = loop {
            match color.acquire_latest_frame() {
                Ok(frame) => break frame,
                Err(SensorError::FramePending) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(1));
                }
                Err(err) => panic!("no color frame: {err}"),
            }
        };
        assert_eq!(frame.bgra.len(), 32 * 16 * 4);

        sensor.close();
        assert!(!sensor.is_open());
        assert_eq!(sensor.outstanding_bodies(), 0);
    }

    #[test]
    fn readers_are_unavailable_before_open() {
        let mut sensor = SyntheticSensor::new(SyntheticConfig::default());
        assert!(matches!(
            sensor.open_color_reader().err(),
            Some(SensorError::StreamUnavailable("color"))
        ));
    }
}
