//! Scripted sensor used by unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use super::{
    BodyFrame, BodyFrameReader, BodyHandle, ColorFrameReader, CoordinateMapper, SensorDevice,
    SensorError,
};
use crate::types::{
    CameraSpacePoint, ColorFrame, ColorSpacePoint, FrameDescription, HandReading, HandSide,
    HandState, Joint, JointSet, JointType, TrackingConfidence, TrackingState, untracked_joints,
};

#[derive(Default)]
struct Shared {
    color: Mutex<VecDeque<ColorFrame>>,
    bodies: Mutex<VecDeque<BodyFrame>>,
    issued: AtomicUsize,
    released: AtomicUsize,
    closes: AtomicUsize,
    color_disconnected: AtomicBool,
}

pub struct FakeSensor {
    description: FrameDescription,
    shared: Arc<Shared>,
    open: bool,
    fail_open: bool,
    report_open: bool,
}

#[derive(Clone)]
pub struct FakeSensorProbe {
    shared: Arc<Shared>,
}

impl FakeSensor {
    pub fn new(description: FrameDescription) -> (Self, FakeSensorProbe) {
        let shared = Arc::new(Shared::default());
        let sensor = Self {
            description,
            shared: shared.clone(),
            open: false,
            fail_open: false,
            report_open: true,
        };
        (sensor, FakeSensorProbe { shared })
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn never_reports_open(mut self) -> Self {
        self.report_open = false;
        self
    }
}

impl SensorDevice for FakeSensor {
    fn name(&self) -> &str {
        "fake"
    }

    fn open(&mut self) -> Result<(), SensorError> {
        if self.fail_open {
            return Err(SensorError::OpenFailed("scripted failure".into()));
        }
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open && self.report_open
    }

    fn close(&mut self) {
        self.open = false;
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn coordinate_mapper(&self) -> Result<Arc<dyn CoordinateMapper>, SensorError> {
        Ok(Arc::new(IdentityMapper))
    }

    fn color_frame_description(&self) -> Result<FrameDescription, SensorError> {
        Ok(self.description)
    }

    fn open_color_reader(&mut self) -> Result<Box<dyn ColorFrameReader>, SensorError> {
        Ok(Box::new(FakeColorReader {
            shared: self.shared.clone(),
        }))
    }

    fn open_body_reader(&mut self) -> Result<Box<dyn BodyFrameReader>, SensorError> {
        Ok(Box::new(FakeBodyReader {
            shared: self.shared.clone(),
        }))
    }
}

impl FakeSensorProbe {
    pub fn push_color(&self, frame: ColorFrame) {
        if let Ok(mut queue) = self.shared.color.lock() {
            queue.push_back(frame);
        }
    }

    pub fn push_solid_color(&self, width: u32, height: u32, bgra: [u8; 4]) {
        let data = bgra.repeat((width * height) as usize);
        self.push_color(ColorFrame {
            bgra: data,
            width,
            height,
        });
    }

    /// The color reader reports a dead stream from now on.
    pub fn disconnect_color(&self) {
        self.shared.color_disconnected.store(true, Ordering::SeqCst);
    }

    pub fn push_bodies(&self, bodies: Vec<Option<FakeBody>>) {
        let handles = bodies
            .into_iter()
            .map(|body| body.map(|b| Box::new(b) as Box<dyn BodyHandle>))
            .collect();
        if let Ok(mut queue) = self.shared.bodies.lock() {
            queue.push_back(BodyFrame::new(handles));
        }
    }

    pub fn body(&self, tracked: bool) -> FakeBody {
        self.shared.issued.fetch_add(1, Ordering::SeqCst);
        FakeBody {
            tracked,
            joints: untracked_joints(),
            left: HandReading::new(HandState::NotTracked, TrackingConfidence::Low),
            right: HandReading::new(HandState::NotTracked, TrackingConfidence::Low),
            fail_queries: false,
            shared: self.shared.clone(),
        }
    }

    pub fn issued(&self) -> usize {
        self.shared.issued.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.issued() - self.released()
    }

    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

pub struct FakeBody {
    tracked: bool,
    joints: JointSet,
    left: HandReading,
    right: HandReading,
    fail_queries: bool,
    shared: Arc<Shared>,
}

impl FakeBody {
    /// Places `joint` at pixel (`x`, `y`) under [`IdentityMapper`].
    pub fn with_joint(mut self, joint: JointType, x: f32, y: f32, state: TrackingState) -> Self {
        self.joints[joint.index()] = Joint {
            joint_type: joint,
            position: CameraSpacePoint { x, y, z: 1.0 },
            tracking_state: state,
        };
        self
    }

    /// A joint the mapper refuses to project.
    pub fn with_unmappable_joint(mut self, joint: JointType) -> Self {
        self.joints[joint.index()] = Joint {
            joint_type: joint,
            position: CameraSpacePoint {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            tracking_state: TrackingState::Tracked,
        };
        self
    }

    pub fn with_hand(mut self, side: HandSide, state: HandState, confidence: TrackingConfidence) -> Self {
        let reading = HandReading::new(state, confidence);
        match side {
            HandSide::Left => self.left = reading,
            HandSide::Right => self.right = reading,
        }
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }
}

impl BodyHandle for FakeBody {
    fn is_tracked(&self) -> Result<bool, SensorError> {
        if self.fail_queries {
            return Err(SensorError::Query("scripted failure".into()));
        }
        Ok(self.tracked)
    }

    fn joints(&self) -> Result<JointSet, SensorError> {
        if self.fail_queries {
            return Err(SensorError::Query("scripted failure".into()));
        }
        Ok(self.joints)
    }

    fn hand(&self, side: HandSide) -> Result<HandReading, SensorError> {
        Ok(match side {
            HandSide::Left => self.left,
            HandSide::Right => self.right,
        })
    }
}

impl Drop for FakeBody {
    fn drop(&mut self) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeColorReader {
    shared: Arc<Shared>,
}

impl ColorFrameReader for FakeColorReader {
    fn acquire_latest_frame(&mut self) -> Result<ColorFrame, SensorError> {
        if self.shared.color_disconnected.load(Ordering::SeqCst) {
            return Err(SensorError::Disconnected);
        }
        self.shared
            .color
            .lock()
            .map_err(|_| SensorError::Disconnected)?
            .pop_front()
            .ok_or(SensorError::FramePending)
    }
}

struct FakeBodyReader {
    shared: Arc<Shared>,
}

impl BodyFrameReader for FakeBodyReader {
    fn acquire_latest_frame(&mut self) -> Result<BodyFrame, SensorError> {
        self.shared
            .bodies
            .lock()
            .map_err(|_| SensorError::Disconnected)?
            .pop_front()
            .ok_or(SensorError::FramePending)
    }
}

/// Treats camera x/y as pixel coordinates; rejects points behind the sensor.
pub struct IdentityMapper;

impl CoordinateMapper for IdentityMapper {
    fn map_camera_point_to_color_space(
        &self,
        point: CameraSpacePoint,
    ) -> Result<ColorSpacePoint, SensorError> {
        if point.z <= 0.0 {
            return Err(SensorError::Mapping {
                x: point.x,
                y: point.y,
                z: point.z,
            });
        }
        Ok(ColorSpacePoint {
            x: point.x,
            y: point.y,
        })
    }
}
