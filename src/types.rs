/// Maximum number of bodies the sensor tracks at once.
pub const BODY_COUNT: usize = 6;

/// Number of entries in [`JointType`].
pub const JOINT_COUNT: usize = 25;

/// Color stream pixels are always blue, green, red, alpha.
pub const BGRA_BYTES_PER_PIXEL: u32 = 4;

/// Shape of the sensor's color stream, queried once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDescription {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl FrameDescription {
    pub fn bgra(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel: BGRA_BYTES_PER_PIXEL,
        }
    }
}

/// One color frame handed out by a color reader.
#[derive(Clone, Debug)]
pub struct ColorFrame {
    pub bgra: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Packed BGRA pixels with fixed dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BgraImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl BgraImage {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize) * BGRA_BYTES_PER_PIXEL as usize;
        Self {
            data: vec![0u8; len],
            width,
            height,
        }
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) as usize) * 4;
        self.data
            .get(idx..idx + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }
}

/// A display color in the sensor's blue/green/red channel order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bgr {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Bgr {
    pub const fn new(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }
}

/// Point in the depth sensor's 3D space, in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Point in color-image pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorSpacePoint {
    pub x: f32,
    pub y: f32,
}

impl ColorSpacePoint {
    /// Nearest integer pixel, or `None` when the mapper produced a non-finite point.
    pub fn to_pixel(self) -> Option<(i32, i32)> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        Some(((self.x + 0.5).floor() as i32, (self.y + 0.5).floor() as i32))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointType {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointType {
    pub const ALL: [JointType; JOINT_COUNT] = [
        JointType::SpineBase,
        JointType::SpineMid,
        JointType::Neck,
        JointType::Head,
        JointType::ShoulderLeft,
        JointType::ElbowLeft,
        JointType::WristLeft,
        JointType::HandLeft,
        JointType::ShoulderRight,
        JointType::ElbowRight,
        JointType::WristRight,
        JointType::HandRight,
        JointType::HipLeft,
        JointType::KneeLeft,
        JointType::AnkleLeft,
        JointType::FootLeft,
        JointType::HipRight,
        JointType::KneeRight,
        JointType::AnkleRight,
        JointType::FootRight,
        JointType::SpineShoulder,
        JointType::HandTipLeft,
        JointType::ThumbLeft,
        JointType::HandTipRight,
        JointType::ThumbRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Which hand this joint carries a hand-state reading for, if any.
    pub fn hand_side(self) -> Option<HandSide> {
        match self {
            JointType::HandLeft => Some(HandSide::Left),
            JointType::HandRight => Some(HandSide::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingState {
    NotTracked,
    Inferred,
    Tracked,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub joint_type: JointType,
    pub position: CameraSpacePoint,
    pub tracking_state: TrackingState,
}

impl Joint {
    pub fn not_tracked(joint_type: JointType) -> Self {
        Self {
            joint_type,
            position: CameraSpacePoint::default(),
            tracking_state: TrackingState::NotTracked,
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_state != TrackingState::NotTracked
    }
}

/// Full joint set of one body, indexed by [`JointType::index`].
pub type JointSet = [Joint; JOINT_COUNT];

pub fn untracked_joints() -> JointSet {
    JointType::ALL.map(Joint::not_tracked)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandState {
    Unknown,
    NotTracked,
    Open,
    Closed,
    Lasso,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingConfidence {
    Low,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandReading {
    pub state: HandState,
    pub confidence: TrackingConfidence,
}

impl HandReading {
    pub const fn new(state: HandState, confidence: TrackingConfidence) -> Self {
        Self { state, confidence }
    }
}

/// Keys the display surface reports back to the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}
