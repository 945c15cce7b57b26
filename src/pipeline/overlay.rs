//! Joint and hand-state overlay.
//!
//! For every tracked body, each joint the sensor did not lose is projected
//! into the color image and marked with the body's palette color. Hand joints
//! additionally get a ring whose color encodes a high-confidence hand state.

use crate::{
    sensor::{BodyHandle, CoordinateMapper, SensorError},
    types::{Bgr, HandReading, HandState, Joint, TrackingConfidence},
};

use super::body_slots::BodySlotTable;

pub const JOINT_RADIUS: i32 = 5;
pub const HAND_RADIUS: i32 = 75;
pub const HAND_THICKNESS: i32 = 5;

pub const HAND_OPEN: Bgr = Bgr::new(0, 128, 0);
pub const HAND_CLOSED: Bgr = Bgr::new(0, 0, 128);
pub const HAND_LASSO: Bgr = Bgr::new(128, 0, 0);

const BASE_PALETTE: [Bgr; 6] = [
    Bgr::new(255, 0, 0),
    Bgr::new(0, 255, 0),
    Bgr::new(0, 0, 255),
    Bgr::new(255, 255, 0),
    Bgr::new(255, 0, 255),
    Bgr::new(0, 255, 255),
];

/// Drawing target for the overlay.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// True while there is nothing to draw on yet.
    fn is_empty(&self) -> bool;
    fn fill_circle(&mut self, center: (i32, i32), radius: i32, color: Bgr);
    fn stroke_circle(&mut self, center: (i32, i32), radius: i32, thickness: i32, color: Bgr);
}

/// Display color per body slot, fixed at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorPalette {
    colors: Vec<Bgr>,
}

impl ColorPalette {
    /// Blue, green, red, cyan, magenta, yellow; repeats past six slots.
    pub fn new(slots: usize) -> Self {
        Self {
            colors: BASE_PALETTE.iter().copied().cycle().take(slots).collect(),
        }
    }

    pub fn color(&self, slot: usize) -> Bgr {
        self.colors
            .get(slot)
            .copied()
            .unwrap_or(BASE_PALETTE[slot % BASE_PALETTE.len()])
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.colors.len()
    }
}

/// Ring color for a hand reading; `None` means nothing is drawn.
pub fn hand_state_color(reading: HandReading) -> Option<Bgr> {
    if reading.confidence != TrackingConfidence::High {
        return None;
    }
    match reading.state {
        HandState::Open => Some(HAND_OPEN),
        HandState::Closed => Some(HAND_CLOSED),
        HandState::Lasso => Some(HAND_LASSO),
        HandState::Unknown | HandState::NotTracked => None,
    }
}

pub struct OverlayRenderer {
    palette: ColorPalette,
}

impl OverlayRenderer {
    pub fn new(palette: ColorPalette) -> Self {
        Self { palette }
    }

    pub fn render<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        bodies: &BodySlotTable,
        mapper: &dyn CoordinateMapper,
    ) {
        if canvas.is_empty() {
            return;
        }

        for (slot, body) in bodies.occupied() {
            let color = self.palette.color(slot);
            if let Err(err) = draw_body(canvas, body, color, mapper) {
                log::warn!("skipping body in slot {slot}: {err}");
            }
        }
    }
}

fn draw_body<C: Canvas + ?Sized>(
    canvas: &mut C,
    body: &dyn BodyHandle,
    color: Bgr,
    mapper: &dyn CoordinateMapper,
) -> Result<(), SensorError> {
    if !body.is_tracked()? {
        return Ok(());
    }

    let joints = body.joints()?;
    for joint in joints.iter().filter(|joint| joint.is_tracked()) {
        let Some(center) = project(canvas, joint, mapper) else {
            continue;
        };
        canvas.fill_circle(center, JOINT_RADIUS, color);

        let Some(side) = joint.joint_type.hand_side() else {
            continue;
        };
        match body.hand(side) {
            Ok(reading) => {
                if let Some(ring) = hand_state_color(reading) {
                    canvas.stroke_circle(center, HAND_RADIUS, HAND_THICKNESS, ring);
                }
            }
            Err(err) => log::debug!("hand state for {side:?} unavailable: {err}"),
        }
    }

    Ok(())
}

/// Pixel position of `joint`, or `None` when it cannot be mapped or falls
/// outside the canvas.
fn project<C: Canvas + ?Sized>(
    canvas: &C,
    joint: &Joint,
    mapper: &dyn CoordinateMapper,
) -> Option<(i32, i32)> {
    let point = match mapper.map_camera_point_to_color_space(joint.position) {
        Ok(point) => point,
        Err(err) => {
            log::trace!("{:?}: {err}", joint.joint_type);
            return None;
        }
    };
    let (x, y) = point.to_pixel()?;
    let inside = x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height();
    inside.then_some((x, y))
}
