use crate::sensor::{BodyFrame, BodyHandle};

/// One tracking position; holds at most one body handle.
#[derive(Default)]
pub struct BodySlot {
    handle: Option<Box<dyn BodyHandle>>,
}

impl BodySlot {
    /// Returns the held handle to the sensor runtime. No-op when empty.
    pub fn release(&mut self) {
        drop(self.handle.take());
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
    }

    pub fn body(&self) -> Option<&dyn BodyHandle> {
        self.handle.as_deref()
    }

    fn fill(&mut self, handle: Option<Box<dyn BodyHandle>>) {
        self.release();
        self.handle = handle;
    }
}

/// Fixed number of body slots, refreshed wholesale from each new body frame.
pub struct BodySlotTable {
    slots: Vec<BodySlot>,
}

impl BodySlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| BodySlot::default()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Releases every slot, then moves the frame's handles in by position.
    ///
    /// Handles beyond the table's capacity are released immediately; slots
    /// the frame does not cover stay empty.
    pub fn refresh(&mut self, frame: BodyFrame) {
        self.release_all();

        let delivered = frame.bodies.len();
        if delivered != self.slots.len() {
            log::warn!(
                "body frame carries {delivered} slots, table holds {}",
                self.slots.len()
            );
        }

        let mut bodies = frame.bodies.into_iter();
        for slot in &mut self.slots {
            slot.fill(bodies.next().flatten());
        }
    }

    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.release();
        }
    }

    #[cfg(test)]
    pub fn slot(&self, index: usize) -> Option<&BodySlot> {
        self.slots.get(index)
    }

    #[cfg(test)]
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut BodySlot> {
        self.slots.get_mut(index)
    }

    /// Slots holding a handle, with their index.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &dyn BodyHandle)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.body().map(|body| (index, body)))
    }

    #[cfg(test)]
    pub fn is_all_empty(&self) -> bool {
        self.slots.iter().all(BodySlot::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sensor::fake::{FakeSensor, FakeSensorProbe},
        types::FrameDescription,
    };

    fn probe() -> FakeSensorProbe {
        FakeSensor::new(FrameDescription::bgra(8, 8)).1
    }

    fn frame(probe: &FakeSensorProbe, tracked: &[Option<bool>]) -> BodyFrame {
        BodyFrame::new(
            tracked
                .iter()
                .map(|t| t.map(|t| Box::new(probe.body(t)) as Box<dyn BodyHandle>))
                .collect(),
        )
    }

    #[test]
    fn starts_with_exactly_capacity_empty_slots() {
        let table = BodySlotTable::new(6);
        assert_eq!(table.capacity(), 6);
        assert!(table.is_all_empty());
        assert!(table.slot(5).is_some());
        assert!(table.slot(6).is_none());
    }

    #[test]
    fn refresh_releases_previous_generation_before_overwriting() {
        let probe = probe();
        let mut table = BodySlotTable::new(3);

        table.refresh(frame(&probe, &[Some(true), Some(false), Some(true)]));
        assert_eq!(probe.issued(), 3);
        assert_eq!(probe.released(), 0);

        table.refresh(frame(&probe, &[Some(true), None, None]));
        assert_eq!(probe.released(), 3);
        assert_eq!(probe.outstanding(), 1);
        assert!(!table.slot(0).unwrap().is_empty());
        assert!(table.slot(1).unwrap().is_empty());
        assert!(table.slot(2).unwrap().is_empty());
    }

    #[test]
    fn release_is_idempotent() {
        let probe = probe();
        let mut table = BodySlotTable::new(2);
        table.refresh(frame(&probe, &[Some(true), None]));

        let slot = table.slot_mut(1).unwrap();
        slot.release();
        slot.release();
        assert!(slot.is_empty());

        let slot = table.slot_mut(0).unwrap();
        slot.release();
        assert!(slot.is_empty());
        slot.release();
        assert!(slot.is_empty());
        assert_eq!(probe.outstanding(), 0);
    }

    #[test]
    fn short_and_long_frames_keep_capacity_fixed() {
        let probe = probe();
        let mut table = BodySlotTable::new(2);

        table.refresh(frame(&probe, &[Some(true)]));
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.occupied().count(), 1);

        table.refresh(frame(&probe, &[Some(true), Some(true), Some(true), Some(true)]));
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.occupied().count(), 2);
        assert_eq!(probe.outstanding(), 2);
    }

    #[test]
    fn release_all_empties_every_slot() {
        let probe = probe();
        let mut table = BodySlotTable::new(6);
        table.refresh(frame(&probe, &[Some(true); 6]));
        table.release_all();
        assert!(table.is_all_empty());
        assert_eq!(probe.outstanding(), 0);
        table.release_all();
        assert!(table.is_all_empty());
    }
}
