use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::{Receiver, TryRecvError};

use super::{BodyFrame, BodyFrameReader, ColorFrameReader, SensorError};
use crate::types::ColorFrame;

/// Reader over a producer thread's frame queue.
pub struct ChannelReader<T> {
    rx: Receiver<T>,
}

impl<T> ChannelReader<T> {
    pub fn new(rx: Receiver<T>) -> Self {
        Self { rx }
    }

    /// Newest queued frame; older queued frames are dropped.
    fn latest(&self) -> Result<T, SensorError> {
        let mut frame = match self.rx.try_recv() {
            Ok(frame) => frame,
            Err(TryRecvError::Empty) => return Err(SensorError::FramePending),
            Err(TryRecvError::Disconnected) => return Err(SensorError::Disconnected),
        };
        while let Ok(newer) = self.rx.try_recv() {
            frame = newer;
        }
        Ok(frame)
    }
}

impl ColorFrameReader for ChannelReader<ColorFrame> {
    fn acquire_latest_frame(&mut self) -> Result<ColorFrame, SensorError> {
        self.latest()
    }
}

impl BodyFrameReader for ChannelReader<BodyFrame> {
    fn acquire_latest_frame(&mut self) -> Result<BodyFrame, SensorError> {
        self.latest()
    }
}

/// Producer threads sharing one stop flag; stopping joins them all.
#[derive(Debug, Default)]
pub struct ProducerThreads {
    stop: Arc<AtomicBool>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl ProducerThreads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn push(&mut self, handle: thread::JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ProducerThreads {
    fn drop(&mut self) {
        self.stop();
    }
}
