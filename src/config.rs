use std::{path::PathBuf, time::Duration};

use anyhow::{Result, ensure};
use clap::{Parser, ValueEnum};

use crate::{
    sensor::{SensorDevice, SyntheticConfig, SyntheticSensor, synthetic::DEFAULT_FRAME_INTERVAL},
    types::{BODY_COUNT, Key},
};

/// Settings the display loop runs with.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopConfig {
    /// Number of body slots; the sensor's simultaneous tracking limit.
    pub body_count: usize,
    /// Bounded wait for a key press at the end of every cycle.
    pub poll_interval: Duration,
    /// One-time pause after opening the streams.
    pub settle_delay: Duration,
    /// Linear scale applied before presenting.
    pub display_scale: f32,
    pub window_title: String,
    pub exit_key: Key,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            body_count: BODY_COUNT,
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::from_secs(2),
            display_scale: 0.5,
            window_title: "Body".to_string(),
            exit_key: Key::Escape,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Simulated sensor with animated bodies.
    Synthetic,
    /// Camera color stream with animated bodies.
    Webcam,
}

#[derive(Debug, Parser)]
#[command(name = "body-overlay", about = "Draw tracked joints and hand states over a live color stream")]
pub struct Args {
    #[arg(long, value_enum, default_value_t = SourceKind::Synthetic)]
    pub source: SourceKind,
    /// Camera index for the webcam source.
    #[arg(long, default_value_t = 0)]
    pub camera_index: u32,
    /// Color resolution of the synthetic source.
    #[arg(long, default_value_t = 1920)]
    pub width: u32,
    #[arg(long, default_value_t = 1080)]
    pub height: u32,
    /// Still image to stream instead of the synthetic test pattern.
    #[arg(long, value_name = "PATH")]
    pub background: Option<PathBuf>,
    /// Bodies the animation tracks.
    #[arg(long, default_value_t = 2)]
    pub tracked_bodies: usize,
    #[arg(long, default_value_t = BODY_COUNT)]
    pub body_count: usize,
    #[arg(long, default_value_t = 10)]
    pub poll_ms: u64,
    #[arg(long, default_value_t = 2000)]
    pub settle_ms: u64,
    #[arg(long, default_value_t = 0.5)]
    pub scale: f32,
    #[arg(long, default_value = "Body")]
    pub title: String,
}

impl Args {
    pub fn loop_config(&self) -> Result<LoopConfig> {
        ensure!(self.body_count > 0, "--body-count must be at least 1");
        ensure!(
            self.scale > 0.0 && self.scale <= 4.0,
            "--scale must be in (0, 4], got {}",
            self.scale
        );

        Ok(LoopConfig {
            body_count: self.body_count,
            poll_interval: Duration::from_millis(self.poll_ms),
            settle_delay: Duration::from_millis(self.settle_ms),
            display_scale: self.scale,
            window_title: self.title.clone(),
            ..LoopConfig::default()
        })
    }

    pub fn sensor_device(&self) -> Result<Box<dyn SensorDevice>> {
        match self.source {
            SourceKind::Synthetic => Ok(Box::new(SyntheticSensor::new(SyntheticConfig {
                width: self.width,
                height: self.height,
                frame_interval: DEFAULT_FRAME_INTERVAL,
                background: self.background.clone(),
                tracked_bodies: self.tracked_bodies,
                body_capacity: self.body_count,
            }))),
            SourceKind::Webcam => webcam(self),
        }
    }
}

#[cfg(feature = "camera-nokhwa")]
fn webcam(args: &Args) -> Result<Box<dyn SensorDevice>> {
    Ok(Box::new(crate::sensor::WebcamSensor::new(
        args.camera_index,
        args.tracked_bodies,
        args.body_count,
    )))
}

#[cfg(not(feature = "camera-nokhwa"))]
fn webcam(_args: &Args) -> Result<Box<dyn SensorDevice>> {
    anyhow::bail!("webcam source requires the camera-nokhwa feature")
}
