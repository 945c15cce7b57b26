use std::thread;

use anyhow::{Context, Result};

use crate::{
    config::LoopConfig,
    display::{DisplaySurface, FrameScaler},
    sensor::{SensorContext, SensorDevice},
};

use super::{
    body_slots::BodySlotTable,
    color_image::ColorImage,
    frame_source::FrameSource,
    overlay::{Canvas, ColorPalette, OverlayRenderer},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated,
}

/// Acquire, refresh, render, present, poll; until the exit key.
pub struct DisplayLoop<D: DisplaySurface> {
    config: LoopConfig,
    context: SensorContext,
    frames: FrameSource,
    bodies: BodySlotTable,
    renderer: OverlayRenderer,
    /// Newest color frame, untouched by drawing.
    color: ColorImage,
    /// `color` plus this cycle's overlay.
    composite: ColorImage,
    scaler: FrameScaler,
    display: D,
    state: LoopState,
}

impl<D: DisplaySurface> DisplayLoop<D> {
    /// Opens the sensor and its streams, then waits for them to settle.
    /// Any failure here aborts startup.
    pub fn initialize(device: Box<dyn SensorDevice>, display: D, config: LoopConfig) -> Result<Self> {
        let mut context = SensorContext::open(device).context("failed to open sensor")?;
        let frames = FrameSource::open(&mut context).context("failed to open sensor streams")?;

        let description = context.color_description();
        let color = ColorImage::new(description);
        let composite = color.clone();
        let bodies = BodySlotTable::new(config.body_count);
        let renderer = OverlayRenderer::new(ColorPalette::new(config.body_count));
        let scaler = FrameScaler::new(config.display_scale);

        if !config.settle_delay.is_zero() {
            log::info!("waiting {:?} for sensor streams to settle", config.settle_delay);
            thread::sleep(config.settle_delay);
        }

        log::info!("display loop running ({} body slots)", bodies.capacity());
        Ok(Self {
            config,
            context,
            frames,
            bodies,
            renderer,
            color,
            composite,
            scaler,
            display,
            state: LoopState::Running,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs cycles until the exit key arrives, then tears everything down.
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_until_exit();
        self.terminate();
        result
    }

    fn run_until_exit(&mut self) -> Result<()> {
        while self.state == LoopState::Running {
            self.cycle()?;
            if self.exit_requested() {
                log::info!("exit key received");
                break;
            }
        }
        Ok(())
    }

    /// One acquire, refresh, render and present pass. Fails only when a
    /// sensor stream is gone.
    pub fn cycle(&mut self) -> Result<()> {
        self.update()?;
        self.draw();
        self.show()
    }

    fn update(&mut self) -> Result<()> {
        let color = self
            .frames
            .try_acquire_color()
            .context("color stream ended")?;
        if let Some(frame) = color {
            if let Err(err) = self.color.overwrite(&frame) {
                log::warn!("dropping color frame: {err}");
            }
        }

        let bodies = self
            .frames
            .try_acquire_bodies()
            .context("body stream ended")?;
        if let Some(frame) = bodies {
            self.bodies.refresh(frame);
        }
        Ok(())
    }

    fn draw(&mut self) {
        self.composite.copy_from(&self.color);
        self.renderer
            .render(&mut self.composite, &self.bodies, self.context.mapper());
    }

    fn show(&mut self) -> Result<()> {
        if self.composite.is_empty() {
            return Ok(());
        }
        let scaled = self.scaler.scale(self.composite.as_bgra())?;
        self.display.present(&self.config.window_title, scaled)
    }

    fn exit_requested(&mut self) -> bool {
        self.display.wait_key(self.config.poll_interval) == Some(self.config.exit_key)
    }

    /// Releases every body slot, drops the frame readers and closes the
    /// sensor and the display. Only the first call has any effect.
    pub fn terminate(&mut self) {
        if self.state == LoopState::Terminated {
            return;
        }
        self.state = LoopState::Terminated;
        self.display.close();
        self.bodies.release_all();
        self.frames.close();
        self.context.close();
        log::info!("display loop terminated");
    }

    #[cfg(test)]
    pub fn bodies(&self) -> &BodySlotTable {
        &self.bodies
    }
}

impl<D: DisplaySurface> Drop for DisplayLoop<D> {
    fn drop(&mut self) {
        self.terminate();
    }
}
