use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use minifb::{KeyRepeat, Window, WindowOptions};
use rayon::prelude::*;

use super::DisplaySurface;
use crate::types::{BgraImage, Key};

/// Desktop window created on first present, like a named image window.
#[derive(Default)]
pub struct MinifbSurface {
    window: Option<Window>,
    title: String,
    size: (usize, usize),
    pixels: Vec<u32>,
}

impl MinifbSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn window_for(&mut self, title: &str, width: usize, height: usize) -> Result<&mut Window> {
        let reuse = self.window.is_some() && self.title == title && self.size == (width, height);
        if !reuse {
            let window = Window::new(title, width, height, WindowOptions::default())
                .map_err(|err| anyhow!("failed to create window {title:?}: {err}"))?;
            log::info!("opened window {title:?} at {width}x{height}");
            self.window = Some(window);
            self.title = title.to_string();
            self.size = (width, height);
        }
        self.window
            .as_mut()
            .ok_or_else(|| anyhow!("window {title:?} unavailable"))
    }
}

impl DisplaySurface for MinifbSurface {
    fn present(&mut self, title: &str, image: &BgraImage) -> Result<()> {
        let (width, height) = (image.width as usize, image.height as usize);

        let mut pixels = std::mem::take(&mut self.pixels);
        pixels.resize(width * height, 0);
        pixels
            .par_iter_mut()
            .zip(image.data.par_chunks_exact(4))
            .for_each(|(dst, px)| {
                *dst = (u32::from(px[2]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[0]);
            });

        let result = self
            .window_for(title, width, height)
            .and_then(|window| {
                window
                    .update_with_buffer(&pixels, width, height)
                    .map_err(|err| anyhow!("failed to present frame: {err}"))
            });
        self.pixels = pixels;
        result
    }

    fn wait_key(&mut self, timeout: Duration) -> Option<Key> {
        let Some(window) = self.window.as_mut() else {
            thread::sleep(timeout);
            return None;
        };

        let deadline = Instant::now() + timeout;
        loop {
            window.update();
            // Closing the window counts as the exit key.
            if !window.is_open() {
                return Some(Key::Escape);
            }
            if let Some(key) = window.get_keys_pressed(KeyRepeat::No).first() {
                return Some(map_key(*key));
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            log::info!("closed window {:?}", self.title);
        }
    }
}

fn map_key(key: minifb::Key) -> Key {
    match key {
        minifb::Key::Escape => Key::Escape,
        _ => Key::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_escape_maps_to_a_loop_key() {
        assert_eq!(map_key(minifb::Key::Escape), Key::Escape);
        for key in [minifb::Key::Q, minifb::Key::Space, minifb::Key::S] {
            assert_eq!(map_key(key), Key::Other);
        }
    }
}
