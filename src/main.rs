mod config;
mod display;
mod pipeline;
mod sensor;
mod types;

use anyhow::Result;
use clap::Parser;

use config::Args;
use display::MinifbSurface;
use pipeline::DisplayLoop;

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.loop_config()?;
    let device = args.sensor_device()?;

    let mut display_loop = DisplayLoop::initialize(device, MinifbSurface::new(), config)?;
    display_loop.run()
}
