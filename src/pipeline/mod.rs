pub mod body_slots;
pub mod color_image;
pub mod display_loop;
mod draw;
pub mod frame_source;
pub mod overlay;

// Re-exports for convenience
pub use display_loop::DisplayLoop;
