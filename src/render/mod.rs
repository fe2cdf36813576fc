//! Volume rendering: camera rays, the ray marcher and framebuffers.

pub mod camera;
pub mod frame;
mod marcher;
mod settings;

pub use camera::{Camera, Ray};
pub use frame::Frame;
pub use marcher::{MarchEvent, MarchOutcome, MarchState, Termination, VolumeRayMarcher, MAX_MARCH_STEPS};
pub use settings::RenderSettings;
