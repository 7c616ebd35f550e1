pub mod bytes;

pub mod config;
pub use config::Config;

pub mod ctrl_surf;
pub use ctrl_surf::ControlSurface;

pub mod midi;
pub mod model;
