pub mod apc40_mk2;
pub use apc40_mk2::APC40_MK2;

pub mod grid_8x8;
pub use grid_8x8::GRID_8X8;
