pub mod drip;
pub mod grid;
pub mod mapping;
pub mod overlay;
pub mod palette;
pub mod ramp;
