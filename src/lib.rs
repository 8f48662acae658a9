pub mod config;
pub mod icons;
pub mod output;
pub mod pack;
pub mod raster;
