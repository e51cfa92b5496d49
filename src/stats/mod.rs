//! Statistics for stream pages

pub mod viewers;

pub use viewers::{ViewerCount, ViewerCounter};
