//! Utility modules for rrt_navigation

pub mod visualization;

pub use visualization::{colors, PathStyle, PointStyle, Visualizer};
