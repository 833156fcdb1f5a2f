// Mapping module

pub mod occupancy_grid;
pub mod range_sensor;

pub use occupancy_grid::{CellClass, OccupancyGrid, Rgb};
pub use range_sensor::{RangeSensor, Scan, SensorConfig, SweepMap};
