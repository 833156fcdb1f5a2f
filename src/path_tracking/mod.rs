// Path Tracking algorithms module

pub mod waypoint_follower;

pub use waypoint_follower::{AgentConfig, DifferentialDriveAgent, METERS_TO_PIXELS};
