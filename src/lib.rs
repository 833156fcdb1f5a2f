//! rrt_navigation - sampling-based navigation for a point agent
//!
//! A single-tree RRT planner over a 2D occupancy workspace, a simulated
//! range sensor, a feedback-linearized differential-drive follower, and a
//! mission loop that replans when newly placed obstacles block the path
//! ahead of the agent.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod mapping;
pub mod path_planning;
pub mod path_tracking;
pub mod mission_planning;

// Re-export common types for convenience
pub use common::{ControlInput, Obstacles, Path2D, Point2D, Pose2D};
pub use common::{CollisionOracle, InputSource, Visualizable};
pub use common::{NavError, NavResult};
