// Path Planning algorithms module

pub mod rrt;
pub mod rrt_planner;

pub use rrt::{Extension, RrtTree, SMOOTHING_SUBDIVISIONS};
pub use rrt_planner::{Plan, RrtConfig, RrtPlanner, SamplingPolicy};
