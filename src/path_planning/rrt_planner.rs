//! RRT planner driver
//!
//! Grows an [`RrtTree`] from the start, mixing uniform extensions with
//! extensions toward the goal, until the goal is reached or the iteration
//! budget runs out. Feasibility only: the returned path is not optimized.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::{CollisionOracle, NavError, NavResult, Path2D, Point2D};
use crate::path_planning::rrt::{Extension, RrtTree};

/// How the driver chooses between uniform and goal-directed extensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Always sample uniformly
    Uniform,
    /// Extend toward the goal on every k-th iteration (0 disables the bias)
    GoalBiasEvery(usize),
    /// Extend toward the goal with the given probability per iteration
    GoalBiasProbability(f64),
}

impl SamplingPolicy {
    fn toward_goal<R: Rng + ?Sized>(&self, iteration: usize, rng: &mut R) -> bool {
        match *self {
            SamplingPolicy::Uniform => false,
            SamplingPolicy::GoalBiasEvery(k) => k > 0 && iteration % k == 0,
            SamplingPolicy::GoalBiasProbability(p) => rng.gen_bool(p),
        }
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy::GoalBiasEvery(10)
    }
}

/// Configuration for RRT planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrtConfig {
    /// Maximum edge length per extension
    pub max_step: f64,
    /// Sampling budget
    pub max_iterations: usize,
    /// Uniform vs. goal-directed mix
    pub sampling: SamplingPolicy,
}

impl Default for RrtConfig {
    fn default() -> Self {
        Self {
            max_step: 35.0,
            max_iterations: 5000,
            sampling: SamplingPolicy::default(),
        }
    }
}

impl RrtConfig {
    pub fn validate(&self) -> NavResult<()> {
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(NavError::invalid(format!(
                "max_step must be positive, got {}",
                self.max_step
            )));
        }
        if self.max_iterations == 0 {
            return Err(NavError::invalid("max_iterations must be at least 1"));
        }
        if let SamplingPolicy::GoalBiasProbability(p) = self.sampling {
            if !(0.0..=1.0).contains(&p) {
                return Err(NavError::invalid(format!(
                    "goal bias probability must be in [0, 1], got {}",
                    p
                )));
            }
        }
        Ok(())
    }
}

/// A successful planning result
#[derive(Debug, Clone)]
pub struct Plan {
    /// Smoothed waypoints, goal first
    pub path: Path2D,
    /// Tree nodes from goal to start
    pub raw_path: Path2D,
    /// The explored tree
    pub tree: RrtTree,
    /// Iterations used
    pub iterations: usize,
    /// Length of the raw path
    pub cost: f64,
}

/// RRT path planner
#[derive(Debug, Clone, Default)]
pub struct RrtPlanner {
    config: RrtConfig,
}

impl RrtPlanner {
    /// Create a new RRT planner
    pub fn new(config: RrtConfig) -> Self {
        RrtPlanner { config }
    }

    /// Plan a path from `start` to `goal` through the oracle's workspace
    pub fn plan<O, R>(&self, start: Point2D, goal: Point2D, oracle: &O, rng: &mut R) -> NavResult<Plan>
    where
        O: CollisionOracle + ?Sized,
        R: Rng + ?Sized,
    {
        self.config.validate()?;
        for (name, p) in [("start", start), ("goal", goal)] {
            if !oracle.contains(p) {
                return Err(NavError::invalid(format!(
                    "{} ({:.1}, {:.1}) is outside the workspace",
                    name, p.x, p.y
                )));
            }
        }

        let mut tree = RrtTree::new(start, goal, oracle.width(), oracle.height(), self.config.max_step);
        let mut blocked = 0usize;
        let mut discarded = 0usize;

        for iteration in 0..self.config.max_iterations {
            let outcome = if self.config.sampling.toward_goal(iteration, rng) {
                tree.bias_toward_goal(oracle)
            } else {
                tree.expand(oracle, rng)
            };
            match outcome {
                Extension::Blocked => blocked += 1,
                Extension::Discarded => discarded += 1,
                Extension::Connected(_) => {}
            }

            if tree.goal_reached() {
                return Self::finish(tree, iteration + 1);
            }
        }

        warn!(
            iterations = self.config.max_iterations,
            nodes = tree.node_count(),
            blocked,
            discarded,
            "RRT: cannot find path within max iterations"
        );
        Err(NavError::PlanningFailed {
            iterations: self.config.max_iterations,
        })
    }

    fn finish(mut tree: RrtTree, iterations: usize) -> NavResult<Plan> {
        tree.backtrack_path();
        let raw_path = Path2D::from_points(tree.path_as_points()?);
        let path = tree.smooth_path()?;
        let cost = tree.goal_state().map_or(0.0, |g| tree.path_cost(g));

        info!(iterations, nodes = tree.node_count(), cost, "RRT reached the goal");
        debug!(raw = raw_path.len(), smoothed = path.len(), "path extracted");

        Ok(Plan {
            path,
            raw_path,
            tree,
            iterations,
            cost,
        })
    }
}
