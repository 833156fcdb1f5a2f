//! Differential-drive waypoint follower
//!
//! Tracks a smoothed RRT path whose last point lies at the start and whose
//! first point is the goal. The cursor starts at the last index and counts
//! down as waypoints are reached.
//!
//! The feedback law steers a point held at distance `a` in front of the
//! wheel axis, which makes the closed loop drive the position straight at
//! the target waypoint.

use serde::{Deserialize, Serialize};

use crate::common::{ControlInput, NavError, NavResult, Path2D, Point2D, Pose2D};

/// Workspace units per meter
pub const METERS_TO_PIXELS: f64 = 3779.52;

/// Agent kinematic parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Look-ahead offset `a` of the controlled point
    pub gain: f64,
    /// Saturation for the forward command
    pub max_speed: f64,
    /// A waypoint counts as reached below this distance
    pub waypoint_tolerance: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gain: 0.01 * METERS_TO_PIXELS,
            max_speed: 0.02 * METERS_TO_PIXELS,
            waypoint_tolerance: 35.0,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> NavResult<()> {
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(NavError::invalid(format!("gain must be positive, got {}", self.gain)));
        }
        if !(self.max_speed > 0.0) {
            return Err(NavError::invalid(format!("max_speed must be positive, got {}", self.max_speed)));
        }
        if !(self.waypoint_tolerance > 0.0) {
            return Err(NavError::invalid("waypoint_tolerance must be positive"));
        }
        Ok(())
    }
}

/// Point agent with unicycle kinematics following a waypoint list
#[derive(Debug, Clone)]
pub struct DifferentialDriveAgent {
    pose: Pose2D,
    command: ControlInput,
    config: AgentConfig,
    path: Path2D,
    waypoint: usize,
    goal_reached: bool,
}

impl DifferentialDriveAgent {
    pub fn new(pose: Pose2D, config: AgentConfig) -> NavResult<Self> {
        config.validate()?;
        Ok(Self {
            pose,
            command: ControlInput::zero(),
            config,
            path: Path2D::new(),
            waypoint: 0,
            goal_reached: false,
        })
    }

    pub fn pose(&self) -> &Pose2D {
        &self.pose
    }

    pub fn position(&self) -> Point2D {
        self.pose.position()
    }

    pub fn command(&self) -> ControlInput {
        self.command
    }

    pub fn path(&self) -> &Path2D {
        &self.path
    }

    /// Index of the waypoint currently steered toward
    pub fn waypoint(&self) -> usize {
        self.waypoint
    }

    /// True once the agent came within tolerance of the final waypoint
    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    pub fn dist(&self, p: Point2D) -> f64 {
        self.position().distance(&p)
    }

    /// Replace the current path. Empty paths are ignored.
    pub fn install_path(&mut self, path: Path2D) -> bool {
        if path.is_empty() {
            return false;
        }
        self.waypoint = path.len() - 1;
        self.path = path;
        self.command = ControlInput::zero();
        self.goal_reached = false;
        true
    }

    /// Refresh `(u, w)` toward the current waypoint and advance the cursor
    /// when the waypoint is within tolerance.
    pub fn compute_control(&mut self) {
        let target = match self.path.get(self.waypoint) {
            Some(t) => t,
            None => {
                self.command = ControlInput::zero();
                return;
            }
        };

        let a = self.config.gain;
        let (sin, cos) = self.pose.yaw.sin_cos();
        let dx = target.x - self.pose.x;
        let dy = target.y - self.pose.y;

        let u = (dx * cos + dy * sin).clamp(-self.config.max_speed, self.config.max_speed);
        let w = (-sin * dx + cos * dy) / a;
        self.command = ControlInput::new(u, w);

        if self.dist(target) < self.config.waypoint_tolerance {
            if self.waypoint == 0 {
                self.goal_reached = true;
            } else {
                self.waypoint -= 1;
            }
        }
    }

    /// Advance the pose by `dt` under the current command, then recompute it
    pub fn integrate(&mut self, dt: f64) {
        let a = self.config.gain;
        let ControlInput { v: u, omega: w } = self.command;
        let (sin, cos) = self.pose.yaw.sin_cos();

        self.pose.x += (u * cos - a * sin * w) * dt;
        self.pose.y += (u * sin + a * cos * w) * dt;
        self.pose.yaw += w * dt;
        self.pose.normalize_yaw();

        self.compute_control();
    }
}
