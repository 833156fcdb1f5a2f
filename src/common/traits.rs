//! Common traits defining the seams between planner, sensor, controller and host

use crate::common::types::*;

/// Number of parametric intervals used when sampling a segment.
/// The segment is probed at `SEGMENT_SAMPLES + 1` points, both ends included.
pub const SEGMENT_SAMPLES: usize = 100;

/// Point and segment obstacle queries against workspace geometry.
///
/// The workspace spans `[0, width) x [0, height)`. Implementations classify
/// any point outside it as an obstacle.
pub trait CollisionOracle {
    /// Workspace width
    fn width(&self) -> f64;

    /// Workspace height
    fn height(&self) -> f64;

    /// Whether the point lies on an obstacle (or outside the workspace)
    fn is_obstacle(&self, p: Point2D) -> bool;

    /// Whether the point lies inside the workspace bounds
    fn contains(&self, p: Point2D) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width() && p.y < self.height()
    }

    /// Whether the straight segment `a`-`b` touches an obstacle.
    ///
    /// Samples a fixed number of evenly spaced points, so the answer is
    /// reproducible for identical geometry. Endpoints are ordered first,
    /// which makes `segment_crosses(a, b) == segment_crosses(b, a)` exact.
    fn segment_crosses(&self, a: Point2D, b: Point2D) -> bool {
        let (from, to) = if (b.x, b.y) < (a.x, a.y) { (b, a) } else { (a, b) };
        (0..=SEGMENT_SAMPLES).any(|i| {
            let u = i as f64 / SEGMENT_SAMPLES as f64;
            self.is_obstacle(from.lerp(&to, u))
        })
    }
}

/// Source of operator input: endpoint picks and a quit signal
pub trait InputSource {
    /// Next endpoint pick, if one is available this tick.
    /// The first pick is the start, the second the goal.
    fn next_endpoint(&mut self) -> Option<Point2D>;

    /// Whether the operator asked to stop
    fn quit_requested(&mut self) -> bool;
}

/// Trait for visualizable state
pub trait Visualizable {
    /// Draw current state to visualizer
    fn visualize(&self, vis: &mut crate::utils::Visualizer);
}
