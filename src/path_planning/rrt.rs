//! RRT (Rapidly-exploring Random Tree) arena
//!
//! The tree is stored as three parallel arrays (`x`, `y`, `parent`) that only
//! ever grow or shrink at the end. A new sample is appended as a *candidate*
//! node, and it is either connected to the tree (its parent edge is recorded)
//! or popped again before anything else is appended. Keeping that stack
//! discipline is what keeps `parent[i]` aligned with node `i`.

use itertools::Itertools;
use ordered_float::OrderedFloat;
use rand::Rng;
use tracing::trace;

use crate::common::{CollisionOracle, NavError, NavResult, Path2D, Point2D};

/// Number of interpolated points emitted per raw path segment when smoothing
pub const SMOOTHING_SUBDIVISIONS: usize = 5;

/// Result of one growth iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// The candidate was attached to the tree under this index
    Connected(usize),
    /// The edge toward the candidate crossed an obstacle; the candidate was popped
    Blocked,
    /// The sample itself was unusable (on an obstacle or outside the workspace)
    Discarded,
}

/// Append/pop-at-end RRT arena
#[derive(Debug, Clone)]
pub struct RrtTree {
    x: Vec<f64>,
    y: Vec<f64>,
    parent: Vec<usize>,
    goal: Point2D,
    width: f64,
    height: f64,
    max_step: f64,
    goal_reached: bool,
    goal_state: Option<usize>,
    path: Vec<usize>,
}

impl RrtTree {
    /// Create a tree rooted at `start` inside a `width` x `height` workspace
    pub fn new(start: Point2D, goal: Point2D, width: f64, height: f64, max_step: f64) -> Self {
        RrtTree {
            x: vec![start.x],
            y: vec![start.y],
            parent: vec![0],
            goal,
            width,
            height,
            max_step,
            goal_reached: false,
            goal_state: None,
            path: Vec::new(),
        }
    }

    pub fn start(&self) -> Point2D {
        self.node(0)
    }

    pub fn goal(&self) -> Point2D {
        self.goal
    }

    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Index of the node that reached the goal
    pub fn goal_state(&self) -> Option<usize> {
        self.goal_state
    }

    pub fn node_count(&self) -> usize {
        self.x.len()
    }

    /// Number of recorded parent edges (the root counts as its own parent)
    pub fn edge_count(&self) -> usize {
        self.parent.len()
    }

    pub fn node(&self, i: usize) -> Point2D {
        Point2D::new(self.x[i], self.y[i])
    }

    /// Parent of node `i`, or None if its edge has not been recorded yet
    pub fn parent(&self, i: usize) -> Option<usize> {
        self.parent.get(i).copied()
    }

    /// Append a node at the end of the arena and return its index
    pub fn add_node(&mut self, x: f64, y: f64) -> usize {
        debug_assert_eq!(
            self.parent.len(),
            self.x.len(),
            "a pending candidate must be connected or removed first"
        );
        self.x.push(x);
        self.y.push(y);
        self.x.len() - 1
    }

    /// Pop the most recently appended node (and its edge, if recorded).
    /// The root is never removed.
    pub fn remove_last(&mut self) {
        let n = self.node_count();
        if n <= 1 {
            return;
        }
        self.x.pop();
        self.y.pop();
        if self.parent.len() == n {
            self.parent.pop();
        }
    }

    /// Record `parent` as the predecessor of the pending candidate `child`
    pub fn add_edge(&mut self, parent: usize, child: usize) {
        assert_eq!(
            child,
            self.parent.len(),
            "edges can only be added for the newest node"
        );
        assert!(child < self.node_count(), "child {} does not exist", child);
        assert!(parent < child, "parent {} must precede child {}", parent, child);
        self.parent.push(parent);
    }

    /// Drop the most recently recorded edge. The root's self-edge is kept.
    pub fn remove_edge(&mut self) {
        if self.parent.len() > 1 {
            self.parent.pop();
        }
    }

    /// Euclidean distance between two nodes
    pub fn distance(&self, n1: usize, n2: usize) -> f64 {
        self.node(n1).distance(&self.node(n2))
    }

    /// Uniform random point inside the workspace
    pub fn sample_workspace<R: Rng + ?Sized>(&self, rng: &mut R) -> Point2D {
        Point2D::new(
            rng.gen_range(0.0..self.width),
            rng.gen_range(0.0..self.height),
        )
    }

    /// Index in `0..n` closest to node `n`; the earliest index wins ties
    pub fn nearest(&self, n: usize) -> usize {
        (0..n)
            .min_by_key(|&i| OrderedFloat(self.distance(i, n)))
            .unwrap_or(0)
    }

    /// Check the newest node against the workspace. If it lies on an obstacle
    /// or outside the bounds it is popped and false is returned.
    pub fn is_free<O: CollisionOracle + ?Sized>(&mut self, oracle: &O) -> bool {
        let n = self.node_count() - 1;
        let p = self.node(n);
        if !oracle.contains(p) || oracle.is_obstacle(p) {
            trace!(x = p.x, y = p.y, "discarding degenerate sample");
            self.remove_last();
            return false;
        }
        true
    }

    /// Limit the candidate to `max_step` from `near`. A repositioned
    /// candidate that lands within `max_step` of the goal on both axes is
    /// snapped onto the goal. A candidate already sitting on the goal marks
    /// it reached as is; any other short extension stays where it was sampled.
    pub fn step(&mut self, near: usize, candidate: usize) {
        let d = self.distance(near, candidate);
        if d > self.max_step {
            let (xnear, ynear) = (self.x[near], self.y[near]);
            let theta = (self.y[candidate] - ynear).atan2(self.x[candidate] - xnear);
            self.x[candidate] = xnear + self.max_step * theta.cos();
            self.y[candidate] = ynear + self.max_step * theta.sin();

            let p = self.node(candidate);
            if (p.x - self.goal.x).abs() <= self.max_step && (p.y - self.goal.y).abs() <= self.max_step {
                self.x[candidate] = self.goal.x;
                self.y[candidate] = self.goal.y;
                self.mark_goal(candidate);
            }
        } else if self.node(candidate) == self.goal {
            self.mark_goal(candidate);
        }
    }

    fn mark_goal(&mut self, candidate: usize) {
        self.goal_state = Some(candidate);
        self.goal_reached = true;
    }

    /// Attach `candidate` to `near` unless the segment between them crosses
    /// an obstacle, in which case the candidate is popped.
    pub fn connect<O: CollisionOracle + ?Sized>(
        &mut self,
        near: usize,
        candidate: usize,
        oracle: &O,
    ) -> bool {
        if oracle.segment_crosses(self.node(near), self.node(candidate)) {
            self.remove_last();
            if self.goal_state == Some(candidate) {
                self.goal_state = None;
                self.goal_reached = false;
            }
            false
        } else {
            self.add_edge(near, candidate);
            true
        }
    }

    /// One iteration of unbiased growth toward a uniform sample
    pub fn expand<O, R>(&mut self, oracle: &O, rng: &mut R) -> Extension
    where
        O: CollisionOracle + ?Sized,
        R: Rng + ?Sized,
    {
        let sample = self.sample_workspace(rng);
        let n = self.add_node(sample.x, sample.y);
        if !self.is_free(oracle) {
            return Extension::Discarded;
        }
        self.extend_candidate(n, oracle)
    }

    /// One iteration of growth toward the goal itself
    pub fn bias_toward_goal<O: CollisionOracle + ?Sized>(&mut self, oracle: &O) -> Extension {
        let n = self.add_node(self.goal.x, self.goal.y);
        self.extend_candidate(n, oracle)
    }

    fn extend_candidate<O: CollisionOracle + ?Sized>(&mut self, n: usize, oracle: &O) -> Extension {
        let near = self.nearest(n);
        self.step(near, n);
        if self.connect(near, n, oracle) {
            Extension::Connected(n)
        } else {
            Extension::Blocked
        }
    }

    /// Walk parent pointers from the goal node back to the root and store
    /// the visited indices (goal first, root last). Returns whether the goal
    /// has been reached.
    pub fn backtrack_path(&mut self) -> bool {
        let goal_state = match self.goal_state {
            Some(g) if self.goal_reached => g,
            _ => return false,
        };

        let mut path = vec![goal_state];
        let mut current = goal_state;
        // parent[i] < i for every non-root node, so this walk is bounded
        while current != 0 {
            current = self.parent[current];
            path.push(current);
        }
        self.path = path;
        true
    }

    /// Node indices of the last backtracked path (goal first)
    pub fn path_indices(&self) -> &[usize] {
        &self.path
    }

    /// Positions of the last backtracked path (goal first)
    pub fn path_as_points(&self) -> NavResult<Vec<Point2D>> {
        if !self.goal_reached || self.path.is_empty() {
            return Err(NavError::InvalidPathQuery);
        }
        Ok(self.path.iter().map(|&i| self.node(i)).collect())
    }

    /// Sum of edge lengths from node `n` to the root
    pub fn path_cost(&self, n: usize) -> f64 {
        let mut cost = 0.0;
        let mut current = n;
        while current != 0 {
            let parent = self.parent[current];
            cost += self.distance(current, parent);
            current = parent;
        }
        cost
    }

    /// Densify the backtracked path: every raw segment contributes points at
    /// offsets 0, 0.2, .., 0.8 from its first endpoint. The final raw point is
    /// not emitted.
    pub fn smooth_path(&self) -> NavResult<Path2D> {
        let raw = self.path_as_points()?;
        let points = raw
            .iter()
            .tuple_windows()
            .flat_map(|(a, b)| {
                (0..SMOOTHING_SUBDIVISIONS)
                    .map(move |i| a.lerp(b, i as f64 / SMOOTHING_SUBDIVISIONS as f64))
            })
            .collect();
        Ok(Path2D::from_points(points))
    }

    /// Tree edges as (parent, child) position pairs
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        (1..self.parent.len()).map(move |i| (self.node(self.parent[i]), self.node(i)))
    }
}
