//! Simulated fan of rangefinder beams
//!
//! Beams are spread evenly across a window centered on the agent heading and
//! marched outward in fixed increments. Each beam stops at its first obstacle
//! sample, which is reported as a detected obstacle point.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::trace;

use crate::common::{CollisionOracle, NavError, NavResult, Obstacles, Point2D, Pose2D};

/// Range sensor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Maximum beam length
    pub range: f64,
    /// Angular width of the beam fan [rad]
    pub field_of_view: f64,
    /// Number of beams
    pub beam_count: usize,
    /// Samples per beam, origin and maximum range included
    pub samples_per_beam: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            range: 250.0,
            field_of_view: 2.0 * PI / 3.0,
            beam_count: 40,
            samples_per_beam: 100,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> NavResult<()> {
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(NavError::invalid(format!("sensor range must be positive, got {}", self.range)));
        }
        if !(0.0..=2.0 * PI).contains(&self.field_of_view) {
            return Err(NavError::invalid(format!(
                "field of view must be within [0, 2pi], got {}",
                self.field_of_view
            )));
        }
        if self.beam_count == 0 || self.samples_per_beam < 2 {
            return Err(NavError::invalid("sensor needs at least one beam and two samples per beam"));
        }
        Ok(())
    }
}

/// Output of one sensing pass
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// First obstacle sample of every beam that hit something
    pub obstacles: Obstacles,
    /// Free samples the beams passed through
    pub swept: Vec<Point2D>,
}

/// Rangefinder fan
#[derive(Debug, Clone)]
pub struct RangeSensor {
    config: SensorConfig,
}

impl RangeSensor {
    pub fn new(config: SensorConfig) -> NavResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Beam bearings, evenly spaced across the window centered on `heading`
    pub fn beam_angles(&self, heading: f64) -> Vec<f64> {
        let n = self.config.beam_count;
        if n == 1 {
            return vec![heading];
        }
        let fov = self.config.field_of_view;
        let start = heading - fov / 2.0;
        (0..n)
            .map(|i| start + fov * i as f64 / (n - 1) as f64)
            .collect()
    }

    /// Cast all beams from `pose` against the oracle
    pub fn sense<O: CollisionOracle + ?Sized>(&self, pose: &Pose2D, oracle: &O) -> Scan {
        let origin = pose.position();
        let last = (self.config.samples_per_beam - 1) as f64;
        let mut scan = Scan::default();

        for angle in self.beam_angles(pose.yaw) {
            let (sin, cos) = angle.sin_cos();
            for i in 0..self.config.samples_per_beam {
                let d = self.config.range * i as f64 / last;
                let p = Point2D::new(origin.x + d * cos, origin.y + d * sin);
                if !oracle.contains(p) {
                    break;
                }
                if oracle.is_obstacle(p) {
                    scan.obstacles.push(p);
                    break;
                }
                scan.swept.push(p);
            }
        }

        trace!(hits = scan.obstacles.len(), swept = scan.swept.len(), "range scan");
        scan
    }
}

/// Display-only record of cells the sensor has swept.
///
/// Nothing reads this layer back for planning or collision checks.
#[derive(Debug, Clone)]
pub struct SweepMap {
    cells: DMatrix<bool>,
}

impl SweepMap {
    pub fn new(x_width: usize, y_width: usize) -> Self {
        Self {
            cells: DMatrix::from_element(x_width, y_width, false),
        }
    }

    /// Mark the cells under the given points
    pub fn mark(&mut self, points: &[Point2D]) {
        let (nx, ny) = (self.cells.nrows(), self.cells.ncols());
        for p in points {
            if p.x < 0.0 || p.y < 0.0 {
                continue;
            }
            let (ix, iy) = (p.x.floor() as usize, p.y.floor() as usize);
            if ix < nx && iy < ny {
                self.cells[(ix, iy)] = true;
            }
        }
    }

    pub fn is_swept(&self, p: Point2D) -> bool {
        if p.x < 0.0 || p.y < 0.0 {
            return false;
        }
        self.cells
            .get((p.x.floor() as usize, p.y.floor() as usize))
            .copied()
            .unwrap_or(false)
    }

    pub fn swept_count(&self) -> usize {
        self.cells.iter().filter(|&&s| s).count()
    }

    /// Centers of all swept cells
    pub fn swept_cells(&self) -> Vec<Point2D> {
        let mut points = Vec::new();
        for iy in 0..self.cells.ncols() {
            for ix in 0..self.cells.nrows() {
                if self.cells[(ix, iy)] {
                    points.push(Point2D::new(ix as f64 + 0.5, iy as f64 + 0.5));
                }
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::OccupancyGrid;
    use approx::assert_relative_eq;

    fn sensor(beam_count: usize, field_of_view: f64) -> RangeSensor {
        RangeSensor::new(SensorConfig {
            range: 100.0,
            field_of_view,
            beam_count,
            samples_per_beam: 100,
        })
        .unwrap()
    }

    #[test]
    fn test_beam_angles_centered_on_heading() {
        let s = sensor(3, PI / 2.0);
        let angles = s.beam_angles(1.0);
        assert_eq!(angles.len(), 3);
        assert_relative_eq!(angles[0], 1.0 - PI / 4.0);
        assert_relative_eq!(angles[1], 1.0);
        assert_relative_eq!(angles[2], 1.0 + PI / 4.0);
        assert_eq!(sensor(1, PI).beam_angles(0.3), vec![0.3]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = SensorConfig {
            samples_per_beam: 1,
            ..Default::default()
        };
        assert!(RangeSensor::new(bad).is_err());
        let bad = SensorConfig {
            range: -1.0,
            ..Default::default()
        };
        assert!(RangeSensor::new(bad).is_err());
    }

    #[test]
    fn test_beam_stops_at_first_hit() {
        let mut world = OccupancyGrid::new(200, 200).unwrap();
        world.fill_rect(Point2D::new(60.0, 0.0), Point2D::new(80.0, 199.0));
        let s = sensor(1, 0.0);
        let scan = s.sense(&Pose2D::new(10.0, 100.0, 0.0), &world);

        assert_eq!(scan.obstacles.len(), 1);
        let hit = scan.obstacles.points[0];
        assert!(hit.x >= 60.0 && hit.x < 62.0);
        assert!(scan.swept.iter().all(|p| p.x < 60.0));
    }

    #[test]
    fn test_open_space_reports_nothing() {
        let world = OccupancyGrid::new(400, 400).unwrap();
        let scan = sensor(9, PI).sense(&Pose2D::new(200.0, 200.0, 0.5), &world);
        assert!(scan.obstacles.is_empty());
        assert_eq!(scan.swept.len(), 9 * 100);
    }

    #[test]
    fn test_beams_stop_at_workspace_edge() {
        let world = OccupancyGrid::new(50, 50).unwrap();
        let scan = sensor(1, 0.0).sense(&Pose2D::new(25.0, 25.0, 0.0), &world);
        assert!(scan.obstacles.is_empty());
        assert!(scan.swept.iter().all(|p| p.x < 50.0));
        assert!(scan.swept.len() < 100);
    }

    #[test]
    fn test_obstacle_behind_agent_is_not_seen() {
        let mut world = OccupancyGrid::new(200, 200).unwrap();
        world.fill_circle(Point2D::new(40.0, 100.0), 10.0);
        let scan = sensor(21, PI / 2.0).sense(&Pose2D::new(100.0, 100.0, 0.0), &world);
        assert!(scan.obstacles.is_empty());
        let scan = sensor(21, PI / 2.0).sense(&Pose2D::new(100.0, 100.0, PI), &world);
        assert!(!scan.obstacles.is_empty());
    }

    #[test]
    fn test_sweep_map_does_not_change_world() {
        let mut world = OccupancyGrid::new(100, 100).unwrap();
        world.fill_rect(Point2D::new(70.0, 0.0), Point2D::new(75.0, 99.0));
        let before = world.obstacle_count();
        let s = sensor(5, PI / 4.0);
        let scan = s.sense(&Pose2D::new(10.0, 50.0, 0.0), &world);

        let mut sweep = SweepMap::new(100, 100);
        sweep.mark(&scan.swept);
        assert!(sweep.swept_count() > 0);
        assert!(sweep.is_swept(Point2D::new(10.0, 50.0)));
        assert!(!sweep.is_swept(Point2D::new(-3.0, 50.0)));
        assert_eq!(sweep.swept_cells().len(), sweep.swept_count());
        assert_eq!(world.obstacle_count(), before);
        assert_eq!(s.sense(&Pose2D::new(10.0, 50.0, 0.0), &world).obstacles, scan.obstacles);
    }
}
