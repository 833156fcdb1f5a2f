//! Occupancy grid workspace
//!
//! Unit-cell boolean grid that answers the collision queries used by the
//! planner, the range sensor and the mission's path monitor. It replaces a
//! drawn display surface as the ground truth for obstacle geometry.

use nalgebra::DMatrix;

use crate::common::{CollisionOracle, NavError, NavResult, Point2D};

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `RRGGBB` hex color. A leading `#` or `0x` is accepted.
    pub fn from_hex(hex: &str) -> NavResult<Self> {
        let digits = hex
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x");
        if digits.is_empty() || digits.len() > 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(NavError::invalid(format!("bad color '{}'", hex)));
        }
        let h = u32::from_str_radix(digits, 16)
            .map_err(|e| NavError::invalid(format!("bad color '{}': {}", hex, e)))?;
        Ok(Self {
            r: ((h & 0xFF0000) >> 16) as u8,
            g: ((h & 0x00FF00) >> 8) as u8,
            b: (h & 0x0000FF) as u8,
        })
    }
}

/// Classification of a workspace location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Free,
    Obstacle,
    OutOfBounds,
}

/// Boolean occupancy grid with one cell per workspace unit.
///
/// Cell `(ix, iy)` covers `[ix, ix + 1) x [iy, iy + 1)`.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    cells: DMatrix<bool>,
}

impl OccupancyGrid {
    /// Create an obstacle-free grid
    pub fn new(x_width: usize, y_width: usize) -> NavResult<Self> {
        if x_width == 0 || y_width == 0 {
            return Err(NavError::invalid(format!(
                "workspace must be non-empty, got {}x{}",
                x_width, y_width
            )));
        }
        Ok(Self {
            cells: DMatrix::from_element(x_width, y_width, false),
        })
    }

    /// Build a grid from a row-major RGB raster; pixels equal to
    /// `obstacle_color` become obstacles.
    pub fn from_rgb(
        x_width: usize,
        y_width: usize,
        pixels: &[Rgb],
        obstacle_color: Rgb,
    ) -> NavResult<Self> {
        let expected = x_width * y_width;
        if pixels.len() != expected {
            return Err(NavError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        let mut grid = Self::new(x_width, y_width)?;
        for (i, pixel) in pixels.iter().enumerate() {
            if *pixel == obstacle_color {
                grid.cells[(i % x_width, i / x_width)] = true;
            }
        }
        Ok(grid)
    }

    pub fn x_width(&self) -> usize {
        self.cells.nrows()
    }

    pub fn y_width(&self) -> usize {
        self.cells.ncols()
    }

    /// Get grid index from workspace coordinates
    pub fn get_index(&self, p: Point2D) -> Option<(usize, usize)> {
        if !self.contains(p) {
            return None;
        }
        Some((p.x.floor() as usize, p.y.floor() as usize))
    }

    /// Classify a workspace location
    pub fn classify(&self, p: Point2D) -> CellClass {
        match self.get_index(p) {
            None => CellClass::OutOfBounds,
            Some(idx) if self.cells[idx] => CellClass::Obstacle,
            Some(_) => CellClass::Free,
        }
    }

    /// Mark or clear a single cell. Returns false if the cell is outside the grid.
    pub fn set_cell(&mut self, ix: usize, iy: usize, occupied: bool) -> bool {
        if ix >= self.x_width() || iy >= self.y_width() {
            return false;
        }
        self.cells[(ix, iy)] = occupied;
        true
    }

    /// Mark every cell overlapping the axis-aligned box `min..=max`
    pub fn fill_rect(&mut self, min: Point2D, max: Point2D) {
        let Some((ix0, ix1)) = Self::clamp_span(min.x, max.x, self.x_width()) else {
            return;
        };
        let Some((iy0, iy1)) = Self::clamp_span(min.y, max.y, self.y_width()) else {
            return;
        };
        for ix in ix0..=ix1 {
            for iy in iy0..=iy1 {
                self.cells[(ix, iy)] = true;
            }
        }
    }

    /// Mark every cell whose center lies within `radius` of `center`
    pub fn fill_circle(&mut self, center: Point2D, radius: f64) {
        let Some((ix0, ix1)) =
            Self::clamp_span(center.x - radius, center.x + radius, self.x_width())
        else {
            return;
        };
        let Some((iy0, iy1)) =
            Self::clamp_span(center.y - radius, center.y + radius, self.y_width())
        else {
            return;
        };
        for ix in ix0..=ix1 {
            for iy in iy0..=iy1 {
                let cell_center = Point2D::new(ix as f64 + 0.5, iy as f64 + 0.5);
                if cell_center.distance(&center) <= radius {
                    self.cells[(ix, iy)] = true;
                }
            }
        }
    }

    /// Number of occupied cells
    pub fn obstacle_count(&self) -> usize {
        self.cells.iter().filter(|&&occupied| occupied).count()
    }

    /// Centers of all occupied cells
    pub fn obstacle_cells(&self) -> Vec<Point2D> {
        let mut points = Vec::new();
        for iy in 0..self.y_width() {
            for ix in 0..self.x_width() {
                if self.cells[(ix, iy)] {
                    points.push(Point2D::new(ix as f64 + 0.5, iy as f64 + 0.5));
                }
            }
        }
        points
    }

    fn clamp_span(lo: f64, hi: f64, n: usize) -> Option<(usize, usize)> {
        if hi < 0.0 || lo >= n as f64 || hi < lo {
            return None;
        }
        let first = lo.max(0.0).floor() as usize;
        let last = (hi.floor() as usize).min(n - 1);
        Some((first, last))
    }
}

impl CollisionOracle for OccupancyGrid {
    fn width(&self) -> f64 {
        self.x_width() as f64
    }

    fn height(&self) -> f64 {
        self.y_width() as f64
    }

    fn is_obstacle(&self, p: Point2D) -> bool {
        self.classify(p) != CellClass::Free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("000000").unwrap(), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("#FF8000").unwrap(), Rgb::new(255, 128, 0));
        assert_eq!(Rgb::from_hex("0x0000ff").unwrap(), Rgb::new(0, 0, 255));
        assert!(Rgb::from_hex("zzzzzz").is_err());
        assert!(Rgb::from_hex("").is_err());
        assert!(Rgb::from_hex("+FFFFF").is_err());
        assert!(Rgb::from_hex("#-12345").is_err());
    }

    #[test]
    fn test_empty_workspace_rejected() {
        assert!(OccupancyGrid::new(0, 10).is_err());
    }

    #[test]
    fn test_classify() {
        let mut grid = OccupancyGrid::new(10, 5).unwrap();
        grid.set_cell(3, 2, true);
        assert_eq!(grid.classify(Point2D::new(3.5, 2.9)), CellClass::Obstacle);
        assert_eq!(grid.classify(Point2D::new(4.0, 2.0)), CellClass::Free);
        assert_eq!(grid.classify(Point2D::new(10.0, 2.0)), CellClass::OutOfBounds);
        assert_eq!(grid.classify(Point2D::new(f64::NAN, 2.0)), CellClass::OutOfBounds);
        assert!(grid.is_obstacle(Point2D::new(-1.0, 0.0)));
    }

    #[test]
    fn test_from_rgb_uses_obstacle_color() {
        let mut pixels = vec![Rgb::WHITE; 4 * 3];
        // row 1, column 2
        pixels[4 + 2] = Rgb::BLACK;
        let grid = OccupancyGrid::from_rgb(4, 3, &pixels, Rgb::BLACK).unwrap();
        assert_eq!(grid.obstacle_count(), 1);
        assert!(grid.is_obstacle(Point2D::new(2.5, 1.5)));
        assert!(!grid.is_obstacle(Point2D::new(1.5, 2.5)));
    }

    #[test]
    fn test_from_rgb_size_mismatch() {
        let pixels = vec![Rgb::WHITE; 5];
        let err = OccupancyGrid::from_rgb(4, 3, &pixels, Rgb::BLACK).unwrap_err();
        assert!(matches!(
            err,
            NavError::BufferSizeMismatch { expected: 12, actual: 5 }
        ));
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut grid = OccupancyGrid::new(10, 10).unwrap();
        grid.fill_rect(Point2D::new(-5.0, 8.0), Point2D::new(1.5, 20.0));
        // columns 0..=1, rows 8..=9
        assert_eq!(grid.obstacle_count(), 4);
        grid.fill_rect(Point2D::new(20.0, 20.0), Point2D::new(30.0, 30.0));
        assert_eq!(grid.obstacle_count(), 4);
    }

    #[test]
    fn test_fill_circle() {
        let mut grid = OccupancyGrid::new(20, 20).unwrap();
        grid.fill_circle(Point2D::new(10.0, 10.0), 3.0);
        assert!(grid.is_obstacle(Point2D::new(10.0, 10.0)));
        assert!(!grid.is_obstacle(Point2D::new(14.5, 10.0)));
        assert_eq!(grid.obstacle_cells().len(), grid.obstacle_count());
    }

    #[test]
    fn test_segment_through_wall() {
        let mut grid = OccupancyGrid::new(100, 100).unwrap();
        grid.fill_rect(Point2D::new(50.0, 0.0), Point2D::new(52.0, 99.0));
        assert!(grid.segment_crosses(Point2D::new(10.0, 10.0), Point2D::new(90.0, 90.0)));
        assert!(!grid.segment_crosses(Point2D::new(10.0, 10.0), Point2D::new(40.0, 90.0)));
    }

    proptest! {
        #[test]
        fn segment_crosses_is_symmetric(
            ax in 0.0f64..60.0, ay in 0.0f64..60.0,
            bx in 0.0f64..60.0, by in 0.0f64..60.0,
            cx in 0.0f64..60.0, cy in 0.0f64..60.0,
            r in 1.0f64..10.0,
        ) {
            let mut grid = OccupancyGrid::new(60, 60).unwrap();
            grid.fill_circle(Point2D::new(cx, cy), r);
            let a = Point2D::new(ax, ay);
            let b = Point2D::new(bx, by);
            prop_assert_eq!(grid.segment_crosses(a, b), grid.segment_crosses(b, a));
        }
    }
}
