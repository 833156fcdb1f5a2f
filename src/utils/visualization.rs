//! Visualization utilities for rrt_navigation
//!
//! Provides a unified interface for plotting workspaces, trees, paths and
//! mission state using gnuplot.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};
use rand::Rng;

use crate::common::{CollisionOracle, NavError, NavResult, Obstacles, Path2D, Point2D, Pose2D, Visualizable};
use crate::mapping::{OccupancyGrid, SweepMap};
use crate::mission_planning::Mission;
use crate::path_planning::RrtTree;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const CYAN: &str = "#00FFFF";
    pub const GRAY: &str = "#808080";
    pub const LIGHT_GRAY: &str = "#D3D3D3";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
    pub const TREE: &str = GRAY;
    pub const ROBOT: &str = CYAN;
    pub const SENSED: &str = "#DD3355";
    pub const SWEPT: &str = LIGHT_GRAY;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::PATH.to_string(),
            line_width: 2.0,
            caption: "Path".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

/// Main visualizer struct
pub struct Visualizer {
    figure: Figure,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    /// Create a new visualizer
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_label: "X [px]".to_string(),
            y_label: "Y [px]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    /// Set the plot title
    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set X axis range
    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    /// Set Y axis range
    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Fix both axes to a `width` x `height` workspace
    pub fn set_workspace<O: CollisionOracle + ?Sized>(&mut self, oracle: &O) -> &mut Self {
        self.set_x_range(0.0, oracle.width());
        self.set_y_range(0.0, oracle.height())
    }

    pub fn workspace_ranges(&self) -> (Option<(f64, f64)>, Option<(f64, f64)>) {
        (self.x_range, self.y_range)
    }

    /// Plot a path
    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.figure.axes2d().lines(
            &path.x_coords(),
            &path.y_coords(),
            &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ],
        );
        self
    }

    /// Plot obstacle points
    pub fn plot_obstacles(&mut self, obstacles: &Obstacles) -> &mut Self {
        self.figure.axes2d().points(
            &obstacles.x_coords(),
            &obstacles.y_coords(),
            &[
                Caption("Obstacles"),
                Color(colors::OBSTACLE),
                PointSymbol('S'),
                PointSize(0.5),
            ],
        );
        self
    }

    /// Plot multiple points
    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();

        self.figure.axes2d().points(
            &x,
            &y,
            &[
                Caption(&style.caption),
                Color(&style.color),
                PointSymbol(style.symbol),
                PointSize(style.size),
            ],
        );
        self
    }

    /// Plot a single point (start, goal, etc.)
    pub fn plot_point(&mut self, point: Point2D, style: &PointStyle) -> &mut Self {
        self.plot_points(&[point], style)
    }

    /// Plot every parent-child edge of an RRT
    pub fn plot_tree(&mut self, tree: &RrtTree) -> &mut Self {
        let axes = self.figure.axes2d();
        for (from, to) in tree.edges() {
            axes.lines(&[from.x, to.x], &[from.y, to.y], &[Color(colors::TREE), LineWidth(0.5)]);
        }
        self
    }

    /// Plot the occupied cells of a grid
    pub fn plot_occupancy(&mut self, grid: &OccupancyGrid) -> &mut Self {
        self.plot_obstacles(&Obstacles::from_points(grid.obstacle_cells()))
    }

    /// Plot the cells a range sensor has swept
    pub fn plot_sweep(&mut self, sweep: &SweepMap) -> &mut Self {
        let cells = sweep.swept_cells();
        self.plot_points(
            &cells,
            &PointStyle::new(colors::SWEPT, "Swept").with_symbol('S').with_size(0.3),
        )
    }

    /// Plot obstacle points reported by the latest scan
    pub fn plot_sensed(&mut self, sensed: &Obstacles) -> &mut Self {
        self.plot_points(
            &sensed.points,
            &PointStyle::new(colors::SENSED, "Sensed").with_symbol('x'),
        )
    }

    /// Plot robot pose with direction indicator
    pub fn plot_robot(&mut self, pose: &Pose2D, size: f64) -> &mut Self {
        self.plot_point(
            pose.position(),
            &PointStyle::new(colors::ROBOT, "Robot").with_size(size),
        );

        let arrow_len = size * 10.0;
        let end_x = pose.x + arrow_len * pose.yaw.cos();
        let end_y = pose.y + arrow_len * pose.yaw.sin();
        self.figure
            .axes2d()
            .lines(&[pose.x, end_x], &[pose.y, end_y], &[Color(colors::ROBOT), LineWidth(2.0)]);
        self
    }

    /// Plot start position
    pub fn plot_start(&mut self, point: Point2D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    /// Plot goal position
    pub fn plot_goal(&mut self, point: Point2D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    /// Draw anything that knows how to draw itself
    pub fn draw<V: Visualizable + ?Sized>(&mut self, item: &V) -> &mut Self {
        item.visualize(self);
        self
    }

    /// Save plot to SVG file
    pub fn save_svg(&mut self, path: &str, width: u32, height: u32) -> NavResult<()> {
        self.apply_settings();
        self.figure
            .save_to_svg(path, width, height)
            .map_err(|e| NavError::Visualization(e.to_string()))
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizable for OccupancyGrid {
    fn visualize(&self, vis: &mut Visualizer) {
        vis.set_workspace(self).plot_occupancy(self);
    }
}

impl Visualizable for RrtTree {
    fn visualize(&self, vis: &mut Visualizer) {
        vis.plot_tree(self);
        if let Ok(points) = self.path_as_points() {
            vis.plot_path(
                &Path2D::from_points(points),
                &PathStyle::new(colors::PATH, "Tree path").with_line_width(1.0),
            );
        }
        vis.plot_start(self.start()).plot_goal(self.goal());
    }
}

impl<O, R> Visualizable for Mission<O, R>
where
    O: CollisionOracle + Visualizable,
    R: Rng,
{
    fn visualize(&self, vis: &mut Visualizer) {
        vis.draw(self.world()).plot_sweep(self.sweep());
        if let Some(plan) = self.last_plan() {
            vis.plot_tree(&plan.tree);
            vis.plot_path(&plan.path, &PathStyle::default());
        }
        vis.plot_sensed(self.sensed_obstacles());
        if let Some(start) = self.start() {
            vis.plot_start(start);
        }
        if let Some(goal) = self.goal() {
            vis.plot_goal(goal);
        }
        if let Some(agent) = self.agent() {
            vis.plot_robot(agent.pose(), 1.5);
        }
        vis.set_title(&format!("RRT mission: {}", self.state()));
    }
}
