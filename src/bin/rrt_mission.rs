// RRT mission demo
//
// Plans through a walled workspace, drives the agent along the path, drops
// an obstacle onto the route partway through, and replans around it.
// Set RUST_LOG=debug (or trace) for planner and sensor detail.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rrt_navigation::mapping::{OccupancyGrid, Rgb};
use rrt_navigation::mission_planning::{Mission, MissionConfig, MissionState, ScriptedInput};
use rrt_navigation::path_planning::RrtConfig;
use rrt_navigation::utils::Visualizer;
use rrt_navigation::{NavResult, Point2D};

const WIDTH: usize = 800;
const HEIGHT: usize = 600;
const DT: f64 = 0.05;
const MAX_TICKS: usize = 20_000;

fn walled_world() -> NavResult<OccupancyGrid> {
    // raster with two offset walls, as an image loader would hand it over
    let wall = Rgb::from_hex("#000000")?;
    let floor = Rgb::from_hex("#FFFFFF")?;
    let mut pixels = vec![floor; WIDTH * HEIGHT];
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let first = (250..=270).contains(&x) && y <= 420;
            let second = (520..=540).contains(&x) && y >= 180;
            if first || second {
                pixels[y * WIDTH + x] = wall;
            }
        }
    }
    OccupancyGrid::from_rgb(WIDTH, HEIGHT, &pixels, Rgb::BLACK)
}

fn main() -> NavResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = MissionConfig {
        planner: RrtConfig {
            max_iterations: 20_000,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut mission = Mission::new(walled_world()?, StdRng::seed_from_u64(7), config)?;
    let mut input = ScriptedInput::start_goal(Point2D::new(40.0, 40.0), Point2D::new(740.0, 60.0));

    let mut obstacle_dropped = false;
    for _ in 0..MAX_TICKS {
        let state = mission.tick(&mut input, DT)?;
        if state.is_terminal() {
            break;
        }
        if state != MissionState::Executing || obstacle_dropped {
            continue;
        }
        let Some(agent) = mission.agent() else {
            continue;
        };
        let cursor = agent.waypoint();
        if cursor > 10 && mission.ticks() > 100 {
            let ahead = agent.path().points[cursor - 8];
            info!(x = ahead.x, y = ahead.y, "dropping obstacle on the route");
            mission.world_mut().fill_circle(ahead, 12.0);
            obstacle_dropped = true;
        }
    }

    info!(
        state = %mission.state(),
        ticks = mission.ticks(),
        replans = mission.replans(),
        "mission finished"
    );
    for (from, event, to) in mission.history() {
        info!("{} --{}--> {}", from, event, to);
    }

    let crate_dir = env!("CARGO_MANIFEST_DIR");
    let mut vis = Visualizer::new();
    vis.draw(&mission);
    vis.save_svg(&format!("{}/img/rrt_mission.svg", crate_dir), 800, 600)?;
    Ok(())
}
