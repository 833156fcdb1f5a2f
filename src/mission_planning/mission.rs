//! Plan / execute / replan mission loop
//!
//! A small state machine that owns the workspace, the planner, the range
//! sensor and the agent. Every tick runs one step of the current state:
//!
//! ```text
//! SelectingEndpoints --endpoints_selected--> Planning --plan_found--> Executing
//! Executing --path_blocked--> Planning
//! Executing --goal_reached--> Done
//! Planning  --retries_exhausted--> Failed      (only with a bounded budget)
//! any       --quit_requested--> Stopped
//! ```

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::{CollisionOracle, InputSource, NavError, NavResult, Obstacles, Point2D, Pose2D};
use crate::mapping::{RangeSensor, SensorConfig, SweepMap};
use crate::path_planning::{Plan, RrtConfig, RrtPlanner};
use crate::path_tracking::{AgentConfig, DifferentialDriveAgent};

/// Mission states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionState {
    SelectingEndpoints,
    Planning,
    Executing,
    Done,
    Stopped,
    Failed,
}

impl MissionState {
    /// Whether the mission can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionState::Done | MissionState::Stopped | MissionState::Failed)
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissionState::SelectingEndpoints => "selecting_endpoints",
            MissionState::Planning => "planning",
            MissionState::Executing => "executing",
            MissionState::Done => "done",
            MissionState::Stopped => "stopped",
            MissionState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Events that move the mission between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionEvent {
    EndpointsSelected,
    PlanFound,
    /// An edge of the lookahead window crosses an obstacle
    PathBlocked,
    GoalReached,
    RetriesExhausted,
    QuitRequested,
}

impl fmt::Display for MissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissionEvent::EndpointsSelected => "endpoints_selected",
            MissionEvent::PlanFound => "plan_found",
            MissionEvent::PathBlocked => "path_blocked",
            MissionEvent::GoalReached => "goal_reached",
            MissionEvent::RetriesExhausted => "retries_exhausted",
            MissionEvent::QuitRequested => "quit_requested",
        };
        write!(f, "{}", name)
    }
}

/// Recorded state change
pub type Transition = (MissionState, MissionEvent, MissionState);

/// Mission parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub planner: RrtConfig,
    pub sensor: SensorConfig,
    pub agent: AgentConfig,
    /// Number of waypoints ahead of the cursor re-validated every tick
    pub lookahead_window: usize,
    /// Consecutive failed plans before giving up; None retries forever
    pub max_planning_attempts: Option<usize>,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            planner: RrtConfig::default(),
            sensor: SensorConfig::default(),
            agent: AgentConfig::default(),
            lookahead_window: 15,
            max_planning_attempts: None,
        }
    }
}

/// Closed-loop navigation mission over workspace `O` with random source `R`
pub struct Mission<O, R> {
    config: MissionConfig,
    world: O,
    rng: R,
    planner: RrtPlanner,
    sensor: RangeSensor,
    agent: Option<DifferentialDriveAgent>,
    state: MissionState,
    start: Option<Point2D>,
    goal: Option<Point2D>,
    sensed: Obstacles,
    sweep: SweepMap,
    last_plan: Option<Plan>,
    planning_attempts: usize,
    replans: usize,
    ticks: usize,
    history: Vec<Transition>,
}

impl<O: CollisionOracle, R: Rng> Mission<O, R> {
    /// Create a mission waiting for endpoint picks
    pub fn new(world: O, rng: R, config: MissionConfig) -> NavResult<Self> {
        config.planner.validate()?;
        config.agent.validate()?;
        let sensor = RangeSensor::new(config.sensor.clone())?;
        let sweep = SweepMap::new(world.width().ceil() as usize, world.height().ceil() as usize);
        Ok(Self {
            planner: RrtPlanner::new(config.planner.clone()),
            config,
            world,
            rng,
            sensor,
            agent: None,
            state: MissionState::SelectingEndpoints,
            start: None,
            goal: None,
            sensed: Obstacles::new(),
            sweep,
            last_plan: None,
            planning_attempts: 0,
            replans: 0,
            ticks: 0,
            history: Vec::new(),
        })
    }

    /// Create a mission with both endpoints already chosen
    pub fn with_endpoints(
        world: O,
        rng: R,
        config: MissionConfig,
        start: Point2D,
        goal: Point2D,
    ) -> NavResult<Self> {
        let mut mission = Self::new(world, rng, config)?;
        mission.set_endpoints(start, goal)?;
        Ok(mission)
    }

    pub fn state(&self) -> MissionState {
        self.state
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn world(&self) -> &O {
        &self.world
    }

    /// Mutable access to the workspace, e.g. to place obstacles mid-mission
    pub fn world_mut(&mut self) -> &mut O {
        &mut self.world
    }

    pub fn agent(&self) -> Option<&DifferentialDriveAgent> {
        self.agent.as_ref()
    }

    pub fn start(&self) -> Option<Point2D> {
        self.start
    }

    pub fn goal(&self) -> Option<Point2D> {
        self.goal
    }

    /// Obstacle points from the latest sensing pass
    pub fn sensed_obstacles(&self) -> &Obstacles {
        &self.sensed
    }

    pub fn sweep(&self) -> &SweepMap {
        &self.sweep
    }

    /// Most recent successful plan
    pub fn last_plan(&self) -> Option<&Plan> {
        self.last_plan.as_ref()
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Number of replans triggered by a blocked lookahead window
    pub fn replans(&self) -> usize {
        self.replans
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Run one tick of the state machine
    pub fn tick<I: InputSource + ?Sized>(&mut self, input: &mut I, dt: f64) -> NavResult<MissionState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        if input.quit_requested() {
            self.transition(MissionEvent::QuitRequested, MissionState::Stopped);
            return Ok(self.state);
        }

        match self.state {
            MissionState::SelectingEndpoints => self.select_endpoints(input)?,
            MissionState::Planning => self.plan_step()?,
            MissionState::Executing => self.execute_step(dt),
            MissionState::Done | MissionState::Stopped | MissionState::Failed => {}
        }
        self.ticks += 1;
        Ok(self.state)
    }

    /// Tick until a terminal state or until `max_ticks` ticks have run
    pub fn run<I: InputSource + ?Sized>(
        &mut self,
        input: &mut I,
        dt: f64,
        max_ticks: usize,
    ) -> NavResult<MissionState> {
        for _ in 0..max_ticks {
            if self.tick(input, dt)?.is_terminal() {
                break;
            }
        }
        Ok(self.state)
    }

    fn select_endpoints<I: InputSource + ?Sized>(&mut self, input: &mut I) -> NavResult<()> {
        while self.goal.is_none() {
            let Some(p) = input.next_endpoint() else {
                return Ok(());
            };
            if !self.world.contains(p) {
                warn!(x = p.x, y = p.y, "ignoring endpoint outside the workspace");
                continue;
            }
            match self.start {
                None => self.start = Some(p),
                Some(start) => return self.set_endpoints(start, p),
            }
        }
        Ok(())
    }

    fn set_endpoints(&mut self, start: Point2D, goal: Point2D) -> NavResult<()> {
        if !self.world.contains(start) || !self.world.contains(goal) {
            return Err(NavError::invalid("mission endpoints must lie inside the workspace"));
        }
        self.start = Some(start);
        self.goal = Some(goal);
        self.agent = Some(DifferentialDriveAgent::new(
            Pose2D::from_position(start, 0.0),
            self.config.agent.clone(),
        )?);
        info!(start.x = start.x, start.y = start.y, goal.x = goal.x, goal.y = goal.y, "endpoints selected");
        self.transition(MissionEvent::EndpointsSelected, MissionState::Planning);
        Ok(())
    }

    fn plan_step(&mut self) -> NavResult<()> {
        let (Some(agent), Some(goal)) = (self.agent.as_mut(), self.goal) else {
            return Err(NavError::invalid("planning requires an agent and a goal"));
        };
        let from = agent.position();

        match self.planner.plan(from, goal, &self.world, &mut self.rng) {
            Ok(plan) => {
                agent.install_path(plan.path.clone());
                self.last_plan = Some(plan);
                self.planning_attempts = 0;
                self.transition(MissionEvent::PlanFound, MissionState::Executing);
            }
            Err(e) if e.is_recoverable() => {
                self.planning_attempts += 1;
                debug!(attempts = self.planning_attempts, "planning attempt failed: {}", e);
                if let Some(max) = self.config.max_planning_attempts {
                    if self.planning_attempts >= max {
                        self.transition(MissionEvent::RetriesExhausted, MissionState::Failed);
                    }
                }
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn execute_step(&mut self, dt: f64) {
        self.sense();
        if let Some(agent) = self.agent.as_mut() {
            agent.integrate(dt);
        }
        self.sense();

        if let Some(edge) = self.blocked_lookahead_edge() {
            self.replans += 1;
            warn!(edge, replans = self.replans, "obstacle on upcoming path, replanning");
            self.transition(MissionEvent::PathBlocked, MissionState::Planning);
        } else if self.agent.as_ref().map_or(false, |a| a.goal_reached()) {
            self.transition(MissionEvent::GoalReached, MissionState::Done);
        }
    }

    fn sense(&mut self) {
        if let Some(agent) = self.agent.as_ref() {
            let scan = self.sensor.sense(agent.pose(), &self.world);
            self.sweep.mark(&scan.swept);
            self.sensed = scan.obstacles;
        }
    }

    /// First edge (farthest first) between `cursor - window` and the cursor
    /// that crosses an obstacle, identified by its lower waypoint index
    fn blocked_lookahead_edge(&self) -> Option<usize> {
        let agent = self.agent.as_ref()?;
        let points = &agent.path().points;
        let cursor = agent.waypoint().min(points.len().saturating_sub(1));
        let first = cursor.saturating_sub(self.config.lookahead_window);
        (first..cursor).find(|&i| self.world.segment_crosses(points[i], points[i + 1]))
    }

    fn transition(&mut self, event: MissionEvent, to: MissionState) {
        let from = self.state;
        info!("mission transitioning from <{}> to <{}> on event [{}]", from, to, event);
        self.history.push((from, event, to));
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::OccupancyGrid;
    use crate::mission_planning::ScriptedInput;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn walled_world() -> OccupancyGrid {
        let mut world = OccupancyGrid::new(800, 600).unwrap();
        world.fill_rect(Point2D::new(250.0, 0.0), Point2D::new(270.0, 420.0));
        world.fill_rect(Point2D::new(520.0, 180.0), Point2D::new(540.0, 599.0));
        world
    }

    fn enclosed_goal_world() -> OccupancyGrid {
        let mut world = OccupancyGrid::new(200, 200).unwrap();
        world.fill_rect(Point2D::new(140.0, 140.0), Point2D::new(199.0, 199.0));
        world.set_cell(170, 170, false);
        world
    }

    #[test]
    fn test_mission_reaches_goal() {
        let start = Point2D::new(40.0, 40.0);
        let goal = Point2D::new(740.0, 60.0);
        let mut mission = Mission::new(walled_world(), StdRng::seed_from_u64(21), MissionConfig {
            planner: RrtConfig { max_iterations: 20000, ..Default::default() },
            ..Default::default()
        })
        .unwrap();
        let mut input = ScriptedInput::start_goal(start, goal);

        let state = mission.run(&mut input, 0.1, 5000).unwrap();
        assert_eq!(state, MissionState::Done);
        assert_eq!(
            &mission.history()[..2],
            &[
                (MissionState::SelectingEndpoints, MissionEvent::EndpointsSelected, MissionState::Planning),
                (MissionState::Planning, MissionEvent::PlanFound, MissionState::Executing),
            ]
        );
        assert_eq!(
            mission.history().last(),
            Some(&(MissionState::Executing, MissionEvent::GoalReached, MissionState::Done))
        );
        let agent = mission.agent().unwrap();
        assert_eq!(agent.waypoint(), 0);
        assert!(agent.dist(goal) < 35.0);
        assert!(mission.sweep().swept_count() > 0);
    }

    #[test]
    fn test_waits_for_both_endpoints() {
        let world = OccupancyGrid::new(100, 100).unwrap();
        let mut mission = Mission::new(world, StdRng::seed_from_u64(0), MissionConfig::default()).unwrap();
        let mut input = ScriptedInput::new([Point2D::new(500.0, 5.0), Point2D::new(10.0, 10.0)]);
        assert_eq!(mission.tick(&mut input, 0.1).unwrap(), MissionState::SelectingEndpoints);
        assert_eq!(mission.start(), Some(Point2D::new(10.0, 10.0)));
        assert_eq!(mission.goal(), None);
        assert!(mission.agent().is_none());
    }

    #[test]
    fn test_injected_obstacle_triggers_replan() {
        let start = Point2D::new(50.0, 50.0);
        let goal = Point2D::new(700.0, 500.0);
        let mut mission = Mission::with_endpoints(
            OccupancyGrid::new(800, 600).unwrap(),
            StdRng::seed_from_u64(9),
            MissionConfig::default(),
            start,
            goal,
        )
        .unwrap();
        let mut input = ScriptedInput::default();

        assert_eq!(mission.tick(&mut input, 0.05).unwrap(), MissionState::Executing);
        assert_eq!(mission.tick(&mut input, 0.05).unwrap(), MissionState::Executing);

        let agent = mission.agent().unwrap();
        let cursor = agent.waypoint();
        assert!(cursor >= 10);
        let blocked = agent.path().points[cursor - 8];
        mission.world_mut().fill_circle(blocked, 4.0);

        assert_eq!(mission.tick(&mut input, 0.05).unwrap(), MissionState::Planning);
        assert_eq!(mission.replans(), 1);
        assert_eq!(
            mission.history().last(),
            Some(&(MissionState::Executing, MissionEvent::PathBlocked, MissionState::Planning))
        );

        // the replacement path starts from where the agent stopped and avoids the obstacle
        let pose_before = *mission.agent().unwrap().pose();
        assert_eq!(mission.tick(&mut input, 0.05).unwrap(), MissionState::Executing);
        let plan = mission.last_plan().unwrap();
        assert_eq!(plan.raw_path.last(), Some(pose_before.position()));
        for pair in plan.raw_path.points.windows(2) {
            assert!(!mission.world().segment_crosses(pair[0], pair[1]));
        }
        assert!(mission.world().is_obstacle(blocked));
    }

    #[test]
    fn test_sensed_obstacles_replaced_each_pass() {
        let mut world = OccupancyGrid::new(400, 300).unwrap();
        world.fill_rect(Point2D::new(150.0, 0.0), Point2D::new(160.0, 150.0));
        let mut mission = Mission::with_endpoints(
            world,
            StdRng::seed_from_u64(4),
            MissionConfig::default(),
            Point2D::new(100.0, 50.0),
            Point2D::new(350.0, 250.0),
        )
        .unwrap();
        let mut input = ScriptedInput::default();
        assert!(mission.sensed_obstacles().is_empty());
        mission.tick(&mut input, 0.05).unwrap();
        mission.tick(&mut input, 0.05).unwrap();
        let beams = mission.config().sensor.beam_count;
        assert!(mission.sensed_obstacles().len() <= beams);
        assert!(mission.sweep().swept_count() > 0);
        assert_eq!(mission.world().obstacle_count(), 11 * 151);
    }

    #[test]
    fn test_quit_stops_from_any_state() {
        let world = OccupancyGrid::new(100, 100).unwrap();
        let mut mission = Mission::new(world, StdRng::seed_from_u64(0), MissionConfig::default()).unwrap();
        let mut input = ScriptedInput::start_goal(Point2D::new(10.0, 10.0), Point2D::new(90.0, 90.0))
            .with_quit_after(1);
        assert_eq!(mission.tick(&mut input, 0.1).unwrap(), MissionState::Planning);
        assert_eq!(mission.tick(&mut input, 0.1).unwrap(), MissionState::Stopped);
        assert_eq!(mission.tick(&mut input, 0.1).unwrap(), MissionState::Stopped);
        assert_eq!(
            mission.history().last(),
            Some(&(MissionState::Planning, MissionEvent::QuitRequested, MissionState::Stopped))
        );
    }

    #[test]
    fn test_planning_retries_forever_by_default() {
        let mut mission = Mission::with_endpoints(
            enclosed_goal_world(),
            StdRng::seed_from_u64(2),
            MissionConfig {
                planner: RrtConfig { max_iterations: 100, ..Default::default() },
                ..Default::default()
            },
            Point2D::new(10.0, 10.0),
            Point2D::new(170.5, 170.5),
        )
        .unwrap();
        let mut input = ScriptedInput::default();
        for _ in 0..5 {
            assert_eq!(mission.tick(&mut input, 0.1).unwrap(), MissionState::Planning);
        }
    }

    #[test]
    fn test_bounded_planning_attempts_fail() {
        let mut mission = Mission::with_endpoints(
            enclosed_goal_world(),
            StdRng::seed_from_u64(2),
            MissionConfig {
                planner: RrtConfig { max_iterations: 100, ..Default::default() },
                max_planning_attempts: Some(3),
                ..Default::default()
            },
            Point2D::new(10.0, 10.0),
            Point2D::new(170.5, 170.5),
        )
        .unwrap();
        let state = mission.run(&mut ScriptedInput::default(), 0.1, 50).unwrap();
        assert_eq!(state, MissionState::Failed);
        assert_eq!(mission.ticks(), 3);
    }

    #[test]
    fn test_endpoints_outside_workspace_rejected() {
        let world = OccupancyGrid::new(100, 100).unwrap();
        let result = Mission::with_endpoints(
            world,
            StdRng::seed_from_u64(0),
            MissionConfig::default(),
            Point2D::new(10.0, 10.0),
            Point2D::new(150.0, 10.0),
        );
        assert!(matches!(result, Err(NavError::InvalidParameter(_))));
    }
}
