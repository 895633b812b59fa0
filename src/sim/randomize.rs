//! Procedural field generation
//!
//! Builds a randomized [`FieldRepresentation`] from per-category budgets:
//! ramp contents first, then the remaining budget scattered across an
//! occupancy grid one entity per cell. Sub-spawning (rings on goals, goals
//! and rings pre-loaded into robots) uses a decayed re-roll loop so counts
//! are long-tailed but always bounded by the budget.
//!
//! All randomness flows through the caller's seeded RNG; a fixed seed
//! reproduces the exact layout.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geometry::Pose;
use super::state::{
    Alliance, FieldRepresentation, Goal, GoalLevel, Platform, PlatformState, Ring, Robot, RobotRole,
};
use crate::consts::*;

/// One grid cell per field inch, both axes inclusive of the far edge
const GRID_CELLS: usize = FIELD_WIDTH_IN as usize + 1;

/// Per-category placement counts against their configured maximums.
/// `current <= maximum` must hold throughout generation; a violation is a
/// generator bug and is reported, never clamped away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCounts {
    pub red_goals: u32,
    pub max_red_goals: u32,
    pub blue_goals: u32,
    pub max_blue_goals: u32,
    pub low_neutral_goals: u32,
    pub max_low_neutral_goals: u32,
    pub high_neutral_goals: u32,
    pub max_high_neutral_goals: u32,
    pub rings: u32,
    pub max_rings: u32,
    pub host_robots: u32,
    pub max_host_robots: u32,
    pub partner_robots: u32,
    pub max_partner_robots: u32,
    pub opposing_robots: u32,
    pub max_opposing_robots: u32,
}

impl Default for FieldCounts {
    fn default() -> Self {
        Self {
            red_goals: 0,
            max_red_goals: MAX_NUM_RED_GOALS,
            blue_goals: 0,
            max_blue_goals: MAX_NUM_BLUE_GOALS,
            low_neutral_goals: 0,
            max_low_neutral_goals: MAX_NUM_LOW_NEUTRAL_GOALS,
            high_neutral_goals: 0,
            max_high_neutral_goals: MAX_NUM_HIGH_NEUTRAL_GOALS,
            rings: 0,
            max_rings: MAX_NUM_RINGS,
            host_robots: 0,
            max_host_robots: MAX_NUM_HOST_ROBOTS,
            partner_robots: 0,
            max_partner_robots: MAX_NUM_PARTNER_ROBOTS,
            opposing_robots: 0,
            max_opposing_robots: MAX_NUM_OPPOSING_ROBOTS,
        }
    }
}

impl FieldCounts {
    pub fn remaining_goals(&self) -> u32 {
        remaining(self.red_goals, self.max_red_goals)
            + remaining(self.blue_goals, self.max_blue_goals)
            + remaining(self.low_neutral_goals, self.max_low_neutral_goals)
            + remaining(self.high_neutral_goals, self.max_high_neutral_goals)
    }

    pub fn remaining_robots(&self) -> u32 {
        remaining(self.host_robots, self.max_host_robots)
            + remaining(self.partner_robots, self.max_partner_robots)
            + remaining(self.opposing_robots, self.max_opposing_robots)
    }
}

fn remaining(current: u32, max: u32) -> u32 {
    max.saturating_sub(current)
}

/// Summary of one generation run, returned alongside the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenReport {
    pub counts: FieldCounts,
    /// Number of refused operations (budget underflow, unplaceable
    /// entities, slot overflow). Zero on a healthy run; anything else
    /// is a generator bug, never silently clamped away.
    pub invariant_violations: u32,
}

/// Produce a freshly randomized field from the default budgets
pub fn randomized_field(rng: &mut Pcg32) -> (FieldRepresentation, GenReport) {
    let mut generator = Generator {
        rng,
        counts: FieldCounts::default(),
        violations: 0,
    };
    let field = generator.run();
    let report = GenReport {
        counts: generator.counts,
        invariant_violations: generator.violations,
    };
    (field, report)
}

/// Occupancy grid over the discretized field; one entity per cell
struct OccupancyGrid {
    cells: Vec<bool>,
}

impl OccupancyGrid {
    fn new() -> Self {
        Self {
            cells: vec![false; GRID_CELLS * GRID_CELLS],
        }
    }

    fn is_blocked(&self, gx: usize, gy: usize) -> bool {
        self.cells[gy * GRID_CELLS + gx]
    }

    fn block(&mut self, gx: usize, gy: usize) {
        self.cells[gy * GRID_CELLS + gx] = true;
    }

    /// Mark every cell under both platform footprints
    fn block_platforms(&mut self) {
        let mid = GRID_CELLS / 2;
        let half_len = (PLATFORM_LENGTH_IN / 2.0) as usize;
        let depth = PLATFORM_WIDTH_IN as usize;
        for gx in (mid - half_len)..=(mid + half_len) {
            for gy in 0..=depth {
                self.block(gx, gy);
            }
            for gy in (GRID_CELLS - 1 - depth)..GRID_CELLS {
                self.block(gx, gy);
            }
        }
    }
}

struct Generator<'a> {
    rng: &'a mut Pcg32,
    counts: FieldCounts,
    violations: u32,
}

impl Generator<'_> {
    fn violation(&mut self, what: &str) {
        log::error!("field generation invariant violated: {what}");
        self.violations += 1;
    }

    fn remaining_rings(&mut self) -> u32 {
        self.checked_remaining(self.counts.rings, self.counts.max_rings, "rings")
    }

    fn checked_remaining(&mut self, current: u32, max: u32, what: &str) -> u32 {
        if current > max {
            self.violation(&format!("{what} count {current} exceeds budget {max}"));
            0
        } else {
            max - current
        }
    }

    /// Re-roll chance for one additional unit after `iteration` placements
    fn roll_another(&mut self, percentage: f32, decay: f32, iteration: u32) -> bool {
        let chance = percentage * (iteration + 1) as f32 * decay;
        self.rng.random::<f32>() < chance
    }

    /// Spawn one or more rings at `pose`, bounded by the ring budget.
    /// Declines outright when the budget is already spent.
    fn generate_rings(&mut self, pose: Pose, percentage: f32, decay: f32) -> Vec<Ring> {
        let mut rings = Vec::new();
        if self.remaining_rings() == 0 {
            return rings;
        }
        let mut iteration = 0;
        loop {
            rings.push(Ring::new(pose));
            self.counts.rings += 1;
            if self.remaining_rings() == 0 || !self.roll_another(percentage, decay, iteration) {
                break;
            }
            iteration += 1;
        }
        rings
    }

    /// Pre-load rings into a goal's containers, high branch down to base.
    ///
    /// One branch roll governs the whole batch; each ring lands in the
    /// first eligible container with vacancy. Stops when the goal has no
    /// capacity left so the budget is only spent on stored rings.
    fn add_rings_to_goal(&mut self, goal: &mut Goal) {
        if self.remaining_rings() == 0 {
            return;
        }
        let branch_roll = self.rng.random::<f32>();
        let mut iteration = 0;
        let mut stored = 0u32;
        loop {
            let ring = Ring::new(goal.pose);
            let placed = if branch_roll < SPAWN_RING_ON_HIGH_BRANCH
                && goal.high.remaining_utilization() > 0
            {
                goal.add_ring(ring, GoalLevel::High)
            } else if branch_roll < SPAWN_RING_ON_LOW_BRANCH && goal.low.remaining_utilization() > 0
            {
                goal.add_ring(ring, GoalLevel::Low)
            } else {
                goal.add_ring(ring, GoalLevel::Base)
            };
            if !placed {
                break;
            }
            self.counts.rings += 1;
            stored += 1;
            if self.remaining_rings() == 0
                || !self.roll_another(SPAWN_RING_ON_GOAL, RING_ON_GOAL_DECAY, iteration)
            {
                break;
            }
            iteration += 1;
        }
        log::info!(
            "spawned {stored} rings on goal at ({}, {})",
            goal.pose.pos.x,
            goal.pose.pos.y
        );
    }

    /// Pick a goal variant for a spawn roll, honoring per-variant budgets.
    /// An exhausted roll falls back to blue; fully exhausted ends the run.
    fn spawn_goal(&mut self, pose: Pose) -> Option<Goal> {
        let roll: u32 = self.rng.random_range(0..=3);
        let counts = self.counts;
        let goal = if roll == 0 && remaining(counts.low_neutral_goals, counts.max_low_neutral_goals) > 0 {
            self.counts.low_neutral_goals += 1;
            Some(Goal::low_neutral(pose))
        } else if roll == 1 && remaining(counts.high_neutral_goals, counts.max_high_neutral_goals) > 0 {
            self.counts.high_neutral_goals += 1;
            Some(Goal::high_neutral(pose))
        } else if roll == 2 && remaining(counts.red_goals, counts.max_red_goals) > 0 {
            self.counts.red_goals += 1;
            Some(Goal::red(pose))
        } else if remaining(counts.blue_goals, counts.max_blue_goals) > 0 {
            self.counts.blue_goals += 1;
            Some(Goal::blue(pose))
        } else {
            None
        };

        if let Some(goal) = goal {
            let mut goal = goal;
            if self.rng.random::<f32>() < SPAWN_RING_ON_GOAL {
                self.add_rings_to_goal(&mut goal);
            }
            Some(goal)
        } else {
            None
        }
    }

    /// Spawn one or more goals at `pose`, capped at `max_count`
    fn generate_goals(
        &mut self,
        pose: Pose,
        percentage: f32,
        decay: f32,
        max_count: usize,
    ) -> Vec<Goal> {
        let mut goals = Vec::new();
        let mut iteration = 0;
        while goals.len() < max_count {
            match self.spawn_goal(pose) {
                Some(goal) => goals.push(goal),
                None => break,
            }
            if self.counts.remaining_goals() == 0 || !self.roll_another(percentage, decay, iteration)
            {
                break;
            }
            iteration += 1;
        }
        goals
    }

    /// Pick a robot seat for a spawn roll, honoring per-seat budgets
    fn spawn_robot(&mut self, host_alliance: Alliance, pose: Pose) -> Option<Robot> {
        let roll: u32 = self.rng.random_range(0..=2);
        let counts = self.counts;
        let opposing_alliance = match host_alliance {
            Alliance::Red => Alliance::Blue,
            _ => Alliance::Red,
        };
        let robot = if roll == 0 && remaining(counts.host_robots, counts.max_host_robots) > 0 {
            self.counts.host_robots += 1;
            Some(Robot::new(host_alliance, RobotRole::Host, pose))
        } else if roll == 1 && remaining(counts.partner_robots, counts.max_partner_robots) > 0 {
            self.counts.partner_robots += 1;
            Some(Robot::new(host_alliance, RobotRole::Partner, pose))
        } else if roll == 2 && remaining(counts.opposing_robots, counts.max_opposing_robots) > 0 {
            self.counts.opposing_robots += 1;
            Some(Robot::new(opposing_alliance, RobotRole::Opposing, pose))
        } else {
            // Rolled seat already filled; the ramp run ends here
            None
        };

        robot.map(|mut robot| {
            self.maybe_load_robot(&mut robot);
            robot
        })
    }

    /// Roll independent chances to pre-load a robot with goals and rings
    fn maybe_load_robot(&mut self, robot: &mut Robot) {
        if self.rng.random::<f32>() < SPAWN_GOAL_IN_ROBOT {
            let goals = self.generate_goals(
                robot.pose,
                SPAWN_GOAL_IN_ROBOT,
                GOAL_IN_ROBOT_DECAY,
                2, // one per slot
            );
            for goal in goals {
                let back = robot
                    .pick_up_front_goal(goal)
                    .err()
                    .and_then(|goal| robot.pick_up_rear_goal(goal).err());
                if back.is_some() {
                    self.violation("pre-loaded goal exceeded the robot's two slots");
                }
            }
        }
        if self.rng.random::<f32>() < SPAWN_RING_IN_ROBOT {
            let mut rings = self.generate_rings(robot.pose, SPAWN_RING_IN_ROBOT, RING_IN_ROBOT_DECAY);
            robot.rings.append(&mut rings);
        }
    }

    /// Spawn one or more robots at `pose`, bounded by the seat budgets
    fn generate_robots(&mut self, host_alliance: Alliance, pose: Pose, percentage: f32, decay: f32) -> Vec<Robot> {
        let mut robots = Vec::new();
        let mut iteration = 0;
        loop {
            match self.spawn_robot(host_alliance, pose) {
                Some(robot) => robots.push(robot),
                None => break,
            }
            if self.counts.remaining_robots() == 0 || !self.roll_another(percentage, decay, iteration)
            {
                break;
            }
            iteration += 1;
        }
        robots
    }

    /// Populate one platform: independent rolls for robots, goals, and
    /// rings at stepped positions along the ramp, plus a random tilt
    fn generate_platform(&mut self, color: Alliance, host_alliance: Alliance) -> Platform {
        let mut x = -(PLATFORM_LENGTH_IN / 2.0) + 5.0;
        let y = match color {
            Alliance::Blue => FIELD_WIDTH_IN - PLATFORM_WIDTH_IN / 3.0,
            _ => PLATFORM_WIDTH_IN / 3.0,
        };

        let mut robots = Vec::new();
        if self.rng.random::<f32>() < SPAWN_ROBOT_ON_RAMP {
            robots = self.generate_robots(
                host_alliance,
                Pose::new(x, y, 0.0),
                SPAWN_ROBOT_ON_RAMP,
                ROBOT_ON_RAMP_DECAY,
            );
            x += 10.0;
        }

        let mut goals = Vec::new();
        if self.rng.random::<f32>() < SPAWN_GOAL_ON_RAMP {
            goals = self.generate_goals(
                Pose::new(x, y, 0.0),
                SPAWN_GOAL_ON_RAMP,
                GOAL_ON_RAMP_DECAY,
                usize::MAX,
            );
            x += 10.0;
        }

        let mut rings = Vec::new();
        if self.rng.random::<f32>() < SPAWN_RING_ON_RAMP {
            rings = self.generate_rings(Pose::new(x, y, 0.0), SPAWN_RING_ON_RAMP, RING_ON_RAMP_DECAY);
        }

        let tilt_roll = self.rng.random::<f32>();
        let state = if tilt_roll < 0.33 {
            PlatformState::Left
        } else if tilt_roll <= 0.66 {
            PlatformState::Level
        } else {
            PlatformState::Right
        };

        let mut platform = Platform::new(color, state);
        platform.robots = robots;
        platform.goals = goals;
        platform.rings = rings;
        platform
    }

    /// Sample an unblocked grid cell and mark it, or report a violation
    /// when the grid has no room left
    fn sample_free_cell(&mut self, grid: &mut OccupancyGrid) -> Option<Pose> {
        // Bounded retry: each miss is a collision with an occupied cell,
        // and the grid is far larger than the combined budgets.
        for _ in 0..GRID_CELLS * GRID_CELLS {
            let gx = self.rng.random_range(0..GRID_CELLS);
            let gy = self.rng.random_range(0..GRID_CELLS);
            if !grid.is_blocked(gx, gy) {
                grid.block(gx, gy);
                let x = gx as f32 - FIELD_HALF_WIDTH_IN;
                let y = gy as f32;
                return Some(Pose::new(x, y, 0.0));
            }
        }
        self.violation("no unblocked grid cell available for placement");
        None
    }

    fn run(&mut self) -> FieldRepresentation {
        let mut field = FieldRepresentation::empty();

        let mut grid = OccupancyGrid::new();
        grid.block_platforms();

        let host_alliance = if self.rng.random_range(0..=1) == 0 {
            Alliance::Red
        } else {
            Alliance::Blue
        };

        field.red_platform = self.generate_platform(Alliance::Red, host_alliance);
        field.blue_platform = self.generate_platform(Alliance::Blue, host_alliance);

        // Scatter the remaining budget of each category across the grid
        while self.checked_remaining(self.counts.host_robots, self.counts.max_host_robots, "host robots") > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            let mut robot = Robot::new(host_alliance, RobotRole::Host, pose);
            self.maybe_load_robot(&mut robot);
            field.robots.push(robot);
            self.counts.host_robots += 1;
            log::info!("spawned host robot at ({}, {})", pose.pos.x, pose.pos.y);
        }

        while self.checked_remaining(self.counts.partner_robots, self.counts.max_partner_robots, "partner robots") > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            let mut robot = Robot::new(host_alliance, RobotRole::Partner, pose);
            self.maybe_load_robot(&mut robot);
            field.robots.push(robot);
            self.counts.partner_robots += 1;
            log::info!("spawned partner robot at ({}, {})", pose.pos.x, pose.pos.y);
        }

        let opposing_alliance = match host_alliance {
            Alliance::Red => Alliance::Blue,
            _ => Alliance::Red,
        };
        while self.checked_remaining(self.counts.opposing_robots, self.counts.max_opposing_robots, "opposing robots") > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            let mut robot = Robot::new(opposing_alliance, RobotRole::Opposing, pose);
            self.maybe_load_robot(&mut robot);
            field.robots.push(robot);
            self.counts.opposing_robots += 1;
            log::info!("spawned opposing robot at ({}, {})", pose.pos.x, pose.pos.y);
        }

        while self.checked_remaining(self.counts.red_goals, self.counts.max_red_goals, "red goals") > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            let mut goal = Goal::red(pose);
            if self.rng.random::<f32>() < SPAWN_RING_ON_GOAL {
                self.add_rings_to_goal(&mut goal);
            }
            field.goals.push(goal);
            self.counts.red_goals += 1;
            log::info!("spawned red goal at ({}, {})", pose.pos.x, pose.pos.y);
        }

        while self.checked_remaining(self.counts.blue_goals, self.counts.max_blue_goals, "blue goals") > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            let mut goal = Goal::blue(pose);
            if self.rng.random::<f32>() < SPAWN_RING_ON_GOAL {
                self.add_rings_to_goal(&mut goal);
            }
            field.goals.push(goal);
            self.counts.blue_goals += 1;
            log::info!("spawned blue goal at ({}, {})", pose.pos.x, pose.pos.y);
        }

        while self.checked_remaining(self.counts.low_neutral_goals, self.counts.max_low_neutral_goals, "low neutral goals") > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            let mut goal = Goal::low_neutral(pose);
            if self.rng.random::<f32>() < SPAWN_RING_ON_GOAL {
                self.add_rings_to_goal(&mut goal);
            }
            field.goals.push(goal);
            self.counts.low_neutral_goals += 1;
            log::info!("spawned low neutral goal at ({}, {})", pose.pos.x, pose.pos.y);
        }

        while self.checked_remaining(self.counts.high_neutral_goals, self.counts.max_high_neutral_goals, "high neutral goals") > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            let mut goal = Goal::high_neutral(pose);
            if self.rng.random::<f32>() < SPAWN_RING_ON_GOAL {
                self.add_rings_to_goal(&mut goal);
            }
            field.goals.push(goal);
            self.counts.high_neutral_goals += 1;
            log::info!("spawned high neutral goal at ({}, {})", pose.pos.x, pose.pos.y);
        }

        while self.remaining_rings() > 0 {
            let Some(pose) = self.sample_free_cell(&mut grid) else { break };
            field.rings.push(Ring::new(pose));
            self.counts.rings += 1;
            log::info!("spawned ring at ({}, {})", pose.pos.x, pose.pos.y);
        }

        field
    }
}
