//! Gym-style environment boundary
//!
//! External drivers (an RL harness, the native binary) own a [`FieldEnv`]
//! for the lifetime of an episode and talk to the simulation only through
//! `reset` and `step`. The observation is a structured, serializable
//! snapshot; tensor packing is the driver's concern, not ours. Read-only
//! accessors on [`FieldEnv`] double as the render and persistence hooks.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::settings::{EnvSettings, LayoutMode};
use crate::sim::geometry::Pose;
use crate::sim::randomize::{GenReport, randomized_field};
use crate::sim::scoring::alliance_score;
use crate::sim::state::{
    Alliance, FieldRepresentation, FieldState, Goal, Platform, PlatformState, Robot, RobotRole,
};
use crate::sim::tick::{self, Action};

/// Entity category in an observation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObsKind {
    HighNeutralGoal,
    Goal,
    Ring,
    Robot,
}

/// One observed entity: enough to reconstruct its position, possession,
/// color, and point value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityObs {
    pub kind: ObsKind,
    pub color: Alliance,
    pub pose: Pose,
    /// Ring-container utilization per level (base, low, high); zero for
    /// anything that is not a goal
    pub levels: [u8; 3],
    /// Goals held in robot slots
    pub held_goals: u8,
    /// Rings carried in a robot's hopper
    pub held_rings: u8,
    /// Whether a robot plays against the host; absent for non-robots
    pub is_opposing: Option<bool>,
    /// Point value against the host's alliance
    pub value: i32,
}

/// Aggregate view of one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformObs {
    pub color: Alliance,
    pub state: PlatformState,
    pub rings: u8,
    pub goals: u8,
    pub robots: u8,
}

/// Serializable snapshot handed to the driver each step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entities: Vec<EntityObs>,
    pub platforms: [PlatformObs; 2],
    pub time_remaining: u32,
}

/// Side-channel data alongside each step result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub red_score: i32,
    pub blue_score: i32,
    pub time_remaining: u32,
}

pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

/// A field simulation behind the reset/step interface
pub struct FieldEnv {
    settings: EnvSettings,
    rng: Pcg32,
    state: FieldState,
    last_report: Option<GenReport>,
}

impl FieldEnv {
    /// Build an environment. The field is empty until the first `reset`.
    pub fn new(settings: EnvSettings) -> Self {
        let rng = Pcg32::seed_from_u64(settings.seed);
        Self {
            settings,
            rng,
            state: FieldState::new(FieldRepresentation::empty(), 0),
            last_report: None,
        }
    }

    /// Rebuild the field and refill the time budget.
    ///
    /// Randomized layouts draw from the environment's RNG stream, so
    /// consecutive resets differ; use [`Self::reset_from_seed`] to
    /// reproduce a layout exactly.
    pub fn reset(&mut self) -> Observation {
        let representation = match self.settings.layout {
            LayoutMode::Fixed => {
                self.last_report = None;
                FieldRepresentation::starting()
            }
            LayoutMode::Randomized => {
                let (field, report) = randomized_field(&mut self.rng);
                if report.invariant_violations > 0 {
                    log::error!(
                        "field generation reported {} invariant violations",
                        report.invariant_violations
                    );
                }
                self.last_report = Some(report);
                field
            }
        };
        self.state = FieldState::new(representation, self.settings.episode_steps);
        self.observe()
    }

    /// Reseed and reset; the same seed reproduces the exact layout
    pub fn reset_from_seed(&mut self, seed: u64) -> Observation {
        self.rng = Pcg32::seed_from_u64(seed);
        self.reset()
    }

    /// Advance one turn. Terminal states accept no further actions and
    /// return `done` with an unchanged field.
    pub fn step(&mut self, action: &Action) -> StepResult {
        let outcome = tick::step(&mut self.state, action);
        let field = &self.state.representation;
        StepResult {
            observation: self.observe(),
            reward: outcome.reward,
            done: outcome.done,
            info: StepInfo {
                red_score: alliance_score(Alliance::Red, field),
                blue_score: alliance_score(Alliance::Blue, field),
                time_remaining: self.state.time_remaining,
            },
        }
    }

    /// Snapshot the current field into an observation
    pub fn observe(&self) -> Observation {
        observation(&self.state)
    }

    /// Render hook: the live field, read-only
    pub fn field(&self) -> &FieldRepresentation {
        &self.state.representation
    }

    /// Persistence hook: the full episode state, read-only. Serializing
    /// this value is a lossless structural snapshot.
    pub fn state(&self) -> &FieldState {
        &self.state
    }

    /// Generation report from the most recent randomized reset
    pub fn last_gen_report(&self) -> Option<&GenReport> {
        self.last_report.as_ref()
    }
}

/// Build the structured observation for a field state
pub fn observation(state: &FieldState) -> Observation {
    let field = &state.representation;
    let host_color = field
        .host_robot()
        .map(|r| r.color)
        .unwrap_or(Alliance::Neutral);

    let mut entities = Vec::new();
    for ring in field
        .rings
        .iter()
        .chain(field.red_platform.rings.iter())
        .chain(field.blue_platform.rings.iter())
    {
        entities.push(EntityObs {
            kind: ObsKind::Ring,
            color: Alliance::Neutral,
            pose: ring.pose,
            levels: [0; 3],
            held_goals: 0,
            held_rings: 0,
            is_opposing: None,
            value: 1,
        });
    }
    for goal in field
        .goals
        .iter()
        .chain(field.red_platform.goals.iter())
        .chain(field.blue_platform.goals.iter())
    {
        entities.push(goal_obs(goal, host_color));
    }
    for robot in field.all_robots() {
        entities.push(robot_obs(robot, host_color));
    }

    Observation {
        entities,
        platforms: [
            platform_obs(&field.red_platform),
            platform_obs(&field.blue_platform),
        ],
        time_remaining: state.time_remaining,
    }
}

fn goal_obs(goal: &Goal, host_color: Alliance) -> EntityObs {
    let kind = if goal.is_high_neutral() {
        ObsKind::HighNeutralGoal
    } else {
        ObsKind::Goal
    };
    EntityObs {
        kind,
        color: goal.color,
        pose: goal.pose,
        levels: [
            goal.base.utilization() as u8,
            goal.low.utilization() as u8,
            goal.high.utilization() as u8,
        ],
        held_goals: 0,
        held_rings: 0,
        is_opposing: None,
        value: goal.current_score(host_color),
    }
}

fn robot_obs(robot: &Robot, host_color: Alliance) -> EntityObs {
    let held: i32 = robot
        .front_goal
        .iter()
        .chain(robot.rear_goal.iter())
        .map(|g| g.current_score(host_color))
        .sum();
    EntityObs {
        kind: ObsKind::Robot,
        color: robot.color,
        pose: robot.pose,
        levels: [0; 3],
        held_goals: robot.has_front_goal() as u8 + robot.has_rear_goal() as u8,
        held_rings: robot.rings.len() as u8,
        is_opposing: Some(robot.role == RobotRole::Opposing),
        value: held + robot.rings.len() as i32,
    }
}

fn platform_obs(platform: &Platform) -> PlatformObs {
    PlatformObs {
        color: platform.color,
        state: platform.state,
        rings: platform.rings.len() as u8,
        goals: platform.goals.len() as u8,
        robots: platform.robots.len() as u8,
    }
}
