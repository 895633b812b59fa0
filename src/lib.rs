//! Robo Field - a two-alliance robotics field game simulator
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, scoring, field generation)
//! - `env`: Gym-style reset/step boundary for external drivers
//! - `settings`: Data-driven episode configuration

pub mod env;
pub mod settings;
pub mod sim;

pub use env::{FieldEnv, Observation, StepResult};
pub use settings::{EnvSettings, LayoutMode};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Field width in inches. The field is square: x spans
    /// [-FIELD_HALF_WIDTH_IN, FIELD_HALF_WIDTH_IN], y spans [0, FIELD_WIDTH_IN].
    pub const FIELD_WIDTH_IN: f32 = 144.0;
    pub const FIELD_HALF_WIDTH_IN: f32 = FIELD_WIDTH_IN / 2.0;

    /// Zone boundaries along y: at or below RED_ZONE_MAX_Y is the red zone,
    /// at or above BLUE_ZONE_MIN_Y is the blue zone, between is neutral.
    pub const RED_ZONE_MAX_Y: f32 = 48.0;
    pub const BLUE_ZONE_MIN_Y: f32 = 96.0;

    /// Platform footprint: a rectangle centered on x = 0, spanning from the
    /// field edge inward along y (red at the bottom, blue at the top).
    pub const PLATFORM_LENGTH_IN: f32 = 50.0;
    pub const PLATFORM_WIDTH_IN: f32 = 24.0;

    /// Entity radii
    pub const RING_RADIUS: f32 = 2.0;
    pub const GOAL_RADIUS: f32 = 6.5;
    pub const ROBOT_RADIUS: f32 = 9.0;

    /// Capture probe radii for the front/rear collision checks
    pub const GOAL_CAPTURE_RADIUS: f32 = 7.0;
    pub const RING_CAPTURE_RADIUS: f32 = 5.0;

    /// Scoring weights
    pub const GOAL_BASE_WORTH: i32 = 20;
    pub const PLATFORM_ROBOT_WORTH: i32 = 30;
    pub const PLATFORM_GOAL_WORTH: i32 = 40;

    /// Ring container default capacity
    pub const RING_CONTAINER_CAPACITY: usize = 8;

    /// Generation budgets (per-category maximums)
    pub const MAX_NUM_RED_GOALS: u32 = 2;
    pub const MAX_NUM_BLUE_GOALS: u32 = 2;
    pub const MAX_NUM_LOW_NEUTRAL_GOALS: u32 = 2;
    pub const MAX_NUM_HIGH_NEUTRAL_GOALS: u32 = 1;
    pub const MAX_NUM_RINGS: u32 = 24;
    pub const MAX_NUM_HOST_ROBOTS: u32 = 1;
    pub const MAX_NUM_PARTNER_ROBOTS: u32 = 1;
    pub const MAX_NUM_OPPOSING_ROBOTS: u32 = 2;

    /// Randomized spawn rates and their per-iteration decay factors
    pub const SPAWN_RING_ON_GOAL: f32 = 0.2;
    pub const RING_ON_GOAL_DECAY: f32 = 0.9;
    pub const SPAWN_GOAL_IN_ROBOT: f32 = 0.2;
    pub const GOAL_IN_ROBOT_DECAY: f32 = 0.5;
    pub const SPAWN_RING_IN_ROBOT: f32 = 0.2;
    pub const RING_IN_ROBOT_DECAY: f32 = 0.8;
    pub const SPAWN_ROBOT_ON_RAMP: f32 = 0.2;
    pub const ROBOT_ON_RAMP_DECAY: f32 = 0.5;
    pub const SPAWN_GOAL_ON_RAMP: f32 = 0.2;
    pub const GOAL_ON_RAMP_DECAY: f32 = 0.5;
    pub const SPAWN_RING_ON_RAMP: f32 = 0.2;
    pub const RING_ON_RAMP_DECAY: f32 = 0.8;

    /// Branch selection thresholds when rings spawn pre-loaded on a goal
    pub const SPAWN_RING_ON_HIGH_BRANCH: f32 = 0.1;
    pub const SPAWN_RING_ON_LOW_BRANCH: f32 = 0.3;

    /// Movement per step: translation in inches, rotation in radians
    pub const DRIVE_STEP_IN: f32 = 1.0;
    pub const TURN_STEP_RAD: f32 = std::f32::consts::FRAC_PI_2;

    /// Default episode length in steps
    pub const DEFAULT_EPISODE_STEPS: u32 = 180;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing along `heading` radians
#[inline]
pub fn heading_vector(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}
