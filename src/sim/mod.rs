//! Deterministic field simulation
//!
//! All game logic lives here. This module must be pure and deterministic:
//! - Turn-based only, one state transition per step call
//! - Seeded RNG only (every stochastic routine takes `&mut Pcg32`)
//! - Stable entity ordering within each owning list
//! - No rendering, I/O, or platform dependencies

pub mod geometry;
pub mod randomize;
pub mod scoring;
pub mod state;
pub mod tick;

pub use geometry::{Pose, is_colliding, is_colliding_front, is_colliding_rear, rotate_vector};
pub use randomize::{FieldCounts, GenReport, randomized_field};
pub use scoring::{alliance_score, terminal_reward};
pub use state::{
    Alliance, FieldRepresentation, FieldState, Goal, GoalLevel, Platform, PlatformState, Ring,
    RingContainer, Robot, RobotRole,
};
pub use tick::{Action, Drive, Handling, StepOutcome, step};
