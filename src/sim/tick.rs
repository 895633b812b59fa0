//! Per-turn action resolution
//!
//! Advances a [`FieldState`] by one turn given the host robot's chosen
//! action. An action has a movement half and a handling half, resolved in
//! that order. Front/rear engagement is probed once at the start of the
//! turn; movement cannot carry the robot through an entity it does not
//! hold, and every capacity rejection is a silent no-op rather than an
//! error.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Pose, is_colliding, is_colliding_front, is_colliding_rear, rotate_vector};
use super::scoring::terminal_reward;
use super::state::{Alliance, FieldRepresentation, FieldState, GoalLevel};
use crate::consts::*;
use crate::{heading_vector, normalize_angle};

/// Movement half of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Drive {
    #[default]
    None,
    Forward,
    Backward,
    RotateLeft,
    RotateRight,
}

/// Handling half of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Handling {
    #[default]
    None,
    GoalIn,
    GoalOut,
    RingIn,
    RingPlace,
}

/// One turn's worth of input for the host robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Action {
    pub drive: Drive,
    pub handling: Handling,
}

impl Action {
    pub const fn idle() -> Self {
        Self {
            drive: Drive::None,
            handling: Handling::None,
        }
    }

    /// Decode a pair of discrete action codes. Out-of-range codes are
    /// rejected here, before any entity is touched.
    pub fn from_indices(drive: u32, handling: u32) -> Option<Self> {
        let drive = match drive {
            0 => Drive::None,
            1 => Drive::Forward,
            2 => Drive::Backward,
            3 => Drive::RotateLeft,
            4 => Drive::RotateRight,
            _ => return None,
        };
        let handling = match handling {
            0 => Handling::None,
            1 => Handling::GoalIn,
            2 => Handling::GoalOut,
            3 => Handling::RingIn,
            4 => Handling::RingPlace,
            _ => return None,
        };
        Some(Self { drive, handling })
    }
}

/// Result of one step call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub reward: f32,
    pub done: bool,
}

/// Advance the field by one turn.
///
/// A terminal state accepts no further actions. Non-terminal steps return
/// the shaping reward (rings captured this turn); the final step returns
/// the zero-sum match outcome for the host's alliance instead.
pub fn step(state: &mut FieldState, action: &Action) -> StepOutcome {
    if state.is_terminal() {
        return StepOutcome {
            reward: 0.0,
            done: true,
        };
    }

    let reward = resolve(&mut state.representation, action);
    state.time_remaining -= 1;

    if state.is_terminal() {
        let agent = state
            .representation
            .host_robot()
            .map(|r| r.color)
            .unwrap_or(Alliance::Neutral);
        StepOutcome {
            reward: terminal_reward(agent, &state.representation),
            done: true,
        }
    } else {
        StepOutcome {
            reward,
            done: false,
        }
    }
}

fn resolve(field: &mut FieldRepresentation, action: &Action) -> f32 {
    let Some(host) = field.host_robot() else {
        log::error!("no host robot on the field; action ignored");
        return 0.0;
    };
    let pose = host.pose;
    let radius = host.radius;
    let has_front = host.has_front_goal();
    let has_rear = host.has_rear_goal();

    // Engagement probes, taken once before movement. A held goal is not in
    // the free list, so the free list is exactly the candidate set.
    let front_goals: Vec<usize> = field
        .goals
        .iter()
        .enumerate()
        .filter(|(_, g)| is_colliding_front(&pose, radius, &g.pose, GOAL_CAPTURE_RADIUS))
        .map(|(i, _)| i)
        .collect();
    let rear_goals: Vec<usize> = field
        .goals
        .iter()
        .enumerate()
        .filter(|(_, g)| is_colliding_rear(&pose, radius, &g.pose, GOAL_CAPTURE_RADIUS))
        .map(|(i, _)| i)
        .collect();
    let captured_rings: Vec<usize> = field
        .rings
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            is_colliding_front(&pose, radius, &r.pose, RING_CAPTURE_RADIUS)
                || is_colliding_rear(&pose, radius, &r.pose, RING_CAPTURE_RADIUS)
        })
        .map(|(i, _)| i)
        .collect();

    apply_movement(field, action.drive, &front_goals, &rear_goals, &captured_rings);

    // Handling works from the post-move pose
    let pose = field.host_robot().map(|h| h.pose).unwrap_or(pose);

    let mut reward = 0.0;
    match action.handling {
        Handling::None => {}

        Handling::GoalIn => {
            // Prefer the rear slot: a rear-held goal is the one rings can
            // be placed into later.
            let target = if !has_rear && !rear_goals.is_empty() {
                rear_goals.last().map(|&i| (i, true))
            } else if !has_front && !front_goals.is_empty() {
                front_goals.last().map(|&i| (i, false))
            } else {
                None
            };
            if let Some((idx, to_rear)) = target {
                let goal = field.goals.remove(idx);
                let rejected = match field.host_robot_mut() {
                    Some(host) if to_rear => host.pick_up_rear_goal(goal).err(),
                    Some(host) => host.pick_up_front_goal(goal).err(),
                    None => Some(goal),
                };
                if let Some(goal) = rejected {
                    field.goals.push(goal);
                }
            }
        }

        Handling::GoalOut => {
            let dropped = field.host_robot_mut().and_then(|host| {
                if host.has_front_goal() {
                    host.drop_front_goal()
                } else {
                    host.drop_rear_goal()
                }
            });
            if let Some(mut goal) = dropped {
                // Release just ahead of the robot, clamped to the field
                let offset =
                    rotate_vector(pose.heading, Vec2::new(radius + goal.radius + 1.0, 0.0));
                let release = pose.pos + offset;
                goal.pose = Pose::new(
                    release.x.clamp(-FIELD_HALF_WIDTH_IN, FIELD_HALF_WIDTH_IN),
                    release.y.clamp(0.0, FIELD_WIDTH_IN),
                    0.0,
                );
                if field.red_platform.contains(&goal.pose) {
                    field.red_platform.goals.push(goal);
                } else if field.blue_platform.contains(&goal.pose) {
                    field.blue_platform.goals.push(goal);
                } else {
                    field.goals.push(goal);
                }
            }
        }

        Handling::RingIn => {
            if !captured_rings.is_empty() {
                let mut taken = Vec::with_capacity(captured_rings.len());
                for &idx in captured_rings.iter().rev() {
                    taken.push(field.rings.remove(idx));
                }
                taken.reverse();
                let count = taken.len();
                if let Some(host) = field.host_robot_mut() {
                    host.rings.extend(taken);
                    reward += count as f32;
                }
            }
        }

        Handling::RingPlace => {
            if let Some(host) = field.host_robot_mut() {
                if let (Some(&ring), Some(goal)) = (host.rings.last(), host.rear_goal.as_mut()) {
                    // Colored goals fill the low branch before the base;
                    // neutral goals only take base rings from a robot.
                    let placed = if goal.color != Alliance::Neutral {
                        goal.add_ring(ring, GoalLevel::Low) || goal.add_ring(ring, GoalLevel::Base)
                    } else {
                        goal.add_ring(ring, GoalLevel::Base)
                    };
                    if placed {
                        host.rings.pop();
                    }
                }
            }
        }
    }

    reward
}

/// Resolve the movement half: translate or rotate, clamp to the field,
/// and reject a translation that would overlap an unheld entity or a
/// platform footprint. Goals engaged by the capture probes are pickup
/// candidates and do not block.
fn apply_movement(
    field: &mut FieldRepresentation,
    drive: Drive,
    front_goals: &[usize],
    rear_goals: &[usize],
    engaged_rings: &[usize],
) {
    let Some(host) = field.host_robot() else {
        return;
    };
    let pose = host.pose;
    let radius = host.radius;

    let tentative = match drive {
        Drive::None => return,
        Drive::RotateLeft => {
            let heading = normalize_angle(pose.heading + TURN_STEP_RAD);
            Pose::new(pose.pos.x, pose.pos.y, heading)
        }
        Drive::RotateRight => {
            let heading = normalize_angle(pose.heading - TURN_STEP_RAD);
            Pose::new(pose.pos.x, pose.pos.y, heading)
        }
        Drive::Forward | Drive::Backward => {
            let sign = if drive == Drive::Forward { 1.0 } else { -1.0 };
            let pos = pose.pos + heading_vector(pose.heading) * (DRIVE_STEP_IN * sign);
            Pose::new(
                pos.x.clamp(-FIELD_HALF_WIDTH_IN, FIELD_HALF_WIDTH_IN),
                pos.y.clamp(0.0, FIELD_WIDTH_IN),
                pose.heading,
            )
        }
    };

    // Rotation never changes position; only translations can collide
    if matches!(drive, Drive::Forward | Drive::Backward) {
        let blocked_by_goal = field.goals.iter().enumerate().any(|(i, g)| {
            !front_goals.contains(&i)
                && !rear_goals.contains(&i)
                && is_colliding(&tentative, radius, &g.pose, g.radius)
        });
        let blocked_by_ring = field.rings.iter().enumerate().any(|(i, r)| {
            !engaged_rings.contains(&i) && is_colliding(&tentative, radius, &r.pose, r.radius)
        });
        if blocked_by_goal
            || blocked_by_ring
            || field.red_platform.contains(&tentative)
            || field.blue_platform.contains(&tentative)
        {
            return;
        }
    }

    if let Some(host) = field.host_robot_mut() {
        host.pose = tentative;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Goal, Ring, Robot, RobotRole};
    use std::f32::consts::FRAC_PI_2;

    fn field_with_host(x: f32, y: f32, heading: f32) -> FieldRepresentation {
        let mut field = FieldRepresentation::empty();
        field
            .robots
            .push(Robot::new(Alliance::Red, RobotRole::Host, Pose::new(x, y, heading)));
        field
    }

    fn run(field: FieldRepresentation, action: Action) -> (FieldRepresentation, StepOutcome) {
        let mut state = FieldState::new(field, 100);
        let outcome = step(&mut state, &action);
        (state.representation, outcome)
    }

    #[test]
    fn test_action_decoding_bounds() {
        assert!(Action::from_indices(4, 4).is_some());
        assert!(Action::from_indices(0, 0).is_some());
        assert!(Action::from_indices(5, 0).is_none());
        assert!(Action::from_indices(0, 5).is_none());
    }

    #[test]
    fn test_forward_moves_along_heading() {
        let field = field_with_host(0.0, 72.0, 0.0);
        let action = Action {
            drive: Drive::Forward,
            ..Action::idle()
        };
        let (field, outcome) = run(field, action);
        let host = field.host_robot().unwrap();
        assert!((host.pose.pos.x - 1.0).abs() < 1e-5);
        assert!((host.pose.pos.y - 72.0).abs() < 1e-5);
        assert_eq!(outcome.reward, 0.0);
    }

    #[test]
    fn test_backward_and_rotation() {
        let field = field_with_host(0.0, 72.0, 0.0);
        let (field, _) = run(
            field,
            Action {
                drive: Drive::Backward,
                ..Action::idle()
            },
        );
        assert!((field.host_robot().unwrap().pose.pos.x + 1.0).abs() < 1e-5);

        let field = field_with_host(0.0, 72.0, 0.0);
        let (field, _) = run(
            field,
            Action {
                drive: Drive::RotateLeft,
                ..Action::idle()
            },
        );
        let host = field.host_robot().unwrap();
        assert!((host.pose.heading - FRAC_PI_2).abs() < 1e-5);
        assert!((host.pose.pos.x).abs() < 1e-5);
    }

    #[test]
    fn test_movement_clamped_to_field_bounds() {
        let field = field_with_host(72.0, 72.0, 0.0);
        let (field, _) = run(
            field,
            Action {
                drive: Drive::Forward,
                ..Action::idle()
            },
        );
        assert!((field.host_robot().unwrap().pose.pos.x - 72.0).abs() < 1e-5);
    }

    #[test]
    fn test_movement_rejected_by_unengaged_goal() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        // Within max-radius range of the tentative pose but outside both
        // capture probes, so it blocks instead of being a pickup candidate
        field.goals.push(Goal::red(Pose::new(1.0, 80.0, 0.0)));
        let (field, outcome) = run(
            field,
            Action {
                drive: Drive::Forward,
                ..Action::idle()
            },
        );
        let host = field.host_robot().unwrap();
        assert!((host.pose.pos.x).abs() < 1e-5, "rejected move must revert");
        assert_eq!(outcome.reward, 0.0);
    }

    #[test]
    fn test_movement_rejected_by_free_ring() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        field.rings.push(Ring::new(Pose::new(1.0, 78.0, 0.0)));
        let (field, _) = run(
            field,
            Action {
                drive: Drive::Forward,
                ..Action::idle()
            },
        );
        assert!((field.host_robot().unwrap().pose.pos.x).abs() < 1e-5);
    }

    #[test]
    fn test_movement_rejected_by_platform_footprint() {
        let field = field_with_host(0.0, 24.9, -FRAC_PI_2);
        let (field, _) = run(
            field,
            Action {
                drive: Drive::Forward,
                ..Action::idle()
            },
        );
        assert!((field.host_robot().unwrap().pose.pos.y - 24.9).abs() < 1e-5);
    }

    #[test]
    fn test_engaged_goal_does_not_block_movement() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        // Sits on the front probe and within blocking range of the
        // tentative pose; engagement wins, so the move goes through
        field.goals.push(Goal::red(Pose::new(9.5, 72.0, 0.0)));
        let (field, _) = run(
            field,
            Action {
                drive: Drive::Forward,
                ..Action::idle()
            },
        );
        assert!((field.host_robot().unwrap().pose.pos.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_goal_pickup_front() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        field.goals.push(Goal::red(Pose::new(14.0, 72.0, 0.0)));
        let (field, _) = run(
            field,
            Action {
                handling: Handling::GoalIn,
                ..Action::idle()
            },
        );
        let host = field.host_robot().unwrap();
        assert!(host.has_front_goal());
        assert!(!host.has_rear_goal());
        assert!(field.goals.is_empty());
    }

    #[test]
    fn test_goal_pickup_prefers_rear() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        field.goals.push(Goal::red(Pose::new(-14.0, 72.0, 0.0)));
        let (field, _) = run(
            field,
            Action {
                handling: Handling::GoalIn,
                ..Action::idle()
            },
        );
        let host = field.host_robot().unwrap();
        assert!(host.has_rear_goal());
        assert!(!host.has_front_goal());
        assert!(field.goals.is_empty());
    }

    #[test]
    fn test_goal_pickup_noop_when_slots_full() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        field.goals.push(Goal::red(Pose::new(14.0, 72.0, 0.0)));
        {
            let host = field.host_robot_mut().unwrap();
            assert!(host.pick_up_front_goal(Goal::blue(Pose::new(0.0, 72.0, 0.0))).is_ok());
            assert!(host.pick_up_rear_goal(Goal::blue(Pose::new(0.0, 72.0, 0.0))).is_ok());
        }
        let (field, _) = run(
            field,
            Action {
                handling: Handling::GoalIn,
                ..Action::idle()
            },
        );
        assert_eq!(field.goals.len(), 1, "engaged goal stays on the field");
    }

    #[test]
    fn test_goal_drop_rehomes_to_free_list() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        let goal = Goal::red(Pose::new(0.0, 72.0, 0.0));
        field
            .host_robot_mut()
            .unwrap()
            .pick_up_front_goal(goal)
            .ok()
            .unwrap();
        let (field, _) = run(
            field,
            Action {
                handling: Handling::GoalOut,
                ..Action::idle()
            },
        );
        assert!(!field.host_robot().unwrap().has_front_goal());
        assert_eq!(field.goals.len(), 1);
        // robot.radius + goal.radius + 1 ahead of the robot
        assert!((field.goals[0].pose.pos.x - 16.5).abs() < 1e-5);
        assert!((field.goals[0].pose.pos.y - 72.0).abs() < 1e-5);
    }

    #[test]
    fn test_goal_drop_onto_platform() {
        let mut field = field_with_host(0.0, 30.0, -FRAC_PI_2);
        let goal = Goal::red(Pose::new(0.0, 30.0, 0.0));
        field
            .host_robot_mut()
            .unwrap()
            .pick_up_front_goal(goal)
            .ok()
            .unwrap();
        let (field, _) = run(
            field,
            Action {
                handling: Handling::GoalOut,
                ..Action::idle()
            },
        );
        assert!(field.goals.is_empty());
        assert_eq!(field.red_platform.goals.len(), 1);
        assert!((field.red_platform.goals[0].pose.pos.y - 13.5).abs() < 1e-4);
    }

    #[test]
    fn test_goal_drop_clamped_at_wall() {
        let mut field = field_with_host(70.0, 72.0, 0.0);
        let goal = Goal::red(Pose::new(70.0, 72.0, 0.0));
        field
            .host_robot_mut()
            .unwrap()
            .pick_up_front_goal(goal)
            .ok()
            .unwrap();
        let (field, _) = run(
            field,
            Action {
                handling: Handling::GoalOut,
                ..Action::idle()
            },
        );
        assert!((field.goals[0].pose.pos.x - 72.0).abs() < 1e-5);
    }

    #[test]
    fn test_ring_capture_is_atomic() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        field.rings.push(Ring::new(Pose::new(14.0, 72.0, 0.0)));
        field.rings.push(Ring::new(Pose::new(-12.0, 72.0, 0.0)));
        field.rings.push(Ring::new(Pose::new(0.0, 100.0, 0.0)));
        let (field, outcome) = run(
            field,
            Action {
                handling: Handling::RingIn,
                ..Action::idle()
            },
        );
        let host = field.host_robot().unwrap();
        assert_eq!(host.rings.len(), 2);
        assert_eq!(field.rings.len(), 1, "distant ring stays free");
        assert_eq!(outcome.reward, 2.0);
    }

    #[test]
    fn test_ring_placement_colored_goal_low_first() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        {
            let host = field.host_robot_mut().unwrap();
            host.pick_up_rear_goal(Goal::red(Pose::new(0.0, 72.0, 0.0)))
                .ok()
                .unwrap();
            host.rings.push(Ring::new(Pose::new(0.0, 72.0, 0.0)));
        }
        let (field, _) = run(
            field,
            Action {
                handling: Handling::RingPlace,
                ..Action::idle()
            },
        );
        let host = field.host_robot().unwrap();
        let goal = host.rear_goal.as_ref().unwrap();
        assert_eq!(goal.low.utilization(), 1);
        assert_eq!(goal.base.utilization(), 0);
        assert!(host.rings.is_empty());
    }

    #[test]
    fn test_ring_placement_falls_through_to_base() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        {
            let host = field.host_robot_mut().unwrap();
            let mut goal = Goal::red(Pose::new(0.0, 72.0, 0.0));
            let filler = Ring::new(Pose::new(0.0, 72.0, 0.0));
            while goal.add_ring(filler, GoalLevel::Low) {}
            host.pick_up_rear_goal(goal).ok().unwrap();
            host.rings.push(Ring::new(Pose::new(0.0, 72.0, 0.0)));
        }
        let (field, _) = run(
            field,
            Action {
                handling: Handling::RingPlace,
                ..Action::idle()
            },
        );
        let goal = field.host_robot().unwrap().rear_goal.as_ref().unwrap();
        assert_eq!(goal.base.utilization(), 1);
    }

    #[test]
    fn test_ring_placement_neutral_goal_base_only() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        {
            let host = field.host_robot_mut().unwrap();
            host.pick_up_rear_goal(Goal::low_neutral(Pose::new(0.0, 72.0, 0.0)))
                .ok()
                .unwrap();
            host.rings.push(Ring::new(Pose::new(0.0, 72.0, 0.0)));
        }
        let (field, _) = run(
            field,
            Action {
                handling: Handling::RingPlace,
                ..Action::idle()
            },
        );
        let goal = field.host_robot().unwrap().rear_goal.as_ref().unwrap();
        assert_eq!(goal.base.utilization(), 1);
        assert_eq!(goal.low.utilization(), 0);
    }

    #[test]
    fn test_ring_placement_full_goal_keeps_ring() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        {
            let host = field.host_robot_mut().unwrap();
            let mut goal = Goal::red(Pose::new(0.0, 72.0, 0.0));
            let filler = Ring::new(Pose::new(0.0, 72.0, 0.0));
            while goal.add_ring(filler, GoalLevel::Low) {}
            while goal.add_ring(filler, GoalLevel::Base) {}
            host.pick_up_rear_goal(goal).ok().unwrap();
            host.rings.push(Ring::new(Pose::new(0.0, 72.0, 0.0)));
        }
        let (field, _) = run(
            field,
            Action {
                handling: Handling::RingPlace,
                ..Action::idle()
            },
        );
        assert_eq!(field.host_robot().unwrap().rings.len(), 1);
    }

    #[test]
    fn test_terminal_step_returns_match_outcome() {
        let mut field = field_with_host(0.0, 40.0, 0.0);
        field.goals.push(Goal::red(Pose::new(0.0, 40.0, 0.0)));
        let mut state = FieldState::new(field, 1);

        let outcome = step(&mut state, &Action::idle());
        assert!(outcome.done);
        assert_eq!(outcome.reward, 1.0, "red host wins 20-0");
    }

    #[test]
    fn test_terminal_state_rejects_actions() {
        let mut state = FieldState::new(field_with_host(0.0, 72.0, 0.0), 1);
        let first = step(&mut state, &Action::idle());
        assert!(first.done);

        let snapshot = state.representation.clone();
        let second = step(
            &mut state,
            &Action {
                drive: Drive::Forward,
                ..Action::idle()
            },
        );
        assert!(second.done);
        assert_eq!(second.reward, 0.0);
        assert_eq!(state.representation, snapshot, "terminal field is frozen");
        assert_eq!(state.time_remaining, 0);
    }

    #[test]
    fn test_possession_stays_partitioned() {
        let mut field = field_with_host(0.0, 72.0, 0.0);
        field.goals.push(Goal::red(Pose::new(14.0, 72.0, 0.0)));
        field.rings.push(Ring::new(Pose::new(-12.0, 72.0, 0.0)));
        let goals_before = field.total_goal_count();
        let rings_before = field.total_ring_count();

        let mut state = FieldState::new(field, 100);
        let script = [
            Action {
                handling: Handling::GoalIn,
                ..Action::idle()
            },
            Action {
                handling: Handling::RingIn,
                ..Action::idle()
            },
            Action {
                drive: Drive::RotateLeft,
                ..Action::idle()
            },
            Action {
                handling: Handling::RingPlace,
                ..Action::idle()
            },
            Action {
                handling: Handling::GoalOut,
                ..Action::idle()
            },
        ];
        for action in &script {
            step(&mut state, action);
            assert_eq!(state.representation.total_goal_count(), goals_before);
            assert_eq!(state.representation.total_ring_count(), rings_before);
        }
    }
}
