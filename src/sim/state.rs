//! Field entities and the aggregate field state
//!
//! Everything that must be persisted for snapshots/determinism lives here.
//! Ownership of every ring and goal is partitioned across the field's free
//! lists, the two platforms, and robot slots - an entity is never in two
//! places at once.

use serde::{Deserialize, Serialize};

use super::geometry::Pose;
use crate::consts::*;

/// Alliance color. Neutral entities score for whichever alliance currently
/// satisfies the zone rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alliance {
    Red,
    Blue,
    Neutral,
}

/// Ring-storage tier on a goal, each with a fixed point weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalLevel {
    Base,
    Low,
    High,
}

impl GoalLevel {
    pub fn weight(&self) -> i32 {
        match self {
            GoalLevel::Base => 1,
            GoalLevel::Low => 3,
            GoalLevel::High => 10,
        }
    }
}

/// A scoring ring. No state beyond its location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub pose: Pose,
    pub radius: f32,
}

impl Ring {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            radius: RING_RADIUS,
        }
    }
}

/// Bounded ring storage for one goal level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingContainer {
    pub max_storage: usize,
    rings: Vec<Ring>,
}

impl RingContainer {
    pub fn new(max_storage: usize) -> Self {
        Self {
            max_storage,
            rings: Vec::new(),
        }
    }

    /// Append a ring if capacity remains. A full container refuses the
    /// ring and leaves its state untouched.
    pub fn add_ring(&mut self, ring: Ring) -> bool {
        if self.remaining_utilization() > 0 {
            self.rings.push(ring);
            true
        } else {
            false
        }
    }

    pub fn utilization(&self) -> usize {
        self.rings.len()
    }

    pub fn remaining_utilization(&self) -> usize {
        self.max_storage - self.utilization()
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }
}

/// A mobile goal. The variant (red/blue/low-neutral/high-neutral) is fixed
/// at construction by its color tag and container capacities; only fill
/// state changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub color: Alliance,
    pub pose: Pose,
    pub radius: f32,
    pub base: RingContainer,
    pub low: RingContainer,
    pub high: RingContainer,
    pub tipped: bool,
}

impl Goal {
    fn with_high_storage(color: Alliance, pose: Pose, high_storage: usize) -> Self {
        Self {
            color,
            pose,
            radius: GOAL_RADIUS,
            base: RingContainer::new(RING_CONTAINER_CAPACITY),
            low: RingContainer::new(RING_CONTAINER_CAPACITY),
            high: RingContainer::new(high_storage),
            tipped: false,
        }
    }

    /// Red alliance goal: no usable high branch
    pub fn red(pose: Pose) -> Self {
        Self::with_high_storage(Alliance::Red, pose, 0)
    }

    /// Blue alliance goal: no usable high branch
    pub fn blue(pose: Pose) -> Self {
        Self::with_high_storage(Alliance::Blue, pose, 0)
    }

    /// Short neutral goal: no usable high branch
    pub fn low_neutral(pose: Pose) -> Self {
        Self::with_high_storage(Alliance::Neutral, pose, 0)
    }

    /// Tall neutral goal: the only variant whose high branch stores rings
    pub fn high_neutral(pose: Pose) -> Self {
        Self::with_high_storage(Alliance::Neutral, pose, RING_CONTAINER_CAPACITY)
    }

    pub fn is_high_neutral(&self) -> bool {
        self.color == Alliance::Neutral && self.high.max_storage > 0
    }

    /// The zone the goal currently occupies, derived from its y position
    pub fn zone(&self) -> Alliance {
        if self.pose.pos.y <= RED_ZONE_MAX_Y {
            Alliance::Red
        } else if self.pose.pos.y >= BLUE_ZONE_MIN_Y {
            Alliance::Blue
        } else {
            Alliance::Neutral
        }
    }

    pub fn ring_container(&self, level: GoalLevel) -> &RingContainer {
        match level {
            GoalLevel::Base => &self.base,
            GoalLevel::Low => &self.low,
            GoalLevel::High => &self.high,
        }
    }

    /// Add a ring to the named level. Fails closed when that level is full.
    pub fn add_ring(&mut self, ring: Ring, level: GoalLevel) -> bool {
        let container = match level {
            GoalLevel::Base => &mut self.base,
            GoalLevel::Low => &mut self.low,
            GoalLevel::High => &mut self.high,
        };
        container.add_ring(ring)
    }

    /// Weighted sum of stored rings across all levels
    pub fn ring_score(&self) -> i32 {
        [GoalLevel::Base, GoalLevel::Low, GoalLevel::High]
            .iter()
            .map(|&level| level.weight() * self.ring_container(level).utilization() as i32)
            .sum()
    }

    /// Points this goal is worth to `color` right now.
    ///
    /// A goal scores for at most one alliance at a time: its zone must
    /// match, and its own color must match or be neutral. A carried goal
    /// keeps its last-set pose for zone purposes.
    pub fn current_score(&self, color: Alliance) -> i32 {
        if self.zone() == color && (self.color == color || self.color == Alliance::Neutral) {
            GOAL_BASE_WORTH + self.ring_score()
        } else {
            0
        }
    }

    pub fn total_ring_count(&self) -> usize {
        self.base.utilization() + self.low.utilization() + self.high.utilization()
    }
}

/// Which seat a robot occupies in the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotRole {
    Host,
    Partner,
    Opposing,
}

/// A mobile agent with one goal slot on each end and a ring hopper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub color: Alliance,
    pub role: RobotRole,
    pub pose: Pose,
    pub radius: f32,
    pub front_goal: Option<Goal>,
    pub rear_goal: Option<Goal>,
    pub rings: Vec<Ring>,
    pub tipped: bool,
}

impl Robot {
    pub fn new(color: Alliance, role: RobotRole, pose: Pose) -> Self {
        Self {
            color,
            role,
            pose,
            radius: ROBOT_RADIUS,
            front_goal: None,
            rear_goal: None,
            rings: Vec::new(),
            tipped: false,
        }
    }

    pub fn has_front_goal(&self) -> bool {
        self.front_goal.is_some()
    }

    pub fn has_rear_goal(&self) -> bool {
        self.rear_goal.is_some()
    }

    /// Install a goal in the front slot. An occupied slot rejects the
    /// goal and hands it back; the caller must re-home it.
    pub fn pick_up_front_goal(&mut self, goal: Goal) -> Result<(), Goal> {
        if self.front_goal.is_some() {
            Err(goal)
        } else {
            self.front_goal = Some(goal);
            Ok(())
        }
    }

    /// Install a goal in the rear slot. Mirror of [`Self::pick_up_front_goal`].
    pub fn pick_up_rear_goal(&mut self, goal: Goal) -> Result<(), Goal> {
        if self.rear_goal.is_some() {
            Err(goal)
        } else {
            self.rear_goal = Some(goal);
            Ok(())
        }
    }

    /// Release the front slot, returning the goal if one was held
    pub fn drop_front_goal(&mut self) -> Option<Goal> {
        self.front_goal.take()
    }

    /// Release the rear slot, returning the goal if one was held
    pub fn drop_rear_goal(&mut self) -> Option<Goal> {
        self.rear_goal.take()
    }
}

/// Tilt state of a platform. Only a level platform scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformState {
    Left,
    Right,
    Level,
}

/// A tiltable scoring platform with a rectangular footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub color: Alliance,
    pub state: PlatformState,
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub rings: Vec<Ring>,
    pub goals: Vec<Goal>,
    pub robots: Vec<Robot>,
}

impl Platform {
    /// Build the platform for `color` at its fixed field location: red
    /// hugs the bottom edge, blue the top, both centered on x = 0.
    pub fn new(color: Alliance, state: PlatformState) -> Self {
        let (min_y, max_y) = match color {
            Alliance::Blue => (FIELD_WIDTH_IN - PLATFORM_WIDTH_IN, FIELD_WIDTH_IN),
            _ => (0.0, PLATFORM_WIDTH_IN),
        };
        Self {
            color,
            state,
            min_x: -PLATFORM_LENGTH_IN / 2.0,
            max_x: PLATFORM_LENGTH_IN / 2.0,
            min_y,
            max_y,
            rings: Vec::new(),
            goals: Vec::new(),
            robots: Vec::new(),
        }
    }

    /// Whether a point falls inside the platform footprint
    pub fn contains(&self, pose: &Pose) -> bool {
        pose.pos.x >= self.min_x
            && pose.pos.x <= self.max_x
            && pose.pos.y >= self.min_y
            && pose.pos.y <= self.max_y
    }

    /// Balance bonus: only a level platform scores, and only for robots of
    /// the platform's alliance and goals of that alliance or neutral.
    pub fn current_score(&self, color: Alliance) -> i32 {
        if self.state != PlatformState::Level {
            return 0;
        }
        let robots = self.robots.iter().filter(|r| r.color == color).count() as i32;
        let goals = self
            .goals
            .iter()
            .filter(|g| g.color == color || g.color == Alliance::Neutral)
            .count() as i32;
        PLATFORM_ROBOT_WORTH * robots + PLATFORM_GOAL_WORTH * goals
    }
}

/// Aggregate root for everything on the field.
///
/// The free `rings`/`goals` lists hold unowned entities; platforms and
/// robot slots hold the rest. Possession moves entities between these
/// lists, never copies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRepresentation {
    pub red_platform: Platform,
    pub blue_platform: Platform,
    pub rings: Vec<Ring>,
    pub goals: Vec<Goal>,
    pub robots: Vec<Robot>,
}

impl FieldRepresentation {
    /// An empty field with level platforms
    pub fn empty() -> Self {
        Self {
            red_platform: Platform::new(Alliance::Red, PlatformState::Level),
            blue_platform: Platform::new(Alliance::Blue, PlatformState::Level),
            rings: Vec::new(),
            goals: Vec::new(),
            robots: Vec::new(),
        }
    }

    /// The tournament starting layout: ring lines and stars at midfield,
    /// colored goals in their home zones, neutral goals on the center
    /// line, robots at the tape lines, both platforms tilted outward.
    pub fn starting() -> Self {
        let ring_spots: &[(f32, f32)] = &[
            (-69.0, 72.0), // Top L
            (-62.0, 72.0),
            (-55.0, 72.0),
            (-48.0, 72.0),
            (-48.0, 78.0),
            (-48.0, 84.0),
            (-48.0, 90.0),
            (-48.0, 96.0),
            (-25.0, 72.0), // Top-mid line
            (-17.0, 72.0),
            (-9.0, 72.0),
            (9.0, 72.0), // Bottom-mid line
            (17.0, 72.0),
            (25.0, 72.0),
            (69.0, 72.0), // Bottom L
            (62.0, 72.0),
            (55.0, 72.0),
            (48.0, 72.0),
            (48.0, 66.0),
            (48.0, 60.0),
            (48.0, 54.0),
            (48.0, 48.0),
            (-28.0, 48.0), // Left top star
            (-25.0, 45.0),
            (-25.0, 48.0),
            (-25.0, 51.0),
            (-22.0, 48.0),
            (-3.0, 48.0), // Left bottom star
            (0.0, 45.0),
            (0.0, 48.0),
            (0.0, 51.0),
            (3.0, 48.0),
            (-3.0, 95.0), // Right top star
            (0.0, 92.0),
            (0.0, 95.0),
            (0.0, 98.0),
            (3.0, 95.0),
            (22.0, 95.0), // Right bottom star
            (25.0, 92.0),
            (25.0, 95.0),
            (25.0, 98.0),
            (28.0, 95.0),
        ];

        let rings = ring_spots
            .iter()
            .map(|&(x, y)| Ring::new(Pose::new(x, y, 0.0)))
            .collect();

        let goals = vec![
            Goal::red(Pose::new(60.0, 35.0, 0.0)),
            Goal::red(Pose::new(-36.0, 12.0, 0.0)),
            Goal::blue(Pose::new(-60.0, 109.0, 0.0)),
            Goal::blue(Pose::new(36.0, 132.0, 0.0)),
            Goal::low_neutral(Pose::new(-35.0, 72.0, 0.0)),
            Goal::high_neutral(Pose::new(0.0, 72.0, 0.0)),
            Goal::low_neutral(Pose::new(35.0, 72.0, 0.0)),
        ];

        let robots = vec![
            Robot::new(Alliance::Red, RobotRole::Host, Pose::new(48.0, 12.0, 0.0)),
            Robot::new(Alliance::Red, RobotRole::Partner, Pose::new(-48.0, 12.0, 0.0)),
            Robot::new(Alliance::Blue, RobotRole::Opposing, Pose::new(48.0, 132.0, 0.0)),
            Robot::new(Alliance::Blue, RobotRole::Opposing, Pose::new(-48.0, 132.0, 0.0)),
        ];

        Self {
            red_platform: Platform::new(Alliance::Red, PlatformState::Left),
            blue_platform: Platform::new(Alliance::Blue, PlatformState::Right),
            rings,
            goals,
            robots,
        }
    }

    /// The host robot, wherever it currently is (field or platform)
    pub fn host_robot(&self) -> Option<&Robot> {
        self.all_robots().find(|r| r.role == RobotRole::Host)
    }

    pub fn host_robot_mut(&mut self) -> Option<&mut Robot> {
        self.robots
            .iter_mut()
            .chain(self.red_platform.robots.iter_mut())
            .chain(self.blue_platform.robots.iter_mut())
            .find(|r| r.role == RobotRole::Host)
    }

    /// All robots: free-roaming plus any parked on a platform
    pub fn all_robots(&self) -> impl Iterator<Item = &Robot> {
        self.robots
            .iter()
            .chain(self.red_platform.robots.iter())
            .chain(self.blue_platform.robots.iter())
    }

    /// Every goal that can score: free, platform-resting, and robot-held
    pub fn scoreable_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals
            .iter()
            .chain(self.red_platform.goals.iter())
            .chain(self.blue_platform.goals.iter())
            .chain(
                self.all_robots()
                    .flat_map(|r| r.front_goal.iter().chain(r.rear_goal.iter())),
            )
    }

    /// Total goal count across every owner (possession audit)
    pub fn total_goal_count(&self) -> usize {
        self.scoreable_goals().count()
    }

    /// Total ring count across every owner, including rings stored inside
    /// goal containers and carried by robots (possession audit)
    pub fn total_ring_count(&self) -> usize {
        let free = self.rings.len() + self.red_platform.rings.len() + self.blue_platform.rings.len();
        let in_goals: usize = self
            .scoreable_goals()
            .map(|g| g.total_ring_count())
            .sum::<usize>();
        let carried: usize = self.all_robots().map(|r| r.rings.len()).sum();
        free + in_goals + carried
    }
}

/// A field plus the remaining time budget for the episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub representation: FieldRepresentation,
    pub time_remaining: u32,
}

impl FieldState {
    pub fn new(representation: FieldRepresentation, time_remaining: u32) -> Self {
        Self {
            representation,
            time_remaining,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.time_remaining == 0
    }
}
