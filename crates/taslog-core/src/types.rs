//! In-memory TASLog document model.
//!
//! The reader builds these values and the writer can be driven from them
//! ([`LogWriter::write_log`](crate::writer::LogWriter::write_log)). `Default`
//! impls carry the schema defaults: the reader seeds every new record with
//! `Default::default()` before processing any key, so fields a document omits
//! come back exactly as the writer's omission rules assume.
//!
//! All types derive serde so callers can export the expanded tree in other
//! encodings (see [`crate::io`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::{
    DEFAULT_CLIENT_STATE, DEFAULT_DUCK_STATE, DEFAULT_ENT_FRICTION, DEFAULT_ENT_GRAVITY,
    DEFAULT_PULL, ZERO_VEC3,
};

/// Fixed-length numeric triple (angles, velocities, positions, normals).
pub type Vec3 = [f32; 3];

/// Player duck state.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DuckState {
    /// Standing.
    #[default]
    Unducked = 0,
    /// Transitioning into a duck.
    InDuck = 1,
    /// Fully ducked.
    Ducked = 2,
}

impl DuckState {
    /// Wire value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DuckState {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, u8> {
        match v {
            0 => Ok(Self::Unducked),
            1 => Ok(Self::InDuck),
            2 => Ok(Self::Ducked),
            other => Err(other),
        }
    }
}

impl fmt::Display for DuckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unducked => "unducked",
            Self::InDuck => "in-duck",
            Self::Ducked => "ducked",
        };
        f.write_str(s)
    }
}

/// Kinematic player state, captured before and after movement resolution.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    /// Origin.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Base velocity (conveyors, pushers).
    pub base_velocity: Vec3,
    /// Whether the player stands on ground.
    pub on_ground: bool,
    /// Whether the player is on a ladder.
    pub on_ladder: bool,
    /// Water level (0 = dry).
    pub water_level: u8,
    /// Duck state.
    pub duck_state: DuckState,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: ZERO_VEC3,
            velocity: ZERO_VEC3,
            base_velocity: ZERO_VEC3,
            on_ground: false,
            on_ladder: false,
            water_level: 0,
            duck_state: DEFAULT_DUCK_STATE,
        }
    }
}

/// Damage taken during a physics frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Damage {
    /// Amount of damage.
    pub amount: f32,
    /// Damage type bitmask.
    pub damage_bits: i32,
    /// Direction the damage came from.
    pub direction: Vec3,
}

impl Default for Damage {
    fn default() -> Self {
        Self {
            amount: 0.0,
            damage_bits: 0,
            direction: ZERO_VEC3,
        }
    }
}

/// A push or pull applied to a physics object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ObjectMove {
    /// Object velocity after the move.
    pub velocity: Vec3,
    /// Object position.
    pub position: Vec3,
    /// `true` for a pull, `false` for a push.
    pub pull: bool,
}

impl Default for ObjectMove {
    fn default() -> Self {
        Self {
            velocity: ZERO_VEC3,
            position: ZERO_VEC3,
            pull: DEFAULT_PULL,
        }
    }
}

/// Collision recorded while resolving a command frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Collision {
    /// Entity index that was hit.
    pub entity: i8,
    /// Plane normal.
    pub normal: Vec3,
    /// Plane distance.
    pub distance: f32,
    /// Velocity at impact.
    pub impact_velocity: Vec3,
}

/// One processed input frame inside a physics frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CommandFrame {
    /// Frame length in milliseconds.
    pub msec: u8,
    /// Frame-time remainder carried to the next frame.
    pub frame_time_remainder: f32,
    /// Framebulk this command frame was produced by.
    pub framebulk_id: u32,
    /// Shared RNG seed.
    pub shared_seed: u32,
    /// View angles.
    pub view_angles: Vec3,
    /// Punch angles.
    pub punch_angles: Vec3,
    /// Buttons bitmask.
    pub buttons: u8,
    /// Impulse command.
    pub impulse: u8,
    /// Forward/side/up movement input.
    pub fsu: Vec3,
    /// Entity friction multiplier.
    pub ent_friction: f32,
    /// Entity gravity multiplier.
    pub ent_gravity: f32,
    /// Health.
    pub health: f32,
    /// Armor.
    pub armor: f32,
    /// Player state before movement.
    pub pre_pm_state: PlayerState,
    /// Player state after movement.
    pub post_pm_state: PlayerState,
    /// Collisions, in occurrence order.
    pub collisions: Vec<Collision>,
    /// Console lines printed during this command frame.
    pub console_prints: Vec<String>,
}

impl Default for CommandFrame {
    fn default() -> Self {
        Self {
            msec: 0,
            frame_time_remainder: 0.0,
            framebulk_id: 0,
            shared_seed: 0,
            view_angles: ZERO_VEC3,
            punch_angles: ZERO_VEC3,
            buttons: 0,
            impulse: 0,
            fsu: ZERO_VEC3,
            ent_friction: DEFAULT_ENT_FRICTION,
            ent_gravity: DEFAULT_ENT_GRAVITY,
            health: 0.0,
            armor: 0.0,
            pre_pm_state: PlayerState::default(),
            post_pm_state: PlayerState::default(),
            collisions: Vec::new(),
            console_prints: Vec::new(),
        }
    }
}

/// One simulation tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhysicsFrame {
    /// Frame time in seconds.
    pub frame_time: f32,
    /// Client state code.
    pub client_state: i8,
    /// Whether the game was paused.
    pub paused: bool,
    /// Command buffer contents executed this frame.
    pub command_buffer: String,
    /// Command frames, in processing order.
    pub command_frames: Vec<CommandFrame>,
    /// Damage events, in push order.
    pub damages: Vec<Damage>,
    /// Object pushes/pulls, in push order.
    pub object_moves: Vec<ObjectMove>,
    /// Console lines printed outside any command frame.
    pub console_prints: Vec<String>,
}

impl Default for PhysicsFrame {
    fn default() -> Self {
        Self {
            frame_time: 0.0,
            client_state: DEFAULT_CLIENT_STATE,
            paused: false,
            command_buffer: String::new(),
            command_frames: Vec::new(),
            damages: Vec::new(),
            object_moves: Vec::new(),
            console_prints: Vec::new(),
        }
    }
}

/// Root of a TASLog document.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TasLog {
    /// Version string of the recording tool.
    pub tool_version: String,
    /// Game build number.
    pub build_number: i32,
    /// Game mod directory name.
    pub game_mod: String,
    /// Physics frames, in simulation order.
    pub physics_frames: Vec<PhysicsFrame>,
}

impl TasLog {
    /// Number of physics frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.physics_frames.len()
    }

    /// Whether the log has no physics frames.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.physics_frames.is_empty()
    }

    /// Total command frames across all physics frames.
    #[must_use]
    pub fn command_frame_count(&self) -> usize {
        self.physics_frames.iter().map(|pf| pf.command_frames.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_schema() {
        let pf = PhysicsFrame::default();
        assert_eq!(pf.client_state, 5);
        assert!(!pf.paused);

        let cf = CommandFrame::default();
        assert_eq!(cf.punch_angles, [0.0; 3]);
        assert_eq!(cf.impulse, 0);
        assert_eq!(cf.ent_friction, 1.0);
        assert_eq!(cf.ent_gravity, 1.0);

        let ps = PlayerState::default();
        assert_eq!(ps.base_velocity, [0.0; 3]);
        assert!(!ps.on_ladder);
        assert_eq!(ps.water_level, 0);
        assert_eq!(ps.duck_state, DuckState::Unducked);

        assert!(ObjectMove::default().pull);
        assert_eq!(Damage::default().direction, [0.0; 3]);
    }

    #[test]
    fn duck_state_wire_values() {
        for ds in [DuckState::Unducked, DuckState::InDuck, DuckState::Ducked] {
            assert_eq!(DuckState::try_from(ds.as_u8()), Ok(ds));
        }
        assert_eq!(DuckState::try_from(3), Err(3));
    }

    #[test]
    fn command_frame_count_sums_frames() {
        let mut log = TasLog::default();
        assert!(log.is_empty());
        for n in [2usize, 0, 3] {
            log.physics_frames.push(PhysicsFrame {
                command_frames: vec![CommandFrame::default(); n],
                ..PhysicsFrame::default()
            });
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.command_frame_count(), 5);
    }
}
