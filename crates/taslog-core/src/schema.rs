//! Canonical TASLog key table and schema defaults.
//!
//! Each JSON object scope of the format owns one key enum. The enums are
//! generated from a single table so that the writer (which calls
//! [`key`](LogKey::key)) and the reader (which calls
//! [`from_key`](LogKey::from_key)) can never disagree about a key.
//!
//! Keys are unique within a scope only. `pos`, `vel`, `dmg` and `cmsg` are
//! reused across scopes and are told apart by the scope the parser is in.

use std::fmt;

use crate::types::{DuckState, Vec3};

/// Client state recorded when a physics frame does not say otherwise.
pub const DEFAULT_CLIENT_STATE: i8 = 5;
/// Entity friction multiplier when absent.
pub const DEFAULT_ENT_FRICTION: f32 = 1.0;
/// Entity gravity multiplier when absent.
pub const DEFAULT_ENT_GRAVITY: f32 = 1.0;
/// Object moves are pulls unless marked otherwise.
pub const DEFAULT_PULL: bool = true;
/// Default for punch angles, base velocity and damage direction.
pub const ZERO_VEC3: Vec3 = [0.0; 3];
/// Default duck state of a player.
pub const DEFAULT_DUCK_STATE: DuckState = DuckState::Unducked;
/// Number of elements in every fixed-length vector field.
pub const VEC3_LEN: usize = 3;
/// Physics frames reserved up front when a log is parsed.
pub const PHYSICS_FRAME_CAPACITY_HINT: usize = 10_000;

/// `true` if every component compares equal to zero (`-0.0` included).
#[inline]
#[must_use]
pub fn is_zero_vec3(v: &Vec3) -> bool {
    v.iter().all(|c| *c == 0.0)
}

macro_rules! key_table {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $key:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every field of the scope, in canonical emission order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire key of the field.
            #[inline]
            #[must_use]
            pub const fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            /// Resolve a wire key within this scope.
            #[must_use]
            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}

key_table! {
    /// Keys of the root object.
    LogKey {
        /// Version string of the recording tool.
        ToolVersion => "tool_ver",
        /// Game build number.
        BuildNumber => "build",
        /// Game mod directory name.
        GameMod => "mod",
        /// Array of physics frames.
        PhysicsFrames => "pf",
    }
}

key_table! {
    /// Keys of a physics frame object.
    PhysicsFrameKey {
        /// Frame time.
        FrameTime => "ft",
        /// Client state code (omitted when 5).
        ClientState => "cls",
        /// Command buffer text.
        CommandBuffer => "cbuf",
        /// Paused flag (omitted when false).
        Paused => "p",
        /// Array of command frames.
        CommandFrames => "cf",
        /// Array of damage events.
        Damages => "dmg",
        /// Array of object pushes/pulls.
        ObjectMoves => "obj",
        /// Array of console lines printed outside any command frame.
        ConsoleMessages => "cmsg",
    }
}

key_table! {
    /// Keys of a damage event object.
    DamageKey {
        /// Damage amount.
        Amount => "dmg",
        /// Damage type bitmask.
        Bits => "bits",
        /// Damage direction (omitted when zero).
        Direction => "dir",
    }
}

key_table! {
    /// Keys of an object move object.
    ObjectMoveKey {
        /// Pull flag (omitted when true).
        Pull => "pull",
        /// Object velocity.
        Velocity => "vel",
        /// Object position.
        Position => "pos",
    }
}

key_table! {
    /// Keys of a command frame object.
    CommandFrameKey {
        /// Frame milliseconds.
        Msec => "ms",
        /// Frame-time remainder.
        Remainder => "rem",
        /// Framebulk id.
        FramebulkId => "bid",
        /// Shared RNG seed.
        SharedSeed => "ss",
        /// View angles.
        ViewAngles => "view",
        /// Punch angles (omitted when zero).
        PunchAngles => "pview",
        /// Buttons bitmask.
        Buttons => "btns",
        /// Impulse (omitted when 0).
        Impulse => "impls",
        /// Forward/side/up input.
        Fsu => "fsu",
        /// Entity friction (omitted when 1).
        EntFriction => "efric",
        /// Entity gravity (omitted when 1).
        EntGravity => "egrav",
        /// Health.
        Health => "hp",
        /// Armor.
        Armor => "ap",
        /// Player state before movement.
        PrePlayerMove => "prepm",
        /// Player state after movement.
        PostPlayerMove => "postpm",
        /// Console lines printed during the command frame.
        ConsoleMessages => "cmsg",
        /// Array of collisions.
        Collisions => "col",
    }
}

key_table! {
    /// Keys of a player state object.
    PlayerKey {
        /// Position.
        Position => "pos",
        /// Velocity.
        Velocity => "vel",
        /// Base velocity (omitted when zero).
        BaseVelocity => "bvel",
        /// On-ground flag (always written).
        OnGround => "og",
        /// On-ladder flag (omitted when false).
        OnLadder => "ol",
        /// Water level (omitted when 0).
        WaterLevel => "wlvl",
        /// Duck state (omitted when unducked).
        DuckState => "dst",
    }
}

key_table! {
    /// Keys of a collision object.
    CollisionKey {
        /// Entity id.
        Entity => "ent",
        /// Plane normal.
        PlaneNormal => "n",
        /// Plane distance.
        PlaneDistance => "d",
        /// Impact velocity.
        ImpactVelocity => "ivel",
    }
}

/// Which of the two player-state captures of a command frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Before movement resolution.
    Pre,
    /// After movement resolution.
    Post,
}

impl Side {
    /// Command-frame key holding this capture.
    #[inline]
    #[must_use]
    pub const fn key(self) -> CommandFrameKey {
        match self {
            Self::Pre => CommandFrameKey::PrePlayerMove,
            Self::Post => CommandFrameKey::PostPlayerMove,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pre => "pre-move player",
            Self::Post => "post-move player",
        })
    }
}
