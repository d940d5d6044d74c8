//! Event-driven TASLog reader.
//!
//! [`LogHandler`] is an [`EventHandler`] that rebuilds a [`TasLog`] from the
//! token stream of one document. It keeps a single state value describing where
//! in the grammar the parser stands; every token is checked against that
//! state, and anything the format does not allow is rejected with an error
//! naming the offending key or scope:
//!
//! - unknown keys, and keys valid only in another scope;
//! - a value of the wrong kind (array where a number belongs, string where a
//!   boolean belongs, `null` anywhere);
//! - integers outside the range of their field, numbers too large for `f32`,
//!   and unknown duck states;
//! - vectors with other than three elements;
//! - a top-level value that is not an object.
//!
//! Each record is seeded with its `Default` before its first key, so omitted
//! fields come back as their schema defaults (and fields without a default
//! come back as zero).
//!
//! `pos`, `vel` and `dmg` are shared between scopes; the state machine tells
//! them apart by the object it is in. `prepm` and `postpm` share one player
//! grammar and differ only in the [`Side`] carried by the state.

use std::fmt;
use std::io;

use anyhow::{anyhow, bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{self, EventHandler};
use crate::schema::{
    CollisionKey, CommandFrameKey, DamageKey, LogKey, ObjectMoveKey, PhysicsFrameKey, PlayerKey,
    Side, PHYSICS_FRAME_CAPACITY_HINT, VEC3_LEN,
};
use crate::types::{
    Collision, CommandFrame, Damage, DuckState, ObjectMove, PhysicsFrame, PlayerState, TasLog,
    Vec3,
};

/// Tunables for [`LogReader`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Physics frames reserved when the `pf` array opens.
    pub physics_frame_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            physics_frame_capacity: PHYSICS_FRAME_CAPACITY_HINT,
        }
    }
}

/// Owner of a console-message array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Owner {
    PhysicsFrame,
    CommandFrame,
}

/// Destination of the vector currently being read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    DamageDirection,
    ObjectVelocity,
    ObjectPosition,
    ViewAngles,
    PunchAngles,
    Fsu,
    PlayerPosition(Side),
    PlayerVelocity(Side),
    PlayerBaseVelocity(Side),
    CollisionNormal,
    CollisionImpactVelocity,
}

impl Slot {
    /// State to return to once the vector closes.
    const fn parent(self) -> State {
        match self {
            Self::DamageDirection => State::Damage,
            Self::ObjectVelocity | Self::ObjectPosition => State::ObjectMove,
            Self::ViewAngles | Self::PunchAngles | Self::Fsu => State::CommandFrame,
            Self::PlayerPosition(side)
            | Self::PlayerVelocity(side)
            | Self::PlayerBaseVelocity(side) => State::Player(side),
            Self::CollisionNormal | Self::CollisionImpactVelocity => State::Collision,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Log,
    LogField(LogKey),
    PhysicsFrames,
    PhysicsFrame,
    PhysicsFrameField(PhysicsFrameKey),
    Damages,
    Damage,
    DamageField(DamageKey),
    ObjectMoves,
    ObjectMove,
    ObjectMoveField(ObjectMoveKey),
    CommandFrames,
    CommandFrame,
    CommandFrameField(CommandFrameKey),
    Player(Side),
    PlayerField(Side, PlayerKey),
    Collisions,
    Collision,
    CollisionField(CollisionKey),
    ConsoleMessages(Owner),
    Vector(Slot, usize),
    Done,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("document start"),
            Self::Log => f.write_str("log object"),
            Self::LogField(k) => write!(f, "log field \"{k}\""),
            Self::PhysicsFrames => f.write_str("physics frame array"),
            Self::PhysicsFrame => f.write_str("physics frame"),
            Self::PhysicsFrameField(k) => write!(f, "physics frame field \"{k}\""),
            Self::Damages => f.write_str("damage array"),
            Self::Damage => f.write_str("damage object"),
            Self::DamageField(k) => write!(f, "damage field \"{k}\""),
            Self::ObjectMoves => f.write_str("object move array"),
            Self::ObjectMove => f.write_str("object move"),
            Self::ObjectMoveField(k) => write!(f, "object move field \"{k}\""),
            Self::CommandFrames => f.write_str("command frame array"),
            Self::CommandFrame => f.write_str("command frame"),
            Self::CommandFrameField(k) => write!(f, "command frame field \"{k}\""),
            Self::Player(side) => write!(f, "{side} block"),
            Self::PlayerField(side, k) => write!(f, "{side} field \"{k}\""),
            Self::Collisions => f.write_str("collision array"),
            Self::Collision => f.write_str("collision object"),
            Self::CollisionField(k) => write!(f, "collision field \"{k}\""),
            Self::ConsoleMessages(Owner::PhysicsFrame) => {
                f.write_str("physics frame console messages")
            }
            Self::ConsoleMessages(Owner::CommandFrame) => {
                f.write_str("command frame console messages")
            }
            Self::Vector(slot, i) => write!(f, "element {i} of {slot:?}"),
            Self::Done => f.write_str("end of document"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Scalar<'a> {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Str(&'a str),
}

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "boolean {v}"),
            Self::Unsigned(v) => write!(f, "integer {v}"),
            Self::Signed(v) => write!(f, "integer {v}"),
            Self::Float(v) => write!(f, "number {v}"),
            Self::Str(v) => write!(f, "string {v:?}"),
        }
    }
}

impl<'a> Scalar<'a> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn float(self) -> Result<f32> {
        let x = match self {
            Self::Float(v) => v as f32,
            Self::Unsigned(v) => v as f32,
            Self::Signed(v) => v as f32,
            other => bail!("expected a number, found {other}"),
        };
        ensure!(x.is_finite(), "{self} does not fit in f32");
        Ok(x)
    }

    fn int<T>(self) -> Result<T>
    where
        T: TryFrom<u64> + TryFrom<i64>,
    {
        let ty = std::any::type_name::<T>();
        match self {
            Self::Unsigned(v) => {
                <T as TryFrom<u64>>::try_from(v).map_err(|_| anyhow!("{v} does not fit in {ty}"))
            }
            Self::Signed(v) => {
                <T as TryFrom<i64>>::try_from(v).map_err(|_| anyhow!("{v} does not fit in {ty}"))
            }
            other => bail!("expected an integer, found {other}"),
        }
    }

    fn boolean(self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(v),
            other => bail!("expected a boolean, found {other}"),
        }
    }

    fn text(self) -> Result<&'a str> {
        match self {
            Self::Str(v) => Ok(v),
            other => bail!("expected a string, found {other}"),
        }
    }
}

/// Token handler that assembles a [`TasLog`].
#[derive(Debug)]
pub struct LogHandler {
    state: State,
    log: TasLog,
    cfg: ReaderConfig,
}

impl Default for LogHandler {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

impl LogHandler {
    /// Handler expecting the start of a document.
    #[must_use]
    pub fn new(cfg: ReaderConfig) -> Self {
        Self {
            state: State::Start,
            log: TasLog::default(),
            cfg,
        }
    }

    /// `true` once the root object has closed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// The finished log. Fails if the document was cut short.
    pub fn finish(self) -> Result<TasLog> {
        ensure!(self.is_done(), "document is incomplete (stopped in {})", self.state);
        Ok(self.log)
    }

    /* --------------------------- record access -------------------------- */

    fn frame(&mut self) -> Result<&mut PhysicsFrame> {
        self.log
            .physics_frames
            .last_mut()
            .context("no open physics frame")
    }

    fn damage(&mut self) -> Result<&mut Damage> {
        self.frame()?.damages.last_mut().context("no open damage")
    }

    fn object_move(&mut self) -> Result<&mut ObjectMove> {
        self.frame()?
            .object_moves
            .last_mut()
            .context("no open object move")
    }

    fn command_frame(&mut self) -> Result<&mut CommandFrame> {
        self.frame()?
            .command_frames
            .last_mut()
            .context("no open command frame")
    }

    fn player(&mut self, side: Side) -> Result<&mut PlayerState> {
        let cf = self.command_frame()?;
        Ok(match side {
            Side::Pre => &mut cf.pre_pm_state,
            Side::Post => &mut cf.post_pm_state,
        })
    }

    fn collision(&mut self) -> Result<&mut Collision> {
        self.command_frame()?
            .collisions
            .last_mut()
            .context("no open collision")
    }

    fn vector(&mut self, slot: Slot) -> Result<&mut Vec3> {
        Ok(match slot {
            Slot::DamageDirection => &mut self.damage()?.direction,
            Slot::ObjectVelocity => &mut self.object_move()?.velocity,
            Slot::ObjectPosition => &mut self.object_move()?.position,
            Slot::ViewAngles => &mut self.command_frame()?.view_angles,
            Slot::PunchAngles => &mut self.command_frame()?.punch_angles,
            Slot::Fsu => &mut self.command_frame()?.fsu,
            Slot::PlayerPosition(side) => &mut self.player(side)?.position,
            Slot::PlayerVelocity(side) => &mut self.player(side)?.velocity,
            Slot::PlayerBaseVelocity(side) => &mut self.player(side)?.base_velocity,
            Slot::CollisionNormal => &mut self.collision()?.normal,
            Slot::CollisionImpactVelocity => &mut self.collision()?.impact_velocity,
        })
    }

    /// A repeated player key replaces the earlier block entirely.
    fn enter_player(&mut self, side: Side) -> Result<State> {
        *self.player(side)? = PlayerState::default();
        Ok(State::Player(side))
    }

    /* ------------------------------ scalars ----------------------------- */

    fn scalar(&mut self, v: Scalar<'_>) -> Result<()> {
        let state = self.state;
        self.apply_scalar(state, v)
            .with_context(|| format!("invalid value in {state}"))
    }

    fn apply_scalar(&mut self, state: State, v: Scalar<'_>) -> Result<()> {
        self.state = match state {
            State::LogField(k) => {
                match k {
                    LogKey::ToolVersion => v.text()?.clone_into(&mut self.log.tool_version),
                    LogKey::BuildNumber => self.log.build_number = v.int()?,
                    LogKey::GameMod => v.text()?.clone_into(&mut self.log.game_mod),
                    LogKey::PhysicsFrames => bail!("expected an array, found {v}"),
                }
                State::Log
            }
            State::PhysicsFrameField(k) => {
                let pf = self.frame()?;
                match k {
                    PhysicsFrameKey::FrameTime => pf.frame_time = v.float()?,
                    PhysicsFrameKey::ClientState => pf.client_state = v.int()?,
                    PhysicsFrameKey::CommandBuffer => v.text()?.clone_into(&mut pf.command_buffer),
                    PhysicsFrameKey::Paused => pf.paused = v.boolean()?,
                    PhysicsFrameKey::CommandFrames
                    | PhysicsFrameKey::Damages
                    | PhysicsFrameKey::ObjectMoves
                    | PhysicsFrameKey::ConsoleMessages => bail!("expected an array, found {v}"),
                }
                State::PhysicsFrame
            }
            State::DamageField(k) => {
                let d = self.damage()?;
                match k {
                    DamageKey::Amount => d.amount = v.float()?,
                    DamageKey::Bits => d.damage_bits = v.int()?,
                    DamageKey::Direction => bail!("expected an array, found {v}"),
                }
                State::Damage
            }
            State::ObjectMoveField(k) => {
                let m = self.object_move()?;
                match k {
                    ObjectMoveKey::Pull => m.pull = v.boolean()?,
                    ObjectMoveKey::Velocity | ObjectMoveKey::Position => {
                        bail!("expected an array, found {v}")
                    }
                }
                State::ObjectMove
            }
            State::CommandFrameField(k) => {
                let cf = self.command_frame()?;
                match k {
                    CommandFrameKey::Msec => cf.msec = v.int()?,
                    CommandFrameKey::Remainder => cf.frame_time_remainder = v.float()?,
                    CommandFrameKey::FramebulkId => cf.framebulk_id = v.int()?,
                    CommandFrameKey::SharedSeed => cf.shared_seed = v.int()?,
                    CommandFrameKey::Buttons => cf.buttons = v.int()?,
                    CommandFrameKey::Impulse => cf.impulse = v.int()?,
                    CommandFrameKey::EntFriction => cf.ent_friction = v.float()?,
                    CommandFrameKey::EntGravity => cf.ent_gravity = v.float()?,
                    CommandFrameKey::Health => cf.health = v.float()?,
                    CommandFrameKey::Armor => cf.armor = v.float()?,
                    CommandFrameKey::PrePlayerMove | CommandFrameKey::PostPlayerMove => {
                        bail!("expected an object, found {v}")
                    }
                    CommandFrameKey::ViewAngles
                    | CommandFrameKey::PunchAngles
                    | CommandFrameKey::Fsu
                    | CommandFrameKey::ConsoleMessages
                    | CommandFrameKey::Collisions => bail!("expected an array, found {v}"),
                }
                State::CommandFrame
            }
            State::PlayerField(side, k) => {
                let p = self.player(side)?;
                match k {
                    PlayerKey::OnGround => p.on_ground = v.boolean()?,
                    PlayerKey::OnLadder => p.on_ladder = v.boolean()?,
                    PlayerKey::WaterLevel => p.water_level = v.int()?,
                    PlayerKey::DuckState => {
                        let raw: u8 = v.int()?;
                        p.duck_state = DuckState::try_from(raw)
                            .map_err(|bad| anyhow!("unknown duck state {bad}"))?;
                    }
                    PlayerKey::Position | PlayerKey::Velocity | PlayerKey::BaseVelocity => {
                        bail!("expected an array, found {v}")
                    }
                }
                State::Player(side)
            }
            State::CollisionField(k) => {
                let c = self.collision()?;
                match k {
                    CollisionKey::Entity => c.entity = v.int()?,
                    CollisionKey::PlaneDistance => c.distance = v.float()?,
                    CollisionKey::PlaneNormal | CollisionKey::ImpactVelocity => {
                        bail!("expected an array, found {v}")
                    }
                }
                State::Collision
            }
            State::ConsoleMessages(owner) => {
                let line = v.text()?.to_owned();
                match owner {
                    Owner::PhysicsFrame => self.frame()?.console_prints.push(line),
                    Owner::CommandFrame => self.command_frame()?.console_prints.push(line),
                }
                state
            }
            State::Vector(slot, i) => {
                ensure!(i < VEC3_LEN, "vector has more than {VEC3_LEN} elements");
                let x = v.float()?;
                self.vector(slot)?[i] = x;
                State::Vector(slot, i + 1)
            }
            other => bail!("unexpected {v} in {other}"),
        };
        Ok(())
    }
}

impl EventHandler for LogHandler {
    fn null(&mut self) -> Result<()> {
        bail!("null is not allowed in {}", self.state)
    }

    fn boolean(&mut self, v: bool) -> Result<()> {
        self.scalar(Scalar::Bool(v))
    }

    fn unsigned(&mut self, v: u64) -> Result<()> {
        self.scalar(Scalar::Unsigned(v))
    }

    fn signed(&mut self, v: i64) -> Result<()> {
        self.scalar(Scalar::Signed(v))
    }

    fn double(&mut self, v: f64) -> Result<()> {
        self.scalar(Scalar::Float(v))
    }

    fn string(&mut self, v: &str) -> Result<()> {
        self.scalar(Scalar::Str(v))
    }

    fn start_object(&mut self) -> Result<()> {
        self.state = match self.state {
            State::Start => State::Log,
            State::PhysicsFrames => {
                self.log.physics_frames.push(PhysicsFrame::default());
                State::PhysicsFrame
            }
            State::Damages => {
                self.frame()?.damages.push(Damage::default());
                State::Damage
            }
            State::ObjectMoves => {
                self.frame()?.object_moves.push(ObjectMove::default());
                State::ObjectMove
            }
            State::CommandFrames => {
                self.frame()?.command_frames.push(CommandFrame::default());
                State::CommandFrame
            }
            State::CommandFrameField(CommandFrameKey::PrePlayerMove) => {
                self.enter_player(Side::Pre)?
            }
            State::CommandFrameField(CommandFrameKey::PostPlayerMove) => {
                self.enter_player(Side::Post)?
            }
            State::Collisions => {
                self.command_frame()?.collisions.push(Collision::default());
                State::Collision
            }
            other => bail!("unexpected object in {other}"),
        };
        Ok(())
    }

    fn key(&mut self, k: &str) -> Result<()> {
        let state = self.state;
        let unknown = || anyhow!("unknown key {k:?} in {state}");
        self.state = match state {
            State::Log => State::LogField(LogKey::from_key(k).ok_or_else(unknown)?),
            State::PhysicsFrame => {
                State::PhysicsFrameField(PhysicsFrameKey::from_key(k).ok_or_else(unknown)?)
            }
            State::Damage => State::DamageField(DamageKey::from_key(k).ok_or_else(unknown)?),
            State::ObjectMove => {
                State::ObjectMoveField(ObjectMoveKey::from_key(k).ok_or_else(unknown)?)
            }
            State::CommandFrame => {
                State::CommandFrameField(CommandFrameKey::from_key(k).ok_or_else(unknown)?)
            }
            State::Player(side) => {
                State::PlayerField(side, PlayerKey::from_key(k).ok_or_else(unknown)?)
            }
            State::Collision => {
                State::CollisionField(CollisionKey::from_key(k).ok_or_else(unknown)?)
            }
            other => bail!("unexpected key {k:?} in {other}"),
        };
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.state = match self.state {
            State::Log => {
                debug!(
                    physics_frames = self.log.physics_frames.len(),
                    command_frames = self.log.command_frame_count(),
                    "TASLog read"
                );
                State::Done
            }
            State::PhysicsFrame => State::PhysicsFrames,
            State::Damage => State::Damages,
            State::ObjectMove => State::ObjectMoves,
            State::CommandFrame => State::CommandFrames,
            State::Player(_) => State::CommandFrame,
            State::Collision => State::Collisions,
            other => bail!("unexpected end of object in {other}"),
        };
        Ok(())
    }

    fn start_array(&mut self) -> Result<()> {
        self.state = match self.state {
            State::LogField(LogKey::PhysicsFrames) => {
                self.log
                    .physics_frames
                    .reserve(self.cfg.physics_frame_capacity);
                State::PhysicsFrames
            }
            State::PhysicsFrameField(k) => match k {
                PhysicsFrameKey::CommandFrames => State::CommandFrames,
                PhysicsFrameKey::Damages => State::Damages,
                PhysicsFrameKey::ObjectMoves => State::ObjectMoves,
                PhysicsFrameKey::ConsoleMessages => State::ConsoleMessages(Owner::PhysicsFrame),
                other => bail!("unexpected array for physics frame field \"{other}\""),
            },
            State::DamageField(DamageKey::Direction) => State::Vector(Slot::DamageDirection, 0),
            State::ObjectMoveField(ObjectMoveKey::Velocity) => {
                State::Vector(Slot::ObjectVelocity, 0)
            }
            State::ObjectMoveField(ObjectMoveKey::Position) => {
                State::Vector(Slot::ObjectPosition, 0)
            }
            State::CommandFrameField(k) => match k {
                CommandFrameKey::ViewAngles => State::Vector(Slot::ViewAngles, 0),
                CommandFrameKey::PunchAngles => State::Vector(Slot::PunchAngles, 0),
                CommandFrameKey::Fsu => State::Vector(Slot::Fsu, 0),
                CommandFrameKey::Collisions => State::Collisions,
                CommandFrameKey::ConsoleMessages => State::ConsoleMessages(Owner::CommandFrame),
                other => bail!("unexpected array for command frame field \"{other}\""),
            },
            State::PlayerField(side, k) => match k {
                PlayerKey::Position => State::Vector(Slot::PlayerPosition(side), 0),
                PlayerKey::Velocity => State::Vector(Slot::PlayerVelocity(side), 0),
                PlayerKey::BaseVelocity => State::Vector(Slot::PlayerBaseVelocity(side), 0),
                other => bail!("unexpected array for {side} field \"{other}\""),
            },
            State::CollisionField(CollisionKey::PlaneNormal) => {
                State::Vector(Slot::CollisionNormal, 0)
            }
            State::CollisionField(CollisionKey::ImpactVelocity) => {
                State::Vector(Slot::CollisionImpactVelocity, 0)
            }
            other => bail!("unexpected array in {other}"),
        };
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.state = match self.state {
            State::PhysicsFrames => State::Log,
            State::CommandFrames | State::Damages | State::ObjectMoves => State::PhysicsFrame,
            State::ConsoleMessages(Owner::PhysicsFrame) => State::PhysicsFrame,
            State::ConsoleMessages(Owner::CommandFrame) | State::Collisions => State::CommandFrame,
            State::Vector(slot, n) => {
                ensure!(
                    n == VEC3_LEN,
                    "{slot:?} has {n} elements, expected {VEC3_LEN}"
                );
                slot.parent()
            }
            other => bail!("unexpected end of array in {other}"),
        };
        Ok(())
    }
}

/// Configurable TASLog reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReader {
    /// Reader configuration.
    pub cfg: ReaderConfig,
}

impl LogReader {
    /// Reader with the given configuration.
    #[must_use]
    pub const fn new(cfg: ReaderConfig) -> Self {
        Self { cfg }
    }

    /// Parse a document held in a string.
    pub fn read_str(&self, json: &str) -> Result<TasLog> {
        self.run(&mut serde_json::Deserializer::from_str(json))
    }

    /// Parse a document held in a byte slice.
    pub fn read_slice(&self, json: &[u8]) -> Result<TasLog> {
        self.run(&mut serde_json::Deserializer::from_slice(json))
    }

    /// Parse a document from a byte stream. Buffer `rdr` for file input.
    pub fn read_from<R: io::Read>(&self, rdr: R) -> Result<TasLog> {
        self.run(&mut serde_json::Deserializer::from_reader(rdr))
    }

    fn run<'de, R>(&self, de: &mut serde_json::Deserializer<R>) -> Result<TasLog>
    where
        R: serde_json::de::Read<'de>,
    {
        let mut handler = LogHandler::new(self.cfg);
        events::drive(de, &mut handler).context("parse TASLog")?;
        handler.finish()
    }
}

/// Parse a TASLog string with the default configuration.
pub fn read_str(json: &str) -> Result<TasLog> {
    LogReader::default().read_str(json)
}

/// Parse a TASLog byte slice with the default configuration.
pub fn read_slice(json: &[u8]) -> Result<TasLog> {
    LogReader::default().read_slice(json)
}

/// Parse a TASLog from a reader with the default configuration.
pub fn read_from<R: io::Read>(rdr: R) -> Result<TasLog> {
    LogReader::default().read_from(rdr)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"{"tool_ver":"t","build":1,"mod":"m","pf":"#;

    fn doc(pf: &str) -> String {
        format!("{HEADER}{pf}}}")
    }

    fn one_cmd_frame(cf: &str) -> String {
        doc(&format!(r#"[{{"ft":0.01,"cbuf":"","cf":[{cf}]}}]"#))
    }

    #[track_caller]
    fn err_of(json: &str) -> String {
        format!("{:#}", read_str(json).unwrap_err())
    }

    #[test]
    fn header_only() {
        let log = read_str(&doc("[]")).unwrap();
        assert_eq!(log.tool_version, "t");
        assert_eq!(log.build_number, 1);
        assert_eq!(log.game_mod, "m");
        assert!(log.is_empty());
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let log = read_str(&one_cmd_frame(r#"{"ms":1,"prepm":{},"col":[{}]}"#)).unwrap();
        let pf = &log.physics_frames[0];
        assert_eq!(pf.client_state, 5);
        assert!(!pf.paused);
        let cf = &pf.command_frames[0];
        assert_eq!(cf.msec, 1);
        assert_eq!(cf.ent_friction, 1.0);
        assert_eq!(cf.ent_gravity, 1.0);
        assert_eq!(cf.punch_angles, [0.0; 3]);
        assert_eq!(cf.impulse, 0);
        assert_eq!(cf.pre_pm_state, PlayerState::default());
        assert_eq!(cf.collisions, vec![Collision::default()]);
        assert_eq!(cf.health, 0.0);
    }

    #[test]
    fn shared_keys_land_in_their_scope() {
        let json = doc(concat!(
            r#"[{"ft":0.01,"cbuf":"","cf":[{"ms":1,"#,
            r#""prepm":{"pos":[1,2,3],"vel":[4,5,6]},"#,
            r#""postpm":{"pos":[7,8,9],"dst":1,"ol":true}}],"#,
            r#""dmg":[{"dmg":5.5,"bits":-2,"dir":[0,0,1]}],"#,
            r#""obj":[{"pull":false,"vel":[1,1,1],"pos":[2,2,2]}]}]"#
        ));
        let log = read_str(&json).unwrap();
        let pf = &log.physics_frames[0];
        let cf = &pf.command_frames[0];
        assert_eq!(cf.pre_pm_state.position, [1.0, 2.0, 3.0]);
        assert_eq!(cf.pre_pm_state.velocity, [4.0, 5.0, 6.0]);
        assert_eq!(cf.post_pm_state.position, [7.0, 8.0, 9.0]);
        assert_eq!(cf.post_pm_state.velocity, [0.0; 3]);
        assert_eq!(cf.post_pm_state.duck_state, DuckState::InDuck);
        assert!(cf.post_pm_state.on_ladder);
        assert!(!cf.pre_pm_state.on_ladder);
        assert_eq!(pf.damages[0].amount, 5.5);
        assert_eq!(pf.damages[0].damage_bits, -2);
        assert_eq!(pf.damages[0].direction, [0.0, 0.0, 1.0]);
        assert!(!pf.object_moves[0].pull);
        assert_eq!(pf.object_moves[0].position, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn console_messages_in_both_scopes() {
        let json = doc(concat!(
            r#"[{"ft":0.01,"cbuf":"","cf":[{"cmsg":["in cf"]}],"#,
            r#""cmsg":["a","b"]}]"#
        ));
        let log = read_str(&json).unwrap();
        let pf = &log.physics_frames[0];
        assert_eq!(pf.console_prints, ["a", "b"]);
        assert_eq!(pf.command_frames[0].console_prints, ["in cf"]);
    }

    #[test]
    fn integers_accepted_for_float_fields() {
        let log = read_str(&one_cmd_frame(r#"{"hp":100,"ap":-3,"rem":0}"#)).unwrap();
        let cf = &log.physics_frames[0].command_frames[0];
        assert_eq!(cf.health, 100.0);
        assert_eq!(cf.armor, -3.0);
    }

    #[test]
    fn negative_signed_fields() {
        let json = doc(r#"[{"ft":0.01,"cls":-1,"cbuf":"","cf":[{"col":[{"ent":-128}]}]}]"#);
        let log = read_str(&json).unwrap();
        assert_eq!(log.physics_frames[0].client_state, -1);
        assert_eq!(log.physics_frames[0].command_frames[0].collisions[0].entity, -128);
    }

    #[test]
    fn vector_arity_is_enforced() {
        let two = err_of(&one_cmd_frame(r#"{"view":[1,2]}"#));
        assert!(two.contains("has 2 elements"), "{two}");
        let four = err_of(&one_cmd_frame(r#"{"view":[1,2,3,4]}"#));
        assert!(four.contains("more than 3"), "{four}");
    }

    #[test]
    fn unknown_and_misplaced_keys_are_rejected() {
        let e = err_of(&one_cmd_frame(r#"{"bogus":1}"#));
        assert!(e.contains("unknown key \"bogus\""), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"pos":[0,0,0]}"#));
        assert!(e.contains("unknown key \"pos\""), "{e}");
        let e = err_of(r#"{"tool_ver":"t","ft":0.1}"#);
        assert!(e.contains("unknown key \"ft\""), "{e}");
    }

    #[test]
    fn wrong_value_kinds_are_rejected() {
        let e = err_of(&one_cmd_frame(r#"{"hp":"full"}"#));
        assert!(e.contains("expected a number"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"ms":1.5}"#));
        assert!(e.contains("expected an integer"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"view":1}"#));
        assert!(e.contains("expected an array"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"prepm":[1,2,3]}"#));
        assert!(e.contains("unexpected array"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"prepm":{"og":1}}"#));
        assert!(e.contains("expected a boolean"), "{e}");
        let e = err_of(&doc(r#"{"x":1}"#));
        assert!(e.contains("unexpected object"), "{e}");
    }

    #[test]
    fn null_is_rejected() {
        let e = err_of(&one_cmd_frame(r#"{"hp":null}"#));
        assert!(e.contains("null is not allowed"), "{e}");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let e = err_of(&one_cmd_frame(r#"{"ms":256}"#));
        assert!(e.contains("does not fit"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"btns":-1}"#));
        assert!(e.contains("does not fit"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"prepm":{"dst":3}}"#));
        assert!(e.contains("unknown duck state 3"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"hp":1e39}"#));
        assert!(e.contains("does not fit in f32"), "{e}");
        let e = err_of(&one_cmd_frame(r#"{"prepm":{"pos":[0,-1e300,0]}}"#));
        assert!(e.contains("does not fit in f32"), "{e}");
        let e = err_of(&doc(r#"[{"ft":-3.5e38,"cbuf":""}]"#));
        assert!(e.contains("does not fit in f32"), "{e}");

        let log = read_str(&one_cmd_frame(r#"{"hp":3.4e38,"ap":1e-50}"#)).unwrap();
        let cf = &log.physics_frames[0].command_frames[0];
        assert!(cf.health.is_finite());
        assert_eq!(cf.armor, 0.0);
    }

    #[test]
    fn repeated_keys_overwrite_reseed_or_append() {
        let json = one_cmd_frame(concat!(
            r#"{"hp":1,"hp":2,"#,
            r#""postpm":{"pos":[9,9,9]},"#,
            r#""prepm":{"pos":[1,2,3],"ol":true},"prepm":{"og":true},"#,
            r#""col":[{"ent":1}],"col":[{"ent":2}]}"#
        ));
        let log = read_str(&json).unwrap();
        let cf = &log.physics_frames[0].command_frames[0];
        assert_eq!(cf.health, 2.0);
        assert_eq!(
            cf.pre_pm_state,
            PlayerState {
                on_ground: true,
                ..PlayerState::default()
            }
        );
        assert_eq!(cf.post_pm_state.position, [9.0, 9.0, 9.0]);
        let ents: Vec<_> = cf.collisions.iter().map(|c| c.entity).collect();
        assert_eq!(ents, [1, 2]);

        let json = doc(concat!(
            r#"[{"ft":0.01,"cbuf":"","cf":[{"ms":1}],"cf":[{"ms":2}],"#,
            r#""cmsg":["a"],"cmsg":["b"]}]"#
        ));
        let log = read_str(&json).unwrap();
        let pf = &log.physics_frames[0];
        let msecs: Vec<_> = pf.command_frames.iter().map(|cf| cf.msec).collect();
        assert_eq!(msecs, [1, 2]);
        assert_eq!(pf.console_prints, ["a", "b"]);
    }

    #[test]
    fn top_level_must_be_an_object() {
        assert!(read_str("[]").is_err());
        assert!(read_str("42").is_err());
        assert!(read_str("\"log\"").is_err());
    }

    #[test]
    fn truncated_and_trailing_input_is_rejected() {
        assert!(read_str(r#"{"tool_ver":"t","pf":["#).is_err());
        assert!(read_str(&format!("{} {{}}", doc("[]"))).is_err());
        assert!(read_str(&format!("{}\n", doc("[]"))).is_ok());
    }

    #[test]
    fn handler_finish_requires_closed_document() {
        let mut h = LogHandler::default();
        h.start_object().unwrap();
        h.key("tool_ver").unwrap();
        h.string("t").unwrap();
        assert!(!h.is_done());
        assert!(h.finish().is_err());
    }

    #[test]
    fn reader_entry_points_agree() {
        let json = one_cmd_frame(r#"{"ms":3,"bid":9}"#);
        let a = read_str(&json).unwrap();
        let b = read_slice(json.as_bytes()).unwrap();
        let c = read_from(json.as_bytes()).unwrap();
        let d = LogReader::new(ReaderConfig {
            physics_frame_capacity: 0,
        })
        .read_str(&json)
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a.physics_frames[0].command_frames[0].framebulk_id, 9);
    }
}
