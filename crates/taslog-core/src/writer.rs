//! Streaming TASLog writer.
//!
//! [`LogWriter`] produces a compact TASLog document incrementally while a
//! simulation runs. The caller opens and closes scopes in document order
//! (log, physics frame, command frame, player block) and pushes sparse
//! events whenever they happen. Events are queued first-in first-out and
//! written when their owning scope closes:
//!
//! - damages, object moves and console lines printed outside any command
//!   frame belong to the open physics frame and follow its `cf` array;
//! - collisions and console lines printed inside a command frame belong to
//!   that command frame.
//!
//! The open command frame is held as a draft and serialized at
//! [`end_cmd_frame`](LogWriter::end_cmd_frame), so a field set twice keeps
//! the last value and fields equal to their schema default are left out.
//!
//! Calls made outside the scope they belong to return an error and leave the
//! writer unchanged.
//!
//! ```
//! use taslog_core::writer::LogWriter;
//!
//! let mut w = LogWriter::new();
//! w.start_log("1.0", 8684, "valve")?;
//! w.start_physics_frame(0.01, 5, false, "")?;
//! w.start_cmd_frame(1, 10, 0.0)?;
//! w.set_health(100.0)?;
//! w.end_cmd_frame()?;
//! w.end_physics_frame()?;
//! w.end_log()?;
//! assert!(w.as_str()?.starts_with(r#"{"tool_ver":"1.0","build":8684"#));
//! # anyhow::Ok(())
//! ```

use std::collections::VecDeque;
use std::fmt;

use anyhow::{bail, ensure, Context, Result};
use tracing::{debug, trace};

use crate::schema::{
    is_zero_vec3, CollisionKey, CommandFrameKey, DamageKey, LogKey, ObjectMoveKey,
    PhysicsFrameKey, PlayerKey, Side, DEFAULT_CLIENT_STATE, DEFAULT_DUCK_STATE,
    DEFAULT_ENT_FRICTION, DEFAULT_ENT_GRAVITY, DEFAULT_PULL, ZERO_VEC3,
};
use crate::sink::JsonSink;
use crate::types::{
    Collision, CommandFrame, Damage, DuckState, ObjectMove, PhysicsFrame, PlayerState, TasLog,
    Vec3,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Log,
    PhysicsFrame,
    CommandFrame,
    Player(Side),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => f.write_str("log"),
            Self::PhysicsFrame => f.write_str("physics frame"),
            Self::CommandFrame => f.write_str("command frame"),
            Self::Player(side) => write!(f, "{side} block"),
        }
    }
}

#[derive(Debug, Default)]
struct PlayerDraft {
    position: Option<Vec3>,
    velocity: Option<Vec3>,
    base_velocity: Vec3,
    on_ground: Option<bool>,
    on_ladder: bool,
    water_level: u8,
    duck_state: DuckState,
}

#[derive(Debug)]
struct CommandFrameDraft {
    msec: u8,
    remainder: f32,
    framebulk_id: u32,
    shared_seed: Option<u32>,
    view_angles: Option<Vec3>,
    punch_angles: Vec3,
    buttons: Option<u8>,
    impulse: u8,
    fsu: Option<Vec3>,
    ent_friction: f32,
    ent_gravity: f32,
    health: Option<f32>,
    armor: Option<f32>,
    pre: Option<PlayerDraft>,
    post: Option<PlayerDraft>,
}

impl CommandFrameDraft {
    const fn new(framebulk_id: u32, msec: u8, remainder: f32) -> Self {
        Self {
            msec,
            remainder,
            framebulk_id,
            shared_seed: None,
            view_angles: None,
            punch_angles: ZERO_VEC3,
            buttons: None,
            impulse: 0,
            fsu: None,
            ent_friction: DEFAULT_ENT_FRICTION,
            ent_gravity: DEFAULT_ENT_GRAVITY,
            health: None,
            armor: None,
            pre: None,
            post: None,
        }
    }

    fn player_slot(&mut self, side: Side) -> &mut Option<PlayerDraft> {
        match side {
            Side::Pre => &mut self.pre,
            Side::Post => &mut self.post,
        }
    }
}

/// Incremental TASLog writer.
///
/// One writer produces one document at a time; [`start_log`](Self::start_log)
/// discards anything left from a previous document.
#[derive(Debug, Default)]
pub struct LogWriter {
    sink: JsonSink,
    scopes: Vec<Scope>,
    draft: Option<CommandFrameDraft>,
    damages: VecDeque<Damage>,
    object_moves: VecDeque<ObjectMove>,
    frame_console: VecDeque<String>,
    cmd_console: VecDeque<String>,
    collisions: VecDeque<Collision>,
    physics_frames: usize,
}

impl LogWriter {
    /// Fresh writer with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh writer with `bytes` of output buffer reserved.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            sink: JsonSink::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Drop output, open scopes, the command-frame draft and all queues.
    pub fn clear(&mut self) {
        self.sink.clear();
        self.scopes.clear();
        self.draft = None;
        self.damages.clear();
        self.object_moves.clear();
        self.frame_console.clear();
        self.cmd_console.clear();
        self.collisions.clear();
        self.physics_frames = 0;
    }

    /// `true` once [`end_log`](Self::end_log) has closed the document.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.scopes.is_empty() && self.sink.is_complete()
    }

    /// Physics frames closed so far in the current document.
    #[must_use]
    pub const fn frames_written(&self) -> usize {
        self.physics_frames
    }

    /// Output bytes so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.sink.as_bytes()
    }

    /// Output text so far.
    pub fn as_str(&self) -> Result<&str> {
        self.sink.as_str()
    }

    /* ---------------------------- log scope ---------------------------- */

    /// Begin a document: writes the header and opens the `pf` array.
    pub fn start_log(&mut self, tool_version: &str, build_number: i32, game_mod: &str) -> Result<()> {
        self.clear();
        let s = &mut self.sink;
        s.start_object()?;
        put_str(s, LogKey::ToolVersion.key(), tool_version)?;
        put_signed(s, LogKey::BuildNumber.key(), build_number)?;
        put_str(s, LogKey::GameMod.key(), game_mod)?;
        s.key(LogKey::PhysicsFrames.key())?;
        s.start_array()?;
        self.enter(Scope::Log);
        Ok(())
    }

    /// Close the `pf` array and the root object.
    pub fn end_log(&mut self) -> Result<()> {
        self.expect_scope(Scope::Log, "end_log")?;
        self.sink.end_array()?;
        self.sink.end_object()?;
        self.leave();
        debug!(
            physics_frames = self.physics_frames,
            bytes = self.sink.as_bytes().len(),
            "TASLog written"
        );
        Ok(())
    }

    /* ------------------------ physics-frame scope ----------------------- */

    /// Open a physics frame and its `cf` array.
    ///
    /// `cls` is left out when `client_state` is the default and `p` when the
    /// frame is not paused.
    pub fn start_physics_frame(
        &mut self,
        frame_time: f32,
        client_state: i8,
        paused: bool,
        command_buffer: &str,
    ) -> Result<()> {
        self.expect_scope(Scope::Log, "start_physics_frame")?;
        let s = &mut self.sink;
        s.start_object()?;
        put_f32(s, PhysicsFrameKey::FrameTime.key(), frame_time)?;
        if client_state != DEFAULT_CLIENT_STATE {
            put_signed(s, PhysicsFrameKey::ClientState.key(), client_state)?;
        }
        put_str(s, PhysicsFrameKey::CommandBuffer.key(), command_buffer)?;
        if paused {
            put_bool(s, PhysicsFrameKey::Paused.key(), true)?;
        }
        s.key(PhysicsFrameKey::CommandFrames.key())?;
        s.start_array()?;
        self.enter(Scope::PhysicsFrame);
        Ok(())
    }

    /// Close `cf`, drain the physics-frame queues and close the frame.
    ///
    /// Queues are written in the order `dmg`, `obj`, `cmsg`; empty queues
    /// produce no key.
    pub fn end_physics_frame(&mut self) -> Result<()> {
        self.expect_scope(Scope::PhysicsFrame, "end_physics_frame")?;
        let s = &mut self.sink;
        s.end_array()?;

        if !self.damages.is_empty() {
            s.key(PhysicsFrameKey::Damages.key())?;
            s.start_array()?;
            for d in self.damages.drain(..) {
                write_damage(s, &d)?;
            }
            s.end_array()?;
        }
        if !self.object_moves.is_empty() {
            s.key(PhysicsFrameKey::ObjectMoves.key())?;
            s.start_array()?;
            for m in self.object_moves.drain(..) {
                write_object_move(s, &m)?;
            }
            s.end_array()?;
        }
        if !self.frame_console.is_empty() {
            s.key(PhysicsFrameKey::ConsoleMessages.key())?;
            write_strings(s, self.frame_console.drain(..))?;
        }

        s.end_object()?;
        self.leave();
        self.physics_frames += 1;
        Ok(())
    }

    /// Queue a damage event for the enclosing physics frame.
    pub fn push_damage(&mut self, damage: Damage) -> Result<()> {
        self.ensure_within(Scope::PhysicsFrame, "push_damage")?;
        self.damages.push_back(damage);
        Ok(())
    }

    /// Queue an object push/pull for the enclosing physics frame.
    pub fn push_object_move(&mut self, object_move: ObjectMove) -> Result<()> {
        self.ensure_within(Scope::PhysicsFrame, "push_object_move")?;
        self.object_moves.push_back(object_move);
        Ok(())
    }

    /// Queue a console line.
    ///
    /// The line belongs to the open command frame if there is one (including
    /// while a player block of it is open), otherwise to the open physics
    /// frame.
    pub fn push_console_print(&mut self, message: impl Into<String>) -> Result<()> {
        match self.scopes.last() {
            Some(Scope::CommandFrame | Scope::Player(_)) => {
                self.cmd_console.push_back(message.into());
            }
            Some(Scope::PhysicsFrame) => self.frame_console.push_back(message.into()),
            Some(scope) => bail!("push_console_print called inside {scope}, expected a physics or command frame"),
            None => bail!("push_console_print called with no open log"),
        }
        Ok(())
    }

    /* ------------------------ command-frame scope ----------------------- */

    /// Open a command frame inside the current physics frame.
    pub fn start_cmd_frame(&mut self, framebulk_id: u32, msec: u8, remainder: f32) -> Result<()> {
        self.expect_scope(Scope::PhysicsFrame, "start_cmd_frame")?;
        self.draft = Some(CommandFrameDraft::new(framebulk_id, msec, remainder));
        self.enter(Scope::CommandFrame);
        Ok(())
    }

    /// Serialize the command-frame draft together with its queued console
    /// lines and collisions.
    pub fn end_cmd_frame(&mut self) -> Result<()> {
        self.expect_scope(Scope::CommandFrame, "end_cmd_frame")?;
        let draft = self
            .draft
            .take()
            .context("command frame scope has no draft")?;
        let s = &mut self.sink;
        write_command_frame(s, &draft, &mut self.cmd_console, &mut self.collisions)?;
        self.leave();
        Ok(())
    }

    /// Shared RNG seed.
    pub fn set_shared_seed(&mut self, seed: u32) -> Result<()> {
        self.draft_mut("set_shared_seed")?.shared_seed = Some(seed);
        Ok(())
    }

    /// View angles.
    pub fn set_view_angles(&mut self, angles: Vec3) -> Result<()> {
        self.draft_mut("set_view_angles")?.view_angles = Some(angles);
        Ok(())
    }

    /// Punch angles; left out when all zero.
    pub fn set_punch_angles(&mut self, angles: Vec3) -> Result<()> {
        self.draft_mut("set_punch_angles")?.punch_angles = angles;
        Ok(())
    }

    /// Buttons bitmask.
    pub fn set_buttons(&mut self, buttons: u8) -> Result<()> {
        self.draft_mut("set_buttons")?.buttons = Some(buttons);
        Ok(())
    }

    /// Impulse; left out when 0.
    pub fn set_impulse(&mut self, impulse: u8) -> Result<()> {
        self.draft_mut("set_impulse")?.impulse = impulse;
        Ok(())
    }

    /// Forward/side/up input.
    pub fn set_fsu(&mut self, fsu: Vec3) -> Result<()> {
        self.draft_mut("set_fsu")?.fsu = Some(fsu);
        Ok(())
    }

    /// Entity friction; left out when 1.
    pub fn set_ent_friction(&mut self, friction: f32) -> Result<()> {
        self.draft_mut("set_ent_friction")?.ent_friction = friction;
        Ok(())
    }

    /// Entity gravity; left out when 1.
    pub fn set_ent_gravity(&mut self, gravity: f32) -> Result<()> {
        self.draft_mut("set_ent_gravity")?.ent_gravity = gravity;
        Ok(())
    }

    /// Health.
    pub fn set_health(&mut self, health: f32) -> Result<()> {
        self.draft_mut("set_health")?.health = Some(health);
        Ok(())
    }

    /// Armor.
    pub fn set_armor(&mut self, armor: f32) -> Result<()> {
        self.draft_mut("set_armor")?.armor = Some(armor);
        Ok(())
    }

    /// Queue a collision for the open command frame.
    pub fn push_collision(&mut self, collision: Collision) -> Result<()> {
        self.ensure_within(Scope::CommandFrame, "push_collision")?;
        self.collisions.push_back(collision);
        Ok(())
    }

    /// Replace the open command frame's collision queue.
    pub fn set_collisions<I>(&mut self, collisions: I) -> Result<()>
    where
        I: IntoIterator<Item = Collision>,
    {
        self.ensure_within(Scope::CommandFrame, "set_collisions")?;
        self.collisions = collisions.into_iter().collect();
        Ok(())
    }

    /* --------------------------- player scope --------------------------- */

    /// Open the pre-move player block.
    pub fn start_pre_player(&mut self) -> Result<()> {
        self.start_player(Side::Pre)
    }

    /// Close the pre-move player block.
    pub fn end_pre_player(&mut self) -> Result<()> {
        self.end_player(Side::Pre)
    }

    /// Open the post-move player block.
    pub fn start_post_player(&mut self) -> Result<()> {
        self.start_player(Side::Post)
    }

    /// Close the post-move player block.
    pub fn end_post_player(&mut self) -> Result<()> {
        self.end_player(Side::Post)
    }

    /// Open a player block. Reopening a side continues its earlier values.
    pub fn start_player(&mut self, side: Side) -> Result<()> {
        self.expect_scope(Scope::CommandFrame, "start_player")?;
        self.draft
            .as_mut()
            .context("command frame scope has no draft")?
            .player_slot(side)
            .get_or_insert_with(PlayerDraft::default);
        self.enter(Scope::Player(side));
        Ok(())
    }

    /// Close a player block.
    pub fn end_player(&mut self, side: Side) -> Result<()> {
        self.expect_scope(Scope::Player(side), "end_player")?;
        self.leave();
        Ok(())
    }

    /// Player position.
    pub fn set_position(&mut self, position: Vec3) -> Result<()> {
        self.player_mut("set_position")?.position = Some(position);
        Ok(())
    }

    /// Player velocity.
    pub fn set_velocity(&mut self, velocity: Vec3) -> Result<()> {
        self.player_mut("set_velocity")?.velocity = Some(velocity);
        Ok(())
    }

    /// Player base velocity; left out when all zero.
    pub fn set_base_velocity(&mut self, velocity: Vec3) -> Result<()> {
        self.player_mut("set_base_velocity")?.base_velocity = velocity;
        Ok(())
    }

    /// On-ground flag; written whenever set.
    pub fn set_on_ground(&mut self, on_ground: bool) -> Result<()> {
        self.player_mut("set_on_ground")?.on_ground = Some(on_ground);
        Ok(())
    }

    /// On-ladder flag; left out when false.
    pub fn set_on_ladder(&mut self, on_ladder: bool) -> Result<()> {
        self.player_mut("set_on_ladder")?.on_ladder = on_ladder;
        Ok(())
    }

    /// Water level; left out when 0.
    pub fn set_water_level(&mut self, level: u8) -> Result<()> {
        self.player_mut("set_water_level")?.water_level = level;
        Ok(())
    }

    /// Duck state; left out when unducked.
    pub fn set_duck_state(&mut self, state: DuckState) -> Result<()> {
        self.player_mut("set_duck_state")?.duck_state = state;
        Ok(())
    }

    /* --------------------------- whole document ------------------------- */

    /// Write `log` as a complete document, replacing any previous output.
    ///
    /// The document is produced through the same calls a live recorder would
    /// make, so reading it back yields `log` again as long as every float is
    /// finite.
    pub fn write_log(&mut self, log: &TasLog) -> Result<()> {
        self.start_log(&log.tool_version, log.build_number, &log.game_mod)?;
        for (i, pf) in log.physics_frames.iter().enumerate() {
            self.write_physics_frame(pf)
                .with_context(|| format!("physics frame {i}"))?;
        }
        self.end_log()
    }

    fn write_physics_frame(&mut self, pf: &PhysicsFrame) -> Result<()> {
        self.start_physics_frame(pf.frame_time, pf.client_state, pf.paused, &pf.command_buffer)?;
        for cf in &pf.command_frames {
            self.write_command_frame(cf)?;
        }
        for d in &pf.damages {
            self.push_damage(d.clone())?;
        }
        for m in &pf.object_moves {
            self.push_object_move(m.clone())?;
        }
        for msg in &pf.console_prints {
            self.push_console_print(msg.as_str())?;
        }
        self.end_physics_frame()
    }

    fn write_command_frame(&mut self, cf: &CommandFrame) -> Result<()> {
        self.start_cmd_frame(cf.framebulk_id, cf.msec, cf.frame_time_remainder)?;
        self.set_shared_seed(cf.shared_seed)?;
        self.set_view_angles(cf.view_angles)?;
        self.set_punch_angles(cf.punch_angles)?;
        self.set_buttons(cf.buttons)?;
        self.set_impulse(cf.impulse)?;
        self.set_fsu(cf.fsu)?;
        self.set_ent_friction(cf.ent_friction)?;
        self.set_ent_gravity(cf.ent_gravity)?;
        self.set_health(cf.health)?;
        self.set_armor(cf.armor)?;
        self.write_player(Side::Pre, &cf.pre_pm_state)?;
        self.write_player(Side::Post, &cf.post_pm_state)?;
        for msg in &cf.console_prints {
            self.push_console_print(msg.as_str())?;
        }
        self.set_collisions(cf.collisions.iter().cloned())?;
        self.end_cmd_frame()
    }

    fn write_player(&mut self, side: Side, p: &PlayerState) -> Result<()> {
        self.start_player(side)?;
        self.set_position(p.position)?;
        self.set_velocity(p.velocity)?;
        self.set_base_velocity(p.base_velocity)?;
        self.set_on_ground(p.on_ground)?;
        self.set_on_ladder(p.on_ladder)?;
        self.set_water_level(p.water_level)?;
        self.set_duck_state(p.duck_state)?;
        self.end_player(side)
    }

    /* ----------------------------- internals ---------------------------- */

    fn enter(&mut self, scope: Scope) {
        trace!(%scope, depth = self.scopes.len(), "enter");
        self.scopes.push(scope);
    }

    fn leave(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            trace!(%scope, depth = self.scopes.len(), "leave");
        }
    }

    fn expect_scope(&self, want: Scope, op: &str) -> Result<()> {
        match self.scopes.last() {
            Some(s) if *s == want => Ok(()),
            Some(s) => bail!("{op} called inside {s}, expected {want}"),
            None => bail!("{op} called with no open {want}"),
        }
    }

    fn ensure_within(&self, want: Scope, op: &str) -> Result<()> {
        ensure!(
            self.scopes.contains(&want),
            "{op} called outside of a {want}"
        );
        Ok(())
    }

    fn draft_mut(&mut self, op: &str) -> Result<&mut CommandFrameDraft> {
        self.expect_scope(Scope::CommandFrame, op)?;
        self.draft
            .as_mut()
            .context("command frame scope has no draft")
    }

    fn player_mut(&mut self, op: &str) -> Result<&mut PlayerDraft> {
        let side = match self.scopes.last() {
            Some(Scope::Player(side)) => *side,
            Some(s) => bail!("{op} called inside {s}, expected a player block"),
            None => bail!("{op} called with no open player block"),
        };
        self.draft
            .as_mut()
            .and_then(|d| d.player_slot(side).as_mut())
            .with_context(|| format!("{side} block has no draft"))
    }
}

/// Serialize `log` into a compact TASLog string.
pub fn to_string(log: &TasLog) -> Result<String> {
    let mut w = LogWriter::new();
    w.write_log(log)?;
    Ok(w.as_str()?.to_owned())
}

/* ------------------------------ emission -------------------------------- */

fn put_str(s: &mut JsonSink, key: &str, v: &str) -> Result<()> {
    s.key(key)?;
    s.string(v)
}

fn put_bool(s: &mut JsonSink, key: &str, v: bool) -> Result<()> {
    s.key(key)?;
    s.boolean(v)
}

fn put_unsigned(s: &mut JsonSink, key: &str, v: impl Into<u64>) -> Result<()> {
    s.key(key)?;
    s.unsigned(v.into())
}

fn put_signed(s: &mut JsonSink, key: &str, v: impl Into<i64>) -> Result<()> {
    s.key(key)?;
    s.signed(v.into())
}

fn put_f32(s: &mut JsonSink, key: &str, v: f32) -> Result<()> {
    s.key(key)?;
    s.float(v).with_context(|| format!("field {key:?}"))
}

fn put_vec3(s: &mut JsonSink, key: &str, v: &Vec3) -> Result<()> {
    s.key(key)?;
    s.start_array()?;
    for c in v {
        s.float(*c).with_context(|| format!("field {key:?}"))?;
    }
    s.end_array()
}

fn write_strings<I: Iterator<Item = String>>(s: &mut JsonSink, lines: I) -> Result<()> {
    s.start_array()?;
    for line in lines {
        s.string(&line)?;
    }
    s.end_array()
}

fn write_damage(s: &mut JsonSink, d: &Damage) -> Result<()> {
    s.start_object()?;
    put_f32(s, DamageKey::Amount.key(), d.amount)?;
    put_signed(s, DamageKey::Bits.key(), d.damage_bits)?;
    if !is_zero_vec3(&d.direction) {
        put_vec3(s, DamageKey::Direction.key(), &d.direction)?;
    }
    s.end_object()
}

fn write_object_move(s: &mut JsonSink, m: &ObjectMove) -> Result<()> {
    s.start_object()?;
    if m.pull != DEFAULT_PULL {
        put_bool(s, ObjectMoveKey::Pull.key(), m.pull)?;
    }
    put_vec3(s, ObjectMoveKey::Velocity.key(), &m.velocity)?;
    put_vec3(s, ObjectMoveKey::Position.key(), &m.position)?;
    s.end_object()
}

fn write_collision(s: &mut JsonSink, c: &Collision) -> Result<()> {
    s.start_object()?;
    put_signed(s, CollisionKey::Entity.key(), c.entity)?;
    put_vec3(s, CollisionKey::PlaneNormal.key(), &c.normal)?;
    put_f32(s, CollisionKey::PlaneDistance.key(), c.distance)?;
    put_vec3(s, CollisionKey::ImpactVelocity.key(), &c.impact_velocity)?;
    s.end_object()
}

fn write_player(s: &mut JsonSink, p: &PlayerDraft) -> Result<()> {
    s.start_object()?;
    if let Some(pos) = &p.position {
        put_vec3(s, PlayerKey::Position.key(), pos)?;
    }
    if let Some(vel) = &p.velocity {
        put_vec3(s, PlayerKey::Velocity.key(), vel)?;
    }
    if !is_zero_vec3(&p.base_velocity) {
        put_vec3(s, PlayerKey::BaseVelocity.key(), &p.base_velocity)?;
    }
    if let Some(og) = p.on_ground {
        put_bool(s, PlayerKey::OnGround.key(), og)?;
    }
    if p.on_ladder {
        put_bool(s, PlayerKey::OnLadder.key(), true)?;
    }
    if p.water_level != 0 {
        put_unsigned(s, PlayerKey::WaterLevel.key(), p.water_level)?;
    }
    if p.duck_state != DEFAULT_DUCK_STATE {
        put_unsigned(s, PlayerKey::DuckState.key(), p.duck_state.as_u8())?;
    }
    s.end_object()
}

#[allow(clippy::float_cmp)]
fn write_command_frame(
    s: &mut JsonSink,
    d: &CommandFrameDraft,
    console: &mut VecDeque<String>,
    collisions: &mut VecDeque<Collision>,
) -> Result<()> {
    s.start_object()?;
    put_unsigned(s, CommandFrameKey::Msec.key(), d.msec)?;
    put_f32(s, CommandFrameKey::Remainder.key(), d.remainder)?;
    put_unsigned(s, CommandFrameKey::FramebulkId.key(), d.framebulk_id)?;
    if let Some(ss) = d.shared_seed {
        put_unsigned(s, CommandFrameKey::SharedSeed.key(), ss)?;
    }
    if let Some(view) = &d.view_angles {
        put_vec3(s, CommandFrameKey::ViewAngles.key(), view)?;
    }
    if !is_zero_vec3(&d.punch_angles) {
        put_vec3(s, CommandFrameKey::PunchAngles.key(), &d.punch_angles)?;
    }
    if let Some(btns) = d.buttons {
        put_unsigned(s, CommandFrameKey::Buttons.key(), btns)?;
    }
    if d.impulse != 0 {
        put_unsigned(s, CommandFrameKey::Impulse.key(), d.impulse)?;
    }
    if let Some(fsu) = &d.fsu {
        put_vec3(s, CommandFrameKey::Fsu.key(), fsu)?;
    }
    if d.ent_friction != DEFAULT_ENT_FRICTION {
        put_f32(s, CommandFrameKey::EntFriction.key(), d.ent_friction)?;
    }
    if d.ent_gravity != DEFAULT_ENT_GRAVITY {
        put_f32(s, CommandFrameKey::EntGravity.key(), d.ent_gravity)?;
    }
    if let Some(hp) = d.health {
        put_f32(s, CommandFrameKey::Health.key(), hp)?;
    }
    if let Some(ap) = d.armor {
        put_f32(s, CommandFrameKey::Armor.key(), ap)?;
    }
    for side in [Side::Pre, Side::Post] {
        let slot = match side {
            Side::Pre => &d.pre,
            Side::Post => &d.post,
        };
        if let Some(p) = slot {
            s.key(side.key().key())?;
            write_player(s, p)?;
        }
    }
    if !console.is_empty() {
        s.key(CommandFrameKey::ConsoleMessages.key())?;
        write_strings(s, console.drain(..))?;
    }
    if !collisions.is_empty() {
        s.key(CommandFrameKey::Collisions.key())?;
        s.start_array()?;
        for c in collisions.drain(..) {
            write_collision(s, &c)?;
        }
        s.end_array()?;
    }
    s.end_object()
}
