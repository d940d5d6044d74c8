//! Seeded generator behind [`generate_log`].

use rand::{rngs::StdRng, Rng as _, SeedableRng};
use serde::{Deserialize, Serialize};
use taslog_core::{
    Collision, CommandFrame, Damage, DuckState, ObjectMove, PhysicsFrame, PlayerState, TasLog,
    Vec3,
};

/// Shape of a generated log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SynthConfig {
    /// Number of physics frames.
    pub physics_frames: usize,
    /// Command frames in every unpaused physics frame.
    pub command_frames_per_frame: usize,
    /// RNG seed; equal seeds give equal logs.
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            physics_frames: 64,
            command_frames_per_frame: 1,
            seed: 42,
        }
    }
}

const FSU_AXIS: [f32; 3] = [-400.0, 0.0, 400.0];
const CONSOLE_LINES: [&str; 4] = [
    "Unknown command: +klook",
    "\"fps_max\" changed to \"100\"",
    "Executing autoexec.cfg",
    "couldn't exec userconfig.cfg",
];
const COMMAND_BUFFERS: [&str; 3] = ["+jump", "-jump", "+duck;wait;-duck"];

/// Rolling kinematic state carried from one command frame to the next.
struct Walker {
    position: Vec3,
    velocity: Vec3,
    on_ground: bool,
    duck_state: DuckState,
    health: f32,
    armor: f32,
}

/// Generate a synthetic session.
#[must_use]
pub fn generate_log(cfg: &SynthConfig) -> TasLog {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut walker = Walker {
        position: [0.0, 0.0, 36.0],
        velocity: [0.0; 3],
        on_ground: true,
        duck_state: DuckState::Unducked,
        health: 100.0,
        armor: 0.0,
    };
    let mut framebulk_id = 0u32;

    let physics_frames = (0..cfg.physics_frames)
        .map(|_| {
            let paused = rng.random_bool(0.05);
            let mut pf = PhysicsFrame {
                frame_time: rng.random_range(0.001f32..0.02),
                client_state: if rng.random_bool(0.9) { 5 } else { rng.random_range(0i8..5) },
                paused,
                command_buffer: if rng.random_bool(0.1) {
                    COMMAND_BUFFERS[rng.random_range(0..COMMAND_BUFFERS.len())].to_owned()
                } else {
                    String::new()
                },
                ..PhysicsFrame::default()
            };
            if !paused {
                for _ in 0..cfg.command_frames_per_frame {
                    if rng.random_bool(0.25) {
                        framebulk_id = framebulk_id.wrapping_add(1);
                    }
                    pf.command_frames
                        .push(command_frame(&mut rng, &mut walker, framebulk_id));
                }
            }
            if rng.random_bool(0.05) {
                pf.damages.push(damage(&mut rng));
            }
            if rng.random_bool(0.05) {
                pf.object_moves.push(ObjectMove {
                    velocity: vec3(&mut rng, 250.0),
                    position: vec3(&mut rng, 2048.0),
                    pull: rng.random_bool(0.5),
                });
            }
            if rng.random_bool(0.03) {
                pf.console_prints.push(console_line(&mut rng));
            }
            pf
        })
        .collect();

    TasLog {
        tool_version: format!("taslog-synth {}", env!("CARGO_PKG_VERSION")),
        build_number: 8684,
        game_mod: "valve".to_owned(),
        physics_frames,
    }
}

fn vec3(rng: &mut StdRng, bound: f32) -> Vec3 {
    [
        rng.random_range(-bound..bound),
        rng.random_range(-bound..bound),
        rng.random_range(-bound..bound),
    ]
}

/// Zero most of the time, random otherwise.
fn sparse_vec3(rng: &mut StdRng, p: f64, bound: f32) -> Vec3 {
    if rng.random_bool(p) {
        vec3(rng, bound)
    } else {
        [0.0; 3]
    }
}

fn console_line(rng: &mut StdRng) -> String {
    CONSOLE_LINES[rng.random_range(0..CONSOLE_LINES.len())].to_owned()
}

fn damage(rng: &mut StdRng) -> Damage {
    Damage {
        amount: rng.random_range(1.0f32..50.0),
        damage_bits: rng.random_range(0..=i32::from(u16::MAX)),
        direction: sparse_vec3(rng, 0.5, 1.0),
    }
}

fn player_state(w: &Walker, rng: &mut StdRng) -> PlayerState {
    PlayerState {
        position: w.position,
        velocity: w.velocity,
        base_velocity: sparse_vec3(rng, 0.05, 100.0),
        on_ground: w.on_ground,
        on_ladder: rng.random_bool(0.02),
        water_level: if rng.random_bool(0.05) { rng.random_range(1u8..=3) } else { 0 },
        duck_state: w.duck_state,
    }
}

fn command_frame(rng: &mut StdRng, w: &mut Walker, framebulk_id: u32) -> CommandFrame {
    let msec: u8 = rng.random_range(1..=20);
    let dt = f32::from(msec) / 1000.0;
    let fsu = [
        FSU_AXIS[rng.random_range(0..3)],
        FSU_AXIS[rng.random_range(0..3)],
        0.0,
    ];

    let pre_pm_state = player_state(w, rng);

    // Crude movement: accelerate toward the input, fall when airborne.
    for (v, wish) in w.velocity.iter_mut().zip(fsu) {
        *v = (*v + wish * dt).clamp(-320.0, 320.0);
    }
    if w.on_ground && rng.random_bool(0.05) {
        w.velocity[2] = 268.0;
        w.on_ground = false;
    } else if !w.on_ground {
        w.velocity[2] -= 800.0 * dt;
    }
    for (p, v) in w.position.iter_mut().zip(w.velocity) {
        *p += v * dt;
    }
    if w.position[2] <= 36.0 {
        w.position[2] = 36.0;
        w.velocity[2] = 0.0;
        w.on_ground = true;
    }
    w.duck_state = match rng.random_range(0..20) {
        0 => DuckState::InDuck,
        1 => DuckState::Ducked,
        2 => DuckState::Unducked,
        _ => w.duck_state,
    };
    if rng.random_bool(0.02) {
        w.health = (w.health - rng.random_range(1.0f32..20.0)).max(1.0);
        w.armor = rng.random_range(0.0f32..100.0);
    }

    let post_pm_state = player_state(w, rng);

    let collisions = if rng.random_bool(0.1) {
        (0..rng.random_range(1..=2))
            .map(|_| Collision {
                entity: rng.random_range(0i8..=i8::MAX),
                normal: [0.0, 0.0, 1.0],
                distance: rng.random_range(-64.0f32..64.0),
                impact_velocity: vec3(rng, 320.0),
            })
            .collect()
    } else {
        Vec::new()
    };

    CommandFrame {
        msec,
        frame_time_remainder: rng.random_range(0.0f32..0.001),
        framebulk_id,
        shared_seed: rng.random(),
        view_angles: [
            rng.random_range(-89.0f32..89.0),
            rng.random_range(-180.0f32..180.0),
            0.0,
        ],
        punch_angles: sparse_vec3(rng, 0.05, 5.0),
        buttons: rng.random(),
        impulse: if rng.random_bool(0.02) { 101 } else { 0 },
        fsu,
        ent_friction: if rng.random_bool(0.05) { 0.5 } else { 1.0 },
        ent_gravity: if rng.random_bool(0.05) { 0.5 } else { 1.0 },
        health: w.health,
        armor: w.armor,
        pre_pm_state,
        post_pm_state,
        collisions,
        console_prints: if rng.random_bool(0.03) {
            vec![console_line(rng)]
        } else {
            Vec::new()
        },
    }
}
