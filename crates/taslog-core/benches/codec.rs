use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use taslog_core::{
    read_str, writer::LogWriter, CommandFrame, Damage, PhysicsFrame, PlayerState, TasLog,
};

/// Deterministic LCG stream mapped into `[-512, 512)`.
struct Det(u64);

impl Det {
    #[allow(clippy::cast_precision_loss)]
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1664525).wrapping_add(1013904223) % (1u64 << 32);
        (self.0 % 1024) as f32 - 512.0
    }

    fn vec3(&mut self) -> [f32; 3] {
        [self.next(), self.next(), self.next()]
    }
}

fn det_log(frames: usize, cmd_frames: usize, seed: u64) -> TasLog {
    let mut d = Det(seed);
    let player = |d: &mut Det| PlayerState {
        position: d.vec3(),
        velocity: d.vec3(),
        on_ground: d.next() > 0.0,
        ..PlayerState::default()
    };
    let physics_frames = (0..frames)
        .map(|i| PhysicsFrame {
            frame_time: 0.01,
            command_frames: (0..cmd_frames)
                .map(|j| CommandFrame {
                    msec: 10,
                    framebulk_id: u32::try_from(i).unwrap_or(u32::MAX),
                    shared_seed: u32::try_from(j).unwrap_or(0),
                    view_angles: d.vec3(),
                    fsu: d.vec3(),
                    health: 100.0,
                    pre_pm_state: player(&mut d),
                    post_pm_state: player(&mut d),
                    ..CommandFrame::default()
                })
                .collect(),
            damages: if i % 16 == 0 {
                vec![Damage {
                    amount: 10.0,
                    damage_bits: 2,
                    direction: d.vec3(),
                }]
            } else {
                Vec::new()
            },
            ..PhysicsFrame::default()
        })
        .collect();
    TasLog {
        tool_version: "bench".into(),
        build_number: 8684,
        game_mod: "valve".into(),
        physics_frames,
    }
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("taslog_codec");
    for &frames in &[1_000usize, 10_000usize] {
        let log = det_log(frames, 2, 2024);
        let mut w = LogWriter::with_capacity(frames * 512);
        w.write_log(&log).unwrap();
        let text = w.as_str().unwrap().to_owned();
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_function(BenchmarkId::new("write_log", frames), |b| {
            b.iter_batched(
                LogWriter::new,
                |mut w| {
                    w.write_log(black_box(&log)).unwrap();
                    black_box(w);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(BenchmarkId::new("read_str", frames), |b| {
            b.iter(|| black_box(read_str(black_box(&text)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
