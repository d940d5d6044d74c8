//! taslog-bench-harness
//!
//! Run small end-to-end codec benchmarks (generate -> write -> read -> file
//! round-trip) and append CSV rows into `benchmarks/reports/bench-<unix>.csv`.
//!
//! Usage examples:
//!   cargo run -p taslog-bench-harness -- --profile configs/profiles/small.toml
//!   cargo run -p taslog-bench-harness -- --profile configs/profiles/medium.toml --capacity 60000

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use taslog_core::io::{read_log_file_with, write_bytes};
use taslog_core::{LogReader, LogWriter, ReaderConfig};
use taslog_synth::{generate_log, SynthConfig};

#[derive(Debug, Deserialize)]
struct Profile {
    /// Generator shape (frames, command frames per frame, seed)
    #[serde(flatten)]
    synth: SynthConfig,
    /// Repetitions of the whole pipeline
    repeats: u32,
}

fn parse_flag(name: &str, default: &str) -> String {
    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        if k == format!("--{name}") {
            return it.next().unwrap_or_else(|| default.to_string());
        }
    }
    default.to_string()
}

fn dur_ms(d: Duration) -> u128 {
    d.as_millis()
}

fn main() -> Result<()> {
    let profile_path = PathBuf::from(parse_flag("profile", "configs/profiles/small.toml"));
    let capacity: usize = parse_flag("capacity", "10000")
        .parse()
        .context("parse --capacity")?;
    let reader_cfg = ReaderConfig {
        physics_frame_capacity: capacity,
    };

    let profile_src = fs::read_to_string(&profile_path)
        .with_context(|| format!("read profile {}", profile_path.display()))?;
    let profile: Profile = toml::from_str(&profile_src).context("parse profile toml")?;
    let SynthConfig {
        physics_frames,
        command_frames_per_frame,
        seed,
    } = profile.synth;
    println!(
        "Profile: frames={physics_frames}, cmd_frames={command_frames_per_frame}, seed={seed}, repeats={}, capacity={capacity}",
        profile.repeats
    );

    fs::create_dir_all("benchmarks/reports").ok();

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs();
    let csv_path = PathBuf::from(format!("benchmarks/reports/bench-{ts}.csv"));
    let mut csv = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&csv_path)?;
    writeln!(csv, "timestamp,frames,cmd_frames,seed,repeat,stage,ms,extra")?;

    let row = |csv: &mut fs::File, rep: u32, stage: &str, d: Duration, extra: &str| {
        writeln!(
            csv,
            "{ts},{physics_frames},{command_frames_per_frame},{seed},{rep},{stage},{},{extra}",
            dur_ms(d)
        )
    };

    for rep in 0..profile.repeats {
        let log_path = PathBuf::from(format!("benchmarks/tmp-log-{ts}-{rep}.taslog"));

        // 1) generate
        let t0 = Instant::now();
        let log = generate_log(&profile.synth);
        row(&mut csv, rep, "gen", t0.elapsed(), "")?;

        // 2) write (in memory)
        let t0 = Instant::now();
        let mut writer = LogWriter::new();
        writer.write_log(&log)?;
        let t_write = t0.elapsed();
        let bytes = writer.as_bytes();
        row(&mut csv, rep, "write", t_write, &format!("bytes={}", bytes.len()))?;

        // 3) read (in memory)
        let t0 = Instant::now();
        let back = LogReader::new(reader_cfg).read_slice(bytes)?;
        let t_read = t0.elapsed();
        ensure!(back == log, "read-back log differs from the generated one");
        row(
            &mut csv,
            rep,
            "read",
            t_read,
            &format!("command_frames={}", back.command_frame_count()),
        )?;

        // 4) file round-trip
        let t0 = Instant::now();
        write_bytes(&log_path, bytes)?;
        let from_disk = read_log_file_with(&log_path, reader_cfg)?;
        let t_file = t0.elapsed();
        ensure!(from_disk == log, "log read from disk differs from the generated one");
        row(&mut csv, rep, "file", t_file, "")?;

        // cleanup temp files to avoid disk bloat
        let _ = fs::remove_file(&log_path);
    }

    println!("Wrote report → {}", csv_path.display());
    Ok(())
}
