#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use taslog_core::{
    io::{export_expanded_auto, read_log_file_with, write_log_file},
    ReaderConfig, TasLog,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "taslog",
    about = "TASLog reference CLI",
    long_about = "TASLog reference CLI.\n\nUse this tool to generate synthetic logs, check and summarize recorded logs, export them in expanded form, and rewrite them canonically.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate a synthetic log and write it in the TASLog format.
    Simulate {
        /// Number of physics frames
        #[arg(long, default_value_t = 1000)]
        frames: usize,

        /// Command frames per unpaused physics frame
        #[arg(long, default_value_t = 1)]
        cmd_frames: usize,

        /// RNG seed (equal seeds give equal logs)
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output path
        #[arg(long, default_value = "session.taslog")]
        out: PathBuf,
    },

    /// Parse a log and report whether it conforms to the format
    Validate {
        /// Input TASLog path
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        reader: ReaderArgs,
    },

    /// Print a summary of a log
    Inspect {
        /// Input TASLog path
        #[arg(long)]
        input: PathBuf,

        /// Output format of the summary
        #[arg(long, value_enum, default_value_t = FormatOpt::Text)]
        format: FormatOpt,

        #[command(flatten)]
        reader: ReaderArgs,
    },

    /// Export a log as an expanded JSON or CBOR tree (picked by extension)
    Export {
        /// Input TASLog path
        #[arg(long)]
        input: PathBuf,

        /// Output path (`.json` or `.cbor`)
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        reader: ReaderArgs,
    },

    /// Rewrite a log in canonical key order with default values omitted
    Normalize {
        /// Input TASLog path
        #[arg(long)]
        input: PathBuf,

        /// Output TASLog path
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        reader: ReaderArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct ReaderArgs {
    /// Physics frames to reserve before parsing
    #[arg(long, default_value_t = ReaderConfig::default().physics_frame_capacity)]
    capacity: usize,
}

impl From<ReaderArgs> for ReaderConfig {
    fn from(a: ReaderArgs) -> Self {
        Self {
            physics_frame_capacity: a.capacity,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum FormatOpt {
    /// Human-readable lines
    Text,
    /// A single JSON object
    Json,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Simulate {
            frames,
            cmd_frames,
            seed,
            out,
        } => simulate(frames, cmd_frames, seed, out),

        Cmd::Validate { input, reader } => validate(input, reader.into()),

        Cmd::Inspect {
            input,
            format,
            reader,
        } => inspect(input, format, reader.into()),

        Cmd::Export {
            input,
            output,
            reader,
        } => export(input, output, reader.into()),

        Cmd::Normalize {
            input,
            output,
            reader,
        } => normalize(input, output, reader.into()),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn simulate(frames: usize, cmd_frames: usize, seed: u64, out: PathBuf) -> Result<()> {
    use taslog_synth::{generate_log, SynthConfig};

    info!(frames, cmd_frames, seed, "generating synthetic log");
    let log = generate_log(&SynthConfig {
        physics_frames: frames,
        command_frames_per_frame: cmd_frames,
        seed,
    });

    write_log_file(&out, &log)
        .with_context(|| format!("writing TASLog to {}", out.display()))?;

    println!(
        "Simulated log: {} physics frames, {} command frames → {}",
        log.len(),
        log.command_frame_count(),
        out.display()
    );
    Ok(())
}

fn validate(input: PathBuf, cfg: ReaderConfig) -> Result<()> {
    info!(input=%input.display(), "validating log");
    let log = read_log_file_with(&input, cfg)?;
    println!(
        "OK: {} physics frames, {} command frames",
        log.len(),
        log.command_frame_count()
    );
    Ok(())
}

/// Counts reported by `inspect`.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    tool_version: &'a str,
    build_number: i32,
    game_mod: &'a str,
    physics_frames: usize,
    paused_frames: usize,
    command_frames: usize,
    framebulks: usize,
    damages: usize,
    object_moves: usize,
    collisions: usize,
    console_prints: usize,
    total_frame_time: f64,
}

impl<'a> Summary<'a> {
    fn of(log: &'a TasLog) -> Self {
        let frames = &log.physics_frames;
        let cfs = || frames.iter().flat_map(|pf| &pf.command_frames);

        let mut framebulks = 0;
        let mut last_bid = None;
        for cf in cfs() {
            if last_bid != Some(cf.framebulk_id) {
                framebulks += 1;
                last_bid = Some(cf.framebulk_id);
            }
        }

        Self {
            tool_version: &log.tool_version,
            build_number: log.build_number,
            game_mod: &log.game_mod,
            physics_frames: frames.len(),
            paused_frames: frames.iter().filter(|pf| pf.paused).count(),
            command_frames: log.command_frame_count(),
            framebulks,
            damages: frames.iter().map(|pf| pf.damages.len()).sum(),
            object_moves: frames.iter().map(|pf| pf.object_moves.len()).sum(),
            collisions: cfs().map(|cf| cf.collisions.len()).sum(),
            console_prints: frames.iter().map(|pf| pf.console_prints.len()).sum::<usize>()
                + cfs().map(|cf| cf.console_prints.len()).sum::<usize>(),
            total_frame_time: frames.iter().map(|pf| f64::from(pf.frame_time)).sum(),
        }
    }
}

fn inspect(input: PathBuf, format: FormatOpt, cfg: ReaderConfig) -> Result<()> {
    info!(input=%input.display(), "inspecting log");
    let log = read_log_file_with(&input, cfg)?;
    let s = Summary::of(&log);

    match format {
        FormatOpt::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&s).context("serialize summary")?
            );
        }
        FormatOpt::Text => {
            println!("tool version    {}", s.tool_version);
            println!("build           {}", s.build_number);
            println!("mod             {}", s.game_mod);
            println!(
                "physics frames  {} ({} paused, {:.3} s)",
                s.physics_frames, s.paused_frames, s.total_frame_time
            );
            println!(
                "command frames  {} in {} framebulks",
                s.command_frames, s.framebulks
            );
            println!("damages         {}", s.damages);
            println!("object moves    {}", s.object_moves);
            println!("collisions      {}", s.collisions);
            println!("console lines   {}", s.console_prints);
        }
    }
    Ok(())
}

fn export(input: PathBuf, output: PathBuf, cfg: ReaderConfig) -> Result<()> {
    info!(infile=%input.display(), outfile=%output.display(), "export expanded log");
    let log = read_log_file_with(&input, cfg)?;
    export_expanded_auto(&output, &log)
        .with_context(|| format!("exporting to {}", output.display()))?;
    println!(
        "Exported {} physics frames → {}",
        log.len(),
        output.display()
    );
    Ok(())
}

fn normalize(input: PathBuf, output: PathBuf, cfg: ReaderConfig) -> Result<()> {
    info!(infile=%input.display(), outfile=%output.display(), "normalizing log");
    let log = read_log_file_with(&input, cfg)?;
    write_log_file(&output, &log)
        .with_context(|| format!("writing TASLog to {}", output.display()))?;
    println!("Normalized {} → {}", input.display(), output.display());
    Ok(())
}
