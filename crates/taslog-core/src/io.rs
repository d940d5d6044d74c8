//! File helpers for TASLog documents.
//!
//! Two on-disk shapes exist:
//!
//! - the **wire format**: the compact, default-omitting TASLog JSON produced
//!   by [`LogWriter`] and consumed by [`LogReader`];
//! - the **expanded export**: the full [`TasLog`] tree serialized through
//!   serde, with every field present. JSON (pretty) and CBOR are supported,
//!   picked by file extension.
//!
//! Expanded exports are for downstream tooling. They are not TASLog
//! documents and cannot be fed back to [`read_log_file`].

use crate::reader::{LogReader, ReaderConfig};
use crate::types::TasLog;
use crate::writer::LogWriter;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/// ------------------------------
/// Wire format
/// ------------------------------

/// Read a TASLog document with the default reader configuration.
pub fn read_log_file<P: AsRef<Path>>(path: P) -> Result<TasLog> {
    read_log_file_with(path, ReaderConfig::default())
}

/// Read a TASLog document with an explicit reader configuration.
pub fn read_log_file_with<P: AsRef<Path>>(path: P, cfg: ReaderConfig) -> Result<TasLog> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    LogReader::new(cfg)
        .read_from(BufReader::new(f))
        .with_context(|| format!("read TASLog {}", display(path_ref)))
}

/// Write `log` in the TASLog wire format, creating parent directories.
pub fn write_log_file<P: AsRef<Path>>(path: P, log: &TasLog) -> Result<()> {
    let path_ref = path.as_ref();
    let mut writer = LogWriter::new();
    writer.write_log(log)?;
    write_bytes(path_ref, writer.as_bytes())
}

/// Write an already-serialized TASLog buffer (e.g. from a live
/// [`LogWriter`]), creating parent directories.
pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    w.write_all(bytes)
        .and_then(|()| w.flush())
        .with_context(|| format!("write {}", display(path_ref)))?;
    Ok(())
}

/// ------------------------------
/// Expanded export
/// ------------------------------

/// Write the expanded tree as **JSON** (pretty).
pub fn export_expanded_json<P: AsRef<Path>>(path: P, log: &TasLog) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let w = BufWriter::new(f);
    serde_json::to_writer_pretty(w, log).with_context(|| "serialize expanded JSON log")?;
    Ok(())
}

/// Write the expanded tree as **CBOR**.
pub fn export_expanded_cbor<P: AsRef<Path>>(path: P, log: &TasLog) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let w = BufWriter::new(f);
    ciborium::ser::into_writer(log, w).with_context(|| "serialize expanded CBOR log")?;
    Ok(())
}

/// Write the expanded tree by extension (`.json` / `.cbor`; unknown → JSON).
pub fn export_expanded_auto<P: AsRef<Path>>(path: P, log: &TasLog) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => export_expanded_cbor(path, log),
        _ => export_expanded_json(path, log),
    }
}

/// Read an expanded tree by extension (`.json` / `.cbor`).
pub fn read_expanded_auto<P: AsRef<Path>>(path: P) -> Result<TasLog> {
    let path_ref = path.as_ref();
    let ext = ext_lower(path_ref);
    let f = || File::open(path_ref).with_context(|| format!("open {}", display(path_ref)));
    match ext.as_deref() {
        Some("json") => serde_json::from_reader(BufReader::new(f()?))
            .with_context(|| "deserialize expanded JSON log"),
        Some("cbor") => ciborium::de::from_reader(BufReader::new(f()?))
            .with_context(|| "deserialize expanded CBOR log"),
        Some(other) => Err(anyhow!(
            "unsupported extension {other:?} for expanded log {}",
            display(path_ref)
        )),
        None => Err(anyhow!(
            "missing extension for expanded log {}",
            display(path_ref)
        )),
    }
}

fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Human-friendly path display for error messages.
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandFrame, ObjectMove, PhysicsFrame};

    fn tmp_path(name: &str, ext: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("taslog_core_io_{name}_{nanos}.{ext}"));
        p
    }

    fn sample() -> TasLog {
        TasLog {
            tool_version: "1.0".into(),
            build_number: 42,
            game_mod: "valve".into(),
            physics_frames: vec![PhysicsFrame {
                frame_time: 0.0166,
                command_frames: vec![CommandFrame {
                    msec: 16,
                    shared_seed: 12345,
                    ..CommandFrame::default()
                }],
                object_moves: vec![ObjectMove::default()],
                ..PhysicsFrame::default()
            }],
        }
    }

    #[test]
    fn wire_file_roundtrip_creates_parent_dirs() {
        let dir = tmp_path("nested", "d");
        let path = dir.join("deeper").join("run.taslog");
        let log = sample();
        write_log_file(&path, &log).unwrap();
        assert_eq!(read_log_file(&path).unwrap(), log);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn expanded_json_and_cbor_roundtrip() {
        let log = sample();
        for ext in ["json", "cbor"] {
            let path = tmp_path("expanded", ext);
            export_expanded_auto(&path, &log).unwrap();
            assert_eq!(read_expanded_auto(&path).unwrap(), log);
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn expanded_json_lists_every_field() {
        let path = tmp_path("fields", "json");
        export_expanded_json(&path, &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"punch_angles\""));
        assert!(text.contains("\"pull\": true"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unknown_extension_rejected_on_read() {
        let path = tmp_path("odd", "bin");
        std::fs::write(&path, b"{}").unwrap();
        assert!(read_expanded_auto(&path).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_error_names_path() {
        let path = tmp_path("absent", "taslog");
        let msg = format!("{:#}", read_log_file(&path).unwrap_err());
        assert!(msg.contains("absent"), "{msg}");
    }
}
