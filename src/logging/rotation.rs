//! Naming and retention of rotated log files.
//!
//! A rotated file is named `<stem>.<UTC timestamp>.<seq>.log`, e.g.
//! `microbatch.2024-12-24T13-50-00UTC.001.log`.

use crate::config::LogRotationConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]-[minute]-[second]UTC");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedLog {
    pub path: PathBuf,
    pub rotated_at: OffsetDateTime,
    pub seq: u16,
}

pub fn rotated_file_name(stem: &str, rotated_at: OffsetDateTime, seq: u16) -> String {
    let ts = rotated_at
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| "1970-01-01T00-00-00UTC".to_string());
    format!("{stem}.{ts}.{seq:03}.log")
}

/// Returns `(rotated_at, seq)` when `file_name` is a rotated file of `stem`.
pub fn parse_rotated_file_name(file_name: &str, stem: &str) -> Option<(OffsetDateTime, u16)> {
    let middle = file_name
        .strip_prefix(stem)?
        .strip_prefix('.')?
        .strip_suffix(".log")?;
    let (ts_raw, seq_raw) = middle.rsplit_once('.')?;
    if seq_raw.len() != 3 || !seq_raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let seq = seq_raw.parse::<u16>().ok()?;
    let rotated_at = PrimitiveDateTime::parse(ts_raw, TIMESTAMP_FORMAT)
        .ok()?
        .assume_utc();
    Some((rotated_at, seq))
}

/// Rotated files of `stem` in `dir`, oldest first.
pub fn list_rotated(dir: &Path, stem: &str) -> io::Result<Vec<RotatedLog>> {
    let mut rotated: Vec<RotatedLog> = fs::read_dir(dir)?
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let (rotated_at, seq) = parse_rotated_file_name(file_name.to_str()?, stem)?;
            Some(RotatedLog {
                path: entry.path(),
                rotated_at,
                seq,
            })
        })
        .collect();
    rotated.sort_by(|a, b| a.rotated_at.cmp(&b.rotated_at).then(a.seq.cmp(&b.seq)));
    Ok(rotated)
}

/// Delete rotated files older than `keep_days`, then the oldest ones beyond `max_num`.
pub fn prune_rotated_logs(dir: &Path, stem: &str, rotation: &LogRotationConfig) -> io::Result<()> {
    let cutoff = OffsetDateTime::now_utc() - Duration::days(rotation.keep_days as i64);
    let (expired, kept): (Vec<_>, Vec<_>) = list_rotated(dir, stem)?
        .into_iter()
        .partition(|log| log.rotated_at < cutoff);
    let excess = kept.len().saturating_sub(rotation.max_num as usize);
    for log in expired.iter().chain(kept.iter().take(excess)) {
        let _ = fs::remove_file(&log.path);
    }
    Ok(())
}
