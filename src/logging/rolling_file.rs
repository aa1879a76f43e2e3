use crate::config::FileLoggingConfig;
use crate::logging::rotation::{list_rotated, prune_rotated_logs, rotated_file_name};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use time::OffsetDateTime;

/// Size-rotated log file. Once the active file would exceed
/// `rotation.max_size_mb` it is renamed to a timestamped sibling and a fresh
/// file is opened in its place.
pub struct RollingFileWriter {
    cfg: FileLoggingConfig,
    dir: PathBuf,
    stem: String,
    file: File,
    len: u64,
}

impl RollingFileWriter {
    pub fn open(cfg: FileLoggingConfig) -> io::Result<Self> {
        let dir = PathBuf::from(&cfg.dir);
        fs::create_dir_all(&dir)?;
        let stem = PathBuf::from(&cfg.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("microbatch")
            .to_string();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(&cfg.file_name))?;
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        prune_rotated_logs(&dir, &stem, &cfg.rotation)?;
        Ok(Self {
            cfg,
            dir,
            stem,
            file,
            len,
        })
    }

    fn limit(&self) -> Option<u64> {
        match self.cfg.rotation.max_size_mb {
            0 => None,
            mb => Some(mb * 1024 * 1024),
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let rotated_at = OffsetDateTime::now_utc()
            .replace_nanosecond(0)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let seq = list_rotated(&self.dir, &self.stem)
            .unwrap_or_default()
            .iter()
            .filter(|log| log.rotated_at == rotated_at)
            .map(|log| log.seq)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        let active = self.dir.join(&self.cfg.file_name);
        fs::rename(
            &active,
            self.dir.join(rotated_file_name(&self.stem, rotated_at, seq)),
        )?;
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&active)?;
        self.len = 0;
        prune_rotated_logs(&self.dir, &self.stem, &self.cfg.rotation)
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(limit) = self.limit() {
            if self.len > 0 && self.len.saturating_add(buf.len() as u64) > limit {
                self.rotate()?;
            }
        }
        let written = self.file.write(buf)?;
        self.len = self.len.saturating_add(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
