mod rolling_file;
mod rotation;

use crate::config::{LogLevel, LoggingConfig, LoggingOutput};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::MakeWriter;

pub use rolling_file::RollingFileWriter;
pub use rotation::{parse_rotated_file_name, prune_rotated_logs, rotated_file_name, RotatedLog};

/// Keeps the non-blocking file writer flushing; hold it for the process lifetime.
#[derive(Debug)]
pub struct LoggingGuard {
    _worker: Option<tracing_appender::non_blocking::WorkerGuard>,
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

fn install<W>(
    cfg: &LoggingConfig,
    writer: W,
    ansi: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level_filter(cfg.level))
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_file(cfg.include_source)
        .with_line_number(cfg.include_source)
        .with_ansi(ansi)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

pub fn init_logging(
    cfg: &LoggingConfig,
) -> Result<LoggingGuard, Box<dyn std::error::Error + Send + Sync>> {
    match cfg.output {
        LoggingOutput::Stdout => {
            install(cfg, std::io::stdout, true)?;
            Ok(LoggingGuard { _worker: None })
        }
        LoggingOutput::Stderr => {
            install(cfg, std::io::stderr, true)?;
            Ok(LoggingGuard { _worker: None })
        }
        LoggingOutput::File => {
            let writer = RollingFileWriter::open(cfg.file.clone())?;
            let (non_blocking, guard) = tracing_appender::non_blocking(writer);
            install(cfg, non_blocking, false)?;
            Ok(LoggingGuard {
                _worker: Some(guard),
            })
        }
    }
}
