//! Process initialization for the microbatch binary.
//!
//! Parses CLI flags (`--config`, `--max-weight`, `--max-quiet-ms`), loads the
//! YAML config, installs logging and derives the runner options.

use crate::config::{AppConfig, MetricsConfig};
use crate::logging::LoggingGuard;
use crate::runner::RunnerOptions;
use std::time::Duration;

/// Result of the default initialization process.
pub struct BootstrapResult {
    /// Runner options derived from config and CLI.
    pub options: RunnerOptions,
    pub metrics: MetricsConfig,
    /// Logging guard that must be kept alive for the lifetime of the application.
    pub logging_guard: LoggingGuard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliFlags {
    pub config_path: Option<String>,
    pub max_weight: Option<usize>,
    pub max_quiet_ms: Option<u64>,
}

impl CliFlags {
    pub fn parse() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::parse_from(std::env::args().skip(1))
    }

    pub fn parse_from(
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut flags = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    flags.config_path = Some(flag_value(&arg, args.next())?);
                }
                "--max-weight" => {
                    let raw = flag_value(&arg, args.next())?;
                    flags.max_weight = Some(
                        raw.parse::<usize>()
                            .map_err(|err| format!("invalid --max-weight {raw}: {err}"))?,
                    );
                }
                "--max-quiet-ms" => {
                    let raw = flag_value(&arg, args.next())?;
                    flags.max_quiet_ms = Some(
                        raw.parse::<u64>()
                            .map_err(|err| format!("invalid --max-quiet-ms {raw}: {err}"))?,
                    );
                }
                other => return Err(format!("unknown argument: {other}").into()),
            }
        }
        Ok(flags)
    }

    pub fn apply_to_runner_options(&self, opts: &mut RunnerOptions) {
        if let Some(max_weight) = self.max_weight {
            opts.batcher.max_weight = max_weight;
        }
        if let Some(ms) = self.max_quiet_ms {
            opts.batcher.max_quiet_period = Duration::from_millis(ms);
        }
    }
}

fn flag_value(
    flag: &str,
    value: Option<String>,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    value.ok_or_else(|| format!("missing value for {flag}").into())
}

/// Perform default initialization: parse CLI, load config, init logging.
pub fn default_init() -> Result<BootstrapResult, Box<dyn std::error::Error + Send + Sync>> {
    let cli_flags = CliFlags::parse()?;
    let config = match cli_flags.config_path.as_deref() {
        Some(path) => AppConfig::load_required(path)?,
        None => AppConfig::default(),
    };

    let logging_guard = crate::logging::init_logging(&config.logging)?;
    if let Some(path) = cli_flags.config_path.as_deref() {
        tracing::info!(config_path = path, "loaded config");
    }
    tracing::info!(
        git_sha = build_info::git_sha(),
        git_tag = build_info::git_tag(),
        version = env!("CARGO_PKG_VERSION"),
        "build info"
    );

    let mut options = config.to_runner_options();
    cli_flags.apply_to_runner_options(&mut options);

    Ok(BootstrapResult {
        options,
        metrics: config.metrics,
        logging_guard,
    })
}
