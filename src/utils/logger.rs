//! log4rs configuration for hosts embedding the data layer.
//!
//! Everything in this crate logs through the `log` facade. These helpers install a log4rs
//! configuration with rolling files:
//! - `app.log`: root logger
//! - `errors.log`: normalized failures (target `racedata::errors`)
//! - `dev.log`: developer trace events (target `racedata::dev`), only when enabled

use crate::errors::{DataError, Result};
use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_BYTES: u64 = 10 * 1024 * 1024;

pub const ERRORS_TARGET: &str = "racedata::errors";

/// Initializes logging from a log4rs YAML file.
pub fn init_path(path: &Path) -> Result<()> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())
        .map_err(|e| DataError::Config(format!("log4rs init from {}: {e}", path.display())))
}

#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)
        .map_err(|e| DataError::Config(format!("log roller for {stem}: {e}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_BYTES)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))
        .map_err(|e| DataError::Config(format!("log appender for {stem}: {e}")))
}

/// Configure logging for the process.
/// - `dir`: base directory for log files; current directory when `None`
/// - `level`: error|warn|info|debug|trace
/// - `retention`: number of rolled files kept per log (default 7)
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<()> {
    configure_logging_with_dev(dir, level, retention, false)
}

/// Like [`configure_logging`], additionally routing `dev_trace!` events to `dev.log`.
pub fn configure_logging_with_dev(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
    enable_dev: bool,
) -> Result<()> {
    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    std::fs::create_dir_all(&base)?;
    let keep = u32::try_from(retention.unwrap_or(7)).unwrap_or(u32::MAX);
    let lvl = parse_level(level);

    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("errors", Box::new(rolling(&base, "errors", keep)?)))
        .logger(Logger::builder().appender("errors").appender("app").additive(false).build(ERRORS_TARGET, lvl));

    builder = if enable_dev {
        builder
            .appender(Appender::builder().build("dev", Box::new(rolling(&base, "dev", keep)?)))
            .logger(
                Logger::builder()
                    .appender("dev")
                    .additive(false)
                    .build(crate::utils::devlog::DEV_TARGET, LevelFilter::Trace),
            )
    } else {
        builder.logger(
            Logger::builder().additive(false).build(crate::utils::devlog::DEV_TARGET, LevelFilter::Off),
        )
    };

    let config = builder
        .build(Root::builder().appender("app").build(lvl))
        .map_err(|e| DataError::Config(format!("log4rs config: {e}")))?;
    log4rs::init_config(config).map_err(|e| DataError::Config(format!("log4rs init: {e}")))?;
    Ok(())
}

/// Configure logging from the `[logging]` section of the portal config.
pub fn configure_from_config(cfg: &crate::config::LoggingConfig) -> Result<()> {
    configure_logging_with_dev(
        cfg.dir.as_deref(),
        Some(cfg.level.as_str()),
        Some(cfg.retention),
        cfg.dev_trace,
    )
}

/// Configure logging from environment variables if present:
/// - RACEDATA_LOG_DIR
/// - RACEDATA_LOG_LEVEL
/// - RACEDATA_LOG_RETENTION
/// - RACEDATA_DEV_TRACE (1|true|yes)
pub fn configure_from_env() -> Result<()> {
    let dir = std::env::var("RACEDATA_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("RACEDATA_LOG_LEVEL").ok();
    let retention =
        std::env::var("RACEDATA_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    let dev = std::env::var("RACEDATA_DEV_TRACE")
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    configure_logging_with_dev(dir.as_deref(), level.as_deref(), retention, dev)
}
