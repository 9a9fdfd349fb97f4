//! Logger setup.

use log::LevelFilter;

use crate::config::{invalid, ConfigError};

/// Parses a log level name, case-insensitively. `critical` and `fatal` mean
/// `error`; `warning` means `warn`.
pub fn parse_level(name: &str) -> Result<LevelFilter, ConfigError> {
    let normalized = name.trim().to_ascii_lowercase();
    let canonical = match normalized.as_str() {
        "critical" | "fatal" => "error",
        "warning" => "warn",
        other => other,
    };
    canonical.parse().map_err(|_| {
        invalid(
            "log_level",
            format!("unknown level `{name}` (expected off, error, warn, info, debug or trace)"),
        )
    })
}

/// Installs the global logger at `level`. `RUST_LOG`, when set, takes
/// precedence. Later calls are no-ops.
pub fn init(level: LevelFilter) {
    let installed = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init()
        .is_ok();
    if installed {
        log::debug!("logging at {level}");
    }
}
