//! Log-level selection for the `log` facade.
//!
//! The crate never installs a logger itself; the host application does. This
//! module only maps `AZURE_LOG_LEVEL` onto the facade's max level.

use log::LevelFilter;

pub const ENV_LOG_LEVEL: &str = "AZURE_LOG_LEVEL";

/// Parse a level name (`TRACE`, `DEBUG`, `INFO`, `WARNING`/`WARN`, `ERROR`, `OFF`).
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::Trace),
        "DEBUG" => Some(LevelFilter::Debug),
        "INFO" => Some(LevelFilter::Info),
        "WARN" | "WARNING" => Some(LevelFilter::Warn),
        "ERROR" | "CRITICAL" => Some(LevelFilter::Error),
        "OFF" | "NONE" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Level from `AZURE_LOG_LEVEL`, defaulting to `INFO`.
pub fn level_from_env() -> LevelFilter {
    std::env::var(ENV_LOG_LEVEL)
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(LevelFilter::Info)
}

/// Apply [`level_from_env`] to the global `log` max level.
pub fn apply_env_level() -> LevelFilter {
    let level = level_from_env();
    log::set_max_level(level);
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("WARNING"), Some(LevelFilter::Warn));
        assert_eq!(parse_level(" info "), Some(LevelFilter::Info));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
    }

    #[test]
    fn unknown_level_is_none() {
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }
}
