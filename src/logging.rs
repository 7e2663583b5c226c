use tracing::Level;

use crate::error::{AppError, AppResult};

/// Parse a log level name (`error`, `warn`, `info`, `debug`, `trace`).
pub fn parse_level(level: &str) -> AppResult<Level> {
    level.trim().parse::<Level>().map_err(|_| {
        AppError::Configuration(format!(
            "Unknown log level '{}', expected one of error, warn, info, debug, trace",
            level
        ))
    })
}

/// Install the global fmt subscriber writing to stderr.
///
/// Calling it again after a subscriber has been installed is a no-op.
pub fn init_logging(level: &str) -> AppResult<()> {
    let level = parse_level(level)?;
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), Level::WARN);
        assert!(matches!(parse_level("loud"), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        assert!(init_logging("info").is_ok());
        assert!(init_logging("trace").is_ok());
        assert!(init_logging("nope").is_err());
    }
}
