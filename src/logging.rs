//! Structured logging setup.
//!
//! Filter precedence: `RUST_LOG`, then `-v` flags, then `[logging].level`.
//! Events go to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Map a `-v` count to a filter directive. Zero defers to the config.
fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Pick the filter directive used when `RUST_LOG` is unset.
pub fn default_directive(verbose: u8, logging: Option<&LoggingConfig>) -> String {
    match (verbosity_level(verbose), logging) {
        (Some(level), _) => level.to_string(),
        (None, Some(cfg)) => cfg.level.clone(),
        (None, None) => "info".to_string(),
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(verbose: u8, logging: Option<&LoggingConfig>) {
    let directive = default_directive(verbose, logging);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_overrides_config() {
        let cfg = LoggingConfig {
            level: "warn".into(),
        };
        assert_eq!(default_directive(0, Some(&cfg)), "warn");
        assert_eq!(default_directive(1, Some(&cfg)), "info");
        assert_eq!(default_directive(2, Some(&cfg)), "debug");
        assert_eq!(default_directive(5, None), "trace");
        assert_eq!(default_directive(0, None), "info");
    }
}
