//! Tracing setup for the binary.
//!
//! Logs go to stderr so they never interleave with the report on stdout.
//! `RUST_LOG`, when set, is appended to the level given on the command line.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEVEL: &str = "warn";

/// Builds the effective filter for `level` merged with `RUST_LOG`.
pub fn env_filter(level: &str) -> EnvFilter {
    let level = level.trim();
    let env_directives = std::env::var("RUST_LOG")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty());

    let base = || EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    match env_directives {
        Some(env_directives) => EnvFilter::try_new(format!("{level},{env_directives}"))
            .or_else(|_| EnvFilter::try_new(env_directives))
            .unwrap_or_else(|_| base()),
        None => base(),
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_logging(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back() {
        // Must not panic on garbage input.
        let _ = env_filter("not a [valid directive");
        let _ = env_filter("debug");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging("info");
        init_logging("debug");
    }
}
