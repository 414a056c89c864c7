//! Tracing setup shared by every Curator entry point.
//!
//! Events are written to stderr; stdout belongs to command output. The text
//! and JSON formatters are mutually exclusive and selected at startup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber.
///
/// `log_level` takes any `EnvFilter` directive (`debug`,
/// `curator_knowledge=trace,warn`). Without it `RUST_LOG` is used, then
/// `info`. Color is also disabled when `NO_COLOR` is set.
///
/// ```no_run
/// curator_core::logging::init_logging(Some("debug"), false, false)?;
/// # Ok::<(), curator_core::AppError>(())
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, json: bool) -> AppResult<()> {
    let filter = resolve_filter(log_level, std::env::var("RUST_LOG").ok().as_deref())?;
    let ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    // `Option<Layer>` is itself a layer, so exactly one formatter is active
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(false)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(ansi)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Pick the first directive source that is set and parse it.
fn resolve_filter(explicit: Option<&str>, env: Option<&str>) -> AppResult<EnvFilter> {
    let directive = explicit
        .or(env)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVE);

    EnvFilter::try_new(directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level_wins_over_env() {
        let filter = resolve_filter(Some("debug"), Some("error")).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_env_then_default() {
        let filter = resolve_filter(None, Some("curator_knowledge=trace")).unwrap();
        assert_eq!(filter.to_string(), "curator_knowledge=trace");

        let filter = resolve_filter(None, Some("  ")).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_bad_directive_is_config_error() {
        let err = resolve_filter(Some("curator=notalevel"), None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
