//! Tracing setup for the `medbench` binary.
//!
//! Logs always go to stderr. Stdout belongs to command output such as the
//! `result ls` table, so it stays parseable with or without `--json`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested verbosity.
const MEDBENCH_TARGETS: &[&str] = &["medbench", "medbench_core", "medbench_exec"];

/// Filter used when `RUST_LOG` is unset: `level` for MedBench crates,
/// `warn` for dependencies such as the HTTP client.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        MEDBENCH_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level.as_str().to_lowercase())),
    );
    directives.join(",")
}

/// Install the global subscriber. `json` switches to newline-delimited JSON.
///
/// `RUST_LOG` overrides the default filter. Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
