use std::sync::OnceLock;

use uuid::Uuid;

use crate::output::config::{OutputConfig, OutputFormat};

static JSON_MODE: OnceLock<bool> = OnceLock::new();
static RUN_ID: OnceLock<Uuid> = OnceLock::new();

/// Identifier of this invocation, shared by the root log span and the stdout envelope.
pub fn run_id() -> Uuid {
    *RUN_ID.get_or_init(Uuid::new_v4)
}

/// Set once from the global `--json` flag.
pub fn set_json_mode(v: bool) {
    let _ = JSON_MODE.set(v);
}

/// Whether the final plan/result envelope goes to stdout as JSON.
pub fn json_mode() -> bool {
    *JSON_MODE.get().unwrap_or(&false) || OutputConfig::from_env().format == OutputFormat::Json
}

pub fn logs_are_json() -> bool {
    matches!(std::env::var("SUBAUDIT_LOG_FORMAT").as_deref(), Ok("json"))
}

/// Initialize tracing/logging according to RUST_LOG and SUBAUDIT_LOG_FORMAT.
/// - Defaults to `info` if `RUST_LOG` is unset
/// - Supports `SUBAUDIT_LOG_FORMAT=json` for JSON logs (stderr)
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    use tracing_subscriber::prelude::*; // for .with()

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let builder = tracing_subscriber::registry().with(filter);

    match std::env::var("SUBAUDIT_LOG_FORMAT").as_deref() {
        Ok("json") => {
            let _ = builder.with(fmt_layer.json().flatten_event(true)).try_init();
        }
        _ => {
            // human-friendly compact text
            let _ = builder.with(fmt_layer.compact()).try_init();
        }
    }
}
