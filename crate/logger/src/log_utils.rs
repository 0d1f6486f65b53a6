use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static LOG_INIT: Once = Once::new();

/// Default filter when neither `RUST_LOG` nor the caller supplies one
const DEFAULT_FILTER: &str = "info";

/// Install the global tracing subscriber, once per process.
///
/// `RUST_LOG` takes precedence over `default_value`; later calls are no-ops,
/// so every test may call it.
pub fn log_init(default_value: Option<&str>) {
    LOG_INIT.call_once(|| {
        if std::env::var("RUST_BACKTRACE").is_err() {
            // SAFETY: runs once, before any thread of ours reads the environment
            unsafe {
                std::env::set_var("RUST_BACKTRACE", "1");
            }
        }

        if std::env::var("RUST_LOG").is_err() {
            // SAFETY: as above
            unsafe {
                std::env::set_var("RUST_LOG", default_value.unwrap_or(DEFAULT_FILTER));
            }
        }

        tracing_setup();
    });
}

fn tracing_setup() {
    let format = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .compact();

    let (filter, _reload_handle) =
        tracing_subscriber::reload::Layer::new(EnvFilter::from_default_env());

    // another subscriber may already be installed, e.g. by a test harness
    if tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init()
        .is_ok()
    {
        debug!("tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::log_init;

    #[test]
    fn test_log_init_is_idempotent() {
        log_init(Some("debug"));
        log_init(None);
        tracing::info!("logging twice initialized once");
    }
}
