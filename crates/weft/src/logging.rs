//! Logging utilities.
//!
//! Only available with the `logging` feature. weft itself follows the
//! library pattern - it emits `tracing` events and never installs a
//! subscriber - so embedding applications either install their own or
//! call one of these convenience initializers.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Install a compact global subscriber with the given filter directives
/// (e.g. `"info"` or `"weft=debug"`).
///
/// Safe to call from multiple threads; only the first call per process
/// takes effect.
pub fn init_logging(directives: &str) {
    let filter = EnvFilter::new(directives);
    init_with(filter);
}

/// Install a compact global subscriber filtered by `RUST_LOG`, falling
/// back to `info`.
pub fn init_logging_from_env() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    init_with(filter);
}

fn init_with(filter: EnvFilter) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).without_time())
            .init();
    });
}
