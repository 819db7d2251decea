//! Tracing subscriber initialization.
//!
//! Log verbosity is driven by `RUST_LOG`; production gets JSON output for
//! log shippers, everything else gets human-readable output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn init_telemetry(environment: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mediabroker=debug,tower_http=debug,info"));

    let is_production =
        environment.eq_ignore_ascii_case("production") || environment.eq_ignore_ascii_case("prod");

    if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
