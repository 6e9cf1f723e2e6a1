//! Logger setup.
//!
//! The crate logs through the `log` facade and installs `env_logger` as the
//! backend once at startup. `RUST_LOG` overrides the filter chosen here.

use crate::config::Config;

/// Default filter: graphics backends stay at warn, this crate at info or debug.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "warn,deferred_ngin=debug"
    } else {
        "warn,deferred_ngin=info"
    }
}

/// Install the logger. A logger that is already installed is left in place.
pub fn init(config: &Config) {
    let env = env_logger::Env::default().default_filter_or(default_filter(config.debug));
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }
    log::debug!("Debug logging enabled");
}
