//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system with a default filter such as `"info"` or
/// `"quest_engine=debug"`; `RUST_LOG` still takes precedence when set.
///
/// Safe to call more than once, later calls are ignored.
pub fn init_with_level(filter: &str) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filter);
    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_filter);
    }
    let _ = builder.try_init();
}

/// Logger for tests; output is captured by the test harness
#[cfg(test)]
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
