//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honors `RUST_LOG`; defaults to `info` for this crate when unset.
pub fn init() {
    builder().init();
}

/// Initialize logging, ignoring a logger that is already installed
///
/// Hosts that embed the engine next to their own logger, and tests, call this.
pub fn try_init() -> bool {
    builder().is_test(cfg!(test)).try_init().is_ok()
}

fn builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_module("glaze_engine", log::LevelFilter::Info);
    builder.parse_default_env();
    builder
}
