//! Diagnostic logging to stderr.
//!
//! Stdout carries command output; logs go to stderr so they can be piped
//! separately. The filter defaults to `warn` and is taken from `--log` or
//! `SVMGOLD_LOG`, in `EnvFilter` syntax (`svmgold_harness=debug,info`).

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Later calls are ignored so tests can run
/// several commands in one process.
pub fn init(filter: &str, json: bool) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
