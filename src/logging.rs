//! Subscriber setup for hosts that embed the interpreter.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `debug` or `info`. Calling it again after a subscriber is installed is a
/// no-op.
pub fn init_logging(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(true);
        init_logging(false);
        tracing::debug!("still logging");
    }
}
