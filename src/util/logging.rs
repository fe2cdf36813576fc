//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events and spans; binaries and tests that
//! want to see them call [`init`] once. The filter is read from `NERFPACK_LOG`
//! (same syntax as `RUST_LOG`) and defaults to `info`.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "NERFPACK_LOG";

/// Guard returned by [`init`]; flushes the chrome trace (if any) on drop.
pub struct LogGuard {
    #[cfg(feature = "chrome-trace")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Install a global fmt subscriber.
///
/// Safe to call more than once; later calls are no-ops. With the
/// `chrome-trace` feature and `NERFPACK_TRACE=1`, spans are also written to
/// `trace.json` for chrome://tracing.
pub fn init() -> LogGuard {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false);

    #[cfg(feature = "chrome-trace")]
    {
        if std::env::var("NERFPACK_TRACE").ok().as_deref() == Some("1") {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file("trace.json")
                .build();
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(chrome_layer);
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                return LogGuard { _chrome: None };
            }
            return LogGuard { _chrome: Some(guard) };
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    // Already installed by an earlier call or by the host application.
    let _ = tracing::subscriber::set_global_default(subscriber);

    LogGuard {
        #[cfg(feature = "chrome-trace")]
        _chrome: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _a = init();
        let _b = init();
        tracing::debug!("logging initialized twice");
    }
}
