//! This module provides a built-in logger implementation.
//!
//! The built-in logger implementation uses the `env_logger` crate.  It is enabled by the Cargo
//! feature "builtin_env_logger" which is enabled by default.  When enabled, it will be initialized
//! in [`crate::GcCore::new`] and will show logs of levels INFO or lower (the lower, the more
//! important).
//!
//! This provides convenient out-of-the-box experience for embedders so that they can see logs
//! from the collector without any configuration, and can easily adjust log levels from
//! environment variables. Some embedders may wish to choose a different implementation, or
//! route logs into their own VM's logging framework. In such cases, the embedder can disable the
//! Cargo feature "builtin_env_logger" and register their own implementation with the `log` crate
//! before constructing a `GcCore`.

/// Attempt to init an env_logger for the collector.
/// Does nothing if the "builtin_env_logger" feature is disabled.
pub(crate) fn try_init() {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            let result = env_logger::try_init_from_env(
                // By default, show info level logging.
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            );

            match result {
                Ok(()) => {
                    log::debug!("stopgc initialized the logger.");
                }
                Err(e) => {
                    // Currently `log::SetLoggerError` can only be raised for one reason: the logger has already been initialized.
                    log::debug!("stopgc failed to initialize the built-in env_logger: {e}");
                }
            }
        } else {
            log::debug!("stopgc didn't initialize the built-in env_logger. The Cargo feature \"builtin_env_logger\" is not enabled.");
        }
    }
}
