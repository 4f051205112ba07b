//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! The scan loop runs once per discovery event, so its chatter can be
//! switched off per module without touching `RUST_LOG`:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("scan started");
//! ```

/// Forward to the `log` macro named by `$level` when the calling module's
/// `ENABLE_LOGS` is true.
#[doc(hidden)]
#[macro_export]
macro_rules! log_gated {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log_gated!(info, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log_gated!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log_gated!(error, $($arg)*) };
}

/// Per-event detail such as dropped frames and filter rejections.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log_gated!(debug, $($arg)*) };
}
