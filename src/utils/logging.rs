//! Logging macros that can be silenced per module.
//!
//! A module opts in by declaring `const ENABLE_LOGS: bool` and then calling
//! `log_info!`, `log_warn!`, `log_error!` or `log_debug!` like the `log`
//! macros they forward to:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::log_info;
//!
//! log_info!("Loaded session {}", session_id);
//! ```
//!
//! With the flag off the calls compile to nothing observable, whatever
//! `RUST_LOG` says.

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
