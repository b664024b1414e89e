//! Logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! The tracker emits dozens of keypoint frames per second, so the noisy
//! modules (classifier, aggregator) keep their chatter behind a switch while
//! lifecycle transitions always go straight through `log`.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_warn};
//!
//! log_warn!("rep index regressed from {} to {}", 4, 1);
//! ```

/// Warn-level log, emitted only when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Debug-level log for per-frame detail.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}
