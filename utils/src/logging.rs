// Category-based logging infrastructure
//
// This will be used from multiple threads, so it needs
// to be stateless apart from the level filter, which is
// a single atomic read from the environment once.
//
// Austin Shafer - 2020
use std::sync::atomic::{AtomicU32, Ordering};

#[allow(dead_code, non_camel_case_types)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LogLevel {
    // in order of highest priority
    critical, // Urgent and must always be displayed
    error,
    debug,     // debugging related, not verbose
    info,      // more verbose
    profiling, // profiling related timing
}

impl LogLevel {
    pub fn get_name(&self) -> &'static str {
        match self {
            LogLevel::critical => "critical",
            LogLevel::error => "error",
            LogLevel::debug => "debug",
            LogLevel::info => "info",
            LogLevel::profiling => "profiling",
        }
    }

    pub fn get_level(&self) -> u32 {
        match self {
            LogLevel::critical => 0,
            LogLevel::error => 1,
            LogLevel::debug => 2,
            LogLevel::info => 3,
            LogLevel::profiling => 4,
        }
    }

    /// Parse one of the level names. Unknown names give None.
    pub fn from_name(name: &str) -> Option<LogLevel> {
        match name.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(LogLevel::critical),
            "error" => Some(LogLevel::error),
            "debug" => Some(LogLevel::debug),
            "info" => Some(LogLevel::info),
            "profiling" => Some(LogLevel::profiling),
            _ => None,
        }
    }
}

/// The env var holding the name of the most verbose level to print
pub const LOG_LEVEL_VAR: &str = "WAYLANDDRV_LOG";

lazy_static::lazy_static! {
    static ref LOG_LEVEL: AtomicU32 = AtomicU32::new(
        std::env::var(LOG_LEVEL_VAR)
            .ok()
            .and_then(|name| LogLevel::from_name(&name))
            .unwrap_or(LogLevel::error)
            .get_level()
    );
}

/// Is `level` at or above the current filter
pub fn is_enabled(level: LogLevel) -> bool {
    level.get_level() <= LOG_LEVEL.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! log_internal {
    ($loglevel:expr, $($format_args:tt)+) => ({
        let level = $loglevel;
        if $crate::logging::is_enabled(level) {
            println!("[{:?}]<{}> {}:{} - {}",
                     $crate::timing::get_current_millis(),
                     level.get_name(),
                     file!(),
                     line!(),
                     format!($($format_args)+)
            );
        }
    })
}

#[macro_export]
macro_rules! critical {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::critical, $($format_args)+)
    })
}

#[macro_export]
macro_rules! error {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::error, $($format_args)+)
    })
}

#[macro_export]
macro_rules! debug {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::debug, $($format_args)+)
    })
}

#[macro_export]
macro_rules! info {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::info, $($format_args)+)
    })
}

#[macro_export]
macro_rules! profiling {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::profiling, $($format_args)+)
    })
}
