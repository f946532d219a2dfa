//! Logging shims: forward to `tracing` with the `with-tracing` feature,
//! expand to nothing otherwise.

macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "with-tracing")]
        {
            tracing::trace!($($arg)*);
        }
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "with-tracing")]
        {
            tracing::debug!($($arg)*);
        }
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "with-tracing")]
        {
            tracing::warn!($($arg)*);
        }
    }};
}
