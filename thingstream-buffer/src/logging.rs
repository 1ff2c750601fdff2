// Conditional logging shim: uses `tracing` when enabled, falls back to a no-op

#[cfg(feature = "tracing")]
pub(crate) use tracing::debug;

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {{
        if false {
            eprintln!($($arg)*);
        }
    }};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug;
