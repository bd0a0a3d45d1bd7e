//! Internal logging shims.
//!
//! Mirrors the crate's optional `log` dependency: with the `log` feature
//! enabled these forward to the real `log` macros, otherwise they compile
//! away to nothing so the wheel never pays for diagnostics callers didn't
//! ask for.

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
