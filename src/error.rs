use std::{error, fmt};

/// Errors surfaced at the wheel's public boundary.
///
/// `CallbackFailure` and the slow-poll recovery (`SlowPoller`) described in
/// the design notes are deliberately not variants here: a callback failure
/// propagates through the callback's own return value or unwind, and a
/// slow poll is a logged, non-fatal resync rather than an error (see
/// [`Wheel::poll`](crate::Wheel::poll)).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WheelError {
    /// A construction parameter that must be a power of two was not.
    InvalidParameter {
        /// Name of the offending parameter (`"tick_resolution"`,
        /// `"ticks_per_wheel"`, or `"initial_allocation"`).
        name: &'static str,
        /// The value that failed the power-of-two check.
        value: i64,
    },
    /// Expansion would grow `ticks_per_wheel * tick_allocation` past the
    /// addressable slot space.
    CapacityExceeded {
        /// `ticks_per_wheel` at the time of the failed expansion.
        ticks_per_wheel: i32,
        /// The `tick_allocation` expansion attempted to install.
        attempted_allocation: i32,
    },
    /// `reset_start_time` was called on a wheel that still has active
    /// timers.
    InvalidState {
        /// Number of timers still active at the time of the call.
        timer_count: i64,
    },
}

/// Result alias for fallible wheel operations.
pub type Result<T> = std::result::Result<T, WheelError>;

impl fmt::Display for WheelError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            WheelError::InvalidParameter { name, value } => {
                write!(fmt, "{} must be a power of two, got {}", name, value)
            }
            WheelError::CapacityExceeded {
                ticks_per_wheel,
                attempted_allocation,
            } => write!(
                fmt,
                "expansion to tick_allocation={} would exceed the addressable \
                 slot space for ticks_per_wheel={}",
                attempted_allocation, ticks_per_wheel
            ),
            WheelError::InvalidState { timer_count } => write!(
                fmt,
                "reset_start_time requires an empty wheel, but {} timers are active",
                timer_count
            ),
        }
    }
}

impl error::Error for WheelError {}
