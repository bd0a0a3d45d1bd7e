use crate::error::Result;
use crate::wheel::{Wheel, DEFAULT_INITIAL_ALLOCATION};

/// Builds a [`Wheel`] from construction-time parameters, mirroring the
/// chained-setter `Builder` pattern.
///
/// ```
/// use wheel_timer::WheelBuilder;
///
/// let wheel = WheelBuilder::new()
///     .start_time(0)
///     .tick_resolution(1024)
///     .ticks_per_wheel(512)
///     .initial_allocation(32)
///     .build()
///     .unwrap();
/// assert_eq!(wheel.ticks_per_wheel(), 512);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct WheelBuilder {
    start_time: i64,
    tick_resolution: i64,
    ticks_per_wheel: i32,
    initial_allocation: i32,
}

impl WheelBuilder {
    /// Starts from the defaults: `start_time = 0`, `tick_resolution = 1`,
    /// `ticks_per_wheel = 512`, `initial_allocation = 16`.
    pub fn new() -> WheelBuilder {
        WheelBuilder::default()
    }

    /// Sets the origin of the time axis. Defaults to `0`.
    pub fn start_time(mut self, start_time: i64) -> WheelBuilder {
        self.start_time = start_time;
        self
    }

    /// Sets the time units covered by a single tick. Must be a power of
    /// two, checked at [`build`](WheelBuilder::build) time.
    pub fn tick_resolution(mut self, tick_resolution: i64) -> WheelBuilder {
        self.tick_resolution = tick_resolution;
        self
    }

    /// Sets the number of spokes. Must be a power of two, checked at
    /// [`build`](WheelBuilder::build) time.
    pub fn ticks_per_wheel(mut self, ticks_per_wheel: i32) -> WheelBuilder {
        self.ticks_per_wheel = ticks_per_wheel;
        self
    }

    /// Sets the initial slots-per-spoke the wheel starts with before any
    /// expansion. Must be a power of two, checked at
    /// [`build`](WheelBuilder::build) time.
    pub fn initial_allocation(mut self, initial_allocation: i32) -> WheelBuilder {
        self.initial_allocation = initial_allocation;
        self
    }

    /// Validates the accumulated parameters and constructs the wheel.
    pub fn build(self) -> Result<Wheel> {
        Wheel::with_initial_allocation(
            self.start_time,
            self.tick_resolution,
            self.ticks_per_wheel,
            self.initial_allocation,
        )
    }
}

impl Default for WheelBuilder {
    fn default() -> WheelBuilder {
        WheelBuilder {
            start_time: 0,
            tick_resolution: 1,
            ticks_per_wheel: 512,
            initial_allocation: DEFAULT_INITIAL_ALLOCATION,
        }
    }
}
