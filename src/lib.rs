//! A single-threaded hashed deadline timer wheel.
//!
//! This crate is the kind of component found inside event loops, network
//! stacks, and RPC runtimes: a way to schedule tens of thousands of timers
//! identified by absolute deadlines and expire them incrementally as
//! logical time advances, with predictable per-operation cost.
//!
//! The wheel owns one flat array of deadlines, organized as
//! `ticks_per_wheel * tick_allocation` slots. A *spoke* is the column of
//! `tick_allocation` slots addressed by `tick mod ticks_per_wheel`; placing
//! a timer is a linear scan of its spoke for a free slot, and polling walks
//! ticks and slots incrementally, honoring a caller-supplied expiry limit
//! so a single call never does unbounded work.
//!
//! The clock, the callback invoked per expired timer, and any concurrency
//! around the wheel are all the caller's responsibility: [`Wheel`] is not
//! safe to mutate from more than one thread, and [`Wheel::poll`] takes
//! "now" as an argument rather than reading a clock itself.
//!
//! # Examples
//!
//! ```
//! use wheel_timer::Wheel;
//!
//! let mut wheel = Wheel::new(0, 1, 8).unwrap();
//! let id = wheel.schedule(5).unwrap();
//! assert_eq!(wheel.deadline_of(id), 5);
//!
//! let mut expired_ids = Vec::new();
//! let count = wheel.poll(5, &mut expired_ids, i64::MAX, |expired_ids, _now, id| {
//!     expired_ids.push(id);
//!     true // consume
//! });
//! assert_eq!(count, 1);
//! assert_eq!(expired_ids, vec![id]);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod builder;
mod error;
mod id;
mod iter;
mod wheel;

pub use builder::WheelBuilder;
pub use error::{Result, WheelError};
pub use id::TimerId;
pub use iter::Iter;
pub use wheel::{Wheel, DEFAULT_INITIAL_ALLOCATION, NULL_DEADLINE};
