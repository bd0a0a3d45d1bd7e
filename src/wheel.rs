use std::cmp;

use crate::error::{Result, WheelError};
use crate::id::TimerId;
use crate::iter::Iter;

/// Sentinel value marking an empty slot.
pub const NULL_DEADLINE: i64 = i64::MAX;

/// Default slots-per-spoke a [`Wheel`] starts with when constructed via
/// [`Wheel::new`].
pub const DEFAULT_INITIAL_ALLOCATION: i32 = 16;

fn is_power_of_two(value: i64) -> bool {
    value > 0 && (value & (value - 1)) == 0
}

/// A single-threaded hashed deadline timer wheel.
///
/// Timers are identified by absolute deadlines and expired incrementally as
/// logical time advances via [`Wheel::poll`]. See the crate documentation
/// for the overall model; this type has no internal synchronization and
/// must not be mutated concurrently.
pub struct Wheel {
    start_time: i64,
    tick_resolution: i64,
    resolution_bits: u32,
    ticks_per_wheel: i32,
    tick_mask: i64,
    tick_allocation: i32,
    allocation_bits: u32,
    current_tick: i64,
    poll_index: i32,
    timer_count: i64,
    slots: Vec<i64>,
}

impl Wheel {
    /// Constructs a wheel with the default initial per-spoke allocation
    /// (`16`, see [`DEFAULT_INITIAL_ALLOCATION`]).
    ///
    /// `tick_resolution` and `ticks_per_wheel` must each be a power of two.
    pub fn new(start_time: i64, tick_resolution: i64, ticks_per_wheel: i32) -> Result<Wheel> {
        Wheel::with_initial_allocation(
            start_time,
            tick_resolution,
            ticks_per_wheel,
            DEFAULT_INITIAL_ALLOCATION,
        )
    }

    /// Constructs a wheel with an explicit initial per-spoke allocation.
    ///
    /// All of `tick_resolution`, `ticks_per_wheel`, and
    /// `initial_allocation` must be powers of two, or
    /// [`WheelError::InvalidParameter`] is returned naming the offender.
    pub fn with_initial_allocation(
        start_time: i64,
        tick_resolution: i64,
        ticks_per_wheel: i32,
        initial_allocation: i32,
    ) -> Result<Wheel> {
        if !is_power_of_two(tick_resolution) {
            return Err(WheelError::InvalidParameter {
                name: "tick_resolution",
                value: tick_resolution,
            });
        }
        if !is_power_of_two(ticks_per_wheel as i64) {
            return Err(WheelError::InvalidParameter {
                name: "ticks_per_wheel",
                value: ticks_per_wheel as i64,
            });
        }
        if !is_power_of_two(initial_allocation as i64) {
            return Err(WheelError::InvalidParameter {
                name: "initial_allocation",
                value: initial_allocation as i64,
            });
        }

        let resolution_bits = tick_resolution.trailing_zeros();
        let allocation_bits = (initial_allocation as u32).trailing_zeros();
        let tick_mask = (ticks_per_wheel as i64) - 1;
        let slots = vec![NULL_DEADLINE; (ticks_per_wheel as usize) * (initial_allocation as usize)];

        Ok(Wheel {
            start_time,
            tick_resolution,
            resolution_bits,
            ticks_per_wheel,
            tick_mask,
            tick_allocation: initial_allocation,
            allocation_bits,
            current_tick: 0,
            poll_index: 0,
            timer_count: 0,
            slots,
        })
    }

    #[inline]
    fn slot_address(&self, spoke: i64, slot: i64) -> usize {
        ((spoke << self.allocation_bits) + slot) as usize
    }

    /// Schedules a timer for `deadline` and returns the id to cancel or
    /// look it up by.
    ///
    /// A deadline at or before the current tick is snapped forward so the
    /// timer is visible to the very next [`Wheel::poll`] call (§4.2).
    /// Fails with [`WheelError::CapacityExceeded`] if growing the wheel to
    /// make room would overflow the addressable slot space.
    pub fn schedule(&mut self, deadline: i64) -> Result<TimerId> {
        let deadline_tick = cmp::max(
            (deadline - self.start_time) >> self.resolution_bits,
            self.current_tick,
        );
        let spoke = deadline_tick & self.tick_mask;

        let base = self.slot_address(spoke, 0);
        for slot in 0..self.tick_allocation as i64 {
            let idx = base + slot as usize;
            if self.slots[idx] == NULL_DEADLINE {
                self.slots[idx] = deadline;
                self.timer_count += 1;
                trace!(
                    "scheduled timer; spoke={} slot={} deadline={}",
                    spoke,
                    slot,
                    deadline
                );
                return Ok(TimerId::encode(spoke, slot));
            }
        }

        self.increase_capacity(spoke, deadline)
    }

    /// Doubles `tick_allocation`, migrating every existing timer to the
    /// same relative offset in its spoke so every previously issued
    /// [`TimerId`] keeps decoding to the same timer (§4.3).
    fn increase_capacity(&mut self, spoke: i64, deadline: i64) -> Result<TimerId> {
        let old_allocation = self.tick_allocation;
        let new_allocation_wide = (old_allocation as i64) * 2;

        if (self.ticks_per_wheel as i64) * new_allocation_wide > (i32::MAX as i64) + 1 {
            return Err(WheelError::CapacityExceeded {
                ticks_per_wheel: self.ticks_per_wheel,
                attempted_allocation: new_allocation_wide as i32,
            });
        }
        let new_allocation = new_allocation_wide as i32;

        let mut new_slots =
            vec![NULL_DEADLINE; (self.ticks_per_wheel as usize) * (new_allocation as usize)];
        for i in 0..self.ticks_per_wheel as usize {
            let old_base = i * old_allocation as usize;
            let new_base = i * new_allocation as usize;
            new_slots[new_base..new_base + old_allocation as usize]
                .copy_from_slice(&self.slots[old_base..old_base + old_allocation as usize]);
        }

        let new_slot_index = old_allocation as i64;
        let spoke_base = (spoke as usize) * new_allocation as usize;
        new_slots[spoke_base + old_allocation as usize] = deadline;

        trace!(
            "expanded wheel; old_allocation={} new_allocation={}",
            old_allocation,
            new_allocation
        );

        self.slots = new_slots;
        self.tick_allocation = new_allocation;
        self.allocation_bits = (new_allocation as u32).trailing_zeros();
        self.timer_count += 1;

        Ok(TimerId::encode(spoke, new_slot_index))
    }

    /// Cancels the timer identified by `id`.
    ///
    /// Returns `true` if it was active, `false` if it was already expired,
    /// already cancelled, or never existed. Never fails; O(1).
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let spoke = id.spoke();
        let slot = id.slot();
        if spoke < 0
            || spoke >= self.ticks_per_wheel as i64
            || slot < 0
            || slot >= self.tick_allocation as i64
        {
            return false;
        }

        let idx = self.slot_address(spoke, slot);
        if self.slots[idx] == NULL_DEADLINE {
            return false;
        }

        self.slots[idx] = NULL_DEADLINE;
        self.timer_count -= 1;
        true
    }

    /// Returns the deadline stored for `id`, or [`NULL_DEADLINE`] if `id`
    /// is out of range or its slot is empty.
    pub fn deadline_of(&self, id: TimerId) -> i64 {
        let spoke = id.spoke();
        let slot = id.slot();
        if spoke < 0
            || spoke >= self.ticks_per_wheel as i64
            || slot < 0
            || slot >= self.tick_allocation as i64
        {
            return NULL_DEADLINE;
        }

        self.slots[self.slot_address(spoke, slot)]
    }

    /// Incrementally expires due timers, resuming exactly where the
    /// previous call left off.
    ///
    /// Processes at most `expiry_limit` timers whose callback invocation
    /// returns `true` (consumed). If the callback returns `false`
    /// (rejected), the slot is restored, the scan position advances past
    /// it (§9 open question: that slot is not retried again until the
    /// wheel rotates back to it), and `poll` returns immediately. Returns
    /// the number of timers successfully expired-and-consumed.
    ///
    /// If `now` has advanced so far past the last poll that the wheel
    /// would have to lap itself to catch up, this is treated as a
    /// recoverable fault: a warning is logged, the cursor resyncs to
    /// `now`, and `0` is returned (§4.6 step 2, §7 `SlowPoller`).
    pub fn poll<C, F>(&mut self, now: i64, client: &mut C, expiry_limit: i64, mut callback: F) -> u32
    where
        F: FnMut(&mut C, i64, TimerId) -> bool,
    {
        let target_tick = cmp::max((now - self.start_time) >> self.resolution_bits, self.current_tick);

        let tick_gap = target_tick - self.current_tick;
        if tick_gap > self.ticks_per_wheel as i64 {
            warn!(
                "timer wheel polled too slowly: {} ticks behind ticks_per_wheel={}; resyncing \
                 to now without expiring",
                tick_gap, self.ticks_per_wheel
            );
            self.current_tick = target_tick;
            self.poll_index = 0;
            return 0;
        }

        if self.timer_count == 0 {
            self.current_tick = target_tick;
            self.poll_index = 0;
            return 0;
        }

        let mut expired: u32 = 0;

        while self.current_tick <= target_tick && (expired as i64) < expiry_limit {
            let spoke = self.current_tick & self.tick_mask;
            let base = self.slot_address(spoke, 0);

            let mut slot = self.poll_index;
            while slot < self.tick_allocation {
                if (expired as i64) >= expiry_limit {
                    self.poll_index = slot;
                    return expired;
                }

                let idx = base + slot as usize;
                let d = self.slots[idx];
                if d == NULL_DEADLINE || now < d {
                    slot += 1;
                    continue;
                }

                self.slots[idx] = NULL_DEADLINE;
                self.timer_count -= 1;
                expired += 1;
                let id = TimerId::encode(spoke, slot as i64);
                trace!(
                    "expiring timer; tick={} spoke={} slot={} deadline={}",
                    self.current_tick,
                    spoke,
                    slot,
                    d
                );

                if callback(client, now, id) {
                    slot += 1;
                    continue;
                }

                // Rejected: restore the timer and defer it past this visit
                // to the spoke (see the §9 open question on this tradeoff).
                self.slots[idx] = d;
                self.timer_count += 1;
                expired -= 1;
                self.poll_index = slot + 1;
                trace!("callback rejected timer; deferred; spoke={} slot={}", spoke, slot);
                return expired;
            }

            self.current_tick += 1;
            self.poll_index = 0;
        }

        expired
    }

    /// Returns a lazy, non-restartable iterator over every active
    /// `(deadline, TimerId)` pair in storage-address order, without
    /// expiring anything.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Clears every slot. Does not reset `current_tick` or the start time.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = NULL_DEADLINE;
        }
        self.timer_count = 0;
    }

    /// Rebases the time axis at `start_time`, resetting the tick cursor.
    ///
    /// Fails with [`WheelError::InvalidState`] unless the wheel is empty.
    pub fn reset_start_time(&mut self, start_time: i64) -> Result<()> {
        if self.timer_count > 0 {
            return Err(WheelError::InvalidState {
                timer_count: self.timer_count,
            });
        }
        self.start_time = start_time;
        self.current_tick = 0;
        self.poll_index = 0;
        Ok(())
    }

    /// Moves the tick cursor forward to reflect `now` without firing any
    /// callbacks.
    pub fn advance(&mut self, now: i64) {
        self.current_tick = cmp::max(self.current_tick, (now - self.start_time) >> self.resolution_bits);
        self.poll_index = 0;
    }

    /// Exclusive upper bound (in the wheel's time units) of the tick
    /// `current_tick` currently points at.
    pub fn current_tick_time(&self) -> i64 {
        ((self.current_tick + 1) << self.resolution_bits) + self.start_time
    }

    /// Number of occupied slots.
    pub fn timer_count(&self) -> i64 {
        self.timer_count
    }

    /// Base time units covered by a single tick.
    pub fn tick_resolution(&self) -> i64 {
        self.tick_resolution
    }

    /// Number of spokes.
    pub fn ticks_per_wheel(&self) -> i32 {
        self.ticks_per_wheel
    }

    /// Origin of the time axis.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub(crate) fn slots(&self) -> &[i64] {
        &self.slots
    }

    pub(crate) fn allocation_bits(&self) -> u32 {
        self.allocation_bits
    }

    pub(crate) fn tick_allocation(&self) -> i32 {
        self.tick_allocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_non_power_of_two() {
        assert_eq!(
            Wheel::new(0, 3, 1024).unwrap_err(),
            WheelError::InvalidParameter {
                name: "tick_resolution",
                value: 3
            }
        );
        assert_eq!(
            Wheel::new(0, 1024, 100).unwrap_err(),
            WheelError::InvalidParameter {
                name: "ticks_per_wheel",
                value: 100
            }
        );
        assert_eq!(
            Wheel::with_initial_allocation(0, 1024, 8, 6).unwrap_err(),
            WheelError::InvalidParameter {
                name: "initial_allocation",
                value: 6
            }
        );
    }

    #[test]
    fn schedule_snaps_past_due_deadlines_to_now() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        wheel.advance(100);
        // Deadline 1 is long past `current_tick`, but it must still be
        // visible to the very next poll rather than silently dropped.
        wheel.schedule(1).unwrap();
        let mut fired = 0;
        wheel.poll(101, &mut fired, i64::MAX, |fired, _now, _id| {
            *fired += 1;
            true
        });
        assert_eq!(fired, 1);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        let id = wheel.schedule(5).unwrap();
        assert!(wheel.cancel(id));
        assert!(!wheel.cancel(id));
    }

    #[test]
    fn cancel_unknown_id_is_false_not_panic() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        let bogus = TimerId::encode(0, 0);
        assert!(!wheel.cancel(bogus));
        assert_eq!(wheel.deadline_of(bogus), NULL_DEADLINE);
    }

    #[test]
    fn deadline_of_out_of_range_id_is_null() {
        let wheel = Wheel::new(0, 1, 8).unwrap();
        let bogus = TimerId::encode(1000, 1000);
        assert_eq!(wheel.deadline_of(bogus), NULL_DEADLINE);
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        let id1 = wheel.schedule(1).unwrap();
        let id2 = wheel.schedule(2).unwrap();
        wheel.clear();
        assert_eq!(wheel.timer_count(), 0);
        assert_eq!(wheel.deadline_of(id1), NULL_DEADLINE);
        assert_eq!(wheel.deadline_of(id2), NULL_DEADLINE);
    }

    #[test]
    fn reset_start_time_requires_empty_wheel() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        let _id = wheel.schedule(1).unwrap();
        assert_eq!(
            wheel.reset_start_time(10).unwrap_err(),
            WheelError::InvalidState { timer_count: 1 }
        );
        wheel.clear();
        assert!(wheel.reset_start_time(10).is_ok());
        assert_eq!(wheel.start_time(), 10);
    }

    #[test]
    fn poll_is_resumable_across_calls() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        wheel.schedule(1).unwrap();
        wheel.schedule(1).unwrap();

        let mut fired = Vec::new();
        let expired = wheel.poll(1, &mut fired, 1, |fired, now, id| {
            fired.push((now, id));
            true
        });
        assert_eq!(expired, 1);
        assert_eq!(fired.len(), 1);

        let expired = wheel.poll(1, &mut fired, 1, |fired, now, id| {
            fired.push((now, id));
            true
        });
        assert_eq!(expired, 1);
        assert_eq!(fired.len(), 2);
    }

    #[test]
    fn rejecting_callback_defers_and_is_retried_next_rotation() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        let id = wheel.schedule(1).unwrap();

        let mut calls = 0;
        let expired = wheel.poll(1, &mut calls, i64::MAX, |calls, _now, _id| {
            *calls += 1;
            false
        });
        assert_eq!(expired, 0);
        assert_eq!(calls, 1);
        // Restored, still visible via deadline_of.
        assert_eq!(wheel.deadline_of(id), 1);

        // Not retried again until the wheel rotates back to this spoke.
        let expired = wheel.poll(1, &mut calls, i64::MAX, |calls, _now, _id| {
            *calls += 1;
            true
        });
        assert_eq!(expired, 0);
        assert_eq!(calls, 1);

        let expired = wheel.poll(9, &mut calls, i64::MAX, |calls, _now, _id| {
            *calls += 1;
            true
        });
        assert_eq!(expired, 1);
        assert_eq!(calls, 2);
    }

    #[test]
    fn slow_poll_resyncs_without_expiring() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        wheel.schedule(1).unwrap();

        let mut fired = 0;
        let expired = wheel.poll(100, &mut fired, i64::MAX, |fired, _now, _id| {
            *fired += 1;
            true
        });
        assert_eq!(expired, 0);
        assert_eq!(fired, 0);
        assert_eq!(wheel.timer_count(), 1);
    }

    #[test]
    fn expansion_preserves_every_id() {
        // A coarse resolution puts all five deadlines in the same tick (and
        // therefore the same spoke), so the fifth `schedule` is guaranteed
        // to exhaust the initial per-spoke allocation of 4 and trigger
        // doubling.
        let mut wheel = Wheel::with_initial_allocation(0, 8, 8, 4).unwrap();
        let ids: Vec<_> = (1..=5).map(|d| wheel.schedule(d).unwrap()).collect();

        for (i, id) in ids.iter().enumerate() {
            assert_eq!(wheel.deadline_of(*id), (i + 1) as i64);
        }

        let mut fired = 0;
        let expired = wheel.poll(6, &mut fired, i64::MAX, |fired, _now, _id| {
            *fired += 1;
            true
        });
        assert_eq!(expired, 5);
        assert_eq!(fired, 5);
    }

    #[test]
    fn iterate_does_not_expire() {
        let mut wheel = Wheel::new(0, 1, 8).unwrap();
        wheel.schedule(1).unwrap();
        wheel.schedule(2).unwrap();

        let seen: Vec<_> = wheel.iter().collect();
        assert_eq!(seen.len(), 2);
        assert_eq!(wheel.timer_count(), 2);

        let mut deadlines: Vec<_> = seen.iter().map(|(d, _)| *d).collect();
        deadlines.sort_unstable();
        assert_eq!(deadlines, vec![1, 2]);
    }

    #[test]
    fn current_tick_time_is_exclusive_upper_bound() {
        let wheel = Wheel::new(0, 1024, 1024).unwrap();
        assert_eq!(wheel.current_tick_time(), 1024);
    }
}
