//! Cycle budget bookkeeping.
//!
//! Instructions always run to completion, so the last instruction of a
//! `run` can overshoot the budget. The overshoot is kept as debt and taken
//! out of the next budget, which keeps the CPU's cumulative cycle count in
//! step with the cumulative budget the host has handed out.

use emu_core::Ticks;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Odometer {
    total: Ticks,
    debt: u64,
    remaining: i64,
}

impl Odometer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cycles executed (plus any charged with [`Odometer::charge`]) since
    /// the last clear.
    #[must_use]
    pub const fn read(&self) -> Ticks {
        self.total
    }

    /// Zero the cumulative count. Carried debt is unaffected.
    pub fn clear(&mut self) {
        self.total = Ticks::ZERO;
    }

    /// Cycles owed to the next `run` after an overshoot or a charge.
    #[must_use]
    pub const fn debt(&self) -> u64 {
        self.debt
    }

    /// Budget left in the current (or last) `run`. Zero or negative once
    /// the run has finished.
    #[must_use]
    pub const fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Count `cycles` the CPU spent stalled outside `run` (bus hold, DMA).
    /// They are taken out of the next budget.
    pub fn charge(&mut self, cycles: u32) {
        self.total += Ticks::from(cycles);
        self.debt += u64::from(cycles);
    }

    /// Start a run of `budget` cycles. Returns the budget left after paying
    /// off debt, or `None` when the debt covers all of it.
    pub(crate) fn begin(&mut self, budget: u32) -> Option<i64> {
        let budget = u64::from(budget);
        if budget <= self.debt {
            self.debt -= budget;
            self.remaining = 0;
            return None;
        }
        self.remaining = (budget - self.debt) as i64;
        self.debt = 0;
        Some(self.remaining)
    }

    /// Record an executed instruction.
    pub(crate) fn advance(&mut self, cycles: u64) {
        self.total += Ticks::new(cycles);
    }

    /// Finish a run with whatever budget the loop left over.
    pub(crate) fn end(&mut self, remaining: i64) {
        self.remaining = remaining;
        self.debt = remaining.min(0).unsigned_abs();
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
