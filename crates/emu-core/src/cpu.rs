//! CPU core trait.

use crate::{IoBus, Ticks};

/// A CPU core driven by a cycle budget.
///
/// A host scheduler interleaves chips by handing each a number of cycles and
/// letting it run that long. The bus is passed in, not owned, so the same
/// memory map can be lent to the other components between calls.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Failure from [`Cpu::run`].
    type Error;

    /// Execute whole instructions until `cycles` have been consumed.
    ///
    /// Returns the cycles actually consumed by this call. An instruction
    /// that starts inside the budget always completes, so the result may
    /// overshoot, even past `u32::MAX`; implementations carry the difference
    /// into the next call.
    fn run<B: IoBus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> Result<u64, Self::Error>;

    /// Returns the current program counter.
    ///
    /// Returns `u32` so 24- and 32-bit cores fit the same trait. Narrower
    /// CPUs zero-extend.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Assert the maskable interrupt line with the byte the interrupting
    /// device would place on the data bus.
    fn interrupt(&mut self, vector: u8);

    /// Lower the maskable interrupt line if the CPU has not yet taken it.
    fn clear_interrupt(&mut self);

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);

    /// Cycles counted since the last reset or counter clear.
    fn elapsed(&self) -> Ticks;
}
