//! Errors reported by the interpreter.

use crate::fetch::RegionId;
use crate::registers::Reg;

/// Everything the interpreter can refuse to do.
///
/// None of these are fatal. Budget exhaustion is not an error at all; see
/// [`crate::RunOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Z80Error {
    /// Register access attempted while the CPU is running.
    #[error("register file is busy while the CPU is running")]
    Busy,

    /// `run` or `step` on a faulted CPU.
    #[error("CPU is faulted; clear the fault or hard reset")]
    Faulted,

    /// `run` found the CPU already running. The CPU is now faulted.
    #[error("run entered while the CPU was already running")]
    Reentered,

    #[error("value {value:#06x} does not fit in register {reg:?}")]
    ValueOutOfRange { reg: Reg, value: u16 },

    #[error("page range {first:#04x}..={last:#04x} is inverted")]
    InvalidPageRange { first: u8, last: u8 },

    #[error("no fetch region with id {0:?}")]
    UnknownRegion(RegionId),

    #[error("offset {offset:#x} is outside a region of {len:#x} bytes")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("fast RAM window {base:#06x}+{size:#x} must be page aligned, non-empty and inside 64 KiB")]
    InvalidFastRam { base: u16, size: usize },
}
