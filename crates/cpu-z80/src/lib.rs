//! Instruction-stepped Z80 interpreter for console sound CPUs.
//!
//! The host owns memory and peripherals behind an [`emu_core::IoBus`] and
//! runs the CPU for a cycle budget at a time:
//!
//! ```
//! use cpu_z80::{Z80, Z80Config};
//! use emu_core::SimpleBus;
//!
//! let mut cpu = Z80::with_config(Z80Config::with_fast_ram(0x0000, 0x2000))?;
//! cpu.fast_ram_mut().unwrap()[..4].copy_from_slice(&[0x3E, 0x05, 0xC6, 0x0A]);
//!
//! let mut bus = SimpleBus::new();
//! cpu.run(&mut bus, 14)?;
//! assert_eq!(cpu.regs().a, 15);
//! # Ok::<(), cpu_z80::Z80Error>(())
//! ```
//!
//! Instruction bytes come from the [`FetchMap`], never from the bus. Pages
//! with nothing mapped read as HALT.

mod alu;
mod config;
mod cpu;
mod error;
pub mod flags;
mod fetch;
mod interrupt;
mod odometer;
mod registers;
pub mod timing;

pub use config::{DEFAULT_UNMAPPED_FILL, FastRamWindow, RefreshMode, Z80Config};
pub use cpu::{RunOutcome, StepResult, Z80};
pub use error::Z80Error;
pub use fetch::{FetchMap, RegionId};
pub use interrupt::{IM1_VECTOR, IntLine, InterruptState, NMI_VECTOR};
pub use odometer::Odometer;
pub use registers::{Reg, RegisterFile, RunStatus};
