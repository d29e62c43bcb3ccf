//! Core traits and types shared by the interpreter and the host that embeds it.
//!
//! The host owns memory and peripherals and exposes them through [`Bus`] and
//! [`IoBus`]. CPUs never own the bus; it is lent to them for each call.

mod bus;
mod cpu;
mod io_bus;
mod ticks;

pub use bus::{Bus, OpenBus, SimpleBus};
pub use cpu::Cpu;
pub use io_bus::IoBus;
pub use ticks::Ticks;
