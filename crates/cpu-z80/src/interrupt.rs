//! Interrupt lines and acknowledgment.
//!
//! Requests are latched whenever the host raises them and sampled only at
//! instruction boundaries. NMI wins over INT. A request is consumed when it
//! is acknowledged.

use bitflags::bitflags;
use emu_core::IoBus;
use tracing::trace;

use crate::cpu::{StepResult, Z80};
use crate::timing;

bitflags! {
    /// Pending interrupt requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct IntLine: u8 {
        /// Maskable interrupt requested.
        const INT = 0b01;
        /// Non-maskable interrupt requested.
        const NMI = 0b10;
    }
}

/// Fixed NMI target.
pub const NMI_VECTOR: u16 = 0x0066;
/// IM 1 target.
pub const IM1_VECTOR: u16 = 0x0038;

/// What the controller will do at the next instruction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptState {
    /// Nothing pending.
    Idle,
    /// An NMI is pending and will be taken.
    NmiPending,
    /// An INT is pending. It is taken only once IFF1 is set and any EI
    /// shadow has passed.
    IntPending,
}

impl Z80 {
    /// Latch a non-maskable interrupt.
    pub fn raise_nmi(&mut self) {
        self.regs.int_line.insert(IntLine::NMI);
    }

    /// Latch a maskable interrupt with the byte the device drives onto the
    /// data bus during acknowledgment.
    pub fn raise_int(&mut self, vector: u8) {
        self.regs.int_vector = vector;
        self.regs.int_line.insert(IntLine::INT);
    }

    /// Withdraw a maskable interrupt the CPU has not taken yet.
    pub fn clear_int(&mut self) {
        self.regs.int_line.remove(IntLine::INT);
    }

    #[must_use]
    pub fn interrupt_state(&self) -> InterruptState {
        let line = self.regs.int_line;
        if line.contains(IntLine::NMI) {
            InterruptState::NmiPending
        } else if line.contains(IntLine::INT) {
            InterruptState::IntPending
        } else {
            InterruptState::Idle
        }
    }

    /// Take a pending interrupt if one is acceptable at this boundary.
    pub(crate) fn service_interrupts<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> Option<StepResult> {
        let after_ei = std::mem::take(&mut self.ei_shadow);
        let line = self.regs.int_line;

        if line.contains(IntLine::NMI) {
            self.regs.int_line.remove(IntLine::NMI);
            self.begin_acknowledge(bus);
            self.regs.iff1 = false;
            self.regs.pc = NMI_VECTOR;
            self.regs.wz = NMI_VECTOR;
            trace!(target_pc = NMI_VECTOR, "NMI acknowledged");
            return Some(StepResult::Nmi {
                cycles: timing::NMI,
            });
        }

        if !line.contains(IntLine::INT) || !self.regs.iff1 || after_ei {
            return None;
        }

        self.regs.int_line.remove(IntLine::INT);
        self.begin_acknowledge(bus);
        self.regs.iff1 = false;
        self.regs.iff2 = false;

        let vector = self.regs.int_vector;
        let (target, cycles) = match self.regs.im {
            0 => (u16::from(vector & 0x38), timing::INT_IM0),
            1 => (IM1_VECTOR, timing::INT_IM1),
            _ => {
                let table = u16::from(self.regs.i) << 8 | u16::from(vector);
                (self.read_word(bus, table), timing::INT_IM2)
            }
        };
        self.regs.pc = target;
        self.regs.wz = target;
        trace!(im = self.regs.im, vector, target_pc = target, "INT acknowledged");
        Some(StepResult::Interrupt { cycles })
    }

    /// Common start of both acknowledge sequences: leave HALT, advance R
    /// for the acknowledge cycle and push the return address.
    fn begin_acknowledge<B: IoBus + ?Sized>(&mut self, bus: &mut B) {
        if self.regs.halted {
            self.regs.halted = false;
            self.regs.pc = self.regs.pc.wrapping_add(1);
            trace!(pc = self.regs.pc, "leaving HALT");
        }
        self.refresh();
        self.push(bus, self.regs.pc);
    }
}
