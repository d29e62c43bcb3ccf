//! CB-prefixed rotates, shifts and bit operations, including the DD CB and
//! FD CB indexed forms.

use emu_core::IoBus;

use super::{IndexMode, Z80};
use crate::alu::{self, Shift};
use crate::timing;

impl Z80 {
    pub(super) fn execute_cb<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let op = self.fetch_opcode();
        let z = op & 7;

        if z == 6 {
            let addr = self.regs.hl();
            let value = self.read_byte(bus, addr);
            // BIT n,(HL) leaks WZ through flags 5 and 3
            let xy = (self.regs.wz >> 8) as u8;
            if let Some(result) = self.bit_operation(op, value, xy) {
                self.write_byte(bus, addr, result);
            }
        } else {
            let value = self.reg8(z, IndexMode::Hl);
            if let Some(result) = self.bit_operation(op, value, value) {
                self.set_reg8(z, IndexMode::Hl, result);
            }
        }

        timing::CB[op as usize]
    }

    /// `DD CB d op` / `FD CB d op`. The sub-opcode byte is read as an
    /// operand, so R does not advance for it.
    ///
    /// Outside of BIT, a register field other than 6 also receives a copy
    /// of the result (the undocumented `RLC (IX+d),B` family).
    pub(super) fn execute_indexed_cb<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        mode: IndexMode,
    ) -> u32 {
        let addr = self.memory_operand(mode);
        let op = self.fetch_byte();
        let z = op & 7;

        let value = self.read_byte(bus, addr);
        if let Some(result) = self.bit_operation(op, value, (addr >> 8) as u8) {
            self.write_byte(bus, addr, result);
            if z != 6 {
                self.set_reg8(z, IndexMode::Hl, result);
            }
        }

        timing::INDEXED_CB[op as usize]
    }

    /// Perform the operation selected by bits 7-3 of a CB sub-opcode on
    /// `value`. Returns the byte to store back, or `None` for BIT. `xy`
    /// supplies flags 5 and 3 for BIT.
    fn bit_operation(&mut self, op: u8, value: u8, xy: u8) -> Option<u8> {
        let y = (op >> 3) & 7;
        match op >> 6 {
            0 => {
                let r = Shift::from_bits(y).apply(value, self.regs.f());
                self.regs.set_f(r.flags);
                Some(r.value)
            }
            1 => {
                self.regs.set_f(alu::bit(y, value, self.regs.f()));
                self.regs.set_undocumented_flags(xy);
                None
            }
            2 => Some(value & !(1 << y)),
            _ => Some(value | (1 << y)),
        }
    }
}
