//! ED-prefixed instructions: 16-bit arithmetic with carry, I/O through C,
//! interrupt control and the block group.

use emu_core::IoBus;

use super::{IndexMode, Z80};
use crate::alu;
use crate::flags::{CF, SZ53P};
use crate::timing;

/// IM n operands by bits 4-3 of the opcode. The 0/1 encodings (ED 4E,
/// ED 6E) behave as IM 0.
const IM_MODES: [u8; 4] = [0, 0, 1, 2];

impl Z80 {
    pub(super) fn execute_ed<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let op = self.fetch_opcode();
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;

        match (op >> 6, z) {
            // IN r,(C); field 6 only sets flags
            (1, 0) => {
                let port = self.regs.bc();
                let value = bus.read_io(port);
                if y != 6 {
                    self.set_reg8(y, IndexMode::Hl, value);
                }
                self.regs.set_f(SZ53P[value as usize] | (self.regs.f() & CF));
                self.regs.wz = port.wrapping_add(1);
            }

            // OUT (C),r; field 6 outputs zero
            (1, 1) => {
                let port = self.regs.bc();
                let value = if y == 6 { 0 } else { self.reg8(y, IndexMode::Hl) };
                bus.write_io(port, value);
                self.regs.wz = port.wrapping_add(1);
            }

            // SBC HL,rr / ADC HL,rr
            (1, 2) => {
                let hl = self.regs.hl();
                let operand = self.rp(p, IndexMode::Hl);
                let (value, flags) = if q == 0 {
                    alu::sbc16(hl, operand, self.regs.f())
                } else {
                    alu::adc16(hl, operand, self.regs.f())
                };
                self.regs.set_hl(value);
                self.regs.set_f(flags);
                self.regs.wz = hl.wrapping_add(1);
            }

            // LD (nn),rr / LD rr,(nn)
            (1, 3) => {
                let addr = self.fetch_word();
                if q == 0 {
                    let value = self.rp(p, IndexMode::Hl);
                    self.write_word(bus, addr, value);
                } else {
                    let value = self.read_word(bus, addr);
                    self.set_rp(p, IndexMode::Hl, value);
                }
                self.regs.wz = addr.wrapping_add(1);
            }

            // NEG and its mirrors
            (1, 4) => {
                let r = alu::sub8(0, self.regs.a, false);
                self.regs.a = r.value;
                self.regs.set_f(r.flags);
            }

            // RETN, RETI (y == 1) and mirrors
            (1, 5) => {
                self.regs.pc = self.pop(bus);
                self.regs.wz = self.regs.pc;
                self.regs.iff1 = self.regs.iff2;
            }

            (1, 6) => self.regs.im = IM_MODES[(y & 3) as usize],

            (1, 7) => match y {
                0 => self.regs.i = self.regs.a,
                1 => self.write_refresh(self.regs.a),
                2 => {
                    self.regs.a = self.regs.i;
                    let flags = alu::ld_a_ir(self.regs.a, self.regs.iff2, self.regs.f());
                    self.regs.set_f(flags);
                }
                3 => {
                    self.regs.a = self.refresh_value();
                    let flags = alu::ld_a_ir(self.regs.a, self.regs.iff2, self.regs.f());
                    self.regs.set_f(flags);
                }
                4 => self.rotate_decimal(bus, false),
                5 => self.rotate_decimal(bus, true),
                _ => {}
            },

            // LDI/CPI/INI/OUTI and their D, IR and DR variants
            (2, 0..=3) if y >= 4 => {
                let increment = y & 1 == 0;
                let repeat = y >= 6;
                match z {
                    0 => self.block_load(bus, increment, repeat),
                    1 => self.block_compare(bus, increment, repeat),
                    2 => self.block_in(bus, increment, repeat),
                    _ => self.block_out(bus, increment, repeat),
                }
            }

            // Everything else is an 8-cycle NOP
            _ => {}
        }

        timing::ED[op as usize]
    }

    /// RLD (`left`) and RRD: rotate a BCD digit between A and (HL).
    fn rotate_decimal<B: IoBus + ?Sized>(&mut self, bus: &mut B, left: bool) {
        let addr = self.regs.hl();
        let value = self.read_byte(bus, addr);
        let a = self.regs.a;
        let (memory, low) = if left {
            ((value << 4) | (a & 0x0F), value >> 4)
        } else {
            ((a << 4) | (value >> 4), value & 0x0F)
        };
        self.write_byte(bus, addr, memory);
        self.regs.a = (a & 0xF0) | low;
        self.regs.set_f(SZ53P[self.regs.a as usize] | (self.regs.f() & CF));
        self.regs.wz = addr.wrapping_add(1);
    }

    /// Rewind onto the ED prefix so the instruction runs again.
    fn repeat_block(&mut self) {
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
        self.extra += timing::BLOCK_REPEAT;
    }

    fn block_load<B: IoBus + ?Sized>(&mut self, bus: &mut B, increment: bool, repeat: bool) {
        let step = stride(increment);
        let hl = self.regs.hl();
        let de = self.regs.de();
        let value = self.read_byte(bus, hl);
        self.write_byte(bus, de, value);

        self.regs.set_hl(hl.wrapping_add_signed(step));
        self.regs.set_de(de.wrapping_add_signed(step));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        self.regs.set_f(alu::block_transfer_flags(bc != 0, self.regs.f()));
        self.regs.set_undocumented_flags(alu::block_transfer_xy(value, self.regs.a));

        if repeat && bc != 0 {
            self.repeat_block();
        }
    }

    fn block_compare<B: IoBus + ?Sized>(&mut self, bus: &mut B, increment: bool, repeat: bool) {
        let step = stride(increment);
        let hl = self.regs.hl();
        let value = self.read_byte(bus, hl);

        self.regs.set_hl(hl.wrapping_add_signed(step));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);
        self.regs.wz = self.regs.wz.wrapping_add_signed(step);

        let flags = alu::block_compare_flags(self.regs.a, value, bc != 0, self.regs.f());
        self.regs.set_f(flags);

        if repeat {
            if bc != 0 && value != self.regs.a {
                self.repeat_block();
            } else {
                self.extra += timing::BLOCK_COMPARE_EXIT;
            }
        }
    }

    fn block_in<B: IoBus + ?Sized>(&mut self, bus: &mut B, increment: bool, repeat: bool) {
        let step = stride(increment);
        let port = self.regs.bc();
        let value = bus.read_io(port);
        let hl = self.regs.hl();
        self.write_byte(bus, hl, value);

        self.regs.wz = port.wrapping_add_signed(step);
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.set_hl(hl.wrapping_add_signed(step));

        let c = self.regs.c.wrapping_add_signed(step as i8);
        let k = u16::from(value) + u16::from(c);
        self.regs.set_f(alu::block_io_flags(value, self.regs.b, k));

        if repeat && self.regs.b != 0 {
            self.repeat_block();
        }
    }

    fn block_out<B: IoBus + ?Sized>(&mut self, bus: &mut B, increment: bool, repeat: bool) {
        let step = stride(increment);
        let hl = self.regs.hl();
        let value = self.read_byte(bus, hl);

        // B is decremented before it goes out on the address bus
        self.regs.b = self.regs.b.wrapping_sub(1);
        let port = self.regs.bc();
        bus.write_io(port, value);

        self.regs.set_hl(hl.wrapping_add_signed(step));
        self.regs.wz = port.wrapping_add_signed(step);

        let k = u16::from(value) + u16::from(self.regs.l);
        self.regs.set_f(alu::block_io_flags(value, self.regs.b, k));

        if repeat && self.regs.b != 0 {
            self.repeat_block();
        }
    }
}

const fn stride(increment: bool) -> i16 {
    if increment { 1 } else { -1 }
}
