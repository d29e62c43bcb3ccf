//! Unprefixed instructions, and their DD/FD-prefixed forms.
//!
//! Opcodes are grouped by the usual field split: `x` = bits 7-6,
//! `y` = bits 5-3, `z` = bits 2-0, with `p` = y >> 1 and `q` = y & 1.
//! Handlers take the decoded fields and an [`IndexMode`] instead of being
//! written out once per register.

use emu_core::IoBus;
use tracing::trace;

use super::{IndexMode, Z80};
use crate::alu::{self, AluOp, Shift};
use crate::flags::{CF, PF, SF, ZF};
use crate::timing;

impl Z80 {
    /// Execute `op` with any DD/FD prefix already decoded into `mode`.
    /// Returns the cost from the timing tables.
    pub(super) fn execute<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        op: u8,
        mode: IndexMode,
    ) -> u32 {
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;

        match op {
            0x00 => {}

            // LD rr,nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word();
                self.set_rp(p, mode, value);
            }

            // LD (BC),A / LD (DE),A
            0x02 | 0x12 => {
                let addr = if op == 0x02 { self.regs.bc() } else { self.regs.de() };
                self.write_byte(bus, addr, self.regs.a);
                self.regs.wz = u16::from(self.regs.a) << 8 | (addr.wrapping_add(1) & 0xFF);
            }

            // LD A,(BC) / LD A,(DE)
            0x0A | 0x1A => {
                let addr = if op == 0x0A { self.regs.bc() } else { self.regs.de() };
                self.regs.a = self.read_byte(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // LD (nn),HL
            0x22 => {
                let addr = self.fetch_word();
                let value = self.index_reg(mode);
                self.write_word(bus, addr, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // LD HL,(nn)
            0x2A => {
                let addr = self.fetch_word();
                let value = self.read_word(bus, addr);
                self.set_index_reg(mode, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // LD (nn),A
            0x32 => {
                let addr = self.fetch_word();
                self.write_byte(bus, addr, self.regs.a);
                self.regs.wz = u16::from(self.regs.a) << 8 | (addr.wrapping_add(1) & 0xFF);
            }

            // LD A,(nn)
            0x3A => {
                let addr = self.fetch_word();
                self.regs.a = self.read_byte(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // INC rr / DEC rr
            0x03 | 0x13 | 0x23 | 0x33 => {
                let value = self.rp(p, mode).wrapping_add(1);
                self.set_rp(p, mode, value);
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let value = self.rp(p, mode).wrapping_sub(1);
                self.set_rp(p, mode, value);
            }

            // INC r / DEC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                self.modify_r8(bus, y, mode, alu::inc8);
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                self.modify_r8(bus, y, mode, alu::dec8);
            }

            // LD r,n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                if y == 6 {
                    // Displacement comes before the immediate
                    let addr = self.memory_operand(mode);
                    let value = self.fetch_byte();
                    self.write_byte(bus, addr, value);
                } else {
                    let value = self.fetch_byte();
                    self.set_reg8(y, mode, value);
                }
            }

            // RLCA / RRCA / RLA / RRA
            0x07 | 0x0F | 0x17 | 0x1F => {
                let r = Shift::from_bits(y).apply_accumulator(self.regs.a, self.regs.f());
                self.regs.a = r.value;
                self.regs.set_f(r.flags);
            }

            0x08 => self.regs.swap_af(),

            // ADD HL,rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                let hl = self.index_reg(mode);
                let (value, flags) = alu::add16(hl, self.rp(p, mode), self.regs.f());
                self.set_index_reg(mode, value);
                self.regs.set_f(flags);
                self.regs.wz = hl.wrapping_add(1);
            }

            // DJNZ e
            0x10 => {
                let offset = self.fetch_byte() as i8;
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.jump_relative(offset);
                }
            }

            // JR e
            0x18 => {
                let offset = self.fetch_byte() as i8;
                self.regs.pc = self.regs.pc.wrapping_add_signed(offset.into());
                self.regs.wz = self.regs.pc;
            }

            // JR cc,e (NZ, Z, NC, C only)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.fetch_byte() as i8;
                if self.condition(y - 4) {
                    self.jump_relative(offset);
                }
            }

            0x27 => {
                let r = alu::daa(self.regs.a, self.regs.f());
                self.regs.a = r.value;
                self.regs.set_f(r.flags);
            }
            0x2F => {
                let r = alu::cpl(self.regs.a, self.regs.f());
                self.regs.a = r.value;
                self.regs.set_f(r.flags);
            }
            0x37 => {
                let flags = alu::scf(self.regs.a, self.regs.f());
                self.regs.set_f(flags);
            }
            0x3F => {
                let flags = alu::ccf(self.regs.a, self.regs.f());
                self.regs.set_f(flags);
            }

            0x76 => self.halt(),

            // LD r,r'
            0x40..=0x7F => {
                if z == 6 {
                    // LD r,(HL): the destination is never IXH/IXL
                    let addr = self.memory_operand(mode);
                    let value = self.read_byte(bus, addr);
                    self.set_reg8(y, IndexMode::Hl, value);
                } else if y == 6 {
                    let addr = self.memory_operand(mode);
                    let value = self.reg8(z, IndexMode::Hl);
                    self.write_byte(bus, addr, value);
                } else {
                    let value = self.reg8(z, mode);
                    self.set_reg8(y, mode, value);
                }
            }

            // ALU A,r
            0x80..=0xBF => {
                let value = if z == 6 {
                    let addr = self.memory_operand(mode);
                    self.read_byte(bus, addr)
                } else {
                    self.reg8(z, mode)
                };
                self.alu_a(AluOp::from_bits(y), value);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition(y) {
                    self.regs.pc = self.pop(bus);
                    self.regs.wz = self.regs.pc;
                    self.extra += timing::RET_TAKEN;
                }
            }

            // POP rr
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop(bus);
                self.set_rp_af(p, mode, value);
            }

            // JP cc,nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let target = self.fetch_word();
                self.regs.wz = target;
                if self.condition(y) {
                    self.regs.pc = target;
                }
            }

            0xC3 => {
                let target = self.fetch_word();
                self.regs.pc = target;
                self.regs.wz = target;
            }

            // CALL cc,nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let target = self.fetch_word();
                self.regs.wz = target;
                if self.condition(y) {
                    self.push(bus, self.regs.pc);
                    self.regs.pc = target;
                    self.extra += timing::CALL_TAKEN;
                }
            }

            // PUSH rr
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let value = self.rp_af(p, mode);
                self.push(bus, value);
            }

            // ALU A,n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch_byte();
                self.alu_a(AluOp::from_bits(y), value);
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push(bus, self.regs.pc);
                self.regs.pc = u16::from(y) * 8;
                self.regs.wz = self.regs.pc;
            }

            0xC9 => {
                self.regs.pc = self.pop(bus);
                self.regs.wz = self.regs.pc;
            }

            0xCD => {
                let target = self.fetch_word();
                self.push(bus, self.regs.pc);
                self.regs.pc = target;
                self.regs.wz = target;
            }

            // OUT (n),A
            0xD3 => {
                let n = self.fetch_byte();
                let port = u16::from(self.regs.a) << 8 | u16::from(n);
                bus.write_io(port, self.regs.a);
                self.regs.wz = u16::from(self.regs.a) << 8 | u16::from(n.wrapping_add(1));
            }

            // IN A,(n)
            0xDB => {
                let n = self.fetch_byte();
                let port = u16::from(self.regs.a) << 8 | u16::from(n);
                self.regs.a = bus.read_io(port);
                self.regs.wz = port.wrapping_add(1);
            }

            0xD9 => self.regs.swap_main(),

            // EX (SP),HL
            0xE3 => {
                let sp = self.regs.sp;
                let value = self.read_word(bus, sp);
                let current = self.index_reg(mode);
                self.write_word(bus, sp, current);
                self.set_index_reg(mode, value);
                self.regs.wz = value;
            }

            // JP (HL)
            0xE9 => self.regs.pc = self.index_reg(mode),

            // EX DE,HL ignores any index prefix
            0xEB => {
                let de = self.regs.de();
                let hl = self.regs.hl();
                self.regs.set_de(hl);
                self.regs.set_hl(de);
            }

            0xF3 => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }

            // LD SP,HL
            0xF9 => self.regs.sp = self.index_reg(mode),

            0xFB => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.ei_shadow = true;
            }

            // Prefixes are consumed by the dispatcher
            0xCB | 0xDD | 0xED | 0xFD => {}
        }

        match mode {
            IndexMode::Hl => timing::BASE[op as usize],
            IndexMode::Ix | IndexMode::Iy => timing::INDEXED[op as usize],
        }
    }

    fn halt(&mut self) {
        // Stay on the HALT opcode until an interrupt is acknowledged
        self.regs.pc = self.regs.pc.wrapping_sub(1);
        self.regs.halted = true;
        trace!(pc = self.regs.pc, "entering HALT");
    }

    fn jump_relative(&mut self, offset: i8) {
        self.regs.pc = self.regs.pc.wrapping_add_signed(offset.into());
        self.regs.wz = self.regs.pc;
        self.extra += timing::JR_TAKEN;
    }

    /// Apply an 8-bit read-modify-write to register `y`, or to the memory
    /// operand when `y` is 6.
    fn modify_r8<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        y: u8,
        mode: IndexMode,
        op: fn(u8, u8) -> alu::AluResult,
    ) {
        if y == 6 {
            let addr = self.memory_operand(mode);
            let value = self.read_byte(bus, addr);
            let r = op(value, self.regs.f());
            self.write_byte(bus, addr, r.value);
            self.regs.set_f(r.flags);
        } else {
            let r = op(self.reg8(y, mode), self.regs.f());
            self.set_reg8(y, mode, r.value);
            self.regs.set_f(r.flags);
        }
    }

    pub(super) fn alu_a(&mut self, op: AluOp, operand: u8) {
        let r = op.apply(self.regs.a, operand, self.regs.f());
        self.regs.a = r.value;
        self.regs.set_f(r.flags);
    }

    /// Test condition `cc` (NZ, Z, NC, C, PO, PE, P, M).
    pub(super) fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f();
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    /// Address of the `(HL)` operand. With an index prefix this fetches the
    /// displacement and latches the effective address in WZ.
    pub(super) fn memory_operand(&mut self, mode: IndexMode) -> u16 {
        match mode {
            IndexMode::Hl => self.regs.hl(),
            IndexMode::Ix | IndexMode::Iy => {
                let offset = self.fetch_byte() as i8;
                let addr = self.index_reg(mode).wrapping_add_signed(offset.into());
                self.regs.wz = addr;
                addr
            }
        }
    }

    /// Register by its three-bit field: B, C, D, E, H, L, -, A. Field 6 is
    /// the memory operand and belongs to the caller.
    pub(super) fn reg8(&self, index: u8, mode: IndexMode) -> u8 {
        debug_assert_ne!(index, 6, "memory operand decoded as a register");
        let regs = &self.regs;
        match index & 7 {
            0 => regs.b,
            1 => regs.c,
            2 => regs.d,
            3 => regs.e,
            4 => (self.index_reg(mode) >> 8) as u8,
            5 => self.index_reg(mode) as u8,
            _ => regs.a,
        }
    }

    pub(super) fn set_reg8(&mut self, index: u8, mode: IndexMode, value: u8) {
        debug_assert_ne!(index, 6, "memory operand decoded as a register");
        match index & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => {
                let low = self.index_reg(mode) & 0x00FF;
                self.set_index_reg(mode, u16::from(value) << 8 | low);
            }
            5 => {
                let high = self.index_reg(mode) & 0xFF00;
                self.set_index_reg(mode, high | u16::from(value));
            }
            _ => self.regs.a = value,
        }
    }

    /// HL, IX or IY.
    pub(super) fn index_reg(&self, mode: IndexMode) -> u16 {
        match mode {
            IndexMode::Hl => self.regs.hl(),
            IndexMode::Ix => self.regs.ix,
            IndexMode::Iy => self.regs.iy,
        }
    }

    pub(super) fn set_index_reg(&mut self, mode: IndexMode, value: u16) {
        match mode {
            IndexMode::Hl => self.regs.set_hl(value),
            IndexMode::Ix => self.regs.ix = value,
            IndexMode::Iy => self.regs.iy = value,
        }
    }

    /// Register pair by its two-bit field: BC, DE, HL, SP.
    pub(super) fn rp(&self, p: u8, mode: IndexMode) -> u16 {
        match p & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(mode),
            _ => self.regs.sp,
        }
    }

    pub(super) fn set_rp(&mut self, p: u8, mode: IndexMode, value: u16) {
        match p & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(mode, value),
            _ => self.regs.sp = value,
        }
    }

    /// Register pair for PUSH/POP: BC, DE, HL, AF.
    fn rp_af(&self, p: u8, mode: IndexMode) -> u16 {
        if p & 3 == 3 {
            self.regs.af()
        } else {
            self.rp(p, mode)
        }
    }

    fn set_rp_af(&mut self, p: u8, mode: IndexMode, value: u16) {
        if p & 3 == 3 {
            self.regs.set_af(value);
        } else {
            self.set_rp(p, mode, value);
        }
    }
}
