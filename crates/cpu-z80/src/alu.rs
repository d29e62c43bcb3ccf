//! Arithmetic, logic, rotate and bit operations.
//!
//! Every function here is pure: operands and the incoming flag byte go in,
//! the result byte (or word) and the complete new flag byte come out. The
//! CPU decides where the result is stored.

use crate::flags::{CF, HF, NF, PF, SF, SZ53, SZ53P, UNDOC, XF, YF, ZF};

/// Result of an ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// The eight accumulator operations, in opcode order (bits 5-3 of
/// `ADD A,r` .. `CP r` and `ADD A,n` .. `CP n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    /// Decode from the three-bit opcode field.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => Self::Add,
            1 => Self::Adc,
            2 => Self::Sub,
            3 => Self::Sbc,
            4 => Self::And,
            5 => Self::Xor,
            6 => Self::Or,
            _ => Self::Cp,
        }
    }

    /// Apply to the accumulator. For [`AluOp::Cp`] the returned value is
    /// `a` unchanged.
    #[must_use]
    pub fn apply(self, a: u8, operand: u8, flags: u8) -> AluResult {
        let carry = flags & CF != 0;
        match self {
            Self::Add => add8(a, operand, false),
            Self::Adc => add8(a, operand, carry),
            Self::Sub => sub8(a, operand, false),
            Self::Sbc => sub8(a, operand, carry),
            Self::And => logic(a & operand, HF),
            Self::Xor => logic(a ^ operand, 0),
            Self::Or => logic(a | operand, 0),
            Self::Cp => cp8(a, operand),
        }
    }
}

/// The eight CB-prefix shift/rotate operations, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Sll,
    Srl,
}

impl Shift {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => Self::Rlc,
            1 => Self::Rrc,
            2 => Self::Rl,
            3 => Self::Rr,
            4 => Self::Sla,
            5 => Self::Sra,
            6 => Self::Sll,
            _ => Self::Srl,
        }
    }

    /// Shift `value`, producing the CB-form flags (S, Z, 5, 3 and parity
    /// from the result, H and N cleared, C from the bit shifted out).
    #[must_use]
    pub fn apply(self, value: u8, flags: u8) -> AluResult {
        let carry_in = flags & CF;
        let (result, carry_out) = match self {
            Self::Rlc => (value.rotate_left(1), value >> 7),
            Self::Rrc => (value.rotate_right(1), value & 1),
            Self::Rl => ((value << 1) | carry_in, value >> 7),
            Self::Rr => ((value >> 1) | (carry_in << 7), value & 1),
            Self::Sla => (value << 1, value >> 7),
            Self::Sra => ((value >> 1) | (value & 0x80), value & 1),
            Self::Sll => ((value << 1) | 1, value >> 7),
            Self::Srl => (value >> 1, value & 1),
        };
        AluResult {
            value: result,
            flags: SZ53P[result as usize] | carry_out,
        }
    }

    /// Accumulator forms (RLCA, RRCA, RLA, RRA): S, Z and P/V are kept,
    /// H and N cleared, 5 and 3 taken from the new A.
    #[must_use]
    pub fn apply_accumulator(self, a: u8, flags: u8) -> AluResult {
        let shifted = self.apply(a, flags);
        AluResult {
            value: shifted.value,
            flags: (flags & (SF | ZF | PF)) | (shifted.value & UNDOC) | (shifted.flags & CF),
        }
    }
}

/// Add with optional carry in.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let sum = u16::from(a) + u16::from(b) + u16::from(carry);
    let result = sum as u8;
    let mut flags = SZ53[result as usize];
    // Bit 4 of a^b^result is the carry into bit 4
    flags |= (a ^ b ^ result) & HF;
    if (a ^ b) & 0x80 == 0 && (a ^ result) & 0x80 != 0 {
        flags |= PF;
    }
    if sum > 0xFF {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// Subtract with optional borrow in.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let diff = i16::from(a) - i16::from(b) - i16::from(carry);
    let result = diff as u8;
    let mut flags = SZ53[result as usize] | NF;
    flags |= (a ^ b ^ result) & HF;
    if (a ^ b) & 0x80 != 0 && (a ^ result) & 0x80 != 0 {
        flags |= PF;
    }
    if diff < 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// Compare: flags of `a - b`, but bits 5 and 3 come from the operand.
#[must_use]
pub fn cp8(a: u8, b: u8) -> AluResult {
    let diff = sub8(a, b, false);
    AluResult {
        value: a,
        flags: (diff.flags & !UNDOC) | (b & UNDOC),
    }
}

fn logic(result: u8, half: u8) -> AluResult {
    AluResult {
        value: result,
        flags: SZ53P[result as usize] | half,
    }
}

/// Increment byte. Carry is preserved.
#[must_use]
pub fn inc8(value: u8, flags: u8) -> AluResult {
    let result = value.wrapping_add(1);
    let mut f = (flags & CF) | SZ53[result as usize];
    if value & 0x0F == 0x0F {
        f |= HF;
    }
    if value == 0x7F {
        f |= PF;
    }
    AluResult { value: result, flags: f }
}

/// Decrement byte. Carry is preserved.
#[must_use]
pub fn dec8(value: u8, flags: u8) -> AluResult {
    let result = value.wrapping_sub(1);
    let mut f = (flags & CF) | NF | SZ53[result as usize];
    if value & 0x0F == 0 {
        f |= HF;
    }
    if value == 0x80 {
        f |= PF;
    }
    AluResult { value: result, flags: f }
}

/// `ADD HL,rr` (and the IX/IY forms). S, Z and P/V are preserved; H and C
/// come from bits 11 and 15, 5 and 3 from the high byte of the result.
#[must_use]
pub fn add16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let sum = u32::from(a) + u32::from(b);
    let result = sum as u16;
    let mut f = (flags & (SF | ZF | PF)) | ((result >> 8) as u8 & UNDOC);
    if (a ^ b ^ result) & 0x1000 != 0 {
        f |= HF;
    }
    if sum > 0xFFFF {
        f |= CF;
    }
    (result, f)
}

/// `ADC HL,rr`. All flags are computed from the 16-bit result.
#[must_use]
pub fn adc16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let sum = u32::from(a) + u32::from(b) + u32::from(flags & CF);
    let result = sum as u16;
    let mut f = wide_sz53(result);
    if (a ^ b ^ result) & 0x1000 != 0 {
        f |= HF;
    }
    if (a ^ b) & 0x8000 == 0 && (a ^ result) & 0x8000 != 0 {
        f |= PF;
    }
    if sum > 0xFFFF {
        f |= CF;
    }
    (result, f)
}

/// `SBC HL,rr`.
#[must_use]
pub fn sbc16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let diff = i32::from(a) - i32::from(b) - i32::from(flags & CF);
    let result = diff as u16;
    let mut f = wide_sz53(result) | NF;
    if (a ^ b ^ result) & 0x1000 != 0 {
        f |= HF;
    }
    if (a ^ b) & 0x8000 != 0 && (a ^ result) & 0x8000 != 0 {
        f |= PF;
    }
    if diff < 0 {
        f |= CF;
    }
    (result, f)
}

fn wide_sz53(value: u16) -> u8 {
    let high = (value >> 8) as u8;
    let mut f = high & (SF | UNDOC);
    if value == 0 {
        f |= ZF;
    }
    f
}

/// Decimal adjust after an 8-bit add or subtract.
#[must_use]
pub fn daa(a: u8, flags: u8) -> AluResult {
    let low = a & 0x0F;
    let subtract = flags & NF != 0;
    let mut correction = 0;
    if flags & HF != 0 || low > 9 {
        correction |= 0x06;
    }
    let carry = flags & CF != 0 || a > 0x99;
    if carry {
        correction |= 0x60;
    }

    let result = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    let half = if subtract {
        flags & HF != 0 && low < 6
    } else {
        low > 9
    };

    let mut f = SZ53P[result as usize] | (flags & NF);
    if half {
        f |= HF;
    }
    if carry {
        f |= CF;
    }
    AluResult { value: result, flags: f }
}

/// Flags for `BIT n,value`.
///
/// Z and P/V are set when the bit is clear, S only for a set bit 7, H is
/// always set and C preserved. Bits 5 and 3 are left clear; the caller
/// fills them from whatever the operand form leaks.
#[must_use]
pub fn bit(n: u8, value: u8, flags: u8) -> u8 {
    let tested = value & (1 << (n & 7));
    let mut f = (flags & CF) | HF;
    if tested == 0 {
        f |= ZF | PF;
    }
    f | (tested & SF)
}

/// Flags for `LD A,I` and `LD A,R`: P/V reflects IFF2.
#[must_use]
pub fn ld_a_ir(value: u8, iff2: bool, flags: u8) -> u8 {
    let mut f = (flags & CF) | SZ53[value as usize];
    if iff2 {
        f |= PF;
    }
    f
}

/// Flags for `CPL`.
#[must_use]
pub fn cpl(a: u8, flags: u8) -> AluResult {
    let result = !a;
    AluResult {
        value: result,
        flags: (flags & (SF | ZF | PF | CF)) | HF | NF | (result & UNDOC),
    }
}

/// Flags for `SCF`.
#[must_use]
pub fn scf(a: u8, flags: u8) -> u8 {
    (flags & (SF | ZF | PF)) | CF | (a & UNDOC)
}

/// Flags for `CCF`: H takes the old carry, C is inverted.
#[must_use]
pub fn ccf(a: u8, flags: u8) -> u8 {
    let old_carry = flags & CF;
    let mut f = (flags & (SF | ZF | PF)) | (a & UNDOC);
    if old_carry != 0 {
        f |= HF;
    } else {
        f |= CF;
    }
    f
}

/// Documented flags after LDI/LDD: H and N clear, P/V reports BC != 0.
#[must_use]
pub fn block_transfer_flags(bc_nonzero: bool, flags: u8) -> u8 {
    let mut f = flags & (SF | ZF | CF);
    if bc_nonzero {
        f |= PF;
    }
    f
}

/// Bits 5 and 3 after LDI/LDD: from `value + A`, bit 3 directly and bit 5
/// from bit 1.
#[must_use]
pub fn block_transfer_xy(value: u8, a: u8) -> u8 {
    let n = value.wrapping_add(a);
    (n & XF) | ((n << 4) & YF)
}

/// Flags after CPI/CPD. C is preserved, P/V reports BC != 0.
#[must_use]
pub fn block_compare_flags(a: u8, value: u8, bc_nonzero: bool, flags: u8) -> u8 {
    let result = a.wrapping_sub(value);
    let half = (a ^ value ^ result) & HF;
    let n = result.wrapping_sub(u8::from(half != 0));
    let mut f = (flags & CF) | NF | half | (SZ53[result as usize] & (SF | ZF));
    f |= (n & XF) | ((n << 4) & YF);
    if bc_nonzero {
        f |= PF;
    }
    f
}

/// Flags after INI/IND/OUTI/OUTD. `b` is the decremented counter and `k`
/// the carry-generating sum for the variant.
#[must_use]
pub fn block_io_flags(value: u8, b: u8, k: u16) -> u8 {
    let mut f = SZ53[b as usize];
    if value & 0x80 != 0 {
        f |= NF;
    }
    if k > 0xFF {
        f |= HF | CF;
    }
    if SZ53P[((k as u8 & 7) ^ b) as usize] & PF != 0 {
        f |= PF;
    }
    f
}
