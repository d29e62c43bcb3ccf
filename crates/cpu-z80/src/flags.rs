//! Z80 flag register bits and the result-byte flag tables.

/// Sign flag (bit 7) - set if result is negative.
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6) - set if result is zero.
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5) - usually a copy of bit 5 of the result.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4) - carry from bit 3 to bit 4.
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3) - usually a copy of bit 3 of the result.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2) - parity or overflow depending on instruction.
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1) - set if last operation was subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7.
pub const CF: u8 = 0b0000_0001;

/// The two undocumented bits, stored apart from the rest of F.
pub const UNDOC: u8 = YF | XF;

/// Parity of a byte (true if an even number of bits are set).
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones().is_multiple_of(2)
}

/// S, Z, 5 and 3 for every possible result byte.
pub const SZ53: [u8; 256] = build_sz53(false);

/// [`SZ53`] plus P/V as even parity.
pub const SZ53P: [u8; 256] = build_sz53(true);

const fn build_sz53(with_parity: bool) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let value = i as u8;
        let mut f = value & (SF | UNDOC);
        if value == 0 {
            f |= ZF;
        }
        if with_parity && parity(value) {
            f |= PF;
        }
        table[i] = f;
        i += 1;
    }
    table
}
