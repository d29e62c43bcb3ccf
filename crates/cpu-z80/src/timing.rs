//! Documented cycle counts.
//!
//! Prefix bytes (CB, ED, DD, FD) are charged [`PREFIX`] each as they are
//! fetched, so the prefixed tables hold the remainder of the documented
//! total: `NEG` is 8 cycles, 4 for ED plus 4 from [`ED`]. Conditional
//! instructions are listed at their not-taken cost; the handler adds the
//! matching `*_TAKEN` constant when the branch is taken.

/// Cost of each prefix byte fetch.
pub const PREFIX: u32 = 4;

/// Extra cycles when `JR cc` or `DJNZ` branches.
pub const JR_TAKEN: u32 = 5;
/// Extra cycles when `CALL cc` calls.
pub const CALL_TAKEN: u32 = 7;
/// Extra cycles when `RET cc` returns.
pub const RET_TAKEN: u32 = 6;
/// Extra cycles when a repeating block instruction loops.
pub const BLOCK_REPEAT: u32 = 5;
/// Extra cycles when CPIR/CPDR stop.
pub const BLOCK_COMPARE_EXIT: u32 = 2;

/// Cycles spent idling per step while halted (an internal NOP).
pub const HALTED: u32 = 4;

/// Acknowledging an NMI.
pub const NMI: u32 = 11;
/// Acknowledging an INT in mode 0 or 1.
pub const INT_IM0: u32 = 13;
pub const INT_IM1: u32 = 13;
/// Acknowledging an INT in mode 2.
pub const INT_IM2: u32 = 19;

/// Unprefixed opcodes. Prefix slots hold 0.
#[rustfmt::skip]
pub const BASE: [u32; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    4, 10,  7,  6,  4,  4,  7,  4,  4, 11,  7,  6,  4,  4,  7,  4, // 0
    8, 10,  7,  6,  4,  4,  7,  4, 12, 11,  7,  6,  4,  4,  7,  4, // 1
    7, 10, 16,  6,  4,  4,  7,  4,  7, 11, 16,  6,  4,  4,  7,  4, // 2
    7, 10, 13,  6, 11, 11, 10,  4,  7, 11, 13,  6,  4,  4,  7,  4, // 3
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 4
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 5
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 6
    7,  7,  7,  7,  7,  7,  4,  7,  4,  4,  4,  4,  4,  4,  7,  4, // 7
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 8
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 9
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // A
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // B
    5, 10, 10, 10, 10, 11,  7, 11,  5, 10, 10,  0, 10, 17,  7, 11, // C
    5, 10, 10, 11, 10, 11,  7, 11,  5,  4, 10, 11, 10,  0,  7, 11, // D
    5, 10, 10, 19, 10, 11,  7, 11,  5,  4, 10,  4, 10,  0,  7, 11, // E
    5, 10, 10,  4, 10, 11,  7, 11,  5,  6, 10,  4, 10,  0,  7, 11, // F
];

/// After DD or FD. Instructions that do not touch HL cost the same as
/// unprefixed; `(HL)` operands become `(IX+d)` and pay for the
/// displacement.
pub const INDEXED: [u32; 256] = build_indexed();

/// After CB.
pub const CB: [u32; 256] = build_cb();

/// After DD CB d or FD CB d.
pub const INDEXED_CB: [u32; 256] = build_indexed_cb();

/// After ED. Undefined opcodes are 8-cycle NOPs overall.
pub const ED: [u32; 256] = build_ed();

const fn uses_memory_hl(op: u8) -> bool {
    match op {
        0x34 | 0x35 | 0x36 => true,
        0x76 => false,
        0x40..=0x7F => op & 7 == 6 || op & 0x38 == 0x30,
        0x80..=0xBF => op & 7 == 6,
        _ => false,
    }
}

const fn build_indexed() -> [u32; 256] {
    let mut table = BASE;
    let mut op = 0;
    while op < 256 {
        if uses_memory_hl(op as u8) {
            // LD (IX+d),n overlaps the displacement and immediate fetches
            table[op] += if op == 0x36 { 5 } else { 8 };
        }
        op += 1;
    }
    table
}

const fn build_cb() -> [u32; 256] {
    let mut table = [4; 256];
    let mut op = 0;
    while op < 256 {
        if op & 7 == 6 {
            table[op] = if op & 0xC0 == 0x40 { 8 } else { 11 };
        }
        op += 1;
    }
    table
}

const fn build_indexed_cb() -> [u32; 256] {
    let mut table = [15; 256];
    let mut op = 0x40;
    while op < 0x80 {
        table[op] = 12;
        op += 1;
    }
    table
}

const fn build_ed() -> [u32; 256] {
    let mut table = [4; 256];
    let mut op = 0;
    while op < 256 {
        let y = (op >> 3) & 7;
        let z = op & 7;
        table[op] = match op >> 6 {
            1 => match z {
                0 | 1 => 8,
                2 => 11,
                3 => 16,
                4 | 6 => 4,
                5 => 10,
                _ => match y {
                    0..=3 => 5,
                    4 | 5 => 14,
                    _ => 4,
                },
            },
            2 if z <= 3 && y >= 4 => 12,
            _ => 4,
        };
        op += 1;
    }
    table
}
