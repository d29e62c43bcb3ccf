//! Z80 register file.

use crate::error::Z80Error;
use crate::flags::UNDOC;
use crate::interrupt::IntLine;

/// Where the CPU is in its execution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    /// Not executing; registers may be inspected and changed.
    #[default]
    Idle,
    /// Inside `run` or `step`. Register access is refused.
    Running,
    /// Stopped on a HALT instruction until an interrupt arrives.
    Halted,
    /// Blocked by a host-detected illegal condition until cleared.
    Faulted,
}

/// A register addressable through [`RegisterFile::get`] and
/// [`RegisterFile::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reg {
    Af,
    Bc,
    De,
    Hl,
    Ix,
    Iy,
    Sp,
    Pc,
    AfAlt,
    BcAlt,
    DeAlt,
    HlAlt,
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    I,
    R,
    Iff1,
    Iff2,
    Im,
    IntVector,
    IntLine,
    Wz,
}

impl Reg {
    /// Every register, in a fixed order suitable for serializing a snapshot.
    pub const ALL: [Self; 28] = [
        Self::Af,
        Self::Bc,
        Self::De,
        Self::Hl,
        Self::Ix,
        Self::Iy,
        Self::Sp,
        Self::Pc,
        Self::AfAlt,
        Self::BcAlt,
        Self::DeAlt,
        Self::HlAlt,
        Self::A,
        Self::F,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::H,
        Self::L,
        Self::I,
        Self::R,
        Self::Iff1,
        Self::Iff2,
        Self::Im,
        Self::IntVector,
        Self::IntLine,
        Self::Wz,
    ];

    /// Largest value the register can hold.
    #[must_use]
    pub const fn max_value(self) -> u16 {
        match self {
            Self::Af
            | Self::Bc
            | Self::De
            | Self::Hl
            | Self::Ix
            | Self::Iy
            | Self::Sp
            | Self::Pc
            | Self::AfAlt
            | Self::BcAlt
            | Self::DeAlt
            | Self::HlAlt
            | Self::Wz => 0xFFFF,
            Self::A
            | Self::F
            | Self::B
            | Self::C
            | Self::D
            | Self::E
            | Self::H
            | Self::L
            | Self::I
            | Self::R
            | Self::IntVector => 0xFF,
            Self::Iff1 | Self::Iff2 => 1,
            Self::Im => 2,
            Self::IntLine => IntLine::all().bits() as u16,
        }
    }
}

/// Complete architectural state of the CPU.
///
/// F is kept in two parts: the documented flags in `f` and the
/// undocumented bits 5 and 3 in `f_undoc`. [`RegisterFile::f`] and
/// [`RegisterFile::af`] reassemble them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterFile {
    pub a: u8,
    f: u8,
    f_undoc: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,

    /// WZ/MEMPTR - internal address latch. Feeds flags 5 and 3 of
    /// `BIT n,(HL)`.
    pub wz: u16,

    pub i: u8,
    /// Refresh register. Bit 7 only changes when R is written.
    pub r: u8,

    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,

    /// Byte the interrupting device places on the data bus.
    pub int_vector: u8,
    /// Pending interrupt requests.
    pub int_line: IntLine,

    pub(crate) status: RunStatus,
    /// HALT line. Survives the Running status of a `run` call.
    pub(crate) halted: bool,
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Flags with the undocumented bits merged back in.
    #[must_use]
    pub const fn f(&self) -> u8 {
        self.f | self.f_undoc
    }

    pub fn set_f(&mut self, value: u8) {
        self.f = value & !UNDOC;
        self.f_undoc = value & UNDOC;
    }

    /// Replace only bits 5 and 3 of F.
    pub fn set_undocumented_flags(&mut self, value: u8) {
        self.f_undoc = value & UNDOC;
    }

    #[must_use]
    pub const fn af(&self) -> u16 {
        (self.a as u16) << 8 | self.f() as u16
    }

    #[must_use]
    pub const fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    #[must_use]
    pub const fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.set_f(value as u8);
    }

    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    /// `EX AF,AF'`
    pub fn swap_af(&mut self) {
        let af = self.af();
        self.set_af(self.af_alt);
        self.af_alt = af;
    }

    /// `EXX`
    pub fn swap_main(&mut self) {
        let (bc, de, hl) = (self.bc(), self.de(), self.hl());
        self.set_bc(self.bc_alt);
        self.set_de(self.de_alt);
        self.set_hl(self.hl_alt);
        self.bc_alt = bc;
        self.de_alt = de;
        self.hl_alt = hl;
    }

    /// Advance the low seven bits of R by one.
    pub fn increment_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }

    /// Advance the low seven bits of R by `steps` refresh cycles.
    pub(crate) fn advance_r(&mut self, steps: u64) {
        let low = (u64::from(self.r & 0x7F) + steps % 0x80) as u8 & 0x7F;
        self.r = (self.r & 0x80) | low;
    }

    /// Read a register.
    ///
    /// Fails with [`Z80Error::Busy`] while the CPU is running.
    pub fn get(&self, reg: Reg) -> Result<u16, Z80Error> {
        if self.status == RunStatus::Running {
            return Err(Z80Error::Busy);
        }
        Ok(self.read(reg))
    }

    /// Write a register.
    ///
    /// Fails with [`Z80Error::Busy`] while the CPU is running and with
    /// [`Z80Error::ValueOutOfRange`] when `value` does not fit. Neither
    /// failure changes any state.
    pub fn set(&mut self, reg: Reg, value: u16) -> Result<(), Z80Error> {
        if self.status == RunStatus::Running {
            return Err(Z80Error::Busy);
        }
        if value > reg.max_value() {
            return Err(Z80Error::ValueOutOfRange { reg, value });
        }
        self.write(reg, value);
        Ok(())
    }

    pub(crate) fn read(&self, reg: Reg) -> u16 {
        match reg {
            Reg::Af => self.af(),
            Reg::Bc => self.bc(),
            Reg::De => self.de(),
            Reg::Hl => self.hl(),
            Reg::Ix => self.ix,
            Reg::Iy => self.iy,
            Reg::Sp => self.sp,
            Reg::Pc => self.pc,
            Reg::AfAlt => self.af_alt,
            Reg::BcAlt => self.bc_alt,
            Reg::DeAlt => self.de_alt,
            Reg::HlAlt => self.hl_alt,
            Reg::A => self.a.into(),
            Reg::F => self.f().into(),
            Reg::B => self.b.into(),
            Reg::C => self.c.into(),
            Reg::D => self.d.into(),
            Reg::E => self.e.into(),
            Reg::H => self.h.into(),
            Reg::L => self.l.into(),
            Reg::I => self.i.into(),
            Reg::R => self.r.into(),
            Reg::Iff1 => self.iff1.into(),
            Reg::Iff2 => self.iff2.into(),
            Reg::Im => self.im.into(),
            Reg::IntVector => self.int_vector.into(),
            Reg::IntLine => self.int_line.bits().into(),
            Reg::Wz => self.wz,
        }
    }

    /// Store without status or range checks; `value` is truncated to the
    /// register width.
    pub(crate) fn write(&mut self, reg: Reg, value: u16) {
        let byte = value as u8;
        match reg {
            Reg::Af => self.set_af(value),
            Reg::Bc => self.set_bc(value),
            Reg::De => self.set_de(value),
            Reg::Hl => self.set_hl(value),
            Reg::Ix => self.ix = value,
            Reg::Iy => self.iy = value,
            Reg::Sp => self.sp = value,
            Reg::Pc => self.pc = value,
            Reg::AfAlt => self.af_alt = value,
            Reg::BcAlt => self.bc_alt = value,
            Reg::DeAlt => self.de_alt = value,
            Reg::HlAlt => self.hl_alt = value,
            Reg::A => self.a = byte,
            Reg::F => self.set_f(byte),
            Reg::B => self.b = byte,
            Reg::C => self.c = byte,
            Reg::D => self.d = byte,
            Reg::E => self.e = byte,
            Reg::H => self.h = byte,
            Reg::L => self.l = byte,
            Reg::I => self.i = byte,
            Reg::R => self.r = byte,
            Reg::Iff1 => self.iff1 = value != 0,
            Reg::Iff2 => self.iff2 = value != 0,
            Reg::Im => self.im = byte.min(2),
            Reg::IntVector => self.int_vector = byte,
            Reg::IntLine => self.int_line = IntLine::from_bits_truncate(byte),
            Reg::Wz => self.wz = value,
        }
    }

    /// Power-on state. Everything is cleared, including any fault.
    pub fn hard_reset(&mut self) {
        *self = Self::default();
    }

    /// The !RESET pin: IX, IY and the shadow set survive.
    pub fn soft_reset(&mut self) {
        self.pc = 0;
        self.sp = 0xFFFF;
        self.i = 0;
        self.r = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.im = 0;
        self.halted = false;
        self.int_line = IntLine::empty();
        if self.status != RunStatus::Faulted {
            self.status = RunStatus::Idle;
        }
    }
}
