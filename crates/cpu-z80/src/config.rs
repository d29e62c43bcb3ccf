//! Construction-time options.

use crate::error::Z80Error;

/// Opcode byte returned by unmapped fetch pages: HALT.
pub const DEFAULT_UNMAPPED_FILL: u8 = 0x76;

/// How the refresh register advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefreshMode {
    /// One step per opcode fetch, prefix bytes included. Matches silicon.
    #[default]
    PerFetch,
    /// Low seven bits derived from cycles elapsed since R was last written,
    /// one step per four cycles. Cheaper and close enough for code that
    /// only uses R as a random seed.
    CycleDerived,
}

/// A page-aligned block of RAM owned by the CPU.
///
/// Data accesses inside the window never reach the bus, and its pages are
/// mapped for instruction fetch, so code copied into it runs immediately.
/// Sound CPUs normally spend almost all their bus traffic here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastRamWindow {
    pub base: u16,
    pub size: usize,
}

impl FastRamWindow {
    pub(crate) fn validate(self) -> Result<Self, Z80Error> {
        let fits = usize::from(self.base)
            .checked_add(self.size)
            .is_some_and(|end| end <= 0x1_0000);
        if self.base & 0xFF != 0 || self.size == 0 || !self.size.is_multiple_of(0x100) || !fits {
            return Err(Z80Error::InvalidFastRam {
                base: self.base,
                size: self.size,
            });
        }
        Ok(self)
    }

    /// First and last page covered.
    pub(crate) fn pages(self) -> (u8, u8) {
        let first = (self.base >> 8) as u8;
        let last = (usize::from(self.base) + self.size - 1) >> 8;
        (first, last as u8)
    }

    /// Offset into the window if `address` falls inside it.
    #[must_use]
    pub fn offset_of(self, address: u16) -> Option<usize> {
        let offset = usize::from(address.wrapping_sub(self.base));
        (address >= self.base && offset < self.size).then_some(offset)
    }
}

/// Interpreter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Z80Config {
    pub refresh: RefreshMode,
    /// Byte read from fetch pages with nothing mapped.
    pub unmapped_fill: u8,
    pub fast_ram: Option<FastRamWindow>,
}

impl Default for Z80Config {
    fn default() -> Self {
        Self {
            refresh: RefreshMode::PerFetch,
            unmapped_fill: DEFAULT_UNMAPPED_FILL,
            fast_ram: None,
        }
    }
}

impl Z80Config {
    /// Default configuration with a fast RAM window.
    #[must_use]
    pub fn with_fast_ram(base: u16, size: usize) -> Self {
        Self {
            fast_ram: Some(FastRamWindow { base, size }),
            ..Self::default()
        }
    }
}
