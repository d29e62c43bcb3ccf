use crate::Bus;

/// A bus that also supports separate I/O port operations.
///
/// The Z80 has a separate 16-bit I/O address space accessed via IN and OUT.
/// Sound hardware (PSG, FM chip latches, bank registers) usually lives here
/// or is memory mapped, depending on the console.
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    ///
    /// The full 16-bit port address is supplied; `IN A,(n)` puts A on the
    /// upper half and `IN r,(C)` puts B there.
    fn read_io(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u16, value: u8);
}
