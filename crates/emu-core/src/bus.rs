//! Memory bus interface and two stock implementations.

use crate::IoBus;

/// Memory bus interface.
///
/// The CPU reaches guest memory through this trait. The host does address
/// decoding and routes each access to RAM, ROM, bank latches or chip
/// registers. Word accesses are composed from byte accesses by the caller.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// A bus with nothing attached.
///
/// Reads float high (0xFF) and writes are discarded. Used when a host has
/// not wired up a memory map, so the CPU always has something to talk to.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenBus;

impl Bus for OpenBus {
    fn read(&mut self, _address: u16) -> u8 {
        0xFF
    }

    fn write(&mut self, _address: u16, _value: u8) {}
}

impl IoBus for OpenBus {
    fn read_io(&mut self, _port: u16) -> u8 {
        0xFF
    }

    fn write_io(&mut self, _port: u16, _value: u8) {}
}

/// Flat 64 KiB of RAM with a scriptable port space.
///
/// Port reads return the value set with [`SimpleBus::set_port`] (0xFF when
/// none was set). Every port write is recorded in order.
#[derive(Debug, Clone)]
pub struct SimpleBus {
    memory: Box<[u8; 0x10000]>,
    ports: [Option<u8>; 0x100],
    port_writes: Vec<(u16, u8)>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            ports: [None; 0x100],
            port_writes: Vec::new(),
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at 0xFFFF.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.memory[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    /// Little-endian word at `address`.
    #[must_use]
    pub fn peek_word(&self, address: u16) -> u16 {
        u16::from_le_bytes([self.peek(address), self.peek(address.wrapping_add(1))])
    }

    pub fn poke(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }

    /// Value returned by reads of any port whose low byte is `port`.
    pub fn set_port(&mut self, port: u8, value: u8) {
        self.ports[port as usize] = Some(value);
    }

    /// All port writes seen so far, oldest first.
    #[must_use]
    pub fn port_writes(&self) -> &[(u16, u8)] {
        &self.port_writes
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

impl IoBus for SimpleBus {
    fn read_io(&mut self, port: u16) -> u8 {
        self.ports[(port & 0xFF) as usize].unwrap_or(0xFF)
    }

    fn write_io(&mut self, port: u16, value: u8) {
        self.port_writes.push((port, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_bus_floats_high() {
        let mut bus = OpenBus;
        bus.write(0x1234, 0x00);
        assert_eq!(bus.read(0x1234), 0xFF);
        assert_eq!(bus.read_io(0x00FE), 0xFF);
    }

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0xAA, 0xBB]);
        assert_eq!(bus.peek(0xFFFF), 0xAA);
        assert_eq!(bus.peek(0x0000), 0xBB);
        assert_eq!(bus.peek_word(0xFFFF), 0xBBAA);
    }

    #[test]
    fn ports_decode_low_byte_and_log_writes() {
        let mut bus = SimpleBus::new();
        bus.set_port(0x40, 0x12);
        assert_eq!(bus.read_io(0x7F40), 0x12);
        assert_eq!(bus.read_io(0x0041), 0xFF);

        bus.write_io(0x0150, 0x9F);
        bus.write_io(0x0150, 0xBF);
        assert_eq!(bus.port_writes(), &[(0x0150, 0x9F), (0x0150, 0xBF)]);
    }
}
