//! Z80 CPU core.
//!
//! The interpreter executes one whole instruction per step: fetch the
//! opcode (and any prefix) through the fetch map, decode it with a `match`,
//! perform its effects and charge its documented cost. A host drives it with
//! [`Z80::run`] and a cycle budget.

mod cb;
mod ed;
mod execute;

use emu_core::{Cpu, IoBus, Ticks};
use tracing::{debug, trace, warn};

use crate::config::{FastRamWindow, RefreshMode, Z80Config};
use crate::error::Z80Error;
use crate::fetch::{FetchMap, RegionId};
use crate::interrupt::IntLine;
use crate::odometer::Odometer;
use crate::registers::{Reg, RegisterFile, RunStatus};
use crate::timing;

/// Which register stands in for HL.
///
/// Set by a DD or FD prefix. H and L operands become the index register's
/// halves and `(HL)` becomes `(IX+d)`/`(IY+d)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexMode {
    Hl,
    Ix,
    Iy,
}

/// How a call to [`Z80::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Whole instructions were executed. `cycles` can exceed the budget by
    /// less than the cost of the final instruction; the excess is taken out
    /// of the next run.
    Ran { cycles: u64 },
    /// Debt from earlier overshoot or charged stalls covered the whole
    /// budget, so nothing was executed.
    OutOfCycles,
}

impl RunOutcome {
    /// Cycles executed during the call.
    #[must_use]
    pub const fn cycles(self) -> u64 {
        match self {
            Self::Ran { cycles } => cycles,
            Self::OutOfCycles => 0,
        }
    }
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Executed one instruction (prefixes included).
    Instruction { cycles: u32 },
    /// Acknowledged a non-maskable interrupt.
    Nmi { cycles: u32 },
    /// Acknowledged a maskable interrupt.
    Interrupt { cycles: u32 },
    /// Idled on HALT.
    Halted { cycles: u32 },
}

impl StepResult {
    #[must_use]
    pub const fn cycles(self) -> u32 {
        match self {
            Self::Instruction { cycles }
            | Self::Nmi { cycles }
            | Self::Interrupt { cycles }
            | Self::Halted { cycles } => cycles,
        }
    }
}

/// A Z80 with its own register file, fetch map and optional fast RAM.
///
/// The bus is not owned; it is lent to [`Z80::run`] and [`Z80::step`].
#[derive(Debug, Clone)]
pub struct Z80 {
    pub(crate) regs: RegisterFile,
    pub(crate) fetch: FetchMap,
    fast_ram: Option<(FastRamWindow, RegionId)>,
    odometer: Odometer,
    config: Z80Config,

    /// Set by EI. A maskable interrupt is not accepted at the boundary
    /// straight after.
    pub(crate) ei_shadow: bool,

    /// Taken-branch and block-repeat cycles for the current instruction.
    extra: u32,

    /// Monotonic cycle clock for [`RefreshMode::CycleDerived`]. Unlike the
    /// odometer the host cannot clear it.
    refresh_clock: u64,
    /// `refresh_clock` when R was last written.
    r_written_at: u64,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    /// A zeroed CPU with the default configuration and nothing mapped.
    #[must_use]
    pub fn new() -> Self {
        let config = Z80Config::default();
        Self {
            regs: RegisterFile::new(),
            fetch: FetchMap::new(config.unmapped_fill),
            fast_ram: None,
            odometer: Odometer::new(),
            config,
            ei_shadow: false,
            extra: 0,
            refresh_clock: 0,
            r_written_at: 0,
        }
    }

    /// Build a CPU from `config`, allocating and mapping the fast RAM
    /// window if one is given.
    pub fn with_config(config: Z80Config) -> Result<Self, Z80Error> {
        let mut cpu = Self::new();
        cpu.config = config;
        cpu.fetch = FetchMap::new(config.unmapped_fill);

        if let Some(window) = config.fast_ram {
            let window = window.validate()?;
            let region = cpu.fetch.add_region(vec![0; window.size]);
            let (first, last) = window.pages();
            cpu.fetch.map_fetch_region(first, last, region, 0)?;
            cpu.fast_ram = Some((window, region));
            debug!(base = window.base, size = window.size, "fast RAM window mapped");
        }
        Ok(cpu)
    }

    #[must_use]
    pub const fn config(&self) -> &Z80Config {
        &self.config
    }

    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.regs.status()
    }

    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.regs.halted
    }

    /// Direct view of the register file.
    ///
    /// In [`RefreshMode::CycleDerived`] the stored R is stale; use
    /// [`Z80::get`] with [`Reg::R`] for the live value.
    #[must_use]
    pub const fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    // === Register access ===

    pub fn get(&self, reg: Reg) -> Result<u16, Z80Error> {
        let value = self.regs.get(reg)?;
        Ok(if reg == Reg::R {
            self.refresh_value().into()
        } else {
            value
        })
    }

    pub fn set(&mut self, reg: Reg, value: u16) -> Result<(), Z80Error> {
        self.regs.set(reg, value)?;
        if reg == Reg::R {
            self.r_written_at = self.refresh_clock;
        }
        Ok(())
    }

    /// Copy of the complete register file for save states and debuggers.
    pub fn snapshot(&self) -> Result<RegisterFile, Z80Error> {
        if self.regs.status == RunStatus::Running {
            return Err(Z80Error::Busy);
        }
        let mut regs = self.regs.clone();
        regs.r = self.refresh_value();
        Ok(regs)
    }

    /// Load a register file taken with [`Z80::snapshot`]. A fault on this
    /// CPU is kept.
    pub fn restore(&mut self, snapshot: &RegisterFile) -> Result<(), Z80Error> {
        let status = self.regs.status;
        if status == RunStatus::Running {
            return Err(Z80Error::Busy);
        }
        self.regs = snapshot.clone();
        self.regs.status = status;
        if status != RunStatus::Faulted {
            self.settle_status();
        }
        self.r_written_at = self.refresh_clock;
        self.ei_shadow = false;
        Ok(())
    }

    // === Fetch map and fast RAM ===

    #[must_use]
    pub const fn fetch_map(&self) -> &FetchMap {
        &self.fetch
    }

    /// Hand a buffer to the fetch map. See [`FetchMap::add_region`].
    pub fn add_region(&mut self, data: Vec<u8>) -> RegionId {
        self.fetch.add_region(data)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut [u8]> {
        self.fetch.region_mut(id)
    }

    pub fn map_fetch_region(
        &mut self,
        first_page: u8,
        last_page: u8,
        region: RegionId,
        offset: usize,
    ) -> Result<(), Z80Error> {
        self.fetch
            .map_fetch_region(first_page, last_page, region, offset)
    }

    pub fn unmap_fetch_region(&mut self, first_page: u8, last_page: u8) -> Result<(), Z80Error> {
        self.fetch.unmap_fetch_region(first_page, last_page)
    }

    #[must_use]
    pub fn fast_ram(&self) -> Option<&[u8]> {
        self.fast_ram.and_then(|(_, id)| self.fetch.region(id))
    }

    pub fn fast_ram_mut(&mut self) -> Option<&mut [u8]> {
        let (_, id) = self.fast_ram?;
        self.fetch.region_mut(id)
    }

    // === Odometer ===

    /// Cycles counted since the odometer was last cleared.
    #[must_use]
    pub const fn read_odometer(&self) -> Ticks {
        self.odometer.read()
    }

    pub fn clear_odometer(&mut self) {
        self.odometer.clear();
    }

    /// Charge `cycles` of stall time. They count towards the odometer and
    /// come out of the next [`Z80::run`] budget.
    pub fn add_cycles(&mut self, cycles: u32) {
        self.odometer.charge(cycles);
        self.refresh_clock += u64::from(cycles);
    }

    #[must_use]
    pub const fn odometer(&self) -> &Odometer {
        &self.odometer
    }

    // === Lifecycle ===

    /// Power-on state: registers, interrupt lines, odometer and any fault
    /// are cleared. Mapped regions and fast RAM contents are kept.
    pub fn hard_reset(&mut self) {
        self.regs.hard_reset();
        self.odometer.reset();
        self.ei_shadow = false;
        self.extra = 0;
        self.refresh_clock = 0;
        self.r_written_at = 0;
        debug!("hard reset");
    }

    /// The !RESET pin. IX, IY, the shadow registers and the odometer are
    /// left alone.
    pub fn soft_reset(&mut self) {
        self.regs.soft_reset();
        self.ei_shadow = false;
        self.r_written_at = self.refresh_clock;
        debug!(pc = self.regs.pc, "soft reset");
    }

    /// Leave the Faulted state.
    pub fn clear_fault(&mut self) {
        if self.regs.status == RunStatus::Faulted {
            self.settle_status();
            debug!(status = ?self.regs.status, "fault cleared");
        }
    }

    // === Execution ===

    /// Execute instructions until `budget` cycles have been used.
    ///
    /// Interrupt lines are sampled before every instruction. The last
    /// instruction always completes, and whatever it overshoots by is
    /// carried into the next call. A halted CPU with no interrupt it can
    /// take idles through the remaining budget in one go.
    pub fn run<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        budget: u32,
    ) -> Result<RunOutcome, Z80Error> {
        self.enter()?;
        let Some(mut remaining) = self.odometer.begin(budget) else {
            self.settle_status();
            return Ok(RunOutcome::OutOfCycles);
        };

        let mut cycles = 0u64;
        while remaining > 0 {
            let result = self.execute_one(bus, &mut remaining);
            cycles += u64::from(result.cycles());
            if matches!(result, StepResult::Halted { .. }) && !self.wake_pending() {
                cycles += self.idle_halted(&mut remaining);
            }
        }

        self.odometer.end(remaining);
        self.settle_status();
        Ok(RunOutcome::Ran { cycles })
    }

    /// Execute one instruction (or interrupt acknowledgment, or one HALT
    /// idle) and take its cost from `budget`.
    ///
    /// Unlike [`Z80::run`], no debt is carried: `budget` is the caller's.
    pub fn step<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        budget: &mut i64,
    ) -> Result<StepResult, Z80Error> {
        self.enter()?;
        let result = self.execute_one(bus, budget);
        self.settle_status();
        Ok(result)
    }

    fn enter(&mut self) -> Result<(), Z80Error> {
        match self.regs.status {
            RunStatus::Faulted => Err(Z80Error::Faulted),
            RunStatus::Running => {
                // Only reachable when an earlier run unwound out of a bus
                // callback and left the CPU mid-instruction.
                warn!(pc = self.regs.pc, "run entered while already running, faulting CPU");
                self.regs.status = RunStatus::Faulted;
                Err(Z80Error::Reentered)
            }
            RunStatus::Idle | RunStatus::Halted => {
                self.regs.status = RunStatus::Running;
                Ok(())
            }
        }
    }

    fn settle_status(&mut self) {
        self.regs.status = if self.regs.halted {
            RunStatus::Halted
        } else {
            RunStatus::Idle
        };
    }

    fn execute_one<B: IoBus + ?Sized>(&mut self, bus: &mut B, budget: &mut i64) -> StepResult {
        let result = if let Some(ack) = self.service_interrupts(bus) {
            ack
        } else if self.regs.halted {
            self.refresh();
            StepResult::Halted {
                cycles: timing::HALTED,
            }
        } else {
            self.extra = 0;
            let cycles = self.dispatch(bus) + self.extra;
            StepResult::Instruction { cycles }
        };

        let cycles = result.cycles();
        *budget -= i64::from(cycles);
        self.odometer.advance(u64::from(cycles));
        self.refresh_clock += u64::from(cycles);
        result
    }

    /// True if an interrupt could be taken at the next instruction
    /// boundary.
    fn wake_pending(&self) -> bool {
        let line = self.regs.int_line;
        line.contains(IntLine::NMI) || (line.contains(IntLine::INT) && self.regs.iff1)
    }

    /// Burn the rest of `budget` in HALT idles. The lines can't change
    /// inside a run, so a halted CPU with nothing pending idles to the end.
    fn idle_halted(&mut self, budget: &mut i64) -> u64 {
        let idles = (*budget).max(0).unsigned_abs().div_ceil(u64::from(timing::HALTED));
        let cycles = idles * u64::from(timing::HALTED);
        if self.config.refresh == RefreshMode::PerFetch {
            self.regs.advance_r(idles);
        }
        *budget -= cycles as i64;
        self.odometer.advance(cycles);
        self.refresh_clock += cycles;
        trace!(idles, "halted through the rest of the budget");
        cycles
    }

    /// Decode prefixes and run one instruction. Returns its cost, not
    /// counting `self.extra`.
    fn dispatch<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let op = self.fetch_opcode();
        let mode = match op {
            0xDD => IndexMode::Ix,
            0xFD => IndexMode::Iy,
            _ => return self.dispatch_opcode(bus, op, IndexMode::Hl),
        };

        // In a run of DD/FD bytes only the last one counts. Each earlier
        // prefix is a 4-cycle step of its own.
        if matches!(self.fetch.peek(self.regs.pc), 0xDD | 0xFD) {
            return timing::PREFIX;
        }
        let op = self.fetch_opcode();
        timing::PREFIX + self.dispatch_opcode(bus, op, mode)
    }

    fn dispatch_opcode<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        op: u8,
        mode: IndexMode,
    ) -> u32 {
        match (op, mode) {
            (0xCB, IndexMode::Hl) => timing::PREFIX + self.execute_cb(bus),
            (0xCB, _) => timing::PREFIX + self.execute_indexed_cb(bus, mode),
            // ED discards any index prefix
            (0xED, _) => timing::PREFIX + self.execute_ed(bus),
            _ => self.execute(bus, op, mode),
        }
    }

    // === Fetch ===

    /// Fetch an opcode or prefix byte. Advances R.
    fn fetch_opcode(&mut self) -> u8 {
        let op = self.fetch_byte();
        self.refresh();
        op
    }

    /// Fetch an operand or displacement byte.
    pub(crate) fn fetch_byte(&mut self) -> u8 {
        let byte = self.fetch.fetch(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        byte
    }

    pub(crate) fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        u16::from_le_bytes([lo, hi])
    }

    // === Refresh register ===

    pub(crate) fn refresh(&mut self) {
        if self.config.refresh == RefreshMode::PerFetch {
            self.regs.increment_r();
        }
    }

    pub(crate) fn refresh_value(&self) -> u8 {
        match self.config.refresh {
            RefreshMode::PerFetch => self.regs.r,
            RefreshMode::CycleDerived => {
                let steps = (self.refresh_clock - self.r_written_at) / 4;
                let low = (u64::from(self.regs.r) + steps) as u8 & 0x7F;
                (self.regs.r & 0x80) | low
            }
        }
    }

    pub(crate) fn write_refresh(&mut self, value: u8) {
        self.regs.r = value;
        self.r_written_at = self.refresh_clock;
    }

    // === Data memory and I/O ===

    fn fast_ram_slot(&self, address: u16) -> Option<(RegionId, usize)> {
        let (window, region) = self.fast_ram?;
        window.offset_of(address).map(|offset| (region, offset))
    }

    pub(crate) fn read_byte<B: IoBus + ?Sized>(&mut self, bus: &mut B, address: u16) -> u8 {
        match self.fast_ram_slot(address) {
            Some((region, offset)) => self
                .fetch
                .region(region)
                .and_then(|ram| ram.get(offset))
                .copied()
                .unwrap_or(0xFF),
            None => bus.read(address),
        }
    }

    pub(crate) fn write_byte<B: IoBus + ?Sized>(&mut self, bus: &mut B, address: u16, value: u8) {
        match self.fast_ram_slot(address) {
            Some((region, offset)) => {
                if let Some(cell) = self
                    .fetch
                    .region_mut(region)
                    .and_then(|ram| ram.get_mut(offset))
                {
                    *cell = value;
                }
            }
            None => bus.write(address, value),
        }
    }

    /// Little-endian word from two byte reads.
    pub(crate) fn read_word<B: IoBus + ?Sized>(&mut self, bus: &mut B, address: u16) -> u16 {
        let lo = self.read_byte(bus, address);
        let hi = self.read_byte(bus, address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn write_word<B: IoBus + ?Sized>(&mut self, bus: &mut B, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(bus, address, lo);
        self.write_byte(bus, address.wrapping_add(1), hi);
    }

    pub(crate) fn push<B: IoBus + ?Sized>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_byte(bus, self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_byte(bus, self.regs.sp, lo);
    }

    pub(crate) fn pop<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let value = self.read_word(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }
}

impl Cpu for Z80 {
    type Registers = RegisterFile;
    type Error = Z80Error;

    fn run<B: IoBus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> Result<u64, Z80Error> {
        Self::run(self, bus, cycles).map(RunOutcome::cycles)
    }

    fn pc(&self) -> u32 {
        self.regs.pc.into()
    }

    fn registers(&self) -> RegisterFile {
        let mut regs = self.regs.clone();
        regs.r = self.refresh_value();
        regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn interrupt(&mut self, vector: u8) {
        self.raise_int(vector);
    }

    fn clear_interrupt(&mut self) {
        self.clear_int();
    }

    fn nmi(&mut self) {
        self.raise_nmi();
    }

    fn reset(&mut self) {
        self.hard_reset();
    }

    fn elapsed(&self) -> Ticks {
        self.odometer.read()
    }
}
