//! Interrupt acknowledgment: NMI priority, the EI shadow, the three
//! maskable modes and leaving HALT.

#![allow(clippy::unwrap_used)]

use cpu_z80::{InterruptState, Reg, RunOutcome, RunStatus, StepResult, Z80, Z80Config};
use emu_core::SimpleBus;

/// Fast RAM over the bottom 8 KiB, zero-filled, so everything not
/// explicitly loaded is a NOP.
fn machine(program: &[u8]) -> (Z80, SimpleBus) {
    let mut cpu = Z80::with_config(Z80Config::with_fast_ram(0x0000, 0x2000)).unwrap();
    cpu.fast_ram_mut().unwrap()[..program.len()].copy_from_slice(program);
    cpu.set(Reg::Sp, 0x2000).unwrap();
    (cpu, SimpleBus::new())
}

fn poke_fast(cpu: &mut Z80, address: u16, data: &[u8]) {
    let start = address as usize;
    cpu.fast_ram_mut().unwrap()[start..start + data.len()].copy_from_slice(data);
}

fn step(cpu: &mut Z80, bus: &mut SimpleBus) -> StepResult {
    let mut budget = i64::MAX;
    cpu.step(bus, &mut budget).unwrap()
}

/// The word on top of the stack.
fn top_of_stack(cpu: &Z80) -> u16 {
    let sp = cpu.regs().sp as usize;
    let ram = cpu.fast_ram().unwrap();
    u16::from_le_bytes([ram[sp], ram[sp + 1]])
}

#[test]
fn nmi_is_taken_while_int_is_masked() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::Iff1, 0).unwrap();
    cpu.set(Reg::Iff2, 1).unwrap();
    cpu.set(Reg::Im, 1).unwrap();

    cpu.raise_int(0x38);
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 4 });
    assert_eq!(cpu.regs().pc, 0x0001, "INT ignored with IFF1 clear");

    cpu.raise_nmi();
    assert_eq!(cpu.interrupt_state(), InterruptState::NmiPending);
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Nmi { cycles: 11 });

    assert_eq!(cpu.regs().pc, 0x0066);
    assert!(!cpu.regs().iff1);
    assert!(cpu.regs().iff2, "IFF2 keeps the pre-NMI state");
    assert_eq!(top_of_stack(&cpu), 0x0001);
    assert_eq!(cpu.interrupt_state(), InterruptState::IntPending);
}

#[test]
fn nmi_wins_over_int() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Iff2, 1).unwrap();
    cpu.set(Reg::Im, 1).unwrap();

    cpu.raise_int(0xFF);
    cpu.raise_nmi();
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Nmi { cycles: 11 });
    assert_eq!(cpu.regs().pc, 0x0066);
    assert_eq!(cpu.interrupt_state(), InterruptState::IntPending);

    // IFF1 is now clear, so the INT has to wait for RETN
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 4 });
    assert_eq!(cpu.regs().pc, 0x0067);
}

#[test]
fn retn_restores_iff1() {
    let (mut cpu, mut bus) = machine(&[]);
    poke_fast(&mut cpu, 0x0066, &[0xED, 0x45]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Iff2, 1).unwrap();

    step(&mut cpu, &mut bus);
    cpu.raise_nmi();
    step(&mut cpu, &mut bus);
    assert!(!cpu.regs().iff1);

    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 14 });
    assert_eq!(cpu.regs().pc, 0x0001);
    assert!(cpu.regs().iff1);
    assert_eq!(cpu.regs().sp, 0x2000);
}

#[test]
fn ei_holds_off_int_for_one_instruction() {
    // EI; NOP; NOP
    let (mut cpu, mut bus) = machine(&[0xFB, 0x00, 0x00]);
    cpu.set(Reg::Im, 1).unwrap();
    cpu.raise_int(0xFF);

    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 4 });
    assert!(cpu.regs().iff1);

    // The instruction after EI always runs
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 4 });
    assert_eq!(cpu.regs().pc, 0x0002);

    assert_eq!(step(&mut cpu, &mut bus), StepResult::Interrupt { cycles: 13 });
    assert_eq!(cpu.regs().pc, 0x0038);
    assert_eq!(top_of_stack(&cpu), 0x0002);
    assert!(!cpu.regs().iff1);
    assert!(!cpu.regs().iff2);
}

#[test]
fn ei_does_not_hold_off_nmi() {
    // EI; NOP
    let (mut cpu, mut bus) = machine(&[0xFB, 0x00]);
    step(&mut cpu, &mut bus);
    cpu.raise_nmi();
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Nmi { cycles: 11 });
    assert_eq!(top_of_stack(&cpu), 0x0001);
}

#[test]
fn repeated_ei_keeps_the_shadow() {
    // EI; EI; NOP
    let (mut cpu, mut bus) = machine(&[0xFB, 0xFB, 0x00]);
    cpu.set(Reg::Im, 1).unwrap();
    cpu.raise_int(0xFF);

    step(&mut cpu, &mut bus);
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 4 });
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 4 });
    assert_eq!(cpu.regs().pc, 0x0003);
    assert!(matches!(step(&mut cpu, &mut bus), StepResult::Interrupt { .. }));
}

#[test]
fn im0_takes_the_rst_target_from_the_vector() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Im, 0).unwrap();

    // RST 0x10
    cpu.raise_int(0xD7);
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Interrupt { cycles: 13 });
    assert_eq!(cpu.regs().pc, 0x0010);
    assert_eq!(top_of_stack(&cpu), 0x0000);
}

#[test]
fn im1_ignores_the_vector() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Im, 1).unwrap();

    cpu.raise_int(0x00);
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Interrupt { cycles: 13 });
    assert_eq!(cpu.regs().pc, 0x0038);
    assert_eq!(cpu.regs().wz, 0x0038);
}

#[test]
fn im2_reads_the_vector_table() {
    let (mut cpu, mut bus) = machine(&[]);
    poke_fast(&mut cpu, 0x1020, &[0x00, 0x08]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Im, 2).unwrap();
    cpu.set(Reg::I, 0x10).unwrap();

    cpu.raise_int(0x20);
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Interrupt { cycles: 19 });
    assert_eq!(cpu.regs().pc, 0x0800);
    assert_eq!(cpu.regs().wz, 0x0800);
}

#[test]
fn im2_table_outside_fast_ram_comes_from_the_bus() {
    let (mut cpu, mut bus) = machine(&[]);
    bus.load(0x40FE, &[0x34, 0x12]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Im, 2).unwrap();
    cpu.set(Reg::I, 0x40).unwrap();

    cpu.raise_int(0xFE);
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().pc, 0x1234);
}

#[test]
fn interrupt_leaves_halt_with_the_following_address() {
    // EI; HALT; NOP
    let (mut cpu, mut bus) = machine(&[0xFB, 0x76, 0x00]);
    poke_fast(&mut cpu, 0x0038, &[0xED, 0x4D]);
    cpu.set(Reg::Im, 1).unwrap();

    step(&mut cpu, &mut bus);
    step(&mut cpu, &mut bus);
    assert!(cpu.is_halted());
    assert_eq!(cpu.status(), RunStatus::Halted);
    assert_eq!(cpu.regs().pc, 0x0001, "PC stays on the HALT");

    assert_eq!(step(&mut cpu, &mut bus), StepResult::Halted { cycles: 4 });

    cpu.raise_int(0xFF);
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Interrupt { cycles: 13 });
    assert!(!cpu.is_halted());
    assert_eq!(cpu.status(), RunStatus::Idle);
    assert_eq!(top_of_stack(&cpu), 0x0002);

    // RETI lands after the HALT
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().pc, 0x0002);
}

#[test]
fn nmi_leaves_halt_even_with_interrupts_disabled() {
    // DI; HALT
    let (mut cpu, mut bus) = machine(&[0xF3, 0x76]);
    let outcome = cpu.run(&mut bus, 40).unwrap();
    assert_eq!(outcome, RunOutcome::Ran { cycles: 40 });
    assert_eq!(cpu.status(), RunStatus::Halted);

    cpu.raise_nmi();
    assert_eq!(step(&mut cpu, &mut bus), StepResult::Nmi { cycles: 11 });
    assert_eq!(top_of_stack(&cpu), 0x0002);
    assert_eq!(cpu.regs().pc, 0x0066);
}

#[test]
fn clear_int_withdraws_the_request() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Im, 1).unwrap();

    cpu.raise_int(0xFF);
    assert_eq!(cpu.interrupt_state(), InterruptState::IntPending);
    cpu.clear_int();
    assert_eq!(cpu.interrupt_state(), InterruptState::Idle);

    assert_eq!(step(&mut cpu, &mut bus), StepResult::Instruction { cycles: 4 });
    assert_eq!(cpu.regs().pc, 0x0001);
}

#[test]
fn masked_int_stays_latched() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::Im, 1).unwrap();
    cpu.raise_int(0xFF);

    for _ in 0..3 {
        step(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.interrupt_state(), InterruptState::IntPending);

    cpu.set(Reg::Iff1, 1).unwrap();
    assert!(matches!(step(&mut cpu, &mut bus), StepResult::Interrupt { .. }));
    assert_eq!(cpu.interrupt_state(), InterruptState::Idle);
}

#[test]
fn acknowledge_advances_r() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::R, 0x7F).unwrap();
    cpu.raise_nmi();
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.get(Reg::R).unwrap(), 0x00, "bit 7 kept, low bits wrap");
}

#[test]
fn run_samples_lines_between_instructions() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::Iff1, 1).unwrap();
    cpu.set(Reg::Im, 1).unwrap();
    cpu.raise_int(0xFF);

    // Acknowledge, then one NOP at 0x0038
    let outcome = cpu.run(&mut bus, 17).unwrap();
    assert_eq!(outcome, RunOutcome::Ran { cycles: 17 });
    assert_eq!(cpu.regs().pc, 0x0039);
    assert_eq!(cpu.read_odometer().get(), 17);
}

#[test]
fn interrupt_lines_are_registers() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.set(Reg::IntVector, 0xD7).unwrap();
    cpu.set(Reg::IntLine, 0b01).unwrap();
    cpu.set(Reg::Iff1, 1).unwrap();
    assert_eq!(cpu.interrupt_state(), InterruptState::IntPending);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().pc, 0x0010);
    assert_eq!(cpu.get(Reg::IntLine).unwrap(), 0);
}
