//! Branches, jumps/calls, `BRK`/`RTI`, flag-setting instructions, and
//! the illegal `NOP` variants.

use crate::constants::InterruptVector;
use crate::cpu::Cpu;
use crate::opcodes::Mode;
use crate::status::StatusFlag;

/// Shared branch body: `Mode::Relative` leaves `pc` just past the
/// operand byte and returns its raw (unsigned) value. Taking the branch
/// sign-extends it, adds it to that already-advanced `pc`, and bills one
/// extra cycle for the branch plus a second if the target lands on a
/// different page.
fn branch(cpu: &mut Cpu, mode: Mode, condition: bool) {
    let raw_offset = cpu.resolve_address(mode);
    if !condition {
        return;
    }
    let offset = raw_offset as u8 as i8;
    let base = cpu.pc;
    let target = base.wrapping_add(offset as i16 as u16);
    let page_changed = (base & 0xFF00) != (target & 0xFF00);
    cpu.pc = target;
    cpu.add_branch_cycle(1);
    if page_changed {
        cpu.add_branch_cycle(1);
    }
}

pub fn bpl(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, !cpu.status_flag(StatusFlag::Negative));
}
pub fn bmi(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, cpu.status_flag(StatusFlag::Negative));
}
pub fn bvc(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, !cpu.status_flag(StatusFlag::Overflow));
}
pub fn bvs(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, cpu.status_flag(StatusFlag::Overflow));
}
pub fn bcc(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, !cpu.status_flag(StatusFlag::Carry));
}
pub fn bcs(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, cpu.status_flag(StatusFlag::Carry));
}
pub fn bne(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, !cpu.status_flag(StatusFlag::Zero));
}
pub fn beq(cpu: &mut Cpu, mode: Mode) {
    branch(cpu, mode, cpu.status_flag(StatusFlag::Zero));
}

pub fn jmp(cpu: &mut Cpu, mode: Mode) {
    cpu.pc = cpu.resolve_address(mode);
}

pub fn jsr(cpu: &mut Cpu, mode: Mode) {
    let target = cpu.resolve_address(mode);
    let return_addr = cpu.pc.wrapping_sub(1);
    cpu.push_word(return_addr);
    cpu.pc = target;
}

pub fn rts(cpu: &mut Cpu, _mode: Mode) {
    let addr = cpu.pull_word();
    cpu.pc = addr.wrapping_add(1);
}

/// Software interrupt: pushes `pc+2` (skipping BRK's padding byte), then
/// status with B forced to 1 (the locked convention distinguishing a
/// software BRK from a hardware NMI/IRQ on the stack), and vectors
/// through the IRQ vector like a real interrupt.
pub fn brk(cpu: &mut Cpu, _mode: Mode) {
    cpu.pc = cpu.pc.wrapping_add(1);
    let pc = cpu.pc;
    cpu.push_word(pc);
    let status_byte = cpu.status.pack_for_push(true);
    cpu.push_byte(status_byte);
    cpu.set_status_flag(StatusFlag::InterruptDisable, true);
    cpu.pc = cpu.bus.read_word(InterruptVector::Irq.address());
}

pub fn rti(cpu: &mut Cpu, _mode: Mode) {
    let byte = cpu.pull_byte();
    cpu.status.unpack(byte);
    cpu.pc = cpu.pull_word();
}

pub fn clc(cpu: &mut Cpu, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::Carry, false);
}
pub fn sec(cpu: &mut Cpu, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::Carry, true);
}
pub fn cli(cpu: &mut Cpu, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::InterruptDisable, false);
}
pub fn sei(cpu: &mut Cpu, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::InterruptDisable, true);
}
pub fn cld(cpu: &mut Cpu, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::Decimal, false);
}
pub fn sed(cpu: &mut Cpu, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::Decimal, true);
}
pub fn clv(cpu: &mut Cpu, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::Overflow, false);
}

/// Covers both the single-byte documented `NOP` and the illegal
/// multi-byte variants; any operand bytes are still consumed so `pc`
/// lands in the right place for the next fetch.
pub fn nop(cpu: &mut Cpu, mode: Mode) {
    if mode != Mode::Implied {
        cpu.resolve_address(mode);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::SystemBus;
    use crate::ram::Ram;
    use crate::rom::Rom;

    fn cpu() -> Cpu {
        let ram = Ram::new();
        let rom = Rom::new(0x8000, 0xFFFF);
        Cpu::new(SystemBus::new(ram, rom))
    }

    #[test]
    fn branch_not_taken_still_consumes_the_operand_byte() {
        let mut cpu = cpu();
        cpu.pc = 0x0200;
        cpu.bus.write(0x0200, 0x10); // +16, but Zero is set so BNE won't take it
        cpu.status.set(StatusFlag::Zero, true);
        bne(&mut cpu, Mode::Relative);
        assert_eq!(cpu.pc, 0x0201);
    }

    #[test]
    fn taken_branch_crossing_a_page_bills_two_extra_cycles() {
        let mut cpu = cpu();
        cpu.pc = 0x02F0;
        cpu.bus.write(0x02F0, 0x10); // +16, lands on $0301: new page
        cpu.status.set(StatusFlag::Zero, true);
        beq(&mut cpu, Mode::Relative);
        assert_eq!(cpu.pc, 0x0301);
    }

    #[test]
    fn jsr_then_rts_round_trips_pc() {
        let mut cpu = cpu();
        cpu.pc = 0x0300;
        cpu.bus.write(0x0300, 0x00);
        cpu.bus.write(0x0301, 0x40);
        jsr(&mut cpu, Mode::Absolute);
        assert_eq!(cpu.pc, 0x4000);
        rts(&mut cpu, Mode::Implied);
        assert_eq!(cpu.pc, 0x0302);
    }

    #[test]
    fn brk_sets_break_bit_in_pushed_status_and_vectors_to_irq() {
        let mut cpu = cpu();
        cpu.bus.write(InterruptVector::Irq.address(), 0x00);
        cpu.bus.write(InterruptVector::Irq.address().wrapping_add(1), 0x90);
        cpu.pc = 0x0500;
        brk(&mut cpu, Mode::Implied);
        assert_eq!(cpu.pc, 0x9000);
        let pushed_status = cpu.pull_byte();
        assert!(pushed_status & StatusFlag::Break as u8 != 0);
        assert!(cpu.status_flag(StatusFlag::InterruptDisable));
    }

    #[test]
    fn rti_restores_pc_and_status_without_bumping_pc() {
        let mut cpu = cpu();
        cpu.pc = 0x0600;
        brk(&mut cpu, Mode::Implied);
        cpu.pc = 0x9000; // pretend a handler ran here
        rti(&mut cpu, Mode::Implied);
        assert_eq!(cpu.pc, 0x0601);
    }
}
