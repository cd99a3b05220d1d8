use super::decode::Instr;
use super::fields::sign_extend;
use super::halt::{HaltReason, WithPc};
use super::regs::A7;
use crate::cpu::Cpu;
use crate::mem::{Memory, Width};

/// `a7` value that requests program exit on `ecall`.
pub const EXIT_SYSCALL: i32 = 10;

/// Base plus offset as a signed sum; anything outside `0..=u32::MAX` is out of range.
fn effective_address(base: i32, off: i32, width: Width, pc: u32) -> Result<u32, HaltReason> {
    let addr = base as i64 + off as i64;
    u32::try_from(addr).map_err(|_| HaltReason::AccessOutOfRange {
        pc,
        addr,
        width: width.bytes(),
    })
}

fn load(
    cpu: &mut Cpu,
    mem: &Memory,
    rd: u8,
    rs1: u8,
    off: i32,
    width: Width,
    signed: bool,
) -> Result<(), HaltReason> {
    let pc = cpu.pc;
    let addr = effective_address(cpu.regs.read(rs1), off, width, pc)?;
    let raw = mem.read(addr, width).with_pc(pc)?;
    let value = match (width, signed) {
        (Width::Byte, true) => sign_extend(raw, 8),
        (Width::Half, true) => sign_extend(raw, 16),
        _ => raw as i32,
    };
    cpu.regs.write(rd, value);
    cpu.pc = pc.wrapping_add(4);
    Ok(())
}

fn store(
    cpu: &mut Cpu,
    mem: &mut Memory,
    rs1: u8,
    rs2: u8,
    off: i32,
    width: Width,
) -> Result<(), HaltReason> {
    let pc = cpu.pc;
    let addr = effective_address(cpu.regs.read(rs1), off, width, pc)?;
    mem.write(addr, width, cpu.regs.read(rs2) as u32).with_pc(pc)?;
    cpu.pc = pc.wrapping_add(4);
    Ok(())
}

/// Applies one decoded instruction. On `Err` nothing but the PC (for a
/// halting `ecall`) has been modified.
pub fn execute(cpu: &mut Cpu, mem: &mut Memory, instr: Instr) -> Result<(), HaltReason> {
    let pc = cpu.pc;
    let next = pc.wrapping_add(4);

    let r = |cpu: &Cpu, idx: u8| -> i32 { cpu.regs.read(idx) };
    let ru = |cpu: &Cpu, idx: u8| -> u32 { cpu.regs.read(idx) as u32 };
    let branch = |taken: bool, off: i32| -> u32 {
        if taken {
            pc.wrapping_add(off as u32)
        } else {
            next
        }
    };

    match instr {
        Instr::Add { rd, rs1, rs2 } => {
            cpu.regs.write(rd, r(cpu, rs1).wrapping_add(r(cpu, rs2)));
            cpu.pc = next;
        }
        Instr::Sub { rd, rs1, rs2 } => {
            cpu.regs.write(rd, r(cpu, rs1).wrapping_sub(r(cpu, rs2)));
            cpu.pc = next;
        }
        Instr::Sll { rd, rs1, rs2 } => {
            cpu.regs
                .write(rd, r(cpu, rs1).wrapping_shl(ru(cpu, rs2) & 0x1f));
            cpu.pc = next;
        }
        Instr::Slt { rd, rs1, rs2 } => {
            cpu.regs.write(rd, (r(cpu, rs1) < r(cpu, rs2)) as i32);
            cpu.pc = next;
        }
        Instr::Sltu { rd, rs1, rs2 } => {
            cpu.regs.write(rd, (ru(cpu, rs1) < ru(cpu, rs2)) as i32);
            cpu.pc = next;
        }
        Instr::Xor { rd, rs1, rs2 } => {
            cpu.regs.write(rd, r(cpu, rs1) ^ r(cpu, rs2));
            cpu.pc = next;
        }
        Instr::Srl { rd, rs1, rs2 } => {
            cpu.regs
                .write(rd, (ru(cpu, rs1) >> (ru(cpu, rs2) & 0x1f)) as i32);
            cpu.pc = next;
        }
        Instr::Sra { rd, rs1, rs2 } => {
            cpu.regs.write(rd, r(cpu, rs1) >> (ru(cpu, rs2) & 0x1f));
            cpu.pc = next;
        }
        Instr::Or { rd, rs1, rs2 } => {
            cpu.regs.write(rd, r(cpu, rs1) | r(cpu, rs2));
            cpu.pc = next;
        }
        Instr::And { rd, rs1, rs2 } => {
            cpu.regs.write(rd, r(cpu, rs1) & r(cpu, rs2));
            cpu.pc = next;
        }
        Instr::Addi { rd, rs1, imm } => {
            cpu.regs.write(rd, r(cpu, rs1).wrapping_add(imm));
            cpu.pc = next;
        }
        Instr::Slli { rd, rs1, shamt } => {
            cpu.regs.write(rd, r(cpu, rs1).wrapping_shl(shamt & 0x1f));
            cpu.pc = next;
        }
        Instr::Slti { rd, rs1, imm } => {
            cpu.regs.write(rd, (r(cpu, rs1) < imm) as i32);
            cpu.pc = next;
        }
        Instr::Sltiu { rd, rs1, imm } => {
            // immediate is sign-extended first, then compared unsigned
            cpu.regs.write(rd, (ru(cpu, rs1) < imm as u32) as i32);
            cpu.pc = next;
        }
        Instr::Xori { rd, rs1, imm } => {
            cpu.regs.write(rd, r(cpu, rs1) ^ imm);
            cpu.pc = next;
        }
        Instr::Srli { rd, rs1, shamt } => {
            cpu.regs.write(rd, (ru(cpu, rs1) >> (shamt & 0x1f)) as i32);
            cpu.pc = next;
        }
        Instr::Srai { rd, rs1, shamt } => {
            cpu.regs.write(rd, r(cpu, rs1) >> (shamt & 0x1f));
            cpu.pc = next;
        }
        Instr::Ori { rd, rs1, imm } => {
            cpu.regs.write(rd, r(cpu, rs1) | imm);
            cpu.pc = next;
        }
        Instr::Andi { rd, rs1, imm } => {
            cpu.regs.write(rd, r(cpu, rs1) & imm);
            cpu.pc = next;
        }
        Instr::Lb { rd, rs1, off } => load(cpu, mem, rd, rs1, off, Width::Byte, true)?,
        Instr::Lh { rd, rs1, off } => load(cpu, mem, rd, rs1, off, Width::Half, true)?,
        Instr::Lw { rd, rs1, off } => load(cpu, mem, rd, rs1, off, Width::Word, true)?,
        Instr::Lbu { rd, rs1, off } => load(cpu, mem, rd, rs1, off, Width::Byte, false)?,
        Instr::Lhu { rd, rs1, off } => load(cpu, mem, rd, rs1, off, Width::Half, false)?,
        Instr::Sb { rs1, rs2, off } => store(cpu, mem, rs1, rs2, off, Width::Byte)?,
        Instr::Sh { rs1, rs2, off } => store(cpu, mem, rs1, rs2, off, Width::Half)?,
        Instr::Sw { rs1, rs2, off } => store(cpu, mem, rs1, rs2, off, Width::Word)?,
        Instr::Beq { rs1, rs2, off } => {
            cpu.pc = branch(r(cpu, rs1) == r(cpu, rs2), off);
        }
        Instr::Bne { rs1, rs2, off } => {
            cpu.pc = branch(r(cpu, rs1) != r(cpu, rs2), off);
        }
        Instr::Blt { rs1, rs2, off } => {
            cpu.pc = branch(r(cpu, rs1) < r(cpu, rs2), off);
        }
        Instr::Bge { rs1, rs2, off } => {
            cpu.pc = branch(r(cpu, rs1) >= r(cpu, rs2), off);
        }
        Instr::Bltu { rs1, rs2, off } => {
            cpu.pc = branch(ru(cpu, rs1) < ru(cpu, rs2), off);
        }
        Instr::Bgeu { rs1, rs2, off } => {
            cpu.pc = branch(ru(cpu, rs1) >= ru(cpu, rs2), off);
        }
        Instr::Jal { rd, off } => {
            cpu.regs.write(rd, next as i32);
            cpu.pc = pc.wrapping_add(off as u32);
        }
        Instr::Jalr { rd, rs1, off } => {
            // read rs1 before the link write, rd may alias it
            let target = ru(cpu, rs1).wrapping_add(off as u32) & !1;
            cpu.regs.write(rd, next as i32);
            cpu.pc = target;
        }
        Instr::Lui { rd, imm } => {
            cpu.regs.write(rd, imm);
            cpu.pc = next;
        }
        Instr::Auipc { rd, imm } => {
            cpu.regs.write(rd, pc.wrapping_add(imm as u32) as i32);
            cpu.pc = next;
        }
        Instr::Ecall => {
            cpu.pc = next;
            if r(cpu, A7) == EXIT_SYSCALL {
                return Err(HaltReason::Exit { pc });
            }
        }
        Instr::Unsupported { inst } => {
            log::warn!("skipping unsupported instruction 0x{inst:08x} at pc=0x{pc:08x}");
            cpu.pc = next;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::decode;
    use proptest::prelude::*;
    use rstest::rstest;

    fn setup() -> (Cpu, Memory) {
        (Cpu::default(), Memory::new(4096))
    }

    fn run(cpu: &mut Cpu, mem: &mut Memory, inst: u32) -> Result<(), HaltReason> {
        let instr = decode(inst).expect("valid opcode");
        execute(cpu, mem, instr)
    }

    #[test]
    fn add_and_sub_wrap() {
        let (mut cpu, mut mem) = setup();
        cpu.regs.write(1, i32::MAX);
        cpu.regs.write(2, 1);
        run(&mut cpu, &mut mem, 0x0020_81b3).unwrap(); // add x3, x1, x2
        assert_eq!(cpu.regs.read(3), i32::MIN);
        run(&mut cpu, &mut mem, 0x4020_81b3).unwrap(); // sub x3, x1, x2
        assert_eq!(cpu.regs.read(3), i32::MAX - 1);
        assert_eq!(cpu.pc, 8);
    }

    #[test]
    fn shifts_use_low_five_bits() {
        let (mut cpu, mut mem) = setup();
        cpu.regs.write(1, -16);
        cpu.regs.write(2, 33);
        run(&mut cpu, &mut mem, 0x0020_91b3).unwrap(); // sll x3, x1, x2
        assert_eq!(cpu.regs.read(3), -32);
        run(&mut cpu, &mut mem, 0x0020_d1b3).unwrap(); // srl x3, x1, x2
        assert_eq!(cpu.regs.read(3), ((-16i32 as u32) >> 1) as i32);
        run(&mut cpu, &mut mem, 0x4020_d1b3).unwrap(); // sra x3, x1, x2
        assert_eq!(cpu.regs.read(3), -8);
    }

    #[test]
    fn signed_and_unsigned_compares() {
        let (mut cpu, mut mem) = setup();
        cpu.regs.write(1, -1);
        cpu.regs.write(2, 1);
        run(&mut cpu, &mut mem, 0x0020_a1b3).unwrap(); // slt x3, x1, x2
        assert_eq!(cpu.regs.read(3), 1);
        run(&mut cpu, &mut mem, 0x0020_b1b3).unwrap(); // sltu x3, x1, x2
        assert_eq!(cpu.regs.read(3), 0);
        // sltiu x3, x2, -1: 1 < 0xffffffff
        run(&mut cpu, &mut mem, 0xfff1_3193).unwrap();
        assert_eq!(cpu.regs.read(3), 1);
        // slti x3, x1, 0
        run(&mut cpu, &mut mem, 0x0000_a193).unwrap();
        assert_eq!(cpu.regs.read(3), 1);
    }

    #[test]
    fn immediate_logic_ops() {
        let (mut cpu, mut mem) = setup();
        cpu.regs.write(1, 0x0f0);
        run(&mut cpu, &mut mem, 0x0ff0_c113).unwrap(); // xori x2, x1, 0xff
        assert_eq!(cpu.regs.read(2), 0x00f);
        run(&mut cpu, &mut mem, 0x00f0_e113).unwrap(); // ori x2, x1, 0xf
        assert_eq!(cpu.regs.read(2), 0x0ff);
        run(&mut cpu, &mut mem, 0x0300_f113).unwrap(); // andi x2, x1, 0x30
        assert_eq!(cpu.regs.read(2), 0x030);
        cpu.regs.write(1, i32::MIN);
        run(&mut cpu, &mut mem, 0x41f0_d113).unwrap(); // srai x2, x1, 31
        assert_eq!(cpu.regs.read(2), -1);
        run(&mut cpu, &mut mem, 0x01f0_d113).unwrap(); // srli x2, x1, 31
        assert_eq!(cpu.regs.read(2), 1);
    }

    #[test]
    fn narrow_loads_extend_by_signedness() {
        let (mut cpu, mut mem) = setup();
        mem.write_u32(0x100, 0x8081_fff0).unwrap();
        cpu.regs.write(2, 0x100);
        run(&mut cpu, &mut mem, 0x0001_0283).unwrap(); // lb x5, 0(x2)
        assert_eq!(cpu.regs.read(5), -16);
        run(&mut cpu, &mut mem, 0x0001_4283).unwrap(); // lbu x5, 0(x2)
        assert_eq!(cpu.regs.read(5), 0xf0);
        run(&mut cpu, &mut mem, 0x0021_1283).unwrap(); // lh x5, 2(x2)
        assert_eq!(cpu.regs.read(5), 0x8081u16 as i16 as i32);
        run(&mut cpu, &mut mem, 0x0021_5283).unwrap(); // lhu x5, 2(x2)
        assert_eq!(cpu.regs.read(5), 0x8081);
        run(&mut cpu, &mut mem, 0x0001_2283).unwrap(); // lw x5, 0(x2)
        assert_eq!(cpu.regs.read(5), 0x8081_fff0u32 as i32);
    }

    #[test]
    fn stores_write_low_bytes() {
        let (mut cpu, mut mem) = setup();
        cpu.regs.write(1, 0x200);
        cpu.regs.write(2, 0x1234_5678);
        run(&mut cpu, &mut mem, 0x0020_8023).unwrap(); // sb x2, 0(x1)
        run(&mut cpu, &mut mem, 0x0020_9223).unwrap(); // sh x2, 4(x1)
        run(&mut cpu, &mut mem, 0x0020_a423).unwrap(); // sw x2, 8(x1)
        assert_eq!(mem.read_u32(0x200).unwrap(), 0x78);
        assert_eq!(mem.read_u32(0x204).unwrap(), 0x5678);
        assert_eq!(mem.read_u32(0x208).unwrap(), 0x1234_5678);
        assert_eq!(cpu.pc, 12);
    }

    #[test]
    fn out_of_range_load_halts_without_writing() {
        let (mut cpu, mut mem) = setup();
        cpu.regs.write(2, 4094);
        cpu.regs.write(5, 7);
        let err = run(&mut cpu, &mut mem, 0x0001_2283).unwrap_err(); // lw x5, 0(x2)
        assert_eq!(
            err,
            HaltReason::AccessOutOfRange { pc: 0, addr: 4094, width: 4 }
        );
        assert_eq!(cpu.regs.read(5), 7);
        assert_eq!(cpu.pc, 0);
    }

    #[test]
    fn negative_effective_address_halts() {
        let (mut cpu, mut mem) = setup();
        // sw x2, -4(x1) with x1 = 0
        let err = run(&mut cpu, &mut mem, 0xfe20_ae23).unwrap_err();
        assert_eq!(
            err,
            HaltReason::AccessOutOfRange { pc: 0, addr: -4, width: 4 }
        );
    }

    #[test]
    fn signed_address_sum_reaches_low_memory() {
        let (mut cpu, mut mem) = setup();
        mem.write_u32(4, 0xabcd).unwrap();
        cpu.regs.write(2, 8);
        run(&mut cpu, &mut mem, 0xffc1_2283).unwrap(); // lw x5, -4(x2)
        assert_eq!(cpu.regs.read(5), 0xabcd);
    }

    #[rstest]
    #[case::beq_taken(0x0020_8863, 5, 5, 16)] // beq x1, x2, 16
    #[case::beq_not_taken(0x0020_8863, 5, 6, 4)]
    #[case::bne_taken(0x0020_9863, 5, 6, 16)] // bne x1, x2, 16
    #[case::blt_signed(0x0020_c863, -1, 0, 16)] // blt x1, x2, 16
    #[case::bge_signed(0x0020_d863, -1, 0, 4)] // bge x1, x2, 16
    #[case::bltu_unsigned(0x0020_e863, -1, 0, 4)] // bltu x1, x2, 16
    #[case::bgeu_unsigned(0x0020_f863, -1, 0, 16)] // bgeu x1, x2, 16
    #[case::backwards(0xfe20_8ce3, 3, 3, -8)] // beq x1, x2, -8
    fn branch_outcomes(#[case] inst: u32, #[case] a: i32, #[case] b: i32, #[case] delta: i32) {
        let (mut cpu, mut mem) = setup();
        cpu.pc = 0x100;
        cpu.regs.write(1, a);
        cpu.regs.write(2, b);
        run(&mut cpu, &mut mem, inst).unwrap();
        assert_eq!(cpu.pc, 0x100u32.wrapping_add(delta as u32));
    }

    #[test]
    fn jal_links_and_jumps() {
        let (mut cpu, mut mem) = setup();
        cpu.pc = 0x40;
        run(&mut cpu, &mut mem, 0x0080_00ef).unwrap(); // jal x1, 8
        assert_eq!(cpu.regs.read(1), 0x44);
        assert_eq!(cpu.pc, 0x48);
        run(&mut cpu, &mut mem, 0xffdf_f06f).unwrap(); // jal x0, -4
        assert_eq!(cpu.pc, 0x44);
        assert_eq!(cpu.regs.read(0), 0);
    }

    #[test]
    fn jalr_clears_low_bit_and_reads_rs1_first() {
        let (mut cpu, mut mem) = setup();
        cpu.pc = 0x10;
        cpu.regs.write(1, 0x101);
        // jalr x1, 2(x1)
        run(&mut cpu, &mut mem, 0x0020_80e7).unwrap();
        assert_eq!(cpu.pc, 0x102);
        assert_eq!(cpu.regs.read(1), 0x14);
    }

    #[test]
    fn upper_immediates() {
        let (mut cpu, mut mem) = setup();
        cpu.pc = 0x20;
        run(&mut cpu, &mut mem, 0x1234_50b7).unwrap(); // lui x1, 0x12345
        assert_eq!(cpu.regs.read(1), 0x1234_5000);
        run(&mut cpu, &mut mem, 0x0000_1117).unwrap(); // auipc x2, 1
        assert_eq!(cpu.regs.read(2), 0x1024);
        assert_eq!(cpu.pc, 0x28);
    }

    #[test]
    fn ecall_exits_only_with_a7_ten() {
        let (mut cpu, mut mem) = setup();
        run(&mut cpu, &mut mem, 0x0000_0073).unwrap();
        assert_eq!(cpu.pc, 4);

        cpu.regs.write(A7, EXIT_SYSCALL);
        let err = run(&mut cpu, &mut mem, 0x0000_0073).unwrap_err();
        assert_eq!(err, HaltReason::Exit { pc: 4 });
        assert_eq!(cpu.pc, 8);
    }

    #[test]
    fn unsupported_sub_operation_only_advances_pc() {
        let (mut cpu, mut mem) = setup();
        cpu.regs.write(1, 6);
        cpu.regs.write(2, 7);
        let before = cpu.regs.clone();
        run(&mut cpu, &mut mem, 0x0220_81b3).unwrap(); // mul x3, x1, x2
        assert_eq!(cpu.regs, before);
        assert_eq!(cpu.pc, 4);
    }

    proptest! {
        #[test]
        fn addi_zero_is_identity(rs in 1u8..32, value in any::<i32>()) {
            let (mut cpu, mut mem) = setup();
            cpu.regs.write(rs, value);
            let inst = ((rs as u32) << 15) | ((rs as u32) << 7) | 0x13;
            run(&mut cpu, &mut mem, inst).unwrap();
            prop_assert_eq!(cpu.regs.read(rs), value);
            prop_assert_eq!(cpu.pc, 4);
        }

        #[test]
        fn store_word_then_load_word(addr in 0u32..=4092, value in any::<i32>()) {
            let (mut cpu, mut mem) = setup();
            cpu.regs.write(1, addr as i32);
            cpu.regs.write(2, value);
            run(&mut cpu, &mut mem, 0x0020_a023).unwrap(); // sw x2, 0(x1)
            run(&mut cpu, &mut mem, 0x0000_a183).unwrap(); // lw x3, 0(x1)
            prop_assert_eq!(cpu.regs.read(3), value);
        }

        #[test]
        fn writes_to_x0_are_discarded(inst in prop::sample::select(vec![
            0x0020_8033u32, // add x0, x1, x2
            0x0050_0013,    // addi x0, x0, 5
            0x1234_5037,    // lui x0, 0x12345
            0x0000_1017,    // auipc x0, 1
            0x0080_006f,    // jal x0, 8
            0x0000_a003,    // lw x0, 0(x1)
        ]), a in any::<i32>(), b in any::<i32>()) {
            let (mut cpu, mut mem) = setup();
            mem.write_u32(0, 0xffff_ffff).unwrap();
            cpu.regs.write(1, a & 0x7fc);
            cpu.regs.write(2, b);
            run(&mut cpu, &mut mem, inst).unwrap();
            prop_assert_eq!(cpu.regs.read(0), 0);
        }
    }
}
