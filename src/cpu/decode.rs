use std::fmt;

use thiserror::Error;

use super::fields::{funct3, funct7, imm_b, imm_i, imm_j, imm_s, imm_u, opcode, rd, rs1, rs2};

pub const OP: u32 = 0b0110011;
pub const OP_IMM: u32 = 0b0010011;
pub const LOAD: u32 = 0b0000011;
pub const STORE: u32 = 0b0100011;
pub const BRANCH: u32 = 0b1100011;
pub const JAL: u32 = 0b1101111;
pub const JALR: u32 = 0b1100111;
pub const LUI: u32 = 0b0110111;
pub const AUIPC: u32 = 0b0010111;
pub const SYSTEM: u32 = 0b1110011;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid opcode: 0x{inst:08x}")]
    InvalidOpcode { inst: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    // R-type (0b0110011)
    Add { rd: u8, rs1: u8, rs2: u8 },
    Sub { rd: u8, rs1: u8, rs2: u8 },
    Sll { rd: u8, rs1: u8, rs2: u8 },
    Slt { rd: u8, rs1: u8, rs2: u8 },
    Sltu { rd: u8, rs1: u8, rs2: u8 },
    Xor { rd: u8, rs1: u8, rs2: u8 },
    Srl { rd: u8, rs1: u8, rs2: u8 },
    Sra { rd: u8, rs1: u8, rs2: u8 },
    Or { rd: u8, rs1: u8, rs2: u8 },
    And { rd: u8, rs1: u8, rs2: u8 },
    // I-type arithmetic (0b0010011)
    Addi { rd: u8, rs1: u8, imm: i32 },
    Slli { rd: u8, rs1: u8, shamt: u32 },
    Slti { rd: u8, rs1: u8, imm: i32 },
    Sltiu { rd: u8, rs1: u8, imm: i32 },
    Xori { rd: u8, rs1: u8, imm: i32 },
    Srli { rd: u8, rs1: u8, shamt: u32 },
    Srai { rd: u8, rs1: u8, shamt: u32 },
    Ori { rd: u8, rs1: u8, imm: i32 },
    Andi { rd: u8, rs1: u8, imm: i32 },
    // I-type load (0b0000011)
    Lb { rd: u8, rs1: u8, off: i32 },
    Lh { rd: u8, rs1: u8, off: i32 },
    Lw { rd: u8, rs1: u8, off: i32 },
    Lbu { rd: u8, rs1: u8, off: i32 },
    Lhu { rd: u8, rs1: u8, off: i32 },
    // S-type (0b0100011)
    Sb { rs1: u8, rs2: u8, off: i32 },
    Sh { rs1: u8, rs2: u8, off: i32 },
    Sw { rs1: u8, rs2: u8, off: i32 },
    // B-type (0b1100011)
    Beq { rs1: u8, rs2: u8, off: i32 },
    Bne { rs1: u8, rs2: u8, off: i32 },
    Blt { rs1: u8, rs2: u8, off: i32 },
    Bge { rs1: u8, rs2: u8, off: i32 },
    Bltu { rs1: u8, rs2: u8, off: i32 },
    Bgeu { rs1: u8, rs2: u8, off: i32 },
    // J-type (0b1101111)
    Jal { rd: u8, off: i32 },
    // I-type jump (0b1100111)
    Jalr { rd: u8, rs1: u8, off: i32 },
    // U-type
    Lui { rd: u8, imm: i32 },   // 0b0110111
    Auipc { rd: u8, imm: i32 }, // 0b0010111
    // 0b1110011 with funct3=0; halts when a7 == 10
    Ecall,
    /// Known opcode, unrecognized funct3/funct7. Skipped without side effects.
    Unsupported { inst: u32 },
}

pub fn decode(inst: u32) -> Result<Instr, DecodeError> {
    let rd = rd(inst);
    let rs1 = rs1(inst);
    let rs2 = rs2(inst);
    let funct3 = funct3(inst);

    let instr = match opcode(inst) {
        OP => match (funct3, funct7(inst)) {
            (0x0, 0x00) => Instr::Add { rd, rs1, rs2 },
            (0x0, 0x20) => Instr::Sub { rd, rs1, rs2 },
            (0x1, 0x00) => Instr::Sll { rd, rs1, rs2 },
            (0x2, 0x00) => Instr::Slt { rd, rs1, rs2 },
            (0x3, 0x00) => Instr::Sltu { rd, rs1, rs2 },
            (0x4, 0x00) => Instr::Xor { rd, rs1, rs2 },
            (0x5, 0x00) => Instr::Srl { rd, rs1, rs2 },
            (0x5, 0x20) => Instr::Sra { rd, rs1, rs2 },
            (0x6, 0x00) => Instr::Or { rd, rs1, rs2 },
            (0x7, 0x00) => Instr::And { rd, rs1, rs2 },
            _ => Instr::Unsupported { inst },
        },
        OP_IMM => {
            let imm = imm_i(inst);
            let shamt = (imm & 0x1f) as u32;
            match funct3 {
                0x0 => Instr::Addi { rd, rs1, imm },
                0x1 => Instr::Slli { rd, rs1, shamt },
                0x2 => Instr::Slti { rd, rs1, imm },
                0x3 => Instr::Sltiu { rd, rs1, imm },
                0x4 => Instr::Xori { rd, rs1, imm },
                // imm[11:5] == 0x20 selects the arithmetic shift
                0x5 if (imm >> 5) & 0x7f == 0x20 => Instr::Srai { rd, rs1, shamt },
                0x5 => Instr::Srli { rd, rs1, shamt },
                0x6 => Instr::Ori { rd, rs1, imm },
                0x7 => Instr::Andi { rd, rs1, imm },
                _ => Instr::Unsupported { inst },
            }
        }
        LOAD => {
            let off = imm_i(inst);
            match funct3 {
                0x0 => Instr::Lb { rd, rs1, off },
                0x1 => Instr::Lh { rd, rs1, off },
                0x2 => Instr::Lw { rd, rs1, off },
                0x4 => Instr::Lbu { rd, rs1, off },
                0x5 => Instr::Lhu { rd, rs1, off },
                _ => Instr::Unsupported { inst },
            }
        }
        STORE => {
            let off = imm_s(inst);
            match funct3 {
                0x0 => Instr::Sb { rs1, rs2, off },
                0x1 => Instr::Sh { rs1, rs2, off },
                0x2 => Instr::Sw { rs1, rs2, off },
                _ => Instr::Unsupported { inst },
            }
        }
        BRANCH => {
            let off = imm_b(inst);
            match funct3 {
                0x0 => Instr::Beq { rs1, rs2, off },
                0x1 => Instr::Bne { rs1, rs2, off },
                0x4 => Instr::Blt { rs1, rs2, off },
                0x5 => Instr::Bge { rs1, rs2, off },
                0x6 => Instr::Bltu { rs1, rs2, off },
                0x7 => Instr::Bgeu { rs1, rs2, off },
                _ => Instr::Unsupported { inst },
            }
        }
        JAL => Instr::Jal {
            rd,
            off: imm_j(inst),
        },
        // funct3 is not checked
        JALR => Instr::Jalr {
            rd,
            rs1,
            off: imm_i(inst),
        },
        LUI => Instr::Lui {
            rd,
            imm: imm_u(inst),
        },
        AUIPC => Instr::Auipc {
            rd,
            imm: imm_u(inst),
        },
        SYSTEM => match funct3 {
            0x0 => Instr::Ecall,
            _ => Instr::Unsupported { inst },
        },
        _ => return Err(DecodeError::InvalidOpcode { inst }),
    };

    Ok(instr)
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instr::*;
        match *self {
            Add { rd, rs1, rs2 } => write!(f, "add x{rd}, x{rs1}, x{rs2}"),
            Sub { rd, rs1, rs2 } => write!(f, "sub x{rd}, x{rs1}, x{rs2}"),
            Sll { rd, rs1, rs2 } => write!(f, "sll x{rd}, x{rs1}, x{rs2}"),
            Slt { rd, rs1, rs2 } => write!(f, "slt x{rd}, x{rs1}, x{rs2}"),
            Sltu { rd, rs1, rs2 } => write!(f, "sltu x{rd}, x{rs1}, x{rs2}"),
            Xor { rd, rs1, rs2 } => write!(f, "xor x{rd}, x{rs1}, x{rs2}"),
            Srl { rd, rs1, rs2 } => write!(f, "srl x{rd}, x{rs1}, x{rs2}"),
            Sra { rd, rs1, rs2 } => write!(f, "sra x{rd}, x{rs1}, x{rs2}"),
            Or { rd, rs1, rs2 } => write!(f, "or x{rd}, x{rs1}, x{rs2}"),
            And { rd, rs1, rs2 } => write!(f, "and x{rd}, x{rs1}, x{rs2}"),
            Addi { rd, rs1, imm } => write!(f, "addi x{rd}, x{rs1}, {imm}"),
            Slli { rd, rs1, shamt } => write!(f, "slli x{rd}, x{rs1}, {shamt}"),
            Slti { rd, rs1, imm } => write!(f, "slti x{rd}, x{rs1}, {imm}"),
            Sltiu { rd, rs1, imm } => write!(f, "sltiu x{rd}, x{rs1}, {imm}"),
            Xori { rd, rs1, imm } => write!(f, "xori x{rd}, x{rs1}, {imm}"),
            Srli { rd, rs1, shamt } => write!(f, "srli x{rd}, x{rs1}, {shamt}"),
            Srai { rd, rs1, shamt } => write!(f, "srai x{rd}, x{rs1}, {shamt}"),
            Ori { rd, rs1, imm } => write!(f, "ori x{rd}, x{rs1}, {imm}"),
            Andi { rd, rs1, imm } => write!(f, "andi x{rd}, x{rs1}, {imm}"),
            Lb { rd, rs1, off } => write!(f, "lb x{rd}, {off}(x{rs1})"),
            Lh { rd, rs1, off } => write!(f, "lh x{rd}, {off}(x{rs1})"),
            Lw { rd, rs1, off } => write!(f, "lw x{rd}, {off}(x{rs1})"),
            Lbu { rd, rs1, off } => write!(f, "lbu x{rd}, {off}(x{rs1})"),
            Lhu { rd, rs1, off } => write!(f, "lhu x{rd}, {off}(x{rs1})"),
            Sb { rs1, rs2, off } => write!(f, "sb x{rs2}, {off}(x{rs1})"),
            Sh { rs1, rs2, off } => write!(f, "sh x{rs2}, {off}(x{rs1})"),
            Sw { rs1, rs2, off } => write!(f, "sw x{rs2}, {off}(x{rs1})"),
            Beq { rs1, rs2, off } => write!(f, "beq x{rs1}, x{rs2}, {off}"),
            Bne { rs1, rs2, off } => write!(f, "bne x{rs1}, x{rs2}, {off}"),
            Blt { rs1, rs2, off } => write!(f, "blt x{rs1}, x{rs2}, {off}"),
            Bge { rs1, rs2, off } => write!(f, "bge x{rs1}, x{rs2}, {off}"),
            Bltu { rs1, rs2, off } => write!(f, "bltu x{rs1}, x{rs2}, {off}"),
            Bgeu { rs1, rs2, off } => write!(f, "bgeu x{rs1}, x{rs2}, {off}"),
            Jal { rd, off } => write!(f, "jal x{rd}, {off}"),
            Jalr { rd, rs1, off } => write!(f, "jalr x{rd}, {off}(x{rs1})"),
            Lui { rd, imm } => write!(f, "lui x{rd}, 0x{:x}", (imm as u32) >> 12),
            Auipc { rd, imm } => write!(f, "auipc x{rd}, 0x{:x}", (imm as u32) >> 12),
            Ecall => write!(f, "ecall"),
            Unsupported { inst } => write!(f, "unsupported 0x{inst:08x}"),
        }
    }
}
