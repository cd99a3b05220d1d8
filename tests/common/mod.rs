//! Tiny RV32I encoder for building test programs.
#![allow(dead_code)]

pub const A0: u32 = 10;
pub const A1: u32 = 11;
pub const A7: u32 = 17;
pub const RA: u32 = 1;
pub const SP: u32 = 2;

fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (((imm as u32) & 0xfff) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7f) << 25)
        | (rs2 << 20)
        | (rs1 << 15)
        | (funct3 << 12)
        | ((imm & 0x1f) << 7)
        | 0x23
}

fn b_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3f) << 25)
        | (rs2 << 20)
        | (rs1 << 15)
        | (funct3 << 12)
        | (((imm >> 1) & 0xf) << 8)
        | (((imm >> 11) & 0x1) << 7)
        | 0x63
}

pub fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0x00, rs2, rs1, 0x0, rd, 0x33)
}

pub fn mul(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0x01, rs2, rs1, 0x0, rd, 0x33)
}

pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0x0, rd, 0x13)
}

pub fn lw(rd: u32, rs1: u32, off: i32) -> u32 {
    i_type(off, rs1, 0x2, rd, 0x03)
}

pub fn sw(rs2: u32, rs1: u32, off: i32) -> u32 {
    s_type(off, rs2, rs1, 0x2)
}

pub fn bne(rs1: u32, rs2: u32, off: i32) -> u32 {
    b_type(off, rs2, rs1, 0x1)
}

pub fn jal(rd: u32, off: i32) -> u32 {
    let imm = off as u32;
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3ff) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xff) << 12)
        | (rd << 7)
        | 0x6f
}

pub fn jalr(rd: u32, rs1: u32, off: i32) -> u32 {
    i_type(off, rs1, 0x0, rd, 0x67)
}

pub fn lui(rd: u32, imm20: u32) -> u32 {
    (imm20 << 12) | (rd << 7) | 0x37
}

/// Load with an arbitrary funct3, e.g. 3 for the RV64 `ld`.
pub fn load(funct3: u32, rd: u32, rs1: u32, off: i32) -> u32 {
    i_type(off, rs1, funct3, rd, 0x03)
}

/// SYSTEM-opcode word with a CSR number in the immediate (`csrrw` for funct3 1).
pub fn system(funct3: u32, rd: u32, rs1: u32, csr: i32) -> u32 {
    i_type(csr, rs1, funct3, rd, 0x73)
}

pub fn ecall() -> u32 {
    0x0000_0073
}

/// `addi a7, x0, 10; ecall`
pub fn exit() -> [u32; 2] {
    [addi(A7, 0, 10), ecall()]
}

pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
