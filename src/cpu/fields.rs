//! Bit-field extraction for 32-bit RV32I instruction words.

/// Sign-extends the low `bits` bits of `value` to a full `i32`.
#[inline]
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    debug_assert!((1..=32).contains(&bits));
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

#[inline]
pub fn opcode(inst: u32) -> u32 {
    inst & 0x7f
}

#[inline]
pub fn rd(inst: u32) -> u8 {
    ((inst >> 7) & 0x1f) as u8
}

#[inline]
pub fn funct3(inst: u32) -> u32 {
    (inst >> 12) & 0x7
}

#[inline]
pub fn rs1(inst: u32) -> u8 {
    ((inst >> 15) & 0x1f) as u8
}

#[inline]
pub fn rs2(inst: u32) -> u8 {
    ((inst >> 20) & 0x1f) as u8
}

#[inline]
pub fn funct7(inst: u32) -> u32 {
    (inst >> 25) & 0x7f
}

/// imm[11:0] = inst[31:20]
#[inline]
pub fn imm_i(inst: u32) -> i32 {
    sign_extend((inst >> 20) & 0xfff, 12)
}

/// imm[11:5] = inst[31:25], imm[4:0] = inst[11:7]
#[inline]
pub fn imm_s(inst: u32) -> i32 {
    let imm11_5 = (inst >> 25) & 0x7f;
    let imm4_0 = (inst >> 7) & 0x1f;
    sign_extend((imm11_5 << 5) | imm4_0, 12)
}

/// imm[12] = inst[31], imm[10:5] = inst[30:25], imm[4:1] = inst[11:8], imm[11] = inst[7]
#[inline]
pub fn imm_b(inst: u32) -> i32 {
    let imm12 = (inst >> 31) & 0x1;
    let imm10_5 = (inst >> 25) & 0x3f;
    let imm4_1 = (inst >> 8) & 0xf;
    let imm11 = (inst >> 7) & 0x1;
    sign_extend(
        (imm12 << 12) | (imm11 << 11) | (imm10_5 << 5) | (imm4_1 << 1),
        13,
    )
}

/// imm[31:12] = inst[31:12], low 12 bits zero.
#[inline]
pub fn imm_u(inst: u32) -> i32 {
    sign_extend((inst >> 12) & 0xf_ffff, 20) << 12
}

/// imm[20] = inst[31], imm[10:1] = inst[30:21], imm[11] = inst[20], imm[19:12] = inst[19:12]
#[inline]
pub fn imm_j(inst: u32) -> i32 {
    let imm20 = (inst >> 31) & 0x1;
    let imm10_1 = (inst >> 21) & 0x3ff;
    let imm11 = (inst >> 20) & 0x1;
    let imm19_12 = (inst >> 12) & 0xff;
    sign_extend(
        (imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1),
        21,
    )
}
