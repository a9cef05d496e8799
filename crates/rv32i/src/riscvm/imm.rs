//! Field extraction and immediate decoding for the RV32I encoding families.
//!
//! Every function here is total: any 32-bit word decodes to some value.

/// Register and function-selector fields shared by all encodings.
pub trait Fields {
    /// bits [6:0]
    fn opcode(self) -> u32;
    /// bits [11:7]
    fn rd(self) -> u32;
    /// bits [14:12]
    fn funct3(self) -> u32;
    /// bits [19:15]
    fn rs1(self) -> u32;
    /// bits [24:20]
    fn rs2(self) -> u32;
    /// bits [31:25]
    fn funct7(self) -> u32;
}

impl Fields for u32 {
    fn opcode(self) -> u32 {
        self & 0x7f
    }

    fn rd(self) -> u32 {
        (self >> 7) & 0x1f
    }

    fn funct3(self) -> u32 {
        (self >> 12) & 0x7
    }

    fn rs1(self) -> u32 {
        (self >> 15) & 0x1f
    }

    fn rs2(self) -> u32 {
        (self >> 20) & 0x1f
    }

    fn funct7(self) -> u32 {
        self >> 25
    }
}

/// All ones when bit 31 of `word` is set, zero otherwise.
const fn sign_fill(word: u32) -> u32 {
    ((word as i32) >> 31) as u32
}

/// imm[11:0] = word[31:20]
pub const fn i_imm(word: u32) -> i32 {
    (word as i32) >> 20
}

/// imm[11:5] = word[31:25], imm[4:0] = word[11:7]
pub const fn s_imm(word: u32) -> i32 {
    let upper = ((word & 0xfe00_0000) as i32) >> 20;
    upper | ((word >> 7) & 0x1f) as i32
}

/// imm[12|10:5] = word[31:25], imm[4:1|11] = word[11:7], imm[0] = 0
pub const fn b_imm(word: u32) -> i32 {
    let imm = (sign_fill(word) << 12)
        | (((word >> 7) & 0x1) << 11)
        | (((word >> 25) & 0x3f) << 5)
        | (((word >> 8) & 0xf) << 1);
    imm as i32
}

/// imm[20|10:1|11|19:12] = word[31:12], imm[0] = 0
pub const fn j_imm(word: u32) -> i32 {
    let imm = (sign_fill(word) << 20)
        | (word & 0x000f_f000)
        | (((word >> 20) & 0x1) << 11)
        | (((word >> 21) & 0x3ff) << 1);
    imm as i32
}

/// imm[31:12] = word[31:12], low 12 bits cleared.
pub const fn u_imm(word: u32) -> u32 {
    word & 0xffff_f000
}
