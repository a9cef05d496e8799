use std::fmt::Display;

use thiserror::Error;

use crate::riscvm::{
    consts::{
        FUNCT7_ALT, OPCODE_AUIPC, OPCODE_BRANCH, OPCODE_JAL, OPCODE_JALR, OPCODE_LOAD, OPCODE_LUI,
        OPCODE_OP, OPCODE_OP_IMM, OPCODE_STORE,
    },
    imm::{Fields, b_imm, i_imm, j_imm, s_imm, u_imm},
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode 0x{opcode:02x} in instruction 0x{word:08x}")]
    UnknownOpcode { word: u32, opcode: u32 },
    #[error(
        "unknown function funct3 0b{funct3:03b} funct7 0x{funct7:02x} for opcode 0x{opcode:02x} in instruction 0x{word:08x}"
    )]
    UnknownFunct {
        word: u32,
        opcode: u32,
        funct3: u32,
        funct7: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

impl BranchCond {
    pub fn holds(self, a: u32, b: u32) -> bool {
        match self {
            BranchCond::Eq => a == b,
            BranchCond::Ne => a != b,
            BranchCond::Lt => (a as i32) < (b as i32),
            BranchCond::Ge => (a as i32) >= (b as i32),
            BranchCond::Ltu => a < b,
            BranchCond::Geu => a >= b,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            BranchCond::Eq => "beq",
            BranchCond::Ne => "bne",
            BranchCond::Lt => "blt",
            BranchCond::Ge => "bge",
            BranchCond::Ltu => "bltu",
            BranchCond::Geu => "bgeu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Byte,
    Half,
    Word,
    ByteUnsigned,
    HalfUnsigned,
}

impl LoadKind {
    fn mnemonic(self) -> &'static str {
        match self {
            LoadKind::Byte => "lb",
            LoadKind::Half => "lh",
            LoadKind::Word => "lw",
            LoadKind::ByteUnsigned => "lbu",
            LoadKind::HalfUnsigned => "lhu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWidth {
    Byte,
    Half,
    Word,
}

impl StoreWidth {
    fn mnemonic(self) -> &'static str {
        match self {
            StoreWidth::Byte => "sb",
            StoreWidth::Half => "sh",
            StoreWidth::Word => "sw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl AluOp {
    /// Applies the operation with modulo 2^32 arithmetic. Shift amounts use
    /// the low 5 bits of `b`.
    pub fn apply(self, a: u32, b: u32) -> u32 {
        let shamt = b & 0x1f;
        match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Sll => a << shamt,
            AluOp::Slt => ((a as i32) < (b as i32)) as u32,
            AluOp::Sltu => (a < b) as u32,
            AluOp::Xor => a ^ b,
            AluOp::Srl => a >> shamt,
            AluOp::Sra => shift_right_arithmetic(a, shamt),
            AluOp::Or => a | b,
            AluOp::And => a & b,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Sll => "sll",
            AluOp::Slt => "slt",
            AluOp::Sltu => "sltu",
            AluOp::Xor => "xor",
            AluOp::Srl => "srl",
            AluOp::Sra => "sra",
            AluOp::Or => "or",
            AluOp::And => "and",
        }
    }
}

/// Logical right shift with the vacated high bits filled with ones when the
/// sign bit of `value` is set.
pub fn shift_right_arithmetic(value: u32, shamt: u32) -> u32 {
    let shamt = shamt & 0x1f;
    let logical = value >> shamt;
    if value & 0x8000_0000 == 0 || shamt == 0 {
        return logical;
    }
    logical | (u32::MAX << (32 - shamt))
}

/// A decoded RV32I instruction, one variant per instruction family.
///
/// Immediates are already sign-extended. For shift-immediate operations `imm`
/// holds the 5-bit shift amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Lui {
        rd: u32,
        imm: u32,
    },
    Auipc {
        rd: u32,
        imm: u32,
    },
    Jal {
        rd: u32,
        offset: i32,
    },
    Jalr {
        rd: u32,
        rs1: u32,
        offset: i32,
    },
    Branch {
        cond: BranchCond,
        rs1: u32,
        rs2: u32,
        offset: i32,
    },
    Load {
        kind: LoadKind,
        rd: u32,
        rs1: u32,
        offset: i32,
    },
    Store {
        width: StoreWidth,
        rs1: u32,
        rs2: u32,
        offset: i32,
    },
    OpImm {
        op: AluOp,
        rd: u32,
        rs1: u32,
        imm: i32,
    },
    Op {
        op: AluOp,
        rd: u32,
        rs1: u32,
        rs2: u32,
    },
}

impl Instruction {
    /// Decodes a raw 32-bit instruction word.
    pub fn decode(word: u32) -> Result<Instruction, DecodeError> {
        let opcode = word.opcode();
        let funct3 = word.funct3();
        let funct7 = word.funct7();
        let rd = word.rd();
        let rs1 = word.rs1();
        let rs2 = word.rs2();

        let unknown_funct = DecodeError::UnknownFunct {
            word,
            opcode,
            funct3,
            funct7,
        };

        let inst = match opcode {
            OPCODE_LUI => Instruction::Lui {
                rd,
                imm: u_imm(word),
            },
            OPCODE_AUIPC => Instruction::Auipc {
                rd,
                imm: u_imm(word),
            },
            OPCODE_JAL => Instruction::Jal {
                rd,
                offset: j_imm(word),
            },
            OPCODE_JALR => match funct3 {
                0b000 => Instruction::Jalr {
                    rd,
                    rs1,
                    offset: i_imm(word),
                },
                _ => return Err(unknown_funct),
            },
            OPCODE_BRANCH => {
                let cond = match funct3 {
                    0b000 => BranchCond::Eq,
                    0b001 => BranchCond::Ne,
                    0b100 => BranchCond::Lt,
                    0b101 => BranchCond::Ge,
                    0b110 => BranchCond::Ltu,
                    0b111 => BranchCond::Geu,
                    _ => return Err(unknown_funct),
                };
                Instruction::Branch {
                    cond,
                    rs1,
                    rs2,
                    offset: b_imm(word),
                }
            }
            OPCODE_LOAD => {
                let kind = match funct3 {
                    0b000 => LoadKind::Byte,
                    0b001 => LoadKind::Half,
                    0b010 => LoadKind::Word,
                    0b100 => LoadKind::ByteUnsigned,
                    0b101 => LoadKind::HalfUnsigned,
                    _ => return Err(unknown_funct),
                };
                Instruction::Load {
                    kind,
                    rd,
                    rs1,
                    offset: i_imm(word),
                }
            }
            OPCODE_STORE => {
                let width = match funct3 {
                    0b000 => StoreWidth::Byte,
                    0b001 => StoreWidth::Half,
                    0b010 => StoreWidth::Word,
                    _ => return Err(unknown_funct),
                };
                Instruction::Store {
                    width,
                    rs1,
                    rs2,
                    offset: s_imm(word),
                }
            }
            OPCODE_OP_IMM => {
                let imm = i_imm(word);
                let (op, imm) = match (funct3, funct7) {
                    (0b000, _) => (AluOp::Add, imm),
                    (0b010, _) => (AluOp::Slt, imm),
                    (0b011, _) => (AluOp::Sltu, imm),
                    (0b100, _) => (AluOp::Xor, imm),
                    (0b110, _) => (AluOp::Or, imm),
                    (0b111, _) => (AluOp::And, imm),
                    (0b001, 0) => (AluOp::Sll, imm & 0x1f),
                    (0b101, 0) => (AluOp::Srl, imm & 0x1f),
                    (0b101, FUNCT7_ALT) => (AluOp::Sra, imm & 0x1f),
                    _ => return Err(unknown_funct),
                };
                Instruction::OpImm { op, rd, rs1, imm }
            }
            OPCODE_OP => {
                let op = match (funct3, funct7) {
                    (0b000, 0) => AluOp::Add,
                    (0b000, FUNCT7_ALT) => AluOp::Sub,
                    (0b001, 0) => AluOp::Sll,
                    (0b010, 0) => AluOp::Slt,
                    (0b011, 0) => AluOp::Sltu,
                    (0b100, 0) => AluOp::Xor,
                    (0b101, 0) => AluOp::Srl,
                    (0b101, FUNCT7_ALT) => AluOp::Sra,
                    (0b110, 0) => AluOp::Or,
                    (0b111, 0) => AluOp::And,
                    _ => return Err(unknown_funct),
                };
                Instruction::Op { op, rd, rs1, rs2 }
            }
            _ => return Err(DecodeError::UnknownOpcode { word, opcode }),
        };

        Ok(inst)
    }

    /// Destination register, if the instruction writes one.
    pub fn rd(&self) -> Option<u32> {
        match *self {
            Instruction::Lui { rd, .. }
            | Instruction::Auipc { rd, .. }
            | Instruction::Jal { rd, .. }
            | Instruction::Jalr { rd, .. }
            | Instruction::Load { rd, .. }
            | Instruction::OpImm { rd, .. }
            | Instruction::Op { rd, .. } => Some(rd),
            Instruction::Branch { .. } | Instruction::Store { .. } => None,
        }
    }

    /// True when the instruction assigns `pc` itself instead of falling
    /// through to the next word.
    pub fn branch(&self) -> bool {
        matches!(
            self,
            Instruction::Jal { .. } | Instruction::Jalr { .. } | Instruction::Branch { .. }
        )
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Instruction::Lui { rd, imm } => write!(f, "lui x{rd}, 0x{:x}", imm >> 12),
            Instruction::Auipc { rd, imm } => write!(f, "auipc x{rd}, 0x{:x}", imm >> 12),
            Instruction::Jal { rd, offset } => write!(f, "jal x{rd}, {offset}"),
            Instruction::Jalr { rd, rs1, offset } => write!(f, "jalr x{rd}, {offset}(x{rs1})"),
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} x{rs1}, x{rs2}, {offset}", cond.mnemonic()),
            Instruction::Load {
                kind,
                rd,
                rs1,
                offset,
            } => write!(f, "{} x{rd}, {offset}(x{rs1})", kind.mnemonic()),
            Instruction::Store {
                width,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} x{rs2}, {offset}(x{rs1})", width.mnemonic()),
            Instruction::OpImm { op, rd, rs1, imm } => {
                write!(f, "{}i x{rd}, x{rs1}, {imm}", op.mnemonic())
            }
            Instruction::Op { op, rd, rs1, rs2 } => {
                write!(f, "{} x{rd}, x{rs1}, x{rs2}", op.mnemonic())
            }
        }
    }
}
