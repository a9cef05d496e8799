pub use configuration::WORD_SIZE;

pub const HALF_WORD_SIZE: usize = WORD_SIZE / 2;

/// Number of general-purpose registers.
pub const REG_COUNT: usize = 32;

// Major opcodes, bits [6:0] of the instruction word.
pub const OPCODE_LUI: u32 = 0b011_0111;
pub const OPCODE_AUIPC: u32 = 0b001_0111;
pub const OPCODE_JAL: u32 = 0b110_1111;
pub const OPCODE_JALR: u32 = 0b110_0111;
pub const OPCODE_BRANCH: u32 = 0b110_0011;
pub const OPCODE_LOAD: u32 = 0b000_0011;
pub const OPCODE_STORE: u32 = 0b010_0011;
pub const OPCODE_OP_IMM: u32 = 0b001_0011;
pub const OPCODE_OP: u32 = 0b011_0011;

/// funct7 value selecting `sub` and the arithmetic right shifts.
pub const FUNCT7_ALT: u32 = 0b010_0000;
