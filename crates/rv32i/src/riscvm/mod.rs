pub mod consts;
pub mod imm;
pub mod inst;
pub mod instruction;
pub mod memory;
pub mod reg;
pub mod vm;
