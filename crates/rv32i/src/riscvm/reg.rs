use std::fmt::Display;

use crate::riscvm::consts::REG_COUNT;

/// Hard-wired zero register.
pub const ZERO: u32 = 0;
/// Return address register.
pub const RA: u32 = 1;
/// Stack pointer register.
pub const SP: u32 = 2;

/// RISC-Vs calling convention https://riscv.org/wp-content/uploads/2024/12/riscv-calling.pdf
#[rustfmt::skip]
pub const ABI_NAMES: [&str; REG_COUNT] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2",
    "s0/fp", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7",
    "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
];

/// 32 general-purpose registers of 32 bits each.
///
/// Register x0 may be written, but it is cleared before every execution step
/// and reads always return zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile {
    regs: [u32; REG_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, i: u32) -> u32 {
        if i == ZERO {
            return 0;
        }
        self.regs[i as usize]
    }

    pub fn write(&mut self, i: u32, data: u32) {
        self.regs[i as usize] = data;
    }

    /// Forces x0 back to zero.
    pub fn clear_zero(&mut self) {
        self.regs[ZERO as usize] = 0;
    }

    pub fn as_array(&self) -> &[u32; REG_COUNT] {
        &self.regs
    }
}

impl Display for RegisterFile {
    /// Four registers per line, `xN: XXXXXXXX`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, value) in self.regs.iter().enumerate() {
            write!(f, "x{}: {:08X} ", idx, value)?;
            if (idx + 1) % 4 == 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
