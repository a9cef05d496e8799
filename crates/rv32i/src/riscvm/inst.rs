use std::fmt::Display;

use crate::riscvm::{
    consts::{REG_COUNT, WORD_SIZE},
    imm::Fields,
    instruction::{AluOp, BranchCond, Instruction, LoadKind, StoreWidth},
    memory::MemoryError,
    reg::RegisterFile,
    vm::{ExecutionError, Running, VM},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTrace {
    pub word: u32,
    pub instruction: Instruction,
    pub input: ExecutionSnapshot,
    pub output: ExecutionSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSnapshot {
    pub pc: u32,
    pub regs: [u32; REG_COUNT],
}

impl ExecutionSnapshot {
    fn capture(pc: u32, regs: &RegisterFile) -> Self {
        ExecutionSnapshot {
            pc,
            regs: *regs.as_array(),
        }
    }
}

impl Display for ExecutionTrace {
    /// Opcode and rd field, the raw word, then the register file and pc after
    /// the step.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " {:X} {}", self.word.opcode(), self.word.rd())?;
        writeln!(f, " 0x{:08X} ", self.word)?;
        for (idx, value) in self.output.regs.iter().enumerate() {
            write!(f, "x{}: {:08X} ", idx, value)?;
            if (idx + 1) % 4 == 0 {
                writeln!(f)?;
            }
        }
        write!(f, "pc: {:08X}", self.output.pc)
    }
}

const INST_LEN: u32 = WORD_SIZE as u32;

impl VM<Running> {
    /// Decodes `word`, dispatches it to its handler and updates `pc`.
    ///
    /// On error the step has no effect on registers, memory or `pc`.
    pub(crate) fn execute_step(&mut self, word: u32) -> Result<ExecutionTrace, ExecutionError> {
        self.regs.clear_zero();

        let pc = self.pc;
        let instruction = Instruction::decode(word)
            .map_err(|source| ExecutionError::IllegalInstruction { pc, source })?;
        let input = ExecutionSnapshot::capture(pc, &self.regs);

        tracing::trace!("executing 0x{:x} - 0x{:08x} {}", pc, word, instruction);

        match instruction {
            Instruction::Lui { rd, imm } => self.inst_lui(rd, imm),
            Instruction::Auipc { rd, imm } => self.inst_auipc(rd, imm),
            Instruction::Jal { rd, offset } => self.inst_jal(rd, offset),
            Instruction::Jalr { rd, rs1, offset } => self.inst_jalr(rd, rs1, offset),
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                offset,
            } => self.inst_branch(cond, rs1, rs2, offset),
            Instruction::Load {
                kind,
                rd,
                rs1,
                offset,
            } => self.inst_load(kind, rd, rs1, offset),
            Instruction::Store {
                width,
                rs1,
                rs2,
                offset,
            } => self.inst_store(width, rs1, rs2, offset),
            Instruction::OpImm { op, rd, rs1, imm } => self.inst_op_imm(op, rd, rs1, imm),
            Instruction::Op { op, rd, rs1, rs2 } => self.inst_op(op, rd, rs1, rs2),
        }
        .map_err(|source| ExecutionError::Memory { pc, source })?;

        if !instruction.branch() {
            self.pc = pc.wrapping_add(INST_LEN);
            tracing::trace!(
                "non branching instruction incrementing pc 0x{:x} to 0x{:x}",
                pc,
                self.pc
            );
        }
        self.regs.clear_zero();

        if let Some(rd) = instruction.rd() {
            tracing::trace!("x{} <- 0x{:08x}", rd, self.regs.read(rd));
        }

        Ok(ExecutionTrace {
            word,
            instruction,
            input,
            output: ExecutionSnapshot::capture(self.pc, &self.regs),
        })
    }

    fn effective_addr(&self, rs1: u32, offset: i32) -> u32 {
        self.read_reg(rs1).wrapping_add(offset as u32)
    }

    fn inst_lui(&mut self, rd: u32, imm: u32) -> Result<(), MemoryError> {
        self.write_reg(rd, imm);
        Ok(())
    }

    fn inst_auipc(&mut self, rd: u32, imm: u32) -> Result<(), MemoryError> {
        let val = self.pc.wrapping_add(imm);
        self.write_reg(rd, val);
        tracing::trace!("\tAUIPC value 0x{:x}", val);
        Ok(())
    }

    fn inst_jal(&mut self, rd: u32, offset: i32) -> Result<(), MemoryError> {
        let link = self.pc.wrapping_add(INST_LEN);
        let new_pc = self.pc.wrapping_add(offset as u32);

        self.write_reg(rd, link);
        self.pc = new_pc;

        tracing::trace!("\tJAL link 0x{:x}, new pc 0x{:x}", link, new_pc);
        Ok(())
    }

    fn inst_jalr(&mut self, rd: u32, rs1: u32, offset: i32) -> Result<(), MemoryError> {
        let link = self.pc.wrapping_add(INST_LEN);
        // target uses rs1 before rd is overwritten, rd may equal rs1
        let new_pc = self.effective_addr(rs1, offset) & !1;

        self.pc = new_pc;
        self.write_reg(rd, link);
        tracing::trace!("\tJALR link 0x{:x}, new pc 0x{:x}", link, new_pc);
        Ok(())
    }

    fn inst_branch(
        &mut self,
        cond: BranchCond,
        rs1: u32,
        rs2: u32,
        offset: i32,
    ) -> Result<(), MemoryError> {
        let rs1_data = self.read_reg(rs1);
        let rs2_data = self.read_reg(rs2);
        if cond.holds(rs1_data, rs2_data) {
            let new_pc = self.pc.wrapping_add(offset as u32);
            tracing::trace!("\t{:?} branching from pc 0x{:x} to 0x{:x}", cond, self.pc, new_pc);
            self.pc = new_pc;
        } else {
            let new_pc = self.pc.wrapping_add(INST_LEN);
            tracing::trace!("\t{:?} not taken, continuing pc 0x{:x} to 0x{:x}", cond, self.pc, new_pc);
            self.pc = new_pc;
        }
        Ok(())
    }

    fn inst_load(
        &mut self,
        kind: LoadKind,
        rd: u32,
        rs1: u32,
        offset: i32,
    ) -> Result<(), MemoryError> {
        let addr = self.effective_addr(rs1, offset);
        let value = match kind {
            LoadKind::Byte => self.memory.read_byte(addr)? as i8 as i32 as u32,
            LoadKind::Half => self.memory.read_half(addr)? as i16 as i32 as u32,
            LoadKind::Word => self.memory.read_word(addr)?,
            LoadKind::ByteUnsigned => self.memory.read_byte(addr)? as u32,
            LoadKind::HalfUnsigned => self.memory.read_half(addr)? as u32,
        };
        self.write_reg(rd, value);

        tracing::trace!("\t{:?} load addr 0x{:x} - value 0x{:x}", kind, addr, value);
        Ok(())
    }

    fn inst_store(
        &mut self,
        width: StoreWidth,
        rs1: u32,
        rs2: u32,
        offset: i32,
    ) -> Result<(), MemoryError> {
        // M[rs1+offset] = reg[rs2]
        let addr = self.effective_addr(rs1, offset);
        let rs2_data = self.read_reg(rs2);
        match width {
            StoreWidth::Byte => self.memory.write_byte(addr, rs2_data as u8)?,
            StoreWidth::Half => self.memory.write_half(addr, rs2_data as u16)?,
            StoreWidth::Word => self.memory.write_word(addr, rs2_data)?,
        }

        tracing::trace!("\t{:?} store addr 0x{:x} - value 0x{:x}", width, addr, rs2_data);
        Ok(())
    }

    fn inst_op_imm(&mut self, op: AluOp, rd: u32, rs1: u32, imm: i32) -> Result<(), MemoryError> {
        let rs1_data = self.read_reg(rs1);
        let value = op.apply(rs1_data, imm as u32);
        self.write_reg(rd, value);
        tracing::trace!("\t{:?}I 0x{:x}, {} = 0x{:x}", op, rs1_data, imm, value);
        Ok(())
    }

    fn inst_op(&mut self, op: AluOp, rd: u32, rs1: u32, rs2: u32) -> Result<(), MemoryError> {
        let rs1_data = self.read_reg(rs1);
        let rs2_data = self.read_reg(rs2);
        let value = op.apply(rs1_data, rs2_data);
        self.write_reg(rd, value);
        tracing::trace!("\t{:?} 0x{:x}, 0x{:x} = 0x{:x}", op, rs1_data, rs2_data, value);
        Ok(())
    }
}
