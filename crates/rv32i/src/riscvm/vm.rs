use std::fmt::Display;

use configuration::VmConfig;
use thiserror::Error;

use crate::riscvm::{
    consts::WORD_SIZE,
    inst::ExecutionTrace,
    instruction::DecodeError,
    memory::{Memory, MemoryError},
    reg::{ABI_NAMES, RegisterFile},
};

pub trait VmState {}

/// Program is being seeded into memory, nothing executes yet.
#[derive(Debug)]
pub struct Loading {}

impl VmState for Loading {}

/// Booted VM, steps instructions starting at the configured entry.
#[derive(Debug)]
pub struct Running {
    /// First fault hit by this VM. Once set, the VM refuses to step.
    fault: Option<ExecutionError>,
    steps: u64,
}

impl VmState for Running {}

#[derive(Debug)]
pub struct VM<State: VmState> {
    /// 32 general-purpose registers, x0 hard-wired to zero.
    pub(crate) regs: RegisterFile,

    /// Byte offset of the next instruction to fetch.
    pub(crate) pc: u32,

    /// The main memory of the VM.
    pub(crate) memory: Memory,

    config: VmConfig,

    state: State,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("illegal instruction at pc 0x{pc:08x}: {source}")]
    IllegalInstruction { pc: u32, source: DecodeError },
    #[error("failed to fetch instruction at pc 0x{pc:08x}: {source}")]
    Fetch { pc: u32, source: MemoryError },
    #[error("memory fault executing instruction at pc 0x{pc:08x}: {source}")]
    Memory { pc: u32, source: MemoryError },
    #[error("vm already faulted and must be reset")]
    Faulted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("word index {0} does not map to a 32-bit address")]
    IndexOverflow(u32),
    #[error("entry pc 0x{0:x} is not aligned to a word boundary")]
    MisalignedEntry(u32),
    #[error("program of {words} words does not fit into {capacity} words of memory")]
    ProgramTooLarge { words: usize, capacity: usize },
    #[error("failed to seed memory: {0}")]
    Memory(#[from] MemoryError),
}

/// External signal gating each fetch-execute cycle.
pub trait StepTrigger {
    /// Blocks until the next step should run. Returns `false` once the
    /// harness wants the run to end.
    fn wait(&mut self) -> bool;
}

/// Allows a fixed number of steps, then stops.
#[derive(Debug, Clone, Copy)]
pub struct StepBudget(pub u64);

impl StepTrigger for StepBudget {
    fn wait(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }
        self.0 -= 1;
        true
    }
}

impl<State: VmState> VM<State> {
    pub fn read_reg(&self, i: u32) -> u32 {
        self.regs.read(i)
    }

    pub fn write_reg(&mut self, i: u32, data: u32) {
        self.regs.write(i, data)
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }
}

impl VM<Loading> {
    pub fn new(config: VmConfig) -> Self {
        VM {
            regs: RegisterFile::new(),
            pc: 0,
            memory: Memory::new(config.memory_size),
            config,
            state: Loading {},
        }
    }

    /// Writes `word` at word index `index`, that is at byte offset `index * 4`.
    pub fn load_word(&mut self, index: u32, word: u32) -> Result<(), LoadError> {
        let addr = index
            .checked_mul(WORD_SIZE as u32)
            .ok_or(LoadError::IndexOverflow(index))?;
        self.memory.write_word(addr, word)?;
        tracing::trace!("seeded 0x{:08x} at 0x{:x}", word, addr);
        Ok(())
    }

    /// Seeds consecutive words starting at the entry point, which must be
    /// word aligned.
    pub fn load_program(&mut self, words: &[u32]) -> Result<(), LoadError> {
        if self.config.entry_pc % WORD_SIZE as u32 != 0 {
            return Err(LoadError::MisalignedEntry(self.config.entry_pc));
        }
        let first = self.config.entry_pc / WORD_SIZE as u32;
        let capacity = self.config.word_capacity();
        if first as usize + words.len() > capacity {
            return Err(LoadError::ProgramTooLarge {
                words: words.len(),
                capacity: capacity.saturating_sub(first as usize),
            });
        }

        for (i, word) in words.iter().enumerate() {
            self.load_word(first + i as u32, *word)?;
        }
        tracing::debug!(
            "loaded program of {} words at 0x{:x}",
            words.len(),
            self.config.entry_pc
        );
        Ok(())
    }

    /// Seeds a single data byte at byte offset `addr`.
    pub fn write_byte(&mut self, addr: u32, data: u8) -> Result<(), LoadError> {
        Ok(self.memory.write_byte(addr, data)?)
    }

    pub fn boot(self) -> VM<Running> {
        tracing::debug!("booting vm at pc 0x{:x}", self.config.entry_pc);
        VM {
            regs: self.regs,
            pc: self.config.entry_pc,
            memory: self.memory,
            config: self.config,
            state: Running {
                fault: None,
                steps: 0,
            },
        }
    }
}

impl Default for VM<Loading> {
    fn default() -> Self {
        VM::new(VmConfig::default())
    }
}

impl VM<Running> {
    /// Reads the instruction word at `pc`.
    pub fn fetch(&self) -> Result<u32, ExecutionError> {
        self.memory
            .read_word(self.pc)
            .map_err(|source| ExecutionError::Fetch {
                pc: self.pc,
                source,
            })
    }

    /// Executes one instruction word as a single atomic step.
    ///
    /// The first error is latched; every later call returns
    /// [`ExecutionError::Faulted`] until the VM is reset.
    pub fn execute(&mut self, word: u32) -> Result<ExecutionTrace, ExecutionError> {
        if self.state.fault.is_some() {
            return Err(ExecutionError::Faulted);
        }
        let result = self.execute_step(word);
        self.record(result)
    }

    /// Fetches the instruction pointed at by `pc`, executes it and updates `pc`.
    pub fn step(&mut self) -> Result<ExecutionTrace, ExecutionError> {
        if self.state.fault.is_some() {
            return Err(ExecutionError::Faulted);
        }
        let result = self.fetch().and_then(|word| self.execute_step(word));
        self.record(result)
    }

    fn record(
        &mut self,
        result: Result<ExecutionTrace, ExecutionError>,
    ) -> Result<ExecutionTrace, ExecutionError> {
        match &result {
            Ok(_) => self.state.steps += 1,
            Err(err) => {
                tracing::error!("HALTING execution, {}", err);
                self.state.fault = Some(err.clone());
            }
        }
        result
    }

    /// Runs the fetch-execute loop, one step per `trigger` signal, handing
    /// each step's trace to `on_step`.
    ///
    /// Returns the number of steps executed once the trigger declines, or the
    /// fault that ended the run.
    pub fn run<T, F>(&mut self, trigger: &mut T, mut on_step: F) -> Result<u64, ExecutionError>
    where
        T: StepTrigger + ?Sized,
        F: FnMut(&ExecutionTrace),
    {
        let mut executed = 0;
        while trigger.wait() {
            let trace = self.step()?;
            on_step(&trace);
            executed += 1;
        }
        tracing::info!("step trigger closed after {} steps", executed);
        Ok(executed)
    }

    pub fn fault(&self) -> Option<&ExecutionError> {
        self.state.fault.as_ref()
    }

    /// Steps successfully executed since boot.
    pub fn steps(&self) -> u64 {
        self.state.steps
    }

    /// Discards all state, returning a zeroed VM ready to be seeded again.
    pub fn reset(mut self) -> VM<Loading> {
        self.memory.clear();
        VM {
            regs: RegisterFile::new(),
            pc: 0,
            memory: self.memory,
            config: self.config,
            state: Loading {},
        }
    }
}

impl Display for VM<Running> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== RISC-V VM State ===")?;
        writeln!(f, "Registers:")?;

        for i in (0..32).step_by(4) {
            write!(f, "  ")?;
            for j in 0..4 {
                let reg_idx = i + j;
                write!(
                    f,
                    "x{:2}({:>5}): 0x{:08x}  ",
                    reg_idx,
                    ABI_NAMES[reg_idx],
                    self.regs.read(reg_idx as u32)
                )?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\nProgram Counter:")?;
        writeln!(f, "  pc: 0x{:08x}", self.pc)?;

        writeln!(f, "\nExecution:")?;
        writeln!(f, "  steps: {}", self.state.steps)?;
        writeln!(f, "  memory: {} bytes", self.memory.capacity())?;
        if let Some(fault) = &self.state.fault {
            writeln!(f, "  fault: {}", fault)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn config() -> VmConfig {
        VmConfig::default().with_memory_size(64)
    }

    #[test]
    fn new_vm_is_zeroed() {
        let vm = VM::<Loading>::new(config()).boot();
        assert_eq!(vm.pc(), 0);
        assert!(vm.regs().as_array().iter().all(|r| *r == 0));
        assert_eq!(vm.memory(), &Memory::new(64));
        assert_eq!(vm.steps(), 0);
        assert!(vm.fault().is_none());
    }

    #[test]
    fn load_word_uses_word_index() {
        let mut vm = VM::<Loading>::new(config());
        vm.load_word(3, 0x123450b7).unwrap();
        assert_eq!(vm.memory().read_word(12).unwrap(), 0x123450b7);
        assert_eq!(
            vm.load_word(16, 0),
            Err(LoadError::Memory(MemoryError::OutOfBounds {
                addr: 64,
                len: 4,
                capacity: 64
            }))
        );
        assert_eq!(
            vm.load_word(u32::MAX, 0),
            Err(LoadError::IndexOverflow(u32::MAX))
        );
    }

    #[test]
    fn load_program_rejects_oversized_program() {
        let mut vm = VM::<Loading>::new(config());
        assert_eq!(
            vm.load_program(&[0x13; 17]),
            Err(LoadError::ProgramTooLarge {
                words: 17,
                capacity: 16
            })
        );
        vm.load_program(&[0x13; 16]).unwrap();
    }

    #[test]
    fn program_is_seeded_at_entry() {
        let mut vm = VM::<Loading>::new(config().with_entry_pc(0x20));
        vm.load_program(&[0x00500093]).unwrap();
        let mut vm = vm.boot();
        assert_eq!(vm.pc(), 0x20);
        vm.step().unwrap();
        assert_eq!(vm.read_reg(1), 5);
        assert_eq!(vm.pc(), 0x24);
    }

    #[test]
    fn load_program_rejects_misaligned_entry() {
        let mut vm = VM::<Loading>::new(config().with_entry_pc(0x22));
        assert_eq!(
            vm.load_program(&[0x00500093]),
            Err(LoadError::MisalignedEntry(0x22))
        );
        assert_eq!(vm.memory(), &Memory::new(64));
    }

    #[test]
    fn fetch_reads_big_endian_word_at_pc() {
        let mut vm = VM::<Loading>::new(config());
        vm.write_byte(0, 0x12).unwrap();
        vm.write_byte(1, 0x34).unwrap();
        vm.write_byte(2, 0x50).unwrap();
        vm.write_byte(3, 0xb7).unwrap();
        let vm = vm.boot();
        assert_eq!(vm.fetch().unwrap(), 0x123450b7);
    }

    #[test]
    fn step_executes_seeded_lui() {
        let mut vm = VM::<Loading>::new(config());
        vm.load_word(0, 0x123450b7).unwrap();
        let mut vm = vm.boot();

        let trace = vm.step().unwrap();
        assert_eq!(trace.word, 0x123450b7);
        assert_eq!(vm.read_reg(1), 0x1234_5000);
        assert_eq!(vm.pc(), 4);
        assert_eq!(vm.steps(), 1);
    }

    #[test]
    fn fault_is_latched_until_reset() {
        let mut vm = VM::<Loading>::new(config());
        vm.load_program(&[0x00500093]).unwrap();
        let mut vm = vm.boot();

        vm.step().unwrap();
        // word 1 is zero, which is not a valid instruction
        let err = vm.step().unwrap_err();
        assert!(matches!(err, ExecutionError::IllegalInstruction { pc: 4, .. }));
        assert_eq!(vm.fault(), Some(&err));
        assert_eq!(vm.step(), Err(ExecutionError::Faulted));
        assert_eq!(vm.execute(0x00000013), Err(ExecutionError::Faulted));
        assert_eq!(vm.pc(), 4);

        let vm = vm.reset();
        assert_eq!(vm.memory(), &Memory::new(64));
        assert_eq!(vm.read_reg(1), 0);
        let vm = vm.boot();
        assert!(vm.fault().is_none());
    }

    #[test]
    fn fetch_past_memory_end_faults() {
        let mut vm = VM::<Loading>::new(config());
        vm.load_word(15, 0x0000006f).unwrap(); // jal x0, 0
        let mut vm = vm.boot();
        vm.write_reg(1, 60);
        vm.execute(0x00008067).unwrap(); // jalr x0, 0(x1)
        vm.step().unwrap();
        assert_eq!(vm.pc(), 60);

        vm.execute(0x0040006f).unwrap(); // jal x0, 4
        assert_eq!(vm.pc(), 64);
        assert!(matches!(
            vm.step(),
            Err(ExecutionError::Fetch { pc: 64, .. })
        ));
    }

    #[test]
    fn run_honours_step_budget() {
        let mut vm = VM::<Loading>::new(config());
        vm.load_program(&[0x00108093, 0xffdff06f]).unwrap(); // addi x1, x1, 1; jal x0, -4
        let mut vm = vm.boot();

        let mut seen = Vec::new();
        let steps = vm
            .run(&mut StepBudget(7), |trace| seen.push(trace.input.pc))
            .unwrap();
        assert_eq!(steps, 7);
        assert_eq!(seen, [0, 4, 0, 4, 0, 4, 0]);
        assert_eq!(vm.read_reg(1), 4);
    }

    #[test]
    fn run_stops_on_fault() {
        let mut vm = VM::<Loading>::new(config());
        vm.load_program(&[0x00500093]).unwrap();
        let mut vm = vm.boot();
        let mut count = 0;
        let result = vm.run(&mut StepBudget(u64::MAX), |_| count += 1);
        assert!(matches!(
            result,
            Err(ExecutionError::IllegalInstruction { pc: 4, .. })
        ));
        assert_eq!(count, 1);
    }

    #[test]
    fn display_uses_abi_names() {
        let vm = VM::<Loading>::new(config()).boot();
        let dump = vm.to_string();
        assert!(dump.contains("x 2(   sp): 0x00000000"));
        assert!(dump.contains("pc: 0x00000000"));
    }
}
