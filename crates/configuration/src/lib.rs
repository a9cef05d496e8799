/// Default capacity of the VM's linear memory, in bytes.
pub const MEMORY_SIZE: usize = 64 * 1024;

/// Address of the first instruction fetched after boot.
pub const ENTRY_PC: u32 = 0;

/// Width of an instruction word and of the widest memory access, in bytes.
pub const WORD_SIZE: usize = 4;

/// Runtime knobs of a VM instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Capacity of the byte-addressable memory.
    pub memory_size: usize,
    /// Value of `pc` after boot.
    pub entry_pc: u32,
    /// Print the register dump after every step.
    pub dump_state: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            memory_size: MEMORY_SIZE,
            entry_pc: ENTRY_PC,
            dump_state: cfg!(debug_assertions),
        }
    }
}

impl VmConfig {
    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    pub fn with_entry_pc(mut self, entry_pc: u32) -> Self {
        self.entry_pc = entry_pc;
        self
    }

    pub fn with_dump_state(mut self, dump_state: bool) -> Self {
        self.dump_state = dump_state;
        self
    }

    /// Number of whole instruction words that fit into memory.
    pub const fn word_capacity(&self) -> usize {
        self.memory_size / WORD_SIZE
    }
}
