//! CLI definitions.

use std::path::PathBuf;

use clap::Parser;
use configuration::{ENTRY_PC, MEMORY_SIZE, VmConfig};

use crate::program::{DEMO_PROGRAM, ProgramError, parse_word, read_program};

#[derive(Parser, Debug)]
#[command(name = "stepper")]
#[command(about = "Steps an RV32I program one instruction per line of input")]
#[command(version)]
pub struct Cli {
    /// File with one hexadecimal instruction word per line
    #[arg(short, long, value_name = "FILE", conflicts_with = "words")]
    pub program: Option<PathBuf>,

    /// Hexadecimal instruction word to seed, may be repeated
    #[arg(short, long = "word", value_name = "HEX", value_parser = parse_word)]
    pub words: Vec<u32>,

    /// Memory capacity in bytes
    #[arg(long, default_value_t = MEMORY_SIZE)]
    pub memory_size: usize,

    /// Hexadecimal address of the first instruction
    #[arg(long, value_name = "HEX", default_value_t = ENTRY_PC, value_parser = parse_word)]
    pub entry: u32,

    /// Run this many steps without waiting for input
    #[arg(long)]
    pub steps: Option<u64>,

    /// Print the register dump after every step
    #[arg(long, conflicts_with = "no_dump")]
    pub dump: bool,

    /// Never print the register dump
    #[arg(long)]
    pub no_dump: bool,

    /// Enable trace logging of every executed instruction
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn config(&self) -> VmConfig {
        let defaults = VmConfig::default();
        let dump_state = if self.dump {
            true
        } else if self.no_dump {
            false
        } else {
            defaults.dump_state
        };

        defaults
            .with_memory_size(self.memory_size)
            .with_entry_pc(self.entry)
            .with_dump_state(dump_state)
    }

    /// Words to seed, falling back to the built-in demo program.
    pub fn program_words(&self) -> Result<Vec<u32>, ProgramError> {
        if let Some(path) = &self.program {
            return read_program(path);
        }
        if !self.words.is_empty() {
            return Ok(self.words.clone());
        }
        Ok(DEMO_PROGRAM.to_vec())
    }
}
