//! Interactive harness around the rv32i engine: seeds a program, then runs
//! one fetch-execute cycle per line read from standard input.

mod cli;
mod program;
mod trigger;

use std::process::ExitCode;

use clap::Parser;
use rv32i::{ExecutionError, ExecutionTrace, LoadError, Loading, StepBudget, VM};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::{cli::Cli, program::ProgramError, trigger::LineTrigger};

#[derive(Error, Debug)]
enum StepperError {
    #[error("invalid program: {0}")]
    Program(#[from] ProgramError),
    #[error("failed to load program: {0}")]
    Load(#[from] LoadError),
    #[error("execution stopped: {0}")]
    Execution(#[from] ExecutionError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "rv32i=trace,stepper=trace"
    } else {
        "rv32i=info,stepper=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(steps) => {
            tracing::info!("executed {} steps", steps);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<u64, StepperError> {
    let words = cli.program_words()?;

    let mut vm = VM::<Loading>::new(cli.config());
    vm.load_program(&words)?;
    let mut vm = vm.boot();
    tracing::info!(
        "loaded {} words, {} bytes of memory, entry 0x{:x}",
        words.len(),
        vm.config().memory_size,
        vm.config().entry_pc
    );

    let dump_state = vm.config().dump_state;
    let print_step = |trace: &ExecutionTrace| {
        if dump_state {
            println!("{trace}");
        }
    };

    let result = match cli.steps {
        Some(budget) => vm.run(&mut StepBudget(budget), print_step),
        None => vm.run(&mut LineTrigger::new(std::io::stdin().lock()), print_step),
    };

    if dump_state || result.is_err() {
        println!("{vm}");
    }
    Ok(result?)
}
