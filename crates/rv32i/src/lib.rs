pub mod riscvm;

pub use riscvm::{
    inst::{ExecutionSnapshot, ExecutionTrace},
    instruction::{AluOp, BranchCond, DecodeError, Instruction, LoadKind, StoreWidth},
    memory::{Memory, MemoryError},
    reg::RegisterFile,
    vm::{ExecutionError, LoadError, Loading, Running, StepBudget, StepTrigger, VM},
};
