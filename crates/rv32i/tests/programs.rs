use configuration::VmConfig;
use rv32i::{ExecutionError, Instruction, Loading, Running, StepBudget, VM};
use test_log::test;

/// Minimal RV32I encoder for building test programs.
mod asm {
    fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        (((imm as u32) & 0xfff) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
        let imm = imm as u32;
        (((imm >> 5) & 0x7f) << 25)
            | (rs2 << 20)
            | (rs1 << 15)
            | (funct3 << 12)
            | ((imm & 0x1f) << 7)
            | 0x23
    }

    fn b_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
        let imm = imm as u32;
        (((imm >> 12) & 0x1) << 31)
            | (((imm >> 5) & 0x3f) << 25)
            | (rs2 << 20)
            | (rs1 << 15)
            | (funct3 << 12)
            | (((imm >> 1) & 0xf) << 8)
            | (((imm >> 11) & 0x1) << 7)
            | 0x63
    }

    pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 0b000, rd, 0x13)
    }

    pub fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
        (rs2 << 20) | (rs1 << 15) | (rd << 7) | 0x33
    }

    pub fn lbu(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b100, rd, 0x03)
    }

    pub fn lw(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b010, rd, 0x03)
    }

    pub fn sb(rs2: u32, rs1: u32, offset: i32) -> u32 {
        s_type(offset, rs2, rs1, 0b000)
    }

    pub fn sw(rs2: u32, rs1: u32, offset: i32) -> u32 {
        s_type(offset, rs2, rs1, 0b010)
    }

    pub fn bne(rs1: u32, rs2: u32, offset: i32) -> u32 {
        b_type(offset, rs2, rs1, 0b001)
    }

    pub fn jal(rd: u32, offset: i32) -> u32 {
        let imm = offset as u32;
        (((imm >> 20) & 0x1) << 31)
            | (((imm >> 1) & 0x3ff) << 21)
            | (((imm >> 11) & 0x1) << 20)
            | (((imm >> 12) & 0xff) << 12)
            | (rd << 7)
            | 0x6f
    }

    pub fn jalr(rd: u32, rs1: u32, offset: i32) -> u32 {
        i_type(offset, rs1, 0b000, rd, 0x67)
    }
}

fn boot(program: &[u32]) -> VM<Running> {
    let mut vm = VM::<Loading>::new(VmConfig::default().with_dump_state(false));
    vm.load_program(program).unwrap();
    vm.boot()
}

#[test]
fn encoder_matches_known_words() {
    assert_eq!(asm::addi(1, 0, 5), 0x00500093);
    assert_eq!(asm::bne(12, 0, -8), 0xfe061ce3);
    assert_eq!(asm::jal(0, -4), 0xffdff06f);
    assert_eq!(asm::sw(1, 2, -4), 0xfe112e23);
    assert_eq!(
        Instruction::decode(asm::jalr(0, 1, 0)),
        Ok(Instruction::Jalr {
            rd: 0,
            rs1: 1,
            offset: 0
        })
    );
}

#[test]
fn seeded_demo_program() {
    let mut vm = boot(&[0x123450b7, 0x10011b17, 0x008002ef, 0x00520463]);

    let steps = vm.run(&mut StepBudget(3), |_| {}).unwrap();
    assert_eq!(steps, 3);
    assert_eq!(vm.read_reg(1), 0x1234_5000);
    assert_eq!(vm.read_reg(22), 0x1001_1004);
    assert_eq!(vm.read_reg(5), 12);
    assert_eq!(vm.pc(), 16);

    // the jump skipped past the branch into zeroed memory
    let err = vm.step().unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::IllegalInstruction { pc: 16, .. }
    ));
}

#[test]
fn sum_loop() {
    let mut vm = boot(&[
        asm::addi(1, 0, 10),
        asm::addi(2, 0, 0),
        asm::add(2, 2, 1),
        asm::addi(1, 1, -1),
        asm::bne(1, 0, -8),
        asm::sw(2, 0, 0x100),
        asm::jal(0, 0),
    ]);

    vm.run(&mut StepBudget(50), |_| {}).unwrap();

    assert_eq!(vm.memory().read_word(0x100).unwrap(), 55);
    assert_eq!(vm.read_reg(1), 0);
    assert_eq!(vm.pc(), 24);
    assert!(vm.fault().is_none());
}

#[test]
fn call_and_return() {
    let mut vm = boot(&[
        asm::addi(10, 0, 6),
        asm::jal(1, 12),
        asm::addi(5, 10, 0),
        asm::jal(0, 0),
        // double a0
        asm::add(10, 10, 10),
        asm::jalr(0, 1, 0),
    ]);

    let mut pcs = Vec::new();
    vm.run(&mut StepBudget(6), |trace| pcs.push(trace.input.pc))
        .unwrap();

    assert_eq!(pcs, [0, 4, 16, 20, 8, 12]);
    assert_eq!(vm.read_reg(1), 8);
    assert_eq!(vm.read_reg(5), 12);
}

#[test]
fn byte_copy_loop() {
    let mut vm = VM::<Loading>::new(VmConfig::default());
    vm.load_program(&[
        asm::addi(1, 0, 0x200),
        asm::addi(2, 0, 0x300),
        asm::addi(3, 0, 4),
        asm::lbu(4, 1, 0),
        asm::sb(4, 2, 0),
        asm::addi(1, 1, 1),
        asm::addi(2, 2, 1),
        asm::addi(3, 3, -1),
        asm::bne(3, 0, -20),
        asm::lw(5, 2, -4),
        asm::jal(0, 0),
    ])
    .unwrap();
    for (i, byte) in [0xde, 0xad, 0xbe, 0xef].into_iter().enumerate() {
        vm.write_byte(0x200 + i as u32, byte).unwrap();
    }
    let mut vm = vm.boot();

    vm.run(&mut StepBudget(40), |_| {}).unwrap();

    assert_eq!(vm.read_reg(5), 0xdead_beef);
    assert_eq!(vm.memory().read_word(0x300).unwrap(), 0xdead_beef);
    assert_eq!(vm.pc(), 40);
}

#[test]
fn store_past_memory_end_ends_run() {
    let mut vm = VM::<Loading>::new(VmConfig::default().with_memory_size(256));
    vm.load_program(&[asm::addi(1, 0, 0x7ff), asm::sw(1, 1, 0), asm::jal(0, 0)])
        .unwrap();
    let mut vm = vm.boot();

    let result = vm.run(&mut StepBudget(10), |_| {});
    assert!(matches!(result, Err(ExecutionError::Memory { pc: 4, .. })));
    assert_eq!(vm.steps(), 1);
    assert_eq!(vm.step(), Err(ExecutionError::Faulted));
}
