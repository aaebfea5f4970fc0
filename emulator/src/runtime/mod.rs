//! The single-cycle execution engine.
//!
//! [`Processor`] owns the full architectural state: the register file, the
//! HI/LO pair, the program counter, the byte-addressable memory, and the
//! loaded program. Execution is fully synchronous; `step` commits exactly
//! one instruction and `run` is a bounded loop around `step`, so a host
//! that wants cancellable execution can drive `step` itself.

use thiserror::Error;
use tracing::debug;

mod control;
mod decode;
mod instructions;
mod memory;
mod registers;
mod trace;

pub use self::control::{control_signals, AluOp, Control, ControlSignals};
pub use self::decode::InstructionFields;
pub use self::instructions::{
    BranchOp, ImmediateOp, Instruction, JumpOp, MemoryOp, RegisterOp,
};
pub use self::memory::Memory;
pub use self::registers::{Reg, RegisterFile, RegisterParseError};
pub use self::trace::TraceEntry;

use crate::assembler::{assemble, AssemblerError, LoadedInstruction, Program};
use crate::constants::{Address, Word, STEP_LIMIT, TEXT_START};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("no program loaded")]
    NotLoaded,

    #[error("processor is halted")]
    Halted,

    #[error("PC out of bounds: {pc:#010x}")]
    PcOutOfBounds { pc: Address },

    #[error("maximum step limit reached")]
    StepLimitReached,
}

/// The result of one committed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// The instruction that committed
    pub instruction: Instruction,
    /// The address it was fetched from
    pub address: Address,
    /// Its encoded word
    pub word: u32,
    pub fields: InstructionFields,
    pub control: Control,
    /// The program counter after the commit
    pub next_pc: Address,
}

/// A MIPS32 processor
#[derive(Debug)]
pub struct Processor {
    pub(crate) registers: RegisterFile,
    pub(crate) hi: Word,
    pub(crate) lo: Word,
    pub(crate) memory: Memory,
    pub(crate) halted: bool,
    pc: Address,
    debug_mode: bool,
    program: Option<Program>,
    cycle: u64,
    instruction_count: u64,
    trace: Vec<TraceEntry>,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: RegisterFile::default(),
            hi: 0,
            lo: 0,
            memory: Memory::default(),
            halted: false,
            pc: TEXT_START,
            debug_mode: false,
            program: None,
            cycle: 0,
            instruction_count: 0,
            trace: Vec::new(),
        }
    }

    /// Assemble `source` and load it as the current program.
    ///
    /// The load is atomic: on an assembly error the previous program and
    /// all processor state are left untouched. On success the execution
    /// state is reset and the instruction count of the new program is
    /// returned.
    #[tracing::instrument(skip(self, source))]
    pub fn load(&mut self, source: &str) -> Result<usize, AssemblerError> {
        let program = assemble(source)?;
        let count = program.instructions.len();
        debug!(count, "Program loaded");
        self.program = Some(program);
        self.reset();
        Ok(count)
    }

    /// Re-zero registers, HI/LO, memory, counters and the trace log, and
    /// restore the PC to the start of the text segment.
    ///
    /// The loaded program is kept.
    pub fn reset(&mut self) {
        self.registers.clear();
        self.hi = 0;
        self.lo = 0;
        self.memory.clear();
        self.halted = false;
        self.pc = TEXT_START;
        self.cycle = 0;
        self.instruction_count = 0;
        self.trace.clear();
    }

    pub fn set_debug_mode(&mut self, debug_mode: bool) {
        self.debug_mode = debug_mode;
    }

    /// Fetch, execute and commit a single instruction.
    ///
    /// # Errors
    ///
    /// Fails if no program is loaded, if the processor is halted, or if
    /// the PC does not address a loaded instruction (which halts it).
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<StepOutcome, ProcessorError> {
        let program = self.program.as_ref().ok_or(ProcessorError::NotLoaded)?;
        if self.halted {
            return Err(ProcessorError::Halted);
        }

        let pc = self.pc;
        let index = pc.wrapping_sub(TEXT_START) / 4;
        let Some(loaded) = program.instructions.get(index as usize) else {
            self.halted = true;
            return Err(ProcessorError::PcOutOfBounds { pc });
        };

        let instruction = loaded.instruction;
        let word = loaded.word;
        let source = self.debug_mode.then(|| loaded.source.clone());

        let fields = InstructionFields::decode(word);
        let control = control_signals(fields);

        let next_pc = instruction.execute(self, pc);
        self.registers.pin_zero();
        self.pc = next_pc;
        self.cycle += 1;
        self.instruction_count += 1;

        if let Some(source) = source {
            self.trace.push(TraceEntry {
                cycle: self.cycle,
                pc,
                source,
                word,
                fields,
                control,
                registers: *self.registers.as_array(),
                hi: self.hi,
                lo: self.lo,
            });
        }

        debug!(pc, next_pc, %instruction, "Committed instruction");

        Ok(StepOutcome {
            instruction,
            address: pc,
            word,
            fields,
            control,
            next_pc,
        })
    }

    /// Step until the program halts.
    ///
    /// Returns the number of instructions committed when the program halts
    /// cleanly (`syscall` with `$v0 == 10`).
    ///
    /// # Errors
    ///
    /// Propagates [`ProcessorError::PcOutOfBounds`] when execution runs
    /// past the program, and fails with
    /// [`ProcessorError::StepLimitReached`] after [`STEP_LIMIT`]
    /// instructions in one invocation (the processor is left runnable).
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<usize, ProcessorError> {
        for steps in 1..=STEP_LIMIT {
            self.step()?;
            if self.halted {
                return Ok(steps);
            }
        }
        Err(ProcessorError::StepLimitReached)
    }

    // Read-only state snapshot, for front-ends.

    #[must_use]
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    #[must_use]
    pub fn register(&self, reg: Reg) -> Word {
        self.registers.get(reg)
    }

    #[must_use]
    pub fn pc(&self) -> Address {
        self.pc
    }

    #[must_use]
    pub fn hi(&self) -> Word {
        self.hi
    }

    #[must_use]
    pub fn lo(&self) -> Word {
        self.lo
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[must_use]
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn loaded(&self) -> bool {
        self.program.is_some()
    }

    #[must_use]
    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// The loaded instruction stream, empty when nothing is loaded
    #[must_use]
    pub fn instructions(&self) -> &[LoadedInstruction] {
        self.program
            .as_ref()
            .map(|program| program.instructions.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn processor_with(source: &str) -> Processor {
        let mut processor = Processor::new();
        processor.load(source).unwrap();
        processor
    }

    #[test]
    fn arithmetic_and_sign_extension_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 5
             addi $t1, $zero, -3
             add  $t2, $t0, $t1",
        );

        // Running past the end of the program is an error halt
        assert_eq!(
            processor.run(),
            Err(ProcessorError::PcOutOfBounds { pc: 0x0040_000C })
        );
        assert_eq!(processor.register(Reg::T0), 0x0000_0005);
        assert_eq!(processor.register(Reg::T1), 0xFFFF_FFFD);
        assert_eq!(processor.register(Reg::T2), 0x0000_0002);
        assert_eq!(processor.pc(), 0x0040_000C);
        assert!(processor.halted());
    }

    #[test]
    fn upper_immediate_composition_test() {
        let mut processor = processor_with(
            "lui $t0, 0xDEAD
             ori $t0, $t0, 0xBEEF",
        );
        let _ = processor.run();
        assert_eq!(processor.register(Reg::T0), 0xDEAD_BEEF);
    }

    #[test]
    fn memory_round_trip_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 0x100
             addi $t1, $zero, 0x42
             sw   $t1, 0($t0)
             lw   $t2, 0($t0)",
        );
        let _ = processor.run();

        assert_eq!(processor.register(Reg::T2), 0x42);
        // Big-endian byte layout
        assert_eq!(processor.memory().peek_byte(0x100), 0x00);
        assert_eq!(processor.memory().peek_byte(0x101), 0x00);
        assert_eq!(processor.memory().peek_byte(0x102), 0x00);
        assert_eq!(processor.memory().peek_byte(0x103), 0x42);
        for address in 0x100..=0x103 {
            assert!(processor.memory().is_touched(address));
        }
    }

    #[test]
    fn loop_with_branch_test() {
        let mut processor = processor_with(
            "       addi $t0, $zero, 3
                    addi $t1, $zero, 0
             loop:  addi $t1, $t1, 1
                    addi $t0, $t0, -1
                    bne  $t0, $zero, loop",
        );
        let _ = processor.run();

        assert_eq!(processor.register(Reg::T0), 0);
        assert_eq!(processor.register(Reg::T1), 3);
        // Two instructions of prologue plus three loop iterations
        assert_eq!(processor.instruction_count(), 11);
        assert_eq!(processor.cycle(), processor.instruction_count());
    }

    #[test]
    fn jump_and_link_test() {
        let mut processor = processor_with(
            "       jal  fn
                    addi $v0, $zero, 10
                    syscall
             fn:    addi $v1, $zero, 7
                    jr   $ra",
        );
        let steps = processor.run().unwrap();

        assert_eq!(steps, 5);
        assert!(processor.halted());
        assert_eq!(processor.register(Reg::V1), 7);
        assert_eq!(processor.register(Reg::V0), 10);
        // $ra holds the address of the instruction after the jal
        assert_eq!(processor.register(Reg::Ra), TEXT_START + 4);
    }

    #[test]
    fn register_zero_is_pinned_test() {
        let mut processor = processor_with("addi $zero, $zero, 5");
        processor.step().unwrap();
        assert_eq!(processor.register(Reg::Zero), 0);
    }

    #[test]
    fn shift_semantics_test() {
        let mut processor = processor_with(
            "lui $t0, 0x8000
             sra $t1, $t0, 1
             srl $t2, $t0, 1",
        );
        let _ = processor.run();
        assert_eq!(processor.register(Reg::T0), 0x8000_0000);
        assert_eq!(processor.register(Reg::T1), 0xC000_0000);
        assert_eq!(processor.register(Reg::T2), 0x4000_0000);
    }

    #[test]
    fn jump_stays_in_region_test() {
        let mut processor = processor_with(
            "       j    target
                    nop
             target: addi $v0, $zero, 10
                    syscall",
        );
        let before = processor.pc();
        processor.step().unwrap();
        assert_eq!(processor.pc() & 0xF000_0000, (before + 4) & 0xF000_0000);
        assert_eq!(processor.pc(), TEXT_START + 8);
    }

    #[test]
    fn variable_shift_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 1
             addi $t1, $zero, 33
             sllv $t2, $t0, $t1",
        );
        let _ = processor.run();
        // Shift amounts are taken modulo 32
        assert_eq!(processor.register(Reg::T2), 2);
    }

    #[test]
    fn jump_and_link_register_test() {
        let mut processor = processor_with(
            "       jalr $t0, $t1
             back:  addi $v0, $zero, 10
                    syscall",
        );
        // $t1 is zero, so the jump lands outside the program
        processor.step().unwrap();
        assert_eq!(processor.register(Reg::T0), TEXT_START + 4);
        assert_eq!(processor.pc(), 0);
    }

    #[test]
    fn set_on_less_than_immediate_test() {
        let mut processor = processor_with(
            "addi  $t0, $zero, -5
             slti  $t1, $t0, -4
             sltiu $t2, $t0, -4",
        );
        let _ = processor.run();
        // Signed: -5 < -4. Unsigned: 0xFFFFFFFB < 0xFFFFFFFC too.
        assert_eq!(processor.register(Reg::T1), 1);
        assert_eq!(processor.register(Reg::T2), 1);
    }

    #[test]
    fn mult_div_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, -6
             addi $t1, $zero, 4
             mult $t0, $t1
             mflo $t2
             mfhi $t3
             div  $t0, $t1
             mflo $t4
             mfhi $t5",
        );
        let _ = processor.run();
        assert_eq!(processor.register(Reg::T2), (-24i32) as u32);
        assert_eq!(processor.register(Reg::T3), 0xFFFF_FFFF);
        assert_eq!(processor.register(Reg::T4), (-1i32) as u32);
        assert_eq!(processor.register(Reg::T5), (-2i32) as u32);
    }

    #[test]
    fn division_by_zero_is_a_no_op_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 7
             mthi $t0
             mtlo $t0
             div  $t0, $zero
             divu $t0, $zero",
        );
        let _ = processor.run();
        assert_eq!(processor.hi(), 7);
        assert_eq!(processor.lo(), 7);
    }

    #[test]
    fn byte_sign_extension_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 0x80
             sb   $t0, 0x10($zero)
             lb   $t1, 0x10($zero)
             lbu  $t2, 0x10($zero)",
        );
        let _ = processor.run();
        // lb extends from bit 7, lbu does not
        assert_eq!(processor.register(Reg::T1), 0xFFFF_FF80);
        assert_eq!(processor.register(Reg::T2), 0x0000_0080);
    }

    #[test]
    fn halted_processor_refuses_to_step_test() {
        let mut processor = processor_with(
            "addi $v0, $zero, 10
             syscall",
        );
        processor.run().unwrap();
        assert_eq!(processor.step(), Err(ProcessorError::Halted));
        assert_eq!(processor.run(), Err(ProcessorError::Halted));
    }

    #[test]
    fn reset_keeps_the_program_test() {
        let mut processor = processor_with(
            "addi $v0, $zero, 10
             syscall",
        );
        processor.run().unwrap();
        processor.reset();

        assert!(processor.loaded());
        assert!(!processor.halted());
        assert_eq!(processor.pc(), TEXT_START);
        assert_eq!(processor.cycle(), 0);

        // The program runs again after a reset
        assert_eq!(processor.run(), Ok(2));
    }

    #[test]
    fn reset_is_idempotent_test() {
        let mut processor = processor_with("addi $t0, $zero, 5");
        let _ = processor.run();

        processor.reset();
        let registers = processor.registers().clone();
        let pc = processor.pc();
        processor.reset();
        assert_eq!(processor.registers(), &registers);
        assert_eq!(processor.pc(), pc);
    }

    #[test]
    fn step_limit_test() {
        let mut processor = processor_with("loop: j loop");
        assert_eq!(processor.run(), Err(ProcessorError::StepLimitReached));
        assert_eq!(processor.instruction_count(), STEP_LIMIT as u64);
        // The limit is per run invocation and does not halt the processor
        assert!(!processor.halted());
        assert!(processor.step().is_ok());
    }

    #[test]
    fn step_requires_a_program_test() {
        let mut processor = Processor::new();
        assert_eq!(processor.step(), Err(ProcessorError::NotLoaded));
        assert_eq!(processor.run(), Err(ProcessorError::NotLoaded));
    }

    #[test]
    fn load_failure_is_atomic_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 1
             addi $t1, $zero, 2",
        );
        processor.step().unwrap();

        assert!(processor.load("bogus $t0, $t1").is_err());
        // The previous program and its state survive a failed load
        assert_eq!(processor.instructions().len(), 2);
        assert_eq!(processor.register(Reg::T0), 1);
        assert_eq!(processor.pc(), TEXT_START + 4);
    }

    #[test]
    fn determinism_test() {
        let source = "       addi $t0, $zero, 3
                      loop:  addi $t0, $t0, -1
                             mult $t0, $t0
                             mflo $t1
                             bne  $t0, $zero, loop";
        let mut first = processor_with(source);
        let mut second = processor_with(source);
        let _ = first.run();
        let _ = second.run();

        assert_eq!(first.registers(), second.registers());
        assert_eq!(first.hi(), second.hi());
        assert_eq!(first.lo(), second.lo());
        assert_eq!(first.pc(), second.pc());
    }

    #[test]
    fn step_outcome_test() {
        let mut processor = processor_with("addi $t0, $zero, 5");
        let outcome = processor.step().unwrap();

        assert_eq!(outcome.address, TEXT_START);
        assert_eq!(outcome.next_pc, TEXT_START + 4);
        assert_eq!(outcome.word, 0x2008_0005);
        assert_eq!(outcome.fields.opcode, 0x08);
        assert!(outcome
            .control
            .signals
            .contains(ControlSignals::REG_WRITE | ControlSignals::ALU_SRC));
    }

    #[test]
    fn trace_is_recorded_in_debug_mode_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 5
             addi $t1, $t0, 1",
        );
        processor.set_debug_mode(true);
        let _ = processor.run();

        let trace = processor.trace();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].cycle, 1);
        assert_eq!(trace[0].pc, TEXT_START);
        assert_eq!(trace[0].source, "addi $t0, $zero, 5");
        assert_eq!(trace[0].registers[Reg::T0.number() as usize], 5);
        assert_eq!(trace[1].pc, TEXT_START + 4);
        assert_eq!(trace[1].registers[Reg::T1.number() as usize], 6);
    }

    #[test]
    fn trace_is_empty_without_debug_mode_test() {
        let mut processor = processor_with("addi $t0, $zero, 5");
        let _ = processor.run();
        assert!(processor.trace().is_empty());
    }

    #[test]
    fn trace_is_cleared_on_reset_test() {
        let mut processor = processor_with("addi $t0, $zero, 5");
        processor.set_debug_mode(true);
        let _ = processor.run();
        assert!(!processor.trace().is_empty());
        processor.reset();
        assert!(processor.trace().is_empty());
    }

    #[test]
    fn jump_register_to_arbitrary_address_halts_test() {
        let mut processor = processor_with(
            "addi $t0, $zero, 0x1234
             jr   $t0",
        );
        // The jr itself commits; the next fetch is out of bounds
        processor.step().unwrap();
        processor.step().unwrap();
        assert_eq!(
            processor.step(),
            Err(ProcessorError::PcOutOfBounds { pc: 0x1234 })
        );
        assert!(processor.halted());
    }
}
