use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueHint};
use tracing::{info, warn};

use mips32_emulator::constants::STEP_LIMIT;
use mips32_emulator::runtime::{ProcessorError, Reg};
use mips32_emulator::Processor;

#[derive(Args, Debug)]
pub struct RunOpt {
    /// Input file
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Log each instruction as it commits
    #[arg(short, long)]
    step: bool,

    /// Record an execution trace and print it after the run
    #[arg(short, long)]
    trace: bool,
}

impl RunOpt {
    pub fn exec(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!(path = ?self.input, "Reading program");
        let source = fs::read_to_string(&self.input)?;

        let mut processor = Processor::new();
        let count = processor.load(&source)?;
        info!(count, "Program loaded");
        processor.set_debug_mode(self.trace);

        let result = if self.step {
            self.run_stepping(&mut processor)
        } else {
            processor.run()
        };

        match result {
            Ok(steps) => info!(steps, "Program halted"),
            Err(ProcessorError::PcOutOfBounds { pc }) => {
                warn!("Execution ran past the program at {pc:#010x}");
            }
            Err(e) => return Err(e.into()),
        }

        print_state(&processor);

        if self.trace {
            println!();
            for entry in processor.trace() {
                println!(
                    "{:>5}  {:#010x}  {:08x}  {}",
                    entry.cycle, entry.pc, entry.word, entry.source
                );
            }
        }

        Ok(())
    }

    fn run_stepping(&self, processor: &mut Processor) -> Result<usize, ProcessorError> {
        for steps in 1..=STEP_LIMIT {
            let outcome = processor.step()?;
            info!(
                "{:#010x}  {:08x}  {}",
                outcome.address, outcome.word, outcome.instruction
            );
            if processor.halted() {
                return Ok(steps);
            }
        }
        Err(ProcessorError::StepLimitReached)
    }
}

fn print_state(processor: &Processor) {
    println!(
        "pc = {:#010x}  hi = {:#010x}  lo = {:#010x}  cycles = {}",
        processor.pc(),
        processor.hi(),
        processor.lo(),
        processor.cycle()
    );

    for row in 0..8u8 {
        let cells: Vec<String> = (0..4)
            .filter_map(|column| Reg::from_number(row * 4 + column))
            .map(|reg| format!("{:>5} = {:#010x}", reg.to_string(), processor.register(reg)))
            .collect();
        println!("{}", cells.join("  "));
    }

    let touched = processor.memory().touched_addresses().count();
    if touched > 0 {
        println!("{touched} byte(s) of memory touched");
    }
}
