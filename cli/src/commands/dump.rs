use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueHint};
use tracing::info;

use mips32_emulator::assemble;

#[derive(Args, Debug)]
pub struct DumpOpt {
    /// Input file
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

impl DumpOpt {
    pub fn exec(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!(path = ?self.input, "Reading program");
        let source = fs::read_to_string(&self.input)?;

        let program = assemble(&source)?;
        for loaded in &program.instructions {
            println!(
                "{:#010x}  {:08x}  {}",
                loaded.address, loaded.word, loaded.instruction
            );
        }

        Ok(())
    }
}
