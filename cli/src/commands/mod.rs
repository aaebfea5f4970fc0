use clap::Subcommand;

mod dump;
mod run;

#[derive(Subcommand)]
pub enum Command {
    /// Assemble and run a program
    Run(run::RunOpt),

    /// Assemble a program and print its instruction listing
    Dump(dump::DumpOpt),
}

impl Command {
    pub fn exec(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Self::Run(opt) => opt.exec(),
            Self::Dump(opt) => opt.exec(),
        }
    }
}
