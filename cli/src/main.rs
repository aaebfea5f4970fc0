#![forbid(unsafe_code)]

use std::process::exit;

use clap::{ArgAction, Parser};
use tracing::error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use crate::commands::Command;

#[derive(Parser)]
#[command(version, author, about)]
struct Opt {
    /// Increase the level of verbosity. Can be used multiple times.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

impl Opt {
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "mips32_emulator=debug,mips32=debug,info",
            2 => "mips32_emulator=trace,mips32=trace,info",
            3 => "mips32_emulator=trace,mips32=trace,debug",
            4..=u8::MAX => "trace",
        }
    }

    fn filter_layer(&self) -> EnvFilter {
        // Parse log level from env, or infer it from the arguments
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.log_filter()))
            .unwrap()
    }
}

fn main() {
    // First, parse the arguments
    let opt = Opt::parse();

    // Then, setup the tracing formatter for logging and instrumentation
    let fmt_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false);
    tracing_subscriber::Registry::default()
        .with(opt.filter_layer())
        .with(fmt_layer)
        .init();

    // And run the command
    if let Err(e) = opt.command.exec() {
        error!("{}", e);
        exit(1);
    }
}
