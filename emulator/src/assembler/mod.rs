//! Two-pass assembly of source text into machine words.
//!
//! Pass one walks the parsed lines and builds the symbol table; pass two
//! selects and packs one 32-bit word per instruction, resolving branch
//! offsets and jump targets against the symbols. Assembly either yields a
//! complete [`Program`] or fails with the offending line; nothing partial
//! escapes.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

mod encode;
mod layout;

pub use self::encode::encode;

use crate::constants::{Address, TEXT_START};
use crate::parser::{parse, ParseError};
use crate::runtime::Instruction;

/// An instruction as loaded into the text segment
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedInstruction {
    /// The instruction text as written in the source
    pub source: String,
    pub instruction: Instruction,
    /// The encoded 32-bit word
    pub word: u32,
    /// The load address, `TEXT_START + 4 * index`
    pub address: Address,
}

/// A fully assembled program
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Vec<LoadedInstruction>,
    /// Label name to instruction index
    pub labels: HashMap<String, usize>,
}

/// Errors from instruction selection and field packing
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("unknown mnemonic {0:?}")]
    UnknownMnemonic(String),

    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    WrongOperandCount {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("{mnemonic} expects a register, found {found:?}")]
    ExpectedRegister { mnemonic: String, found: String },

    #[error("{mnemonic} expects an immediate, found {found:?}")]
    ExpectedImmediate { mnemonic: String, found: String },

    #[error("{mnemonic} expects an offset(base) operand, found {found:?}")]
    ExpectedMemoryOperand { mnemonic: String, found: String },

    #[error("{mnemonic} expects a label, found {found:?}")]
    ExpectedLabel { mnemonic: String, found: String },

    #[error("undefined label {0:?}")]
    UndefinedLabel(String),

    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum AssemblerError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("line {line}: {inner}")]
    Encode { line: usize, inner: EncodeError },
}

/// Assemble a program.
#[tracing::instrument(skip(source))]
pub fn assemble(source: &str) -> Result<Program, AssemblerError> {
    let lines = parse(source)?;
    let labels = layout::build_symbol_table(&lines)?;

    let mut instructions = Vec::new();
    for line in &lines {
        let Some(content) = &line.content else {
            continue;
        };

        let index = instructions.len();
        let instruction = encode::lower_instruction(content, index, &labels)
            .map_err(|inner| AssemblerError::Encode {
                line: line.number,
                inner,
            })?;
        let word = encode::encode(instruction);

        instructions.push(LoadedInstruction {
            source: content.source.clone(),
            instruction,
            word,
            address: TEXT_START + 4 * index as Address,
        });
    }

    debug!(count = instructions.len(), "Assembled program");
    Ok(Program {
        instructions,
        labels,
    })
}
