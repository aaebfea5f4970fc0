//! Second assembly pass: instruction selection and field packing.
//!
//! [`lower_instruction`] maps a parsed mnemonic and operand list onto an
//! [`Instruction`] variant, resolving labels against the symbol table from
//! pass one. [`encode`] packs a variant into its 32-bit word.
//!
//! Out-of-range immediates are not rejected: values are masked to the
//! field they land in (low 16 bits for I-type immediates, low 5 bits for
//! shift amounts).

use super::layout::Labels;
use super::EncodeError;
use crate::constants::*;
use crate::parser::{LineContent, Operand};
use crate::runtime::{
    BranchOp, ImmediateOp, Instruction, JumpOp, MemoryOp, Reg, RegisterOp,
};

fn wrong_operand_count(content: &LineContent, expected: usize) -> EncodeError {
    EncodeError::WrongOperandCount {
        mnemonic: content.mnemonic.clone(),
        expected,
        found: content.operands.len(),
    }
}

fn expect_operands(content: &LineContent, count: usize) -> Result<&[Operand], EncodeError> {
    if content.operands.len() == count {
        Ok(&content.operands)
    } else {
        Err(wrong_operand_count(content, count))
    }
}

fn register(content: &LineContent, operand: &Operand) -> Result<Reg, EncodeError> {
    match operand {
        Operand::Register(reg) => Ok(*reg),
        other => Err(EncodeError::ExpectedRegister {
            mnemonic: content.mnemonic.clone(),
            found: other.to_string(),
        }),
    }
}

fn immediate(content: &LineContent, operand: &Operand) -> Result<i64, EncodeError> {
    match operand {
        Operand::Immediate(value) => Ok(*value),
        other => Err(EncodeError::ExpectedImmediate {
            mnemonic: content.mnemonic.clone(),
            found: other.to_string(),
        }),
    }
}

fn memory_operand(content: &LineContent, operand: &Operand) -> Result<(i16, Reg), EncodeError> {
    match operand {
        Operand::Indexed { offset, base } => Ok((*offset as i16, *base)),
        other => Err(EncodeError::ExpectedMemoryOperand {
            mnemonic: content.mnemonic.clone(),
            found: other.to_string(),
        }),
    }
}

/// Resolve a branch target to a signed instruction offset, relative to the
/// instruction after the branch.
fn branch_offset(
    content: &LineContent,
    operand: &Operand,
    index: usize,
    labels: &Labels,
) -> Result<i16, EncodeError> {
    match operand {
        Operand::Label(name) => {
            let target = labels
                .get(name)
                .ok_or_else(|| EncodeError::UndefinedLabel(name.clone()))?;
            Ok((*target as i64 - index as i64 - 1) as i16)
        }
        // A bare immediate is taken as an already-computed offset
        Operand::Immediate(value) => Ok(*value as i16),
        other => Err(EncodeError::ExpectedLabel {
            mnemonic: content.mnemonic.clone(),
            found: other.to_string(),
        }),
    }
}

/// Resolve a jump target to its 26-bit field: the target byte address
/// shifted right by two.
fn jump_target(
    content: &LineContent,
    operand: &Operand,
    labels: &Labels,
) -> Result<u32, EncodeError> {
    let address = match operand {
        Operand::Label(name) => {
            let target = labels
                .get(name)
                .ok_or_else(|| EncodeError::UndefinedLabel(name.clone()))?;
            TEXT_START + 4 * *target as u32
        }
        Operand::Immediate(value) => *value as u32,
        other => {
            return Err(EncodeError::ExpectedLabel {
                mnemonic: content.mnemonic.clone(),
                found: other.to_string(),
            })
        }
    };
    Ok((address >> 2) & 0x03FF_FFFF)
}

/// Select the instruction for a parsed line.
///
/// `index` is the position the instruction will occupy in the program,
/// used for PC-relative branch resolution.
pub(crate) fn lower_instruction(
    content: &LineContent,
    index: usize,
    labels: &Labels,
) -> Result<Instruction, EncodeError> {
    use Instruction as I;

    let ops = &content.operands;

    match content.mnemonic.as_str() {
        "nop" => {
            expect_operands(content, 0)?;
            Ok(I::Nop)
        }
        "syscall" => {
            expect_operands(content, 0)?;
            Ok(I::Syscall)
        }

        // Three-register arithmetic and logic: rd, rs, rt
        "add" | "addu" | "sub" | "subu" | "and" | "or" | "xor" | "nor" | "slt" | "sltu" => {
            let ops = expect_operands(content, 3)?;
            let op = match content.mnemonic.as_str() {
                "add" => RegisterOp::Add,
                "addu" => RegisterOp::Addu,
                "sub" => RegisterOp::Sub,
                "subu" => RegisterOp::Subu,
                "and" => RegisterOp::And,
                "or" => RegisterOp::Or,
                "xor" => RegisterOp::Xor,
                "nor" => RegisterOp::Nor,
                "slt" => RegisterOp::Slt,
                "sltu" => RegisterOp::Sltu,
                _ => unreachable!(),
            };
            Ok(I::Register {
                op,
                rd: register(content, &ops[0])?,
                rs: register(content, &ops[1])?,
                rt: register(content, &ops[2])?,
                shamt: 0,
            })
        }

        // Constant shifts: rd, rt, shamt
        "sll" | "srl" | "sra" => {
            let ops = expect_operands(content, 3)?;
            let op = match content.mnemonic.as_str() {
                "sll" => RegisterOp::Sll,
                "srl" => RegisterOp::Srl,
                "sra" => RegisterOp::Sra,
                _ => unreachable!(),
            };
            Ok(I::Register {
                op,
                rd: register(content, &ops[0])?,
                rt: register(content, &ops[1])?,
                rs: Reg::Zero,
                shamt: (immediate(content, &ops[2])? & 0x1F) as u8,
            })
        }

        // Variable shifts: rd, rt, rs
        "sllv" | "srlv" | "srav" => {
            let ops = expect_operands(content, 3)?;
            let op = match content.mnemonic.as_str() {
                "sllv" => RegisterOp::Sllv,
                "srlv" => RegisterOp::Srlv,
                "srav" => RegisterOp::Srav,
                _ => unreachable!(),
            };
            Ok(I::Register {
                op,
                rd: register(content, &ops[0])?,
                rt: register(content, &ops[1])?,
                rs: register(content, &ops[2])?,
                shamt: 0,
            })
        }

        // Multiply and divide: rs, rt
        "mult" | "multu" | "div" | "divu" => {
            let ops = expect_operands(content, 2)?;
            let op = match content.mnemonic.as_str() {
                "mult" => RegisterOp::Mult,
                "multu" => RegisterOp::Multu,
                "div" => RegisterOp::Div,
                "divu" => RegisterOp::Divu,
                _ => unreachable!(),
            };
            Ok(I::Register {
                op,
                rs: register(content, &ops[0])?,
                rt: register(content, &ops[1])?,
                rd: Reg::Zero,
                shamt: 0,
            })
        }

        "mfhi" | "mflo" => {
            let ops = expect_operands(content, 1)?;
            let op = if content.mnemonic == "mfhi" {
                RegisterOp::Mfhi
            } else {
                RegisterOp::Mflo
            };
            Ok(I::Register {
                op,
                rd: register(content, &ops[0])?,
                rs: Reg::Zero,
                rt: Reg::Zero,
                shamt: 0,
            })
        }

        "mthi" | "mtlo" => {
            let ops = expect_operands(content, 1)?;
            let op = if content.mnemonic == "mthi" {
                RegisterOp::Mthi
            } else {
                RegisterOp::Mtlo
            };
            Ok(I::Register {
                op,
                rs: register(content, &ops[0])?,
                rt: Reg::Zero,
                rd: Reg::Zero,
                shamt: 0,
            })
        }

        "jr" => {
            let ops = expect_operands(content, 1)?;
            Ok(I::Register {
                op: RegisterOp::Jr,
                rs: register(content, &ops[0])?,
                rt: Reg::Zero,
                rd: Reg::Zero,
                shamt: 0,
            })
        }

        // jalr $rs, or jalr $rd, $rs
        "jalr" => {
            let (rd, rs) = match ops.len() {
                1 => (Reg::Ra, register(content, &ops[0])?),
                2 => (register(content, &ops[0])?, register(content, &ops[1])?),
                _ => return Err(wrong_operand_count(content, 2)),
            };
            Ok(I::Register {
                op: RegisterOp::Jalr,
                rs,
                rt: Reg::Zero,
                rd,
                shamt: 0,
            })
        }

        // Immediate arithmetic and logic: rt, rs, imm
        "addi" | "addiu" | "slti" | "sltiu" | "andi" | "ori" | "xori" => {
            let ops = expect_operands(content, 3)?;
            let op = match content.mnemonic.as_str() {
                "addi" => ImmediateOp::Addi,
                "addiu" => ImmediateOp::Addiu,
                "slti" => ImmediateOp::Slti,
                "sltiu" => ImmediateOp::Sltiu,
                "andi" => ImmediateOp::Andi,
                "ori" => ImmediateOp::Ori,
                "xori" => ImmediateOp::Xori,
                _ => unreachable!(),
            };
            Ok(I::Immediate {
                op,
                rt: register(content, &ops[0])?,
                rs: register(content, &ops[1])?,
                imm: (immediate(content, &ops[2])? & 0xFFFF) as u16,
            })
        }

        "lui" => {
            let ops = expect_operands(content, 2)?;
            Ok(I::Immediate {
                op: ImmediateOp::Lui,
                rt: register(content, &ops[0])?,
                rs: Reg::Zero,
                imm: (immediate(content, &ops[1])? & 0xFFFF) as u16,
            })
        }

        // Loads and stores: rt, offset(base)
        "lb" | "lh" | "lw" | "lbu" | "lhu" | "sb" | "sh" | "sw" => {
            let ops = expect_operands(content, 2)?;
            let op = match content.mnemonic.as_str() {
                "lb" => MemoryOp::Lb,
                "lh" => MemoryOp::Lh,
                "lw" => MemoryOp::Lw,
                "lbu" => MemoryOp::Lbu,
                "lhu" => MemoryOp::Lhu,
                "sb" => MemoryOp::Sb,
                "sh" => MemoryOp::Sh,
                "sw" => MemoryOp::Sw,
                _ => unreachable!(),
            };
            let (offset, base) = memory_operand(content, &ops[1])?;
            Ok(I::Memory {
                op,
                rt: register(content, &ops[0])?,
                base,
                offset,
            })
        }

        "beq" | "bne" => {
            let ops = expect_operands(content, 3)?;
            let op = if content.mnemonic == "beq" {
                BranchOp::Beq
            } else {
                BranchOp::Bne
            };
            Ok(I::Branch {
                op,
                rs: register(content, &ops[0])?,
                rt: register(content, &ops[1])?,
                offset: branch_offset(content, &ops[2], index, labels)?,
            })
        }

        "bgtz" | "blez" => {
            let ops = expect_operands(content, 2)?;
            let op = if content.mnemonic == "bgtz" {
                BranchOp::Bgtz
            } else {
                BranchOp::Blez
            };
            Ok(I::Branch {
                op,
                rs: register(content, &ops[0])?,
                rt: Reg::Zero,
                offset: branch_offset(content, &ops[1], index, labels)?,
            })
        }

        "j" | "jal" => {
            let ops = expect_operands(content, 1)?;
            let op = if content.mnemonic == "j" {
                JumpOp::J
            } else {
                JumpOp::Jal
            };
            Ok(I::Jump {
                op,
                target: jump_target(content, &ops[0], labels)?,
            })
        }

        _ => Err(EncodeError::UnknownMnemonic(content.mnemonic.clone())),
    }
}

fn r_type(rs: Reg, rt: Reg, rd: Reg, shamt: u8, funct: u8) -> u32 {
    u32::from(rs.number()) << 21
        | u32::from(rt.number()) << 16
        | u32::from(rd.number()) << 11
        | u32::from(shamt & 0x1F) << 6
        | u32::from(funct)
}

fn i_type(opcode: u8, rs: Reg, rt: Reg, imm: u16) -> u32 {
    u32::from(opcode) << 26
        | u32::from(rs.number()) << 21
        | u32::from(rt.number()) << 16
        | u32::from(imm)
}

fn j_type(opcode: u8, target: u32) -> u32 {
    u32::from(opcode) << 26 | (target & 0x03FF_FFFF)
}

fn register_funct(op: RegisterOp) -> u8 {
    use RegisterOp::*;
    match op {
        Sll => FUNCTION_SLL,
        Srl => FUNCTION_SRL,
        Sra => FUNCTION_SRA,
        Sllv => FUNCTION_SLLV,
        Srlv => FUNCTION_SRLV,
        Srav => FUNCTION_SRAV,
        Jr => FUNCTION_JR,
        Jalr => FUNCTION_JALR,
        Mfhi => FUNCTION_MFHI,
        Mthi => FUNCTION_MTHI,
        Mflo => FUNCTION_MFLO,
        Mtlo => FUNCTION_MTLO,
        Mult => FUNCTION_MULT,
        Multu => FUNCTION_MULTU,
        Div => FUNCTION_DIV,
        Divu => FUNCTION_DIVU,
        Add => FUNCTION_ADD,
        Addu => FUNCTION_ADDU,
        Sub => FUNCTION_SUB,
        Subu => FUNCTION_SUBU,
        And => FUNCTION_AND,
        Or => FUNCTION_OR,
        Xor => FUNCTION_XOR,
        Nor => FUNCTION_NOR,
        Slt => FUNCTION_SLT,
        Sltu => FUNCTION_SLTU,
    }
}

fn immediate_opcode(op: ImmediateOp) -> u8 {
    use ImmediateOp::*;
    match op {
        Addi => OP_ADDI,
        Addiu => OP_ADDIU,
        Slti => OP_SLTI,
        Sltiu => OP_SLTIU,
        Andi => OP_ANDI,
        Ori => OP_ORI,
        Xori => OP_XORI,
        Lui => OP_LUI,
    }
}

fn memory_opcode(op: MemoryOp) -> u8 {
    use MemoryOp::*;
    match op {
        Lb => OP_LB,
        Lh => OP_LH,
        Lw => OP_LW,
        Lbu => OP_LBU,
        Lhu => OP_LHU,
        Sb => OP_SB,
        Sh => OP_SH,
        Sw => OP_SW,
    }
}

fn branch_opcode(op: BranchOp) -> u8 {
    use BranchOp::*;
    match op {
        Beq => OP_BEQ,
        Bne => OP_BNE,
        Bgtz => OP_BGTZ,
        Blez => OP_BLEZ,
    }
}

fn jump_opcode(op: JumpOp) -> u8 {
    match op {
        JumpOp::J => OP_J,
        JumpOp::Jal => OP_JAL,
    }
}

/// Pack an instruction into its 32-bit word
#[must_use]
pub fn encode(instruction: Instruction) -> u32 {
    match instruction {
        Instruction::Register { op, rs, rt, rd, shamt } => {
            r_type(rs, rt, rd, shamt, register_funct(op))
        }
        Instruction::Immediate { op, rs, rt, imm } => {
            i_type(immediate_opcode(op), rs, rt, imm)
        }
        Instruction::Memory { op, rt, base, offset } => {
            i_type(memory_opcode(op), base, rt, offset as u16)
        }
        Instruction::Branch { op, rs, rt, offset } => {
            i_type(branch_opcode(op), rs, rt, offset as u16)
        }
        Instruction::Jump { op, target } => j_type(jump_opcode(op), target),
        Instruction::Syscall => u32::from(FUNCTION_SYSCALL),
        Instruction::Nop => 0,
    }
}
