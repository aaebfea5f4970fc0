/// Machine word. Every register holds one of these.
pub type Word = u32;

/// Byte address.
pub type Address = u32;

/// Load address of the first instruction of a program.
pub const TEXT_START: Address = 0x0040_0000;

/// Capacity of the byte-addressable memory region.
pub const MEMORY_SIZE: usize = 65_536;

/// Upper bound on instructions committed by a single `run` invocation.
pub const STEP_LIMIT: usize = 10_000;

/// The `$v0` service code that halts the processor on `syscall`.
pub const SYSCALL_EXIT: Word = 10;

// Operation codes
pub const OP_R_TYPE: u8 = 0x00;
pub const OP_J: u8 = 0x02;
pub const OP_JAL: u8 = 0x03;
pub const OP_BEQ: u8 = 0x04;
pub const OP_BNE: u8 = 0x05;
pub const OP_BLEZ: u8 = 0x06;
pub const OP_BGTZ: u8 = 0x07;
pub const OP_ADDI: u8 = 0x08;
pub const OP_ADDIU: u8 = 0x09;
pub const OP_SLTI: u8 = 0x0A;
pub const OP_SLTIU: u8 = 0x0B;
pub const OP_ANDI: u8 = 0x0C;
pub const OP_ORI: u8 = 0x0D;
pub const OP_XORI: u8 = 0x0E;
pub const OP_LUI: u8 = 0x0F;
pub const OP_LB: u8 = 0x20;
pub const OP_LH: u8 = 0x21;
pub const OP_LW: u8 = 0x23;
pub const OP_LBU: u8 = 0x24;
pub const OP_LHU: u8 = 0x25;
pub const OP_SB: u8 = 0x28;
pub const OP_SH: u8 = 0x29;
pub const OP_SW: u8 = 0x2B;

// R-type function codes
pub const FUNCTION_SLL: u8 = 0x00;
pub const FUNCTION_SRL: u8 = 0x02;
pub const FUNCTION_SRA: u8 = 0x03;
pub const FUNCTION_SLLV: u8 = 0x04;
pub const FUNCTION_SRLV: u8 = 0x06;
pub const FUNCTION_SRAV: u8 = 0x07;
pub const FUNCTION_JR: u8 = 0x08;
pub const FUNCTION_JALR: u8 = 0x09;
pub const FUNCTION_SYSCALL: u8 = 0x0C;
pub const FUNCTION_MFHI: u8 = 0x10;
pub const FUNCTION_MTHI: u8 = 0x11;
pub const FUNCTION_MFLO: u8 = 0x12;
pub const FUNCTION_MTLO: u8 = 0x13;
pub const FUNCTION_MULT: u8 = 0x18;
pub const FUNCTION_MULTU: u8 = 0x19;
pub const FUNCTION_DIV: u8 = 0x1A;
pub const FUNCTION_DIVU: u8 = 0x1B;
pub const FUNCTION_ADD: u8 = 0x20;
pub const FUNCTION_ADDU: u8 = 0x21;
pub const FUNCTION_SUB: u8 = 0x22;
pub const FUNCTION_SUBU: u8 = 0x23;
pub const FUNCTION_AND: u8 = 0x24;
pub const FUNCTION_OR: u8 = 0x25;
pub const FUNCTION_XOR: u8 = 0x26;
pub const FUNCTION_NOR: u8 = 0x27;
pub const FUNCTION_SLT: u8 = 0x2A;
pub const FUNCTION_SLTU: u8 = 0x2B;
