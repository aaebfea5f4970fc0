use parse_display::Display;
use thiserror::Error;

use crate::constants::Word;

/// The 32 general-purpose registers, by ABI name.
///
/// The discriminant of each variant is its architectural register number,
/// so `Reg::T0 as u8` is 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("${}", style = "lowercase")]
#[rustfmt::skip]
pub enum Reg {
    Zero, At, V0, V1, A0, A1, A2, A3,
    T0, T1, T2, T3, T4, T5, T6, T7,
    S0, S1, S2, S3, S4, S5, S6, S7,
    T8, T9, K0, K1, Gp, Sp, Fp, Ra,
}

#[rustfmt::skip]
const REGS: [Reg; 32] = [
    Reg::Zero, Reg::At, Reg::V0, Reg::V1, Reg::A0, Reg::A1, Reg::A2, Reg::A3,
    Reg::T0, Reg::T1, Reg::T2, Reg::T3, Reg::T4, Reg::T5, Reg::T6, Reg::T7,
    Reg::S0, Reg::S1, Reg::S2, Reg::S3, Reg::S4, Reg::S5, Reg::S6, Reg::S7,
    Reg::T8, Reg::T9, Reg::K0, Reg::K1, Reg::Gp, Reg::Sp, Reg::Fp, Reg::Ra,
];

impl Reg {
    /// The architectural register number, 0 to 31.
    #[must_use]
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Look up a register by its architectural number.
    #[must_use]
    pub fn from_number(number: u8) -> Option<Reg> {
        REGS.get(usize::from(number)).copied()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid register")]
pub struct RegisterParseError;

impl std::str::FromStr for Reg {
    type Err = RegisterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix('$').unwrap_or(s).to_lowercase();

        if let Ok(number) = name.parse::<u8>() {
            return Reg::from_number(number).ok_or(RegisterParseError);
        }

        match name.as_str() {
            "zero" => Ok(Reg::Zero),
            "at" => Ok(Reg::At),
            "v0" => Ok(Reg::V0),
            "v1" => Ok(Reg::V1),
            "a0" => Ok(Reg::A0),
            "a1" => Ok(Reg::A1),
            "a2" => Ok(Reg::A2),
            "a3" => Ok(Reg::A3),
            "t0" => Ok(Reg::T0),
            "t1" => Ok(Reg::T1),
            "t2" => Ok(Reg::T2),
            "t3" => Ok(Reg::T3),
            "t4" => Ok(Reg::T4),
            "t5" => Ok(Reg::T5),
            "t6" => Ok(Reg::T6),
            "t7" => Ok(Reg::T7),
            "s0" => Ok(Reg::S0),
            "s1" => Ok(Reg::S1),
            "s2" => Ok(Reg::S2),
            "s3" => Ok(Reg::S3),
            "s4" => Ok(Reg::S4),
            "s5" => Ok(Reg::S5),
            "s6" => Ok(Reg::S6),
            "s7" => Ok(Reg::S7),
            "t8" => Ok(Reg::T8),
            "t9" => Ok(Reg::T9),
            "k0" => Ok(Reg::K0),
            "k1" => Ok(Reg::K1),
            "gp" => Ok(Reg::Gp),
            "sp" => Ok(Reg::Sp),
            "fp" => Ok(Reg::Fp),
            "ra" => Ok(Reg::Ra),
            _ => Err(RegisterParseError),
        }
    }
}

/// The register file.
///
/// Writes land unconditionally, including writes to `$zero`; the processor
/// reasserts the hard-wired zero with [`pin_zero`](Self::pin_zero) when it
/// commits a step, so the invariant holds at every observation point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile([Word; 32]);

impl Default for RegisterFile {
    fn default() -> Self {
        Self([0; 32])
    }
}

impl RegisterFile {
    pub fn get(&self, reg: Reg) -> Word {
        self.0[usize::from(reg.number())]
    }

    pub(crate) fn set(&mut self, reg: Reg, value: Word) {
        self.0[usize::from(reg.number())] = value;
    }

    /// Reassert `$zero == 0`.
    pub(crate) fn pin_zero(&mut self) {
        self.0[0] = 0;
    }

    pub(crate) fn clear(&mut self) {
        self.0 = [0; 32];
    }

    #[must_use]
    pub fn as_array(&self) -> &[Word; 32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn register_numbers_test() {
        assert_eq!(Reg::Zero.number(), 0);
        assert_eq!(Reg::T0.number(), 8);
        assert_eq!(Reg::Sp.number(), 29);
        assert_eq!(Reg::Ra.number(), 31);
        assert_eq!(Reg::from_number(25), Some(Reg::T9));
        assert_eq!(Reg::from_number(32), None);
    }

    #[test]
    fn register_from_str_test() {
        assert_eq!(Reg::from_str("$t0"), Ok(Reg::T0));
        assert_eq!(Reg::from_str("$T0"), Ok(Reg::T0));
        assert_eq!(Reg::from_str("$8"), Ok(Reg::T0));
        assert_eq!(Reg::from_str("$31"), Ok(Reg::Ra));
        assert_eq!(Reg::from_str("zero"), Ok(Reg::Zero));
        assert_eq!(Reg::from_str("$32"), Err(RegisterParseError));
        assert_eq!(Reg::from_str("$tx"), Err(RegisterParseError));
    }

    #[test]
    fn register_display_test() {
        assert_eq!(Reg::Zero.to_string(), "$zero");
        assert_eq!(Reg::T0.to_string(), "$t0");
        assert_eq!(Reg::Fp.to_string(), "$fp");
    }

    #[test]
    fn pin_zero_test() {
        let mut file = RegisterFile::default();
        file.set(Reg::Zero, 42);
        file.set(Reg::T0, 42);
        file.pin_zero();
        assert_eq!(file.get(Reg::Zero), 0);
        assert_eq!(file.get(Reg::T0), 42);
    }
}
