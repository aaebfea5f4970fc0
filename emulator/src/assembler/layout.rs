//! First assembly pass: the symbol table.
//!
//! Walks the parsed lines and maps every label to the index of the next
//! instruction. Label-only lines attach to the instruction that follows
//! them, wherever it is.

use std::collections::HashMap;

use tracing::debug;

use super::{AssemblerError, EncodeError};
use crate::parser::Line;

/// Label name to instruction index
pub(crate) type Labels = HashMap<String, usize>;

pub(crate) fn build_symbol_table(lines: &[Line]) -> Result<Labels, AssemblerError> {
    let mut labels = Labels::new();
    let mut index = 0;

    for line in lines {
        for label in &line.labels {
            debug!(label = label.as_str(), index, "Inserting label");
            if labels.insert(label.clone(), index).is_some() {
                return Err(AssemblerError::Encode {
                    line: line.number,
                    inner: EncodeError::DuplicateLabel(label.clone()),
                });
            }
        }

        if line.content.is_some() {
            index += 1;
        }
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn build_symbol_table_test() {
        let lines = parse(
            "start: addi $t0, $zero, 3
             loop:  addi $t0, $t0, -1
                    bne  $t0, $zero, loop
             done:",
        )
        .unwrap();
        let labels = build_symbol_table(&lines).unwrap();

        assert_eq!(labels.get("start"), Some(&0));
        assert_eq!(labels.get("loop"), Some(&1));
        // A trailing label points one past the last instruction
        assert_eq!(labels.get("done"), Some(&3));
    }

    #[test]
    fn label_only_line_attaches_forward_test() {
        let lines = parse(
            "first:
             second:
                    nop",
        )
        .unwrap();
        let labels = build_symbol_table(&lines).unwrap();
        assert_eq!(labels.get("first"), Some(&0));
        assert_eq!(labels.get("second"), Some(&0));
    }

    #[test]
    fn duplicate_label_test() {
        let lines = parse(
            "loop: nop
             loop: nop",
        )
        .unwrap();
        let error = build_symbol_table(&lines).unwrap_err();
        assert!(matches!(
            error,
            AssemblerError::Encode {
                line: 2,
                inner: EncodeError::DuplicateLabel(label),
            } if label == "loop"
        ));
    }
}
