use super::traits::{Structure, StructureParser};
use crate::domain::{ChallengerError, ChallengerResult};
use std::collections::BTreeSet;

/// Syntactic SMILES screen. It rejects strings no SMILES reader would accept
/// (foreign characters, unbalanced branches or atom brackets, dangling ring
/// closures) and passes everything else through unchanged; chemistry
/// validation is left to the fragmentation engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmilesScreen;

impl StructureParser for SmilesScreen {
    fn parse(&self, smiles: &str) -> ChallengerResult<Structure> {
        let smiles = smiles.trim();
        screen(smiles).map_err(|reason| {
            ChallengerError::computation(
                "RUN.STRUCTURE_PARSE",
                format!("invalid SMILES '{smiles}': {reason}"),
            )
        })?;
        Ok(Structure {
            smiles: smiles.to_string(),
        })
    }
}

fn screen(smiles: &str) -> Result<(), String> {
    if smiles.is_empty() {
        return Err("empty string".to_string());
    }

    let mut depth = 0usize;
    let mut in_bracket = false;
    let mut open_rings = BTreeSet::new();
    let mut previous = None;
    let mut chars = smiles.chars().peekable();

    while let Some(current) = chars.next() {
        match current {
            '[' if in_bracket => return Err("nested '['".to_string()),
            '[' => in_bracket = true,
            ']' if !in_bracket => return Err("unmatched ']'".to_string()),
            ']' => in_bracket = false,
            _ if in_bracket => {
                if !(current.is_ascii_alphanumeric() || "+-@:*".contains(current)) {
                    return Err(format!("unexpected '{current}' inside atom brackets"));
                }
            }
            '(' => depth += 1,
            ')' => {
                if previous == Some('(') {
                    return Err("empty branch".to_string());
                }
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unmatched ')'".to_string())?;
            }
            '%' => {
                let tens = chars.next().filter(char::is_ascii_digit);
                let units = chars.next().filter(char::is_ascii_digit);
                let (Some(tens), Some(units)) = (tens, units) else {
                    return Err("'%' must be followed by two digits".to_string());
                };
                toggle_ring(&mut open_rings, format!("%{tens}{units}"));
            }
            digit if digit.is_ascii_digit() => toggle_ring(&mut open_rings, digit.to_string()),
            letter if letter.is_ascii_alphabetic() => {}
            bond if "=#$:/\\.-*".contains(bond) => {}
            other => return Err(format!("unexpected character '{other}'")),
        }
        previous = Some(current);
    }

    if in_bracket {
        return Err("unterminated '['".to_string());
    }
    if depth != 0 {
        return Err("unmatched '('".to_string());
    }
    if let Some(ring) = open_rings.first() {
        return Err(format!("ring closure {ring} is never closed"));
    }
    Ok(())
}

fn toggle_ring(open_rings: &mut BTreeSet<String>, ring: String) {
    if !open_rings.remove(&ring) {
        open_rings.insert(ring);
    }
}
