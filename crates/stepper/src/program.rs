//! Instruction word sources for the harness.

use std::{
    num::ParseIntError,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Seeded when no program is given on the command line:
/// `lui x1, 0x12345`, `auipc x22, 0x10011`, `jal x5, 8`, `beq x4, x5, 8`.
pub const DEMO_PROGRAM: [u32; 4] = [0x123450b7, 0x10011b17, 0x008002ef, 0x00520463];

#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("failed to read program file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}: invalid instruction word {text:?}")]
    InvalidWord {
        line: usize,
        text: String,
        source: ParseIntError,
    },
}

/// Parses a hexadecimal word, with or without a `0x` prefix. Underscores
/// are ignored.
pub fn parse_word(text: &str) -> Result<u32, ParseIntError> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
        .replace('_', "");
    u32::from_str_radix(&digits, 16)
}

/// One word per line; blank lines and `#` comments are skipped.
pub fn parse_program(source: &str) -> Result<Vec<u32>, ProgramError> {
    let mut words = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let text = match line.split_once('#') {
            Some((code, _comment)) => code,
            None => line,
        }
        .trim();
        if text.is_empty() {
            continue;
        }

        let word = parse_word(text).map_err(|source| ProgramError::InvalidWord {
            line: idx + 1,
            text: text.to_owned(),
            source,
        })?;
        words.push(word);
    }
    Ok(words)
}

pub fn read_program(path: &Path) -> Result<Vec<u32>, ProgramError> {
    tracing::debug!("reading program at {:?}", path);
    let source = std::fs::read_to_string(path).map_err(|source| ProgramError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_program(&source)
}
