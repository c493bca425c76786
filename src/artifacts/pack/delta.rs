//! Delta instruction streams
//!
//! A delta starts with the base size and the result size (little-endian
//! base-128 varints), followed by instructions:
//!
//! - copy (`1xxxxxxx`): bits 0-3 select offset bytes, bits 4-6 select size
//!   bytes; a size of zero means 0x10000
//! - insert (`0nnnnnnn`, n > 0): the next n bytes are literal data

use crate::artifacts::objects::parser::ByteCursor;
use crate::errors::{Error, Result};

const COPY_FLAG: u8 = 0b1000_0000;
const DEFAULT_COPY_SIZE: usize = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaInstruction<'d> {
    Copy { offset: usize, length: usize },
    Insert(&'d [u8]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<'d> {
    pub base_size: usize,
    pub result_size: usize,
    pub instructions: Vec<DeltaInstruction<'d>>,
}

impl<'d> Delta<'d> {
    pub fn parse(data: &'d [u8]) -> Result<Self> {
        Self::decode(data).map_err(|e| e.within("delta"))
    }

    fn decode(data: &'d [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let base_size = read_size(&mut cursor)?;
        let result_size = read_size(&mut cursor)?;

        let mut instructions = Vec::new();
        while !cursor.is_empty() {
            let opcode = cursor.read_u8()?;

            if opcode & COPY_FLAG != 0 {
                let mut offset = 0usize;
                for i in 0..4 {
                    if opcode & (1 << i) != 0 {
                        offset |= (cursor.read_u8()? as usize) << (i * 8);
                    }
                }
                let mut length = 0usize;
                for i in 0..3 {
                    if opcode & (1 << (4 + i)) != 0 {
                        length |= (cursor.read_u8()? as usize) << (i * 8);
                    }
                }
                if length == 0 {
                    length = DEFAULT_COPY_SIZE;
                }
                instructions.push(DeltaInstruction::Copy { offset, length });
            } else if opcode == 0 {
                return Err(Error::corrupt("reserved delta opcode 0"));
            } else {
                instructions.push(DeltaInstruction::Insert(cursor.read_exact(opcode as usize)?));
            }
        }

        Ok(Delta {
            base_size,
            result_size,
            instructions,
        })
    }

    /// Rebuild the target bytes from `base`
    pub fn apply(&self, base: &[u8]) -> Result<Vec<u8>> {
        if base.len() != self.base_size {
            return Err(Error::corrupt(format!(
                "delta expects a {} byte base, got {}",
                self.base_size,
                base.len()
            )));
        }

        // the declared size is untrusted, grow as instructions are applied
        let mut output = Vec::new();
        for instruction in &self.instructions {
            match instruction {
                DeltaInstruction::Copy { offset, length } => {
                    let chunk = offset
                        .checked_add(*length)
                        .and_then(|end| base.get(*offset..end))
                        .ok_or_else(|| {
                            Error::corrupt(format!(
                                "delta copy {offset}+{length} exceeds base of {} bytes",
                                base.len()
                            ))
                        })?;
                    output.extend_from_slice(chunk);
                }
                DeltaInstruction::Insert(data) => output.extend_from_slice(data),
            }

            if output.len() > self.result_size {
                return Err(Error::corrupt("delta output exceeds declared size"));
            }
        }

        if output.len() != self.result_size {
            return Err(Error::corrupt(format!(
                "delta produced {} bytes, expected {}",
                output.len(),
                self.result_size
            )));
        }

        Ok(output)
    }
}

fn read_size(cursor: &mut ByteCursor<'_>) -> Result<usize> {
    let mut size = 0usize;
    let mut shift = 0;

    loop {
        let byte = cursor.read_u8()?;
        let bits = (byte & !COPY_FLAG) as usize;
        if shift >= usize::BITS || (bits << shift) >> shift != bits {
            return Err(Error::corrupt("delta size overflows"));
        }
        size |= bits << shift;
        shift += 7;

        if byte & COPY_FLAG == 0 {
            return Ok(size);
        }
    }
}
