//! Byte cursor used by every binary and text parser in the crate
//!
//! The cursor walks a borrowed byte slice and keeps a running count of the
//! bytes consumed so far. Every read either succeeds fully or returns
//! [`Error::Corrupt`] without moving the cursor.

use crate::artifacts::objects::RAW_OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, position: 0 }
    }

    /// Number of bytes consumed since the cursor was created
    pub fn consumed(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    pub fn starts_with(&self, token: &[u8]) -> bool {
        self.remaining().starts_with(token)
    }

    /// Read up to (excluding) `delimiter`, consuming the delimiter too
    pub fn read_until(&mut self, delimiter: u8) -> Result<&'a [u8]> {
        let rest = self.remaining();
        let end = rest.iter().position(|&b| b == delimiter).ok_or_else(|| {
            Error::corrupt(format!(
                "missing delimiter {:?} at offset {}",
                delimiter as char, self.position
            ))
        })?;

        self.position += end + 1;
        Ok(&rest[..end])
    }

    pub fn read_str_until(&mut self, delimiter: u8) -> Result<&'a str> {
        let start = self.position;
        let token = self.read_until(delimiter)?;

        std::str::from_utf8(token).map_err(|e| {
            self.position = start;
            Error::corrupt(format!("invalid UTF-8 at offset {start}: {e}"))
        })
    }

    /// Read a decimal integer terminated by `delimiter`
    pub fn read_decimal_until(&mut self, delimiter: u8) -> Result<usize> {
        let start = self.position;
        let digits = self.read_until(delimiter)?;

        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            self.position = start;
            return Err(Error::corrupt(format!(
                "invalid decimal number {:?}",
                String::from_utf8_lossy(digits)
            )));
        }

        std::str::from_utf8(digits)
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| {
                self.position = start;
                Error::corrupt("decimal number out of range")
            })
    }

    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        let rest = self.remaining();
        if rest.len() < len {
            return Err(Error::corrupt(format!(
                "unexpected end of data: wanted {len} bytes at offset {}, {} left",
                self.position,
                rest.len()
            )));
        }

        self.position += len;
        Ok(&rest[..len])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_exact(4)?))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.read_exact(8)?))
    }

    /// Read a raw 20-byte object ID
    pub fn read_object_id(&mut self) -> Result<ObjectId> {
        ObjectId::try_from_slice(self.read_exact(RAW_OBJECT_ID_LENGTH)?)
    }

    /// Read a 40-character hex object ID terminated by `delimiter`
    pub fn read_hex_object_id(&mut self, delimiter: u8) -> Result<ObjectId> {
        let start = self.position;
        let hex = self.read_str_until(delimiter)?;

        ObjectId::try_parse(hex).inspect_err(|_| self.position = start)
    }

    /// Consume `token` or fail
    pub fn expect(&mut self, token: &[u8]) -> Result<()> {
        if !self.starts_with(token) {
            return Err(Error::corrupt(format!(
                "expected {:?} at offset {}",
                String::from_utf8_lossy(token),
                self.position
            )));
        }

        self.position += token.len();
        Ok(())
    }

    /// Consume `token` if it comes next
    pub fn eat(&mut self, token: &[u8]) -> bool {
        self.expect(token).is_ok()
    }

    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.remaining();
        self.position = self.data.len();
        rest
    }
}
