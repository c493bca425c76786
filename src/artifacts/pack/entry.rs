//! Pack entry headers
//!
//! Each entry starts with a variable-length header: the first byte holds
//! the type in bits 4-6 and the low 4 size bits; following bytes add 7
//! size bits each while the continuation bit is set. Delta entries then
//! name their base, either by a relative offset or by object ID.

use crate::artifacts::objects::RAW_OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::{OFS_DELTA_CODE, REF_DELTA_CODE};
use crate::errors::{Error, Result};
use byteorder::ReadBytesExt;
use std::io::Read;

const CONTINUE_FLAG: u8 = 0b1000_0000;
const TYPE_MASK: u8 = 0b0111_0000;
const FIRST_SIZE_MASK: u8 = 0b0000_1111;
const SIZE_MASK: u8 = 0b0111_1111;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackEntryKind {
    Base(ObjectType),
    /// Delta against an earlier entry of the same pack
    OfsDelta { base_offset: u64 },
    /// Delta against the object with the given id
    RefDelta { base_oid: ObjectId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntryHeader {
    pub kind: PackEntryKind,
    /// Inflated size of the entry data (the delta stream for delta entries)
    pub size: usize,
    /// Bytes occupied by the header, base reference included
    pub header_len: usize,
}

impl PackEntryHeader {
    /// Read an entry header located at `offset` in the pack
    pub fn read(reader: &mut impl Read, offset: u64) -> Result<Self> {
        Self::decode(reader, offset).map_err(|e| e.within(format!("pack entry at {offset}")))
    }

    fn decode(reader: &mut impl Read, offset: u64) -> Result<Self> {
        let mut header_len = 1;
        let mut byte = read_byte(reader)?;

        let type_code = (byte & TYPE_MASK) >> 4;
        let mut size = (byte & FIRST_SIZE_MASK) as u64;
        let mut shift = 4;
        while byte & CONTINUE_FLAG != 0 {
            byte = read_byte(reader)?;
            header_len += 1;
            if shift > 57 {
                return Err(Error::corrupt("entry size overflows"));
            }
            size |= u64::from(byte & SIZE_MASK) << shift;
            shift += 7;
        }
        let size = usize::try_from(size).map_err(|_| Error::corrupt("entry size overflows"))?;

        let kind = match type_code {
            OFS_DELTA_CODE => {
                let (distance, len) = read_offset_distance(reader)?;
                header_len += len;
                let base_offset = offset
                    .checked_sub(distance)
                    .filter(|_| distance > 0)
                    .ok_or_else(|| Error::corrupt(format!("delta base distance {distance} out of range")))?;
                PackEntryKind::OfsDelta { base_offset }
            }
            REF_DELTA_CODE => {
                let mut raw = [0; RAW_OBJECT_ID_LENGTH];
                reader
                    .read_exact(&mut raw)
                    .map_err(|e| Error::corrupt(format!("truncated delta base id: {e}")))?;
                header_len += RAW_OBJECT_ID_LENGTH;
                PackEntryKind::RefDelta {
                    base_oid: ObjectId::from_bytes(raw),
                }
            }
            code => match ObjectType::from_pack_code(code) {
                Some(object_type) => PackEntryKind::Base(object_type),
                None => return Err(Error::corrupt(format!("invalid entry type {code}"))),
            },
        };

        Ok(PackEntryHeader {
            kind,
            size,
            header_len,
        })
    }
}

fn read_byte(reader: &mut impl Read) -> Result<u8> {
    reader
        .read_u8()
        .map_err(|e| Error::corrupt(format!("truncated entry header: {e}")))
}

/// Offset-delta distances use a big-endian base-128 encoding where each
/// continuation adds one before shifting
fn read_offset_distance(reader: &mut impl Read) -> Result<(u64, usize)> {
    let mut byte = read_byte(reader)?;
    let mut len = 1;
    let mut distance = u64::from(byte & SIZE_MASK);

    while byte & CONTINUE_FLAG != 0 {
        byte = read_byte(reader)?;
        len += 1;
        distance = distance
            .checked_add(1)
            .and_then(|d| d.checked_mul(1 << 7))
            .map(|d| d | u64::from(byte & SIZE_MASK))
            .ok_or_else(|| Error::corrupt("delta base distance overflows"))?;
    }

    Ok((distance, len))
}
