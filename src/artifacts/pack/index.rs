use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::parser::ByteCursor;
use crate::artifacts::pack::{CHECKSUM_SIZE, INDEX_SIGNATURE, INDEX_VERSION};
use crate::errors::{Error, Result};
use derive_new::new;
use sha1::{Digest, Sha1};
use std::collections::HashMap;

const FANOUT_ENTRIES: usize = 256;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct PackIndexEntry {
    pub oid: ObjectId,
    /// Byte offset of the entry in the pack data file
    pub offset: u64,
    /// CRC32 of the packed (compressed) representation
    pub crc32: u32,
}

/// Fully loaded pack index
///
/// Entries stay in on-disk (hash) order; lookups go through an id map built
/// at load time.
#[derive(Debug, Clone)]
pub struct PackIndex {
    fanout: [u32; FANOUT_ENTRIES],
    entries: Vec<PackIndexEntry>,
    by_id: HashMap<ObjectId, usize>,
    pack_checksum: ObjectId,
    index_checksum: ObjectId,
}

impl PackIndex {
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::decode(data).map_err(|e| e.within("pack index"))
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);

        cursor
            .expect(INDEX_SIGNATURE)
            .map_err(|_| Error::corrupt("bad signature"))?;
        let version = cursor.read_u32_be()?;
        if version != INDEX_VERSION {
            return Err(Error::corrupt(format!("unsupported version {version}")));
        }

        let mut fanout = [0; FANOUT_ENTRIES];
        for slot in fanout.iter_mut() {
            *slot = cursor.read_u32_be()?;
        }
        if fanout.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(Error::corrupt("fan-out table is not monotonic"));
        }
        let count = fanout[FANOUT_ENTRIES - 1] as usize;
        if cursor.remaining().len() < count * (20 + 4 + 4) + 2 * CHECKSUM_SIZE {
            return Err(Error::corrupt(format!("truncated index for {count} objects")));
        }

        let mut oids = Vec::with_capacity(count);
        for _ in 0..count {
            oids.push(cursor.read_object_id()?);
        }
        if oids.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::corrupt("object IDs are not strictly sorted"));
        }
        for (i, oid) in oids.iter().enumerate() {
            let bucket = oid.as_bytes()[0] as usize;
            let start = if bucket == 0 { 0 } else { fanout[bucket - 1] as usize };
            if i < start || i >= fanout[bucket] as usize {
                return Err(Error::corrupt(format!("object {oid} outside its fan-out bucket")));
            }
        }

        let mut crcs = Vec::with_capacity(count);
        for _ in 0..count {
            crcs.push(cursor.read_u32_be()?);
        }

        let mut small_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            small_offsets.push(cursor.read_u32_be()?);
        }

        let large_count = small_offsets
            .iter()
            .filter(|&&offset| offset & LARGE_OFFSET_FLAG != 0)
            .count();
        let mut large_offsets = Vec::with_capacity(large_count);
        for _ in 0..large_count {
            large_offsets.push(cursor.read_u64_be()?);
        }

        let pack_checksum = cursor.read_object_id()?;
        let checksummed_len = cursor.consumed();
        let index_checksum = cursor.read_object_id()?;

        if !cursor.is_empty() {
            return Err(Error::corrupt(format!(
                "{} trailing bytes after checksums",
                cursor.remaining().len()
            )));
        }

        let mut hasher = Sha1::new();
        hasher.update(&data[..checksummed_len]);
        if ObjectId::from_hasher(hasher) != index_checksum {
            return Err(Error::corrupt("index checksum mismatch"));
        }

        let mut entries = Vec::with_capacity(count);
        for ((oid, crc32), offset) in oids.into_iter().zip(crcs).zip(small_offsets) {
            let offset = if offset & LARGE_OFFSET_FLAG != 0 {
                let slot = (offset & !LARGE_OFFSET_FLAG) as usize;
                *large_offsets
                    .get(slot)
                    .ok_or_else(|| Error::corrupt(format!("large offset slot {slot} out of range")))?
            } else {
                u64::from(offset)
            };
            entries.push(PackIndexEntry::new(oid, offset, crc32));
        }

        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.oid.clone(), i))
            .collect();

        Ok(PackIndex {
            fanout,
            entries,
            by_id,
            pack_checksum,
            index_checksum,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PackIndexEntry] {
        &self.entries
    }

    pub fn find(&self, oid: &ObjectId) -> Option<&PackIndexEntry> {
        self.by_id.get(oid).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.by_id.contains_key(oid)
    }

    /// All ids starting with the hex `prefix`, narrowed by the fan-out table
    pub fn lookup_prefix(&self, prefix: &str) -> Vec<ObjectId> {
        if prefix.len() > OBJECT_ID_LENGTH {
            return Vec::new();
        }

        let bucket = prefix
            .get(..2)
            .and_then(|first| u8::from_str_radix(first, 16).ok());
        let range = match bucket {
            Some(bucket) => {
                let bucket = bucket as usize;
                let start = if bucket == 0 { 0 } else { self.fanout[bucket - 1] as usize };
                start..self.fanout[bucket] as usize
            }
            None => 0..self.entries.len(),
        };

        self.entries[range]
            .iter()
            .filter(|entry| entry.oid.starts_with_hex(prefix))
            .map(|entry| entry.oid.clone())
            .collect()
    }

    /// Checksum of the companion pack data file
    pub fn pack_checksum(&self) -> &ObjectId {
        &self.pack_checksum
    }

    /// Checksum of the index file itself
    pub fn index_checksum(&self) -> &ObjectId {
        &self.index_checksum
    }
}
