//! Writes version 2 packs and indexes the way `git pack-objects` lays them out

use bit_odb::artifacts::objects::object::Object;
use bit_odb::artifacts::objects::object_id::ObjectId;
use bit_odb::artifacts::objects::object_type::ObjectType;
use bit_odb::artifacts::pack::{OFS_DELTA_CODE, REF_DELTA_CODE};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use sha1::{Digest, Sha1};
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_INSERT: usize = 0x7f;

struct WrittenEntry {
    oid: ObjectId,
    offset: u64,
    crc32: u32,
}

#[derive(Default)]
pub struct PackWriter {
    body: Vec<u8>,
    entries: Vec<WrittenEntry>,
}

impl PackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next entry will land at
    fn next_offset(&self) -> u64 {
        12 + self.body.len() as u64
    }

    pub fn add_object(&mut self, object_type: ObjectType, payload: &[u8]) -> (ObjectId, u64) {
        let oid = Object::hash(object_type, payload);
        let offset = self.add_raw(oid.clone(), object_type.pack_code(), &[], payload);

        (oid, offset)
    }

    /// Store `target` as a delta against the entry at `base_offset`
    pub fn add_ofs_delta(
        &mut self,
        base_offset: u64,
        object_type: ObjectType,
        base: &[u8],
        target: &[u8],
    ) -> (ObjectId, u64) {
        let oid = Object::hash(object_type, target);
        let distance = encode_offset_distance(self.next_offset() - base_offset);
        let offset = self.add_raw(oid.clone(), OFS_DELTA_CODE, &distance, &make_delta(base, target));

        (oid, offset)
    }

    /// Store `target` as a delta against the object `base_oid`
    pub fn add_ref_delta(
        &mut self,
        base_oid: &ObjectId,
        object_type: ObjectType,
        base: &[u8],
        target: &[u8],
    ) -> (ObjectId, u64) {
        let oid = Object::hash(object_type, target);
        let offset = self.add_raw(
            oid.clone(),
            REF_DELTA_CODE,
            base_oid.as_bytes(),
            &make_delta(base, target),
        );

        (oid, offset)
    }

    /// Append an entry under an arbitrary id, `base` being the raw base reference
    pub fn add_raw(&mut self, oid: ObjectId, type_code: u8, base: &[u8], data: &[u8]) -> u64 {
        let offset = self.next_offset();
        let start = self.body.len();

        self.body.extend(encode_entry_header(type_code, data.len()));
        self.body.extend_from_slice(base);
        self.body.extend(deflate(data));

        let crc32 = crc32fast::hash(&self.body[start..]);
        self.entries.push(WrittenEntry { oid, offset, crc32 });

        offset
    }

    /// Write `pack-<checksum>.pack` and its `.idx` into `pack_dir`
    pub fn write(self, pack_dir: &Path) -> std::io::Result<PathBuf> {
        let pack = self.pack_bytes();
        let checksum = &pack[pack.len() - 20..];
        let index = self.index_bytes(checksum);

        std::fs::create_dir_all(pack_dir)?;
        let stem = pack_dir.join(format!("pack-{}", hex::encode(checksum)));
        std::fs::write(stem.with_extension("pack"), &pack)?;
        std::fs::write(stem.with_extension("idx"), &index)?;

        Ok(stem.with_extension("pack"))
    }

    fn pack_bytes(&self) -> Vec<u8> {
        let mut pack = Vec::with_capacity(12 + self.body.len() + 20);
        pack.extend_from_slice(b"PACK");
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        pack.extend_from_slice(&self.body);

        let checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&checksum);
        pack
    }

    fn index_bytes(&self, pack_checksum: &[u8]) -> Vec<u8> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.oid.cmp(&b.oid));

        let mut index = Vec::new();
        index.extend_from_slice(b"\xfftOc");
        index.extend_from_slice(&2u32.to_be_bytes());

        let mut fanout = [0u32; 256];
        for entry in &sorted {
            for slot in &mut fanout[entry.oid.as_bytes()[0] as usize..] {
                *slot += 1;
            }
        }
        for count in fanout {
            index.extend_from_slice(&count.to_be_bytes());
        }
        for entry in &sorted {
            index.extend_from_slice(entry.oid.as_bytes());
        }
        for entry in &sorted {
            index.extend_from_slice(&entry.crc32.to_be_bytes());
        }
        for entry in &sorted {
            index.extend_from_slice(&(entry.offset as u32).to_be_bytes());
        }
        index.extend_from_slice(pack_checksum);

        let checksum = Sha1::digest(&index);
        index.extend_from_slice(&checksum);
        index
    }
}

fn encode_entry_header(type_code: u8, size: usize) -> Vec<u8> {
    let mut header = Vec::new();
    let mut byte = (type_code << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;

    while rest != 0 {
        header.push(byte | 0x80);
        byte = (rest & 0x7f) as u8;
        rest >>= 7;
    }
    header.push(byte);

    header
}

fn encode_offset_distance(distance: u64) -> Vec<u8> {
    let mut n = distance;
    let mut bytes = vec![(n & 0x7f) as u8];
    n >>= 7;

    while n != 0 {
        n -= 1;
        bytes.push(0x80 | (n & 0x7f) as u8);
        n >>= 7;
    }
    bytes.reverse();

    bytes
}

fn encode_size(mut size: usize, out: &mut Vec<u8>) {
    loop {
        let byte = (size & 0x7f) as u8;
        size >>= 7;
        if size == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Copy the shared prefix of `base`, insert the rest of `target`
pub fn make_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();
    encode_size(base.len(), &mut delta);
    encode_size(target.len(), &mut delta);

    let shared = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count()
        .min(0xff_ffff);
    if shared > 0 {
        delta.extend(copy_instruction(0, shared));
    }
    for chunk in target[shared..].chunks(MAX_INSERT) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }

    delta
}

pub fn copy_instruction(offset: usize, size: usize) -> Vec<u8> {
    let mut opcode = 0x80u8;
    let mut args = Vec::new();

    for i in 0..4 {
        let byte = (offset >> (i * 8)) as u8;
        if byte != 0 {
            opcode |= 1 << i;
            args.push(byte);
        }
    }
    for i in 0..3 {
        let byte = (size >> (i * 8)) as u8;
        if byte != 0 {
            opcode |= 1 << (4 + i);
            args.push(byte);
        }
    }

    let mut instruction = vec![opcode];
    instruction.extend(args);
    instruction
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("Failed to deflate");
    encoder.finish().expect("Failed to deflate")
}
