use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::delta::Delta;
use crate::artifacts::pack::entry::{PackEntryHeader, PackEntryKind};
use crate::artifacts::pack::index::PackIndex;
use crate::artifacts::pack::{CHECKSUM_SIZE, PACK_HEADER_SIZE, PACK_SIGNATURE};
use crate::errors::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

/// One `pack-<sha>.pack`/`pack-<sha>.idx` pair
#[derive(Debug)]
pub struct PackFile {
    pack_path: PathBuf,
    pack_len: u64,
    index: PackIndex,
}

impl PackFile {
    fn open(index_path: &Path) -> Result<Option<Self>> {
        let pack_path = index_path.with_extension("pack");
        if !pack_path.exists() {
            warn!(index = %index_path.display(), "pack index without a pack file, skipping");
            return Ok(None);
        }

        let index_bytes = std::fs::read(index_path).map_err(|e| Error::io(index_path, e))?;
        let index =
            PackIndex::parse(&index_bytes).map_err(|e| e.within(index_path.display()))?;

        let mut file = File::open(&pack_path).map_err(|e| Error::io(&pack_path, e))?;
        let pack_len = file
            .metadata()
            .map_err(|e| Error::io(&pack_path, e))?
            .len();
        let mut header = [0; PACK_HEADER_SIZE];
        file.read_exact(&mut header)
            .map_err(|_| Error::corrupt(format!("{}: truncated pack header", pack_path.display())))?;

        let pack_file = PackFile {
            pack_path,
            pack_len,
            index,
        };
        pack_file
            .validate_header(&header)
            .map_err(|e| e.within(pack_file.pack_path.display()))?;

        Ok(Some(pack_file))
    }

    fn validate_header(&self, header: &[u8; PACK_HEADER_SIZE]) -> Result<()> {
        if &header[..4] != PACK_SIGNATURE {
            return Err(Error::corrupt("bad pack signature"));
        }
        let version = BigEndian::read_u32(&header[4..8]);
        if version != 2 && version != 3 {
            return Err(Error::corrupt(format!("unsupported pack version {version}")));
        }
        let count = BigEndian::read_u32(&header[8..12]) as usize;
        if count != self.index.len() {
            return Err(Error::corrupt(format!(
                "pack holds {count} objects but its index lists {}",
                self.index.len()
            )));
        }

        let data_end = self.data_end();
        if let Some(entry) = self
            .index
            .entries()
            .iter()
            .find(|entry| entry.offset < PACK_HEADER_SIZE as u64 || entry.offset >= data_end)
        {
            return Err(Error::corrupt(format!(
                "object {} has offset {} outside the pack",
                entry.oid, entry.offset
            )));
        }

        Ok(())
    }

    /// Offset where the trailing checksum starts
    fn data_end(&self) -> u64 {
        self.pack_len.saturating_sub(CHECKSUM_SIZE as u64)
    }

    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Read and inflate the entry at `offset`
    fn read_entry(&self, offset: u64) -> Result<(PackEntryHeader, Vec<u8>)> {
        let file = File::open(&self.pack_path).map_err(|e| Error::io(&self.pack_path, e))?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(&self.pack_path, e))?;

        let header = PackEntryHeader::read(&mut reader, offset)?;

        // header sizes are untrusted, let the inflated stream drive growth
        let mut data = Vec::new();
        flate2::bufread::ZlibDecoder::new(reader)
            .take((header.size as u64).saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| Error::corrupt(format!("pack entry at {offset}: inflate failed: {e}")))?;
        if data.len() != header.size {
            return Err(Error::corrupt(format!(
                "pack entry at {offset}: inflated to {} bytes, header declares {}",
                data.len(),
                header.size
            )));
        }

        Ok((header, data))
    }

    /// Check the trailing pack checksum and every entry CRC32
    fn verify(&self) -> Result<usize> {
        let data = std::fs::read(&self.pack_path).map_err(|e| Error::io(&self.pack_path, e))?;
        if data.len() < PACK_HEADER_SIZE + CHECKSUM_SIZE {
            return Err(Error::corrupt("truncated pack"));
        }
        let (body, trailer) = data.split_at(data.len() - CHECKSUM_SIZE);

        let mut hasher = Sha1::new();
        hasher.update(body);
        let checksum = ObjectId::from_hasher(hasher);
        if checksum.as_bytes()[..] != trailer[..] {
            return Err(Error::corrupt("pack checksum mismatch"));
        }
        if &checksum != self.index.pack_checksum() {
            return Err(Error::corrupt("pack checksum does not match its index"));
        }

        let mut entries: Vec<_> = self.index.entries().iter().collect();
        entries.sort_by_key(|entry| entry.offset);
        for (i, entry) in entries.iter().enumerate() {
            let end = entries
                .get(i + 1)
                .map_or(body.len(), |next| next.offset as usize);
            let packed = &body[entry.offset as usize..end];
            if crc32fast::hash(packed) != entry.crc32 {
                return Err(Error::corrupt(format!("CRC32 mismatch for object {}", entry.oid)));
            }
        }

        Ok(entries.len())
    }
}

/// Every pack of a repository plus the id map built across them
#[derive(Debug, Default)]
pub struct Packs {
    packs: Vec<PackFile>,
    locations: HashMap<ObjectId, (usize, u64)>,
}

impl Packs {
    pub fn load(pack_dir: &Path) -> Result<Self> {
        let read_dir = match std::fs::read_dir(pack_dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %pack_dir.display(), "no pack directory");
                return Ok(Packs::default());
            }
            Err(e) => return Err(Error::io(pack_dir, e)),
        };

        let mut index_paths = Vec::new();
        for entry in read_dir {
            let path = entry.map_err(|e| Error::io(pack_dir, e))?.path();
            let is_index = path.extension().is_some_and(|ext| ext == "idx")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("pack-"));
            if is_index {
                index_paths.push(path);
            }
        }
        index_paths.sort();

        let mut packs = Packs::default();
        for index_path in index_paths {
            let Some(pack_file) = PackFile::open(&index_path)? else {
                continue;
            };

            let pack = packs.packs.len();
            for entry in pack_file.index.entries() {
                packs
                    .locations
                    .entry(entry.oid.clone())
                    .or_insert((pack, entry.offset));
            }
            packs.packs.push(pack_file);
        }

        debug!(
            packs = packs.packs.len(),
            objects = packs.locations.len(),
            "indexed packs"
        );
        Ok(packs)
    }

    pub fn packs(&self) -> &[PackFile] {
        &self.packs
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.locations.contains_key(object_id)
    }

    pub fn all_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.packs
            .iter()
            .flat_map(|pack| pack.index.entries().iter().map(|entry| &entry.oid))
    }

    pub fn lookup_prefix(&self, prefix: &str) -> Vec<ObjectId> {
        self.packs
            .iter()
            .flat_map(|pack| pack.index.lookup_prefix(prefix))
            .collect()
    }

    /// Type and fully resolved payload of a packed object
    pub fn read_object(&self, object_id: &ObjectId) -> Result<Option<(ObjectType, Vec<u8>)>> {
        let Some(&(pack, offset)) = self.locations.get(object_id) else {
            return Ok(None);
        };

        self.resolve(pack, offset)
            .map(Some)
            .map_err(|e| e.within(format!("packed object {object_id}")))
    }

    /// Walk a delta chain down to its base, then apply the deltas back up
    fn resolve(&self, mut pack: usize, mut offset: u64) -> Result<(ObjectType, Vec<u8>)> {
        let mut visited = HashSet::new();
        let mut deltas = Vec::new();

        let (object_type, mut data) = loop {
            if !visited.insert((pack, offset)) {
                return Err(Error::corrupt(format!("cyclic delta chain at offset {offset}")));
            }

            let (header, data) = self.packs[pack].read_entry(offset)?;
            match header.kind {
                PackEntryKind::Base(object_type) => break (object_type, data),
                PackEntryKind::OfsDelta { base_offset } => {
                    deltas.push(data);
                    offset = base_offset;
                }
                PackEntryKind::RefDelta { base_oid } => {
                    deltas.push(data);
                    (pack, offset) = *self.locations.get(&base_oid).ok_or_else(|| {
                        Error::corrupt(format!("delta base {base_oid} is not in any pack"))
                    })?;
                }
            }
        };

        if !deltas.is_empty() {
            trace!(depth = deltas.len(), %object_type, "applying delta chain");
        }
        for delta in deltas.iter().rev() {
            data = Delta::parse(delta)?.apply(&data)?;
        }

        Ok((object_type, data))
    }

    pub fn verify(&self) -> Result<usize> {
        let mut verified = 0;
        for pack in &self.packs {
            verified += pack.verify().map_err(|e| e.within(pack.pack_path.display()))?;
        }

        Ok(verified)
    }
}

/// Lazily loaded view of the pack directory
///
/// The first lookup builds the id map under a write lock; every later
/// lookup shares the same snapshot.
#[derive(Debug)]
pub struct PackStore {
    pack_dir: PathBuf,
    loaded: RwLock<Option<Arc<Packs>>>,
}

impl PackStore {
    pub fn new(pack_dir: impl Into<PathBuf>) -> Self {
        PackStore {
            pack_dir: pack_dir.into(),
            loaded: RwLock::new(None),
        }
    }

    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    pub fn packs(&self) -> Result<Arc<Packs>> {
        if let Some(packs) = self
            .loaded
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            return Ok(Arc::clone(packs));
        }

        let mut loaded = self
            .loaded
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(packs) = loaded.as_ref() {
            return Ok(Arc::clone(packs));
        }

        let packs = Arc::new(Packs::load(&self.pack_dir)?);
        *loaded = Some(Arc::clone(&packs));

        Ok(packs)
    }
}
