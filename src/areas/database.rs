use crate::areas::packs::PackStore;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object::{Object, ObjectHeader};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::parser::ByteCursor;
use crate::errors::{Error, Result};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// Longest `<type> <size>\0` header read when only the header is wanted
const MAX_HEADER_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Pack directory, `<objects>/pack` when unset
    pub pack_dir: Option<PathBuf>,
    /// Shortest accepted abbreviated object id
    pub min_short_len: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        DatabaseOptions {
            pack_dir: None,
            min_short_len: 4,
        }
    }
}

/// Object store over loose objects and packs
///
/// Loose objects take precedence; packs are indexed on first use.
#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    packs: PackStore,
    min_short_len: usize,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, DatabaseOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: DatabaseOptions) -> Self {
        let path = path.into();
        let pack_dir = options.pack_dir.unwrap_or_else(|| path.join("pack"));

        Database {
            path: path.into_boxed_path(),
            packs: PackStore::new(pack_dir),
            min_short_len: options.min_short_len,
        }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn pack_dir(&self) -> &Path {
        self.packs.pack_dir()
    }

    pub fn get(&self, object_id: &ObjectId) -> Result<Object> {
        if let Some(data) = self.read_loose(object_id)? {
            return Object::parse(object_id.clone(), &data);
        }
        trace!(%object_id, "not a loose object, trying packs");

        match self.packs.packs()?.read_object(object_id)? {
            Some((object_type, payload)) => Object::parse_payload(
                object_id.clone(),
                ObjectHeader::new(object_type, payload.len()),
                &payload,
            ),
            None => Err(Error::not_found(format!("object {object_id}"))),
        }
    }

    /// Look an object up by an abbreviated hex id
    pub fn get_by_short(&self, prefix: &str) -> Result<Object> {
        let object_id = self.resolve_short(prefix)?;

        self.get(&object_id)
    }

    /// Expand an abbreviated hex id into the unique full id it denotes
    pub fn resolve_short(&self, prefix: &str) -> Result<ObjectId> {
        if prefix.len() < self.min_short_len {
            return Err(Error::invalid_spec(format!(
                "short object id {prefix:?} is shorter than {} characters",
                self.min_short_len
            )));
        }
        if prefix.len() > OBJECT_ID_LENGTH || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::invalid_spec(format!("{prefix:?} is not an object id")));
        }
        let prefix = prefix.to_ascii_lowercase();

        if prefix.len() == OBJECT_ID_LENGTH {
            let object_id = ObjectId::try_parse(&prefix)?;
            return if self.contains(&object_id)? {
                Ok(object_id)
            } else {
                Err(Error::not_found(format!("object {object_id}")))
            };
        }

        let mut candidates = self.find_loose_by_prefix(&prefix)?;
        candidates.extend(self.packs.packs()?.lookup_prefix(&prefix));
        let mut candidates = candidates.into_iter();

        match (candidates.next(), candidates.len()) {
            (None, _) => Err(Error::not_found(format!("object {prefix}"))),
            (Some(object_id), 0) => Ok(object_id),
            (Some(first), _) => Err(Error::Ambiguous {
                prefix,
                candidates: std::iter::once(first).chain(candidates).collect(),
            }),
        }
    }

    pub fn contains(&self, object_id: &ObjectId) -> Result<bool> {
        if self.path.join(object_id.to_path()).is_file() {
            return Ok(true);
        }

        Ok(self.packs.packs()?.contains(object_id))
    }

    /// Type and size of an object without decoding its payload
    pub fn read_header(&self, object_id: &ObjectId) -> Result<ObjectHeader> {
        let object_path = self.path.join(object_id.to_path());
        match std::fs::File::open(&object_path) {
            Ok(file) => {
                let mut prefix = Vec::with_capacity(MAX_HEADER_LEN);
                flate2::read::ZlibDecoder::new(file)
                    .take(MAX_HEADER_LEN as u64)
                    .read_to_end(&mut prefix)
                    .map_err(|e| Self::inflate_error(&object_path, e))?;

                ObjectHeader::parse(&mut ByteCursor::new(&prefix))
                    .map_err(|e| e.within(format!("object {object_id}")))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match self.packs.packs()?.read_object(object_id)? {
                    Some((object_type, payload)) => Ok(ObjectHeader::new(object_type, payload.len())),
                    None => Err(Error::not_found(format!("object {object_id}"))),
                }
            }
            Err(e) => Err(Error::io(object_path, e)),
        }
    }

    /// Every object id, loose first, then packed
    ///
    /// An object stored both ways is listed twice.
    pub fn all_ids(&self) -> Result<Vec<ObjectId>> {
        let mut object_ids = Vec::new();

        let walker = WalkDir::new(&self.path)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name();
        if self.path.is_dir() {
            for entry in walker {
                let entry = entry.map_err(|e| {
                    let path = e.path().unwrap_or(self.objects_path()).to_path_buf();
                    Error::io(path, e.into())
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(object_id) = Self::loose_id(entry.path()) {
                    object_ids.push(object_id);
                }
            }
        }

        let packs = self.packs.packs()?;
        object_ids.extend(packs.all_ids().cloned());

        Ok(object_ids)
    }

    pub fn all_objects(&self) -> Result<impl Iterator<Item = Result<Object>> + '_> {
        Ok(self
            .all_ids()?
            .into_iter()
            .map(move |object_id| self.get(&object_id)))
    }

    /// Check every pack against its checksum and entry CRCs
    pub fn verify_packs(&self) -> Result<usize> {
        self.packs.packs()?.verify()
    }

    fn read_loose(&self, object_id: &ObjectId) -> Result<Option<Vec<u8>>> {
        let object_path = self.path.join(object_id.to_path());

        let compressed = match std::fs::read(&object_path) {
            Ok(compressed) => compressed,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(object_path, e)),
        };

        Self::decompress(&compressed)
            .map(Some)
            .map_err(|e| Self::inflate_error(&object_path, e))
    }

    fn find_loose_by_prefix(&self, prefix: &str) -> Result<BTreeSet<ObjectId>> {
        let mut matches = BTreeSet::new();

        // a two character prefix narrows the scan to one fan-out directory
        let dirs: Vec<String> = match prefix.get(..2) {
            Some(dir_name) => vec![dir_name.to_string()],
            None => (0..=255).map(|i| format!("{i:02x}")).collect(),
        };

        for dir_name in dirs {
            let dir_path = self.path.join(&dir_name);
            let read_dir = match std::fs::read_dir(&dir_path) {
                Ok(read_dir) => read_dir,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(dir_path, e)),
            };

            for entry in read_dir {
                let entry = entry.map_err(|e| Error::io(&dir_path, e))?;
                if let Some(object_id) = Self::loose_id(&entry.path())
                    && object_id.starts_with_hex(prefix)
                {
                    matches.insert(object_id);
                }
            }
        }

        Ok(matches)
    }

    /// Object id named by a `<objects>/xx/yyyy...` path
    fn loose_id(path: &Path) -> Option<ObjectId> {
        let file_name = path.file_name()?.to_str()?;
        let dir_name = path.parent()?.file_name()?.to_str()?;
        if dir_name.len() != 2 || file_name.len() != OBJECT_ID_LENGTH - 2 {
            return None;
        }

        ObjectId::try_parse(&format!("{dir_name}{file_name}")).ok()
    }

    fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content)
    }

    fn inflate_error(object_path: &Path, error: std::io::Error) -> Error {
        Error::corrupt(format!(
            "{}: unable to decompress object: {error}",
            object_path.display()
        ))
    }
}
