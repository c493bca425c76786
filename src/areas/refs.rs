//! Git references (HEAD, branches, tags, remotes)
//!
//! Refs are read on demand from loose files under the metadata root, with
//! the `packed-refs` file as a fallback. A loose ref always wins over a
//! packed entry of the same name, since the packed snapshot may be stale.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::packed_refs::PackedRefs;
use crate::artifacts::refs::ref_name::RefName;
use crate::artifacts::refs::{HEAD_REF_NAME, Ref, RefTarget, search_names};
use crate::errors::{Error, ErrorKind, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Longest symbolic chain followed before giving up
pub const MAX_SYMREF_DEPTH: usize = 5;

const PACKED_REFS_FILE: &str = "packed-refs";

#[derive(Debug)]
pub struct Refs {
    /// Path to the metadata root (typically `.git`)
    path: Box<Path>,
    packed: RwLock<Option<Arc<PackedRefs>>>,
}

impl Refs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Refs {
            path: path.into().into_boxed_path(),
            packed: RwLock::new(None),
        }
    }

    /// Read one ref by its full name, loose file first
    pub fn resolve(&self, name: &str) -> Result<Ref> {
        let ref_name = RefName::try_parse(name)?;

        if let Some(target) = self.read_loose(&ref_name)? {
            let peeled = match &target {
                RefTarget::Direct(oid) => self.peeled_if_same(name, oid)?,
                RefTarget::Symbolic(_) => None,
            };
            return Ok(Ref::new(name, target).with_peeled(peeled));
        }

        self.packed()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("ref {name}")))
    }

    /// Follow symbolic refs until a direct id is found
    pub fn resolve_to_id(&self, name: &str) -> Result<ObjectId> {
        let mut chain = vec![name.to_string()];

        loop {
            let current = chain.last().map(String::as_str).unwrap_or(name);
            match self.resolve(current)?.target() {
                RefTarget::Direct(oid) => return Ok(oid.clone()),
                RefTarget::Symbolic(target) => {
                    trace!(from = current, to = %target, "following symbolic ref");
                    if chain.contains(target) {
                        return Err(Error::corrupt(format!(
                            "symbolic ref cycle: {} -> {target}",
                            chain.join(" -> ")
                        )));
                    }
                    if chain.len() > MAX_SYMREF_DEPTH {
                        return Err(Error::corrupt(format!(
                            "symbolic ref {name} nests deeper than {MAX_SYMREF_DEPTH}"
                        )));
                    }
                    chain.push(target.clone());
                }
            }
        }
    }

    pub fn head(&self) -> Result<ObjectId> {
        self.resolve_to_id(HEAD_REF_NAME)
    }

    /// Find the ref a short name stands for
    ///
    /// Tries `<name>`, `refs/<name>`, `refs/tags/<name>`, `refs/heads/<name>`,
    /// `refs/remotes/<name>` and `refs/remotes/<name>/HEAD` in that order.
    pub fn lookup(&self, name: &str) -> Result<Ref> {
        for candidate in search_names(name) {
            match self.resolve(&candidate) {
                Ok(found) => return Ok(found),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::not_found(format!("ref {name}")))
    }

    /// Target id of the ref a short name stands for
    pub fn lookup_id(&self, name: &str) -> Result<ObjectId> {
        let found = self.lookup(name)?;

        match found.target() {
            RefTarget::Direct(oid) => Ok(oid.clone()),
            RefTarget::Symbolic(_) => self.resolve_to_id(found.name()),
        }
    }

    /// Recorded peeled target of an annotated tag ref
    pub fn peeled(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.resolve(name)?.peeled().cloned())
    }

    /// Every ref under `refs/`, loose overriding packed, sorted by name
    ///
    /// A loose ref file that does not parse is logged and left out; I/O
    /// failures still abort the listing.
    pub fn all_refs(&self) -> Result<Vec<Ref>> {
        let mut refs: BTreeMap<String, Ref> = self
            .packed()?
            .refs()
            .iter()
            .map(|r| (r.name().to_string(), r.clone()))
            .collect();

        let refs_path = self.refs_path();
        if refs_path.is_dir() {
            for entry in WalkDir::new(&refs_path).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let path = e.path().unwrap_or(refs_path.as_path()).to_path_buf();
                    Error::io(path, e.into())
                })?;
                let is_lock = entry.path().extension().is_some_and(|ext| ext == "lock");
                if !entry.file_type().is_file() || is_lock {
                    continue;
                }

                let Some(name) = self.ref_name_of(entry.path()) else {
                    continue;
                };
                match self.resolve(&name) {
                    Ok(resolved) => {
                        refs.insert(name, resolved);
                    }
                    Err(e) if e.kind() == ErrorKind::Corrupt => {
                        warn!(%name, error = %e, "skipping unreadable loose ref");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(refs.into_values().collect())
    }

    /// Entries of the packed-refs file, in file order
    pub fn packed_refs(&self) -> Result<Vec<Ref>> {
        Ok(self.packed()?.refs().to_vec())
    }

    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join("refs")
    }

    fn read_loose(&self, ref_name: &RefName) -> Result<Option<RefTarget>> {
        let ref_path = ref_name
            .components()
            .fold(self.path.to_path_buf(), |path, component| path.join(component));
        if !ref_path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&ref_path).map_err(|e| Error::io(&ref_path, e))?;
        RefTarget::parse(&content)
            .map(Some)
            .map_err(|e| e.within(format!("ref {}", ref_path.display())))
    }

    /// Packed peel information still applies to a loose ref holding the same id
    fn peeled_if_same(&self, name: &str, oid: &ObjectId) -> Result<Option<ObjectId>> {
        Ok(self
            .packed()?
            .get(name)
            .filter(|packed| packed.oid() == Some(oid))
            .and_then(|packed| packed.peeled().cloned()))
    }

    fn ref_name_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.path).ok()?;
        let components = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;

        let name = components.join("/");
        RefName::try_parse(&name).ok().map(|_| name)
    }

    fn packed(&self) -> Result<Arc<PackedRefs>> {
        if let Some(packed) = self
            .packed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            return Ok(Arc::clone(packed));
        }

        let mut cached = self
            .packed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(packed) = cached.as_ref() {
            return Ok(Arc::clone(packed));
        }

        let packed_path = self.path.join(PACKED_REFS_FILE);
        let packed = match std::fs::read_to_string(&packed_path) {
            Ok(content) => PackedRefs::parse(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PackedRefs::default(),
            Err(e) => return Err(Error::io(packed_path, e)),
        };
        debug!(refs = packed.len(), "loaded packed refs");

        let packed = Arc::new(packed);
        *cached = Some(Arc::clone(&packed));

        Ok(packed)
    }
}
