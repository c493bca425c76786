//! Structural comparison of two trees
//!
//! Each directory level is compared by child object id, not by name: both
//! entry lists are sorted by id and merge-walked. An id present only on
//! the old side is a deletion, only on the new side an insertion, and an
//! id present on both sides under different names is a rename.
//!
//! Deletions and insertions sharing a name are then paired up. Two
//! subtrees are compared recursively, two leaves become a modification.
//! Whole subtrees that were only deleted or only inserted are expanded to
//! the leaves they contain.
//!
//! Comparing by id means a same-named entry whose content changed is only
//! reported as modified if no other entry of the new tree holds its old id.

use crate::areas::database::Database;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::errors::{Error, Result};
use bitflags::bitflags;
use std::cmp::Ordering;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DiffFilter: u32 {
        const ADDED = 0b0001;
        const DELETED = 0b0010;
        const MODIFIED = 0b0100;
        const RENAMED = 0b1000;
    }
}

impl DiffFilter {
    pub fn try_parse(s: &str) -> Option<Self> {
        let mut filter = Self::empty();

        for c in s.chars() {
            match c {
                'A' => filter |= Self::ADDED,
                'D' => filter |= Self::DELETED,
                'M' => filter |= Self::MODIFIED,
                'R' => filter |= Self::RENAMED,
                _ => return None,
            }
        }

        Some(filter)
    }
}

/// A tree entry together with its slash-separated path from the diff root
///
/// Non-UTF-8 name bytes are replaced in `path`; `entry` keeps the raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedEntry {
    pub path: String,
    pub entry: TreeEntry,
}

impl ChangedEntry {
    fn new(prefix: &str, entry: TreeEntry) -> Self {
        ChangedEntry {
            path: join_path(prefix, entry.name()),
            entry,
        }
    }

    pub fn oid(&self) -> &ObjectId {
        self.entry.oid()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub before: ChangedEntry,
    pub after: ChangedEntry,
}

impl Modification {
    pub fn is_rename(&self) -> bool {
        self.before.path != self.after.path
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    pub modified: Vec<Modification>,
    pub deleted: Vec<ChangedEntry>,
    pub inserted: Vec<ChangedEntry>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.deleted.is_empty() && self.inserted.is_empty()
    }

    /// Keep only the kinds of change selected by `filter`
    pub fn filter(&self, filter: DiffFilter) -> TreeDiff {
        let keep = |selected: bool, entries: &[ChangedEntry]| {
            if selected { entries.to_vec() } else { Vec::new() }
        };

        TreeDiff {
            modified: self
                .modified
                .iter()
                .filter(|modification| {
                    if modification.is_rename() {
                        filter.contains(DiffFilter::RENAMED)
                    } else {
                        filter.contains(DiffFilter::MODIFIED)
                    }
                })
                .cloned()
                .collect(),
            deleted: keep(filter.contains(DiffFilter::DELETED), &self.deleted),
            inserted: keep(filter.contains(DiffFilter::ADDED), &self.inserted),
        }
    }

    fn sort(&mut self) {
        self.modified
            .sort_by(|a, b| a.after.path.cmp(&b.after.path).then(a.before.path.cmp(&b.before.path)));
        self.deleted.sort_by(|a, b| a.path.cmp(&b.path));
        self.inserted.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

#[derive(Debug)]
pub struct TreeDiffer<'d> {
    database: &'d Database,
}

impl<'d> TreeDiffer<'d> {
    pub fn new(database: &'d Database) -> Self {
        TreeDiffer { database }
    }

    pub fn diff(&self, tree_a: &Tree, tree_b: &Tree) -> Result<TreeDiff> {
        let mut diff = TreeDiff::default();

        if tree_a.id() != tree_b.id() {
            self.compare_entries(tree_a.entries(), tree_b.entries(), "", &mut diff)?;
        }
        diff.sort();

        Ok(diff)
    }

    fn compare_entries(
        &self,
        old: &[TreeEntry],
        new: &[TreeEntry],
        prefix: &str,
        diff: &mut TreeDiff,
    ) -> Result<()> {
        let old = sorted_by_oid(old);
        let new = sorted_by_oid(new);

        let mut deleted = Vec::new();
        let mut inserted = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < old.len() && j < new.len() {
            match old[i].oid().cmp(new[j].oid()) {
                Ordering::Less => {
                    deleted.push(old[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    inserted.push(new[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    if old[i].name() != new[j].name() {
                        diff.modified.push(Modification {
                            before: ChangedEntry::new(prefix, old[i].clone()),
                            after: ChangedEntry::new(prefix, new[j].clone()),
                        });
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        deleted.extend_from_slice(&old[i..]);
        inserted.extend_from_slice(&new[j..]);

        // same name on both sides: descend into subtrees, pair up leaves
        let mut unpaired_inserted = Vec::with_capacity(inserted.len());
        for after in inserted {
            let paired = deleted.iter().position(|before| {
                before.name() == after.name() && before.is_tree() == after.is_tree()
            });
            let Some(position) = paired else {
                unpaired_inserted.push(after);
                continue;
            };
            let before = deleted.remove(position);

            if before.is_tree() {
                let path = join_path(prefix, before.name());
                let before_tree = self.load_tree(before.oid())?;
                let after_tree = self.load_tree(after.oid())?;
                self.compare_entries(before_tree.entries(), after_tree.entries(), &path, diff)?;
            } else {
                diff.modified.push(Modification {
                    before: ChangedEntry::new(prefix, before.clone()),
                    after: ChangedEntry::new(prefix, after.clone()),
                });
            }
        }

        for entry in deleted {
            self.expand(entry, prefix, &mut diff.deleted)?;
        }
        for entry in unpaired_inserted {
            self.expand(entry, prefix, &mut diff.inserted)?;
        }

        Ok(())
    }

    /// Push a leaf, or every leaf below a subtree
    fn expand(&self, entry: &TreeEntry, prefix: &str, out: &mut Vec<ChangedEntry>) -> Result<()> {
        if !entry.is_tree() {
            out.push(ChangedEntry::new(prefix, entry.clone()));
            return Ok(());
        }

        let path = join_path(prefix, entry.name());
        let tree = self.load_tree(entry.oid())?;
        for child in tree.entries() {
            self.expand(child, &path, out)?;
        }

        Ok(())
    }

    fn load_tree(&self, oid: &ObjectId) -> Result<Tree> {
        let object = self.database.get(oid)?;
        let object_type = object.object_type();

        object
            .into_tree()
            .ok_or_else(|| Error::corrupt(format!("{oid} is a {object_type}, expected a tree")))
    }
}

fn sorted_by_oid(entries: &[TreeEntry]) -> Vec<&TreeEntry> {
    let mut sorted: Vec<_> = entries.iter().collect();
    sorted.sort_by(|a, b| a.oid().cmp(b.oid()).then_with(|| a.name().cmp(b.name())));
    sorted
}

fn join_path(prefix: &str, name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    if prefix.is_empty() {
        name.into_owned()
    } else {
        format!("{prefix}/{name}")
    }
}
