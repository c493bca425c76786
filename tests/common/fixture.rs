use assert_fs::TempDir;
use super::pack::deflate;
use assert_fs::prelude::{FileWriteBin, FileWriteStr, PathChild, PathCreateDir};
use bit_odb::Repository;
use bit_odb::artifacts::objects::blob::Blob;
use bit_odb::artifacts::objects::commit::Commit;
use bit_odb::artifacts::objects::file_mode::FileMode;
use bit_odb::artifacts::objects::object::Object;
use bit_odb::artifacts::objects::object_id::ObjectId;
use bit_odb::artifacts::objects::object_type::ObjectType;
use bit_odb::artifacts::objects::tag::Tag;
use bit_odb::artifacts::objects::tree::{Tree, TreeEntry};
use bit_odb::artifacts::objects::who_when::WhoWhen;
use fake::Fake;
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use rstest::fixture;
use std::path::PathBuf;

/// Base of the synthetic commit clock, 2023-11-14T22:13:20Z
pub const EPOCH: i64 = 1_700_000_000;

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// A work tree with an empty `.git` whose HEAD points at `refs/heads/main`
#[fixture]
pub fn test_repository(repository_dir: TempDir) -> TestRepository {
    repository_dir
        .child(".git/objects")
        .create_dir_all()
        .expect("Failed to create objects dir");
    repository_dir
        .child(".git/refs/heads")
        .create_dir_all()
        .expect("Failed to create refs dir");
    repository_dir
        .child(".git/HEAD")
        .write_str("ref: refs/heads/main\n")
        .expect("Failed to write HEAD");

    TestRepository {
        dir: repository_dir,
        author: WhoWhen::new(&Name().fake::<String>(), &FreeEmail().fake::<String>(), EPOCH, 120)
            .expect("Failed to build identity"),
    }
}

pub struct TestRepository {
    pub dir: TempDir,
    author: WhoWhen,
}

impl TestRepository {
    pub fn git_dir(&self) -> PathBuf {
        self.dir.path().join(".git")
    }

    pub fn pack_dir(&self) -> PathBuf {
        self.git_dir().join("objects/pack")
    }

    /// Open a fresh handle, so packs and packed refs written so far are seen
    pub fn open(&self) -> Repository {
        Repository::open(self.dir.path()).expect("Failed to open repository")
    }

    /// Write a zlib-deflated loose object under `.git/objects`
    pub fn store(&self, object: impl Into<Object>) -> ObjectId {
        let object = object.into();
        self.dir
            .child(".git/objects")
            .child(object.id().to_path())
            .write_binary(&deflate(&object.serialize()))
            .expect("Failed to store object");

        object.id().clone()
    }

    pub fn blob(&self, content: &str) -> ObjectId {
        self.store(Blob::new(content.as_bytes().to_vec()))
    }

    pub fn random_blob(&self) -> ObjectId {
        self.blob(&Words(3..8).fake::<Vec<String>>().join(" "))
    }

    pub fn tree(&self, entries: &[(&str, FileMode, &ObjectId)]) -> ObjectId {
        self.store(build_tree(entries))
    }

    /// Store a commit whose author and committer time is `EPOCH + tick`
    pub fn commit(&self, tree: &ObjectId, parents: &[&ObjectId], tick: i64) -> ObjectId {
        self.store(self.build_commit(tree, parents, tick))
    }

    pub fn build_commit(&self, tree: &ObjectId, parents: &[&ObjectId], tick: i64) -> Commit {
        let when = WhoWhen::new(
            self.author.name(),
            self.author.email(),
            EPOCH + tick,
            self.author.offset_minutes(),
        )
        .expect("Failed to build identity");
        let message = format!("{}\n", Words(2..6).fake::<Vec<String>>().join(" "));

        Commit::new(
            tree.clone(),
            parents.iter().map(|&parent| parent.clone()).collect(),
            when.clone(),
            when,
            message,
        )
    }

    pub fn tag(&self, name: &str, target: &ObjectId, target_type: ObjectType) -> ObjectId {
        self.store(Tag::new(
            target.clone(),
            target_type,
            name,
            self.author.clone(),
            format!("release {name}\n"),
        ))
    }

    /// Linear history C0..C(n-1), each commit with its own one-file tree
    pub fn linear_history(&self, len: usize) -> Vec<ObjectId> {
        let mut commits: Vec<ObjectId> = Vec::with_capacity(len);
        for i in 0..len {
            let blob = self.blob(&format!("generation {i}\n"));
            let tree = self.tree(&[("file.txt", FileMode::Regular, &blob)]);
            let parents: Vec<&ObjectId> = commits.last().into_iter().collect();
            let commit = self.commit(&tree, &parents, i as i64);
            commits.push(commit);
        }

        commits
    }

    pub fn write_ref(&self, name: &str, target: &ObjectId) {
        self.dir
            .child(".git")
            .child(name)
            .write_str(&format!("{target}\n"))
            .expect("Failed to write ref");
    }

    pub fn write_symref(&self, name: &str, target: &str) {
        self.dir
            .child(".git")
            .child(name)
            .write_str(&format!("ref: {target}\n"))
            .expect("Failed to write symbolic ref");
    }

    pub fn write_packed_refs(&self, content: &str) {
        self.dir
            .child(".git/packed-refs")
            .write_str(content)
            .expect("Failed to write packed-refs");
    }
}

pub fn build_tree(entries: &[(&str, FileMode, &ObjectId)]) -> Tree {
    Tree::new(
        entries
            .iter()
            .map(|&(name, mode, oid)| {
                TreeEntry::new(mode, name, oid.clone()).expect("Failed to build tree entry")
            })
            .collect(),
    )
}
