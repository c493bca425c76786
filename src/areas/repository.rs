use crate::areas::database::{Database, DatabaseOptions};
use crate::areas::refs::Refs;
use crate::artifacts::diff::tree_diff::{TreeDiff, TreeDiffer};
use crate::artifacts::log::rev_list::RevWalker;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::revision::Revision;
use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const GIT_DIR_NAME: &str = ".git";
const GIT_DIR_ENV: &str = "GIT_DIR";
const GIT_OBJECT_DIRECTORY_ENV: &str = "GIT_OBJECT_DIRECTORY";
const GITDIR_FILE_PREFIX: &str = "gitdir: ";

/// Read-only handle on a repository's metadata directory
#[derive(Debug)]
pub struct Repository {
    git_dir: Box<Path>,
    database: Database,
    refs: Refs,
}

impl Repository {
    /// Open a work tree (holding `.git`) or a metadata directory itself
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let git_dir = Self::find_git_dir(path.as_ref())?
            .ok_or_else(|| Error::not_found(format!("repository at {}", path.as_ref().display())))?;

        Ok(Self::with_options(
            git_dir.clone(),
            git_dir.join("objects"),
            DatabaseOptions::default(),
        ))
    }

    /// Open the closest repository at or above `start`
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        let start = start
            .canonicalize()
            .map_err(|e| Error::io(start, e))?;

        for candidate in start.ancestors() {
            if let Some(git_dir) = Self::find_git_dir(candidate)? {
                debug!(git_dir = %git_dir.display(), "discovered repository");
                return Ok(Self::with_options(
                    git_dir.clone(),
                    git_dir.join("objects"),
                    DatabaseOptions::default(),
                ));
            }
        }

        Err(Error::not_found(format!(
            "repository at or above {}",
            start.display()
        )))
    }

    /// Open the repository named by `GIT_DIR` and `GIT_OBJECT_DIRECTORY`,
    /// discovering one from the current directory when `GIT_DIR` is unset
    pub fn from_env() -> Result<Self> {
        let git_dir = match std::env::var_os(GIT_DIR_ENV) {
            Some(git_dir) => PathBuf::from(git_dir),
            None => {
                let current_dir =
                    std::env::current_dir().map_err(|e| Error::io(".", e))?;
                let repository = Self::discover(current_dir)?;
                repository.git_dir.to_path_buf()
            }
        };
        let objects_dir = std::env::var_os(GIT_OBJECT_DIRECTORY_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| git_dir.join("objects"));

        Ok(Self::with_options(git_dir, objects_dir, DatabaseOptions::default()))
    }

    pub fn with_options(
        git_dir: impl Into<PathBuf>,
        objects_dir: impl Into<PathBuf>,
        options: DatabaseOptions,
    ) -> Self {
        let git_dir = git_dir.into();

        Repository {
            database: Database::with_options(objects_dir, options),
            refs: Refs::new(git_dir.clone()),
            git_dir: git_dir.into_boxed_path(),
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Evaluate a revision expression such as `main~2^{tree}`
    pub fn resolve_revision(&self, spec: &str) -> Result<Object> {
        Revision::parse(spec)?.resolve(self)
    }

    /// Diff two trees, or the trees of two commits
    pub fn tree_diff(&self, old: &ObjectId, new: &ObjectId) -> Result<TreeDiff> {
        let old = self.load_tree(old)?;
        let new = self.load_tree(new)?;

        TreeDiffer::new(&self.database).diff(&old, &new)
    }

    pub fn rev_walker(&self) -> RevWalker<'_> {
        RevWalker::new(&self.database)
    }

    fn load_tree(&self, object_id: &ObjectId) -> Result<Tree> {
        match self.database.get(object_id)? {
            Object::Tree(tree) => Ok(tree),
            Object::Commit(commit) => self.load_tree(commit.tree_oid()),
            other => Err(Error::invalid_spec(format!(
                "{} {object_id} has no tree",
                other.object_type()
            ))),
        }
    }

    fn find_git_dir(path: &Path) -> Result<Option<PathBuf>> {
        let dot_git = path.join(GIT_DIR_NAME);
        if dot_git.is_dir() {
            return Ok(Some(dot_git));
        }

        // linked work trees point at their metadata with a `gitdir:` file
        if dot_git.is_file() {
            let content = std::fs::read_to_string(&dot_git).map_err(|e| Error::io(&dot_git, e))?;
            let target = content
                .trim()
                .strip_prefix(GITDIR_FILE_PREFIX)
                .ok_or_else(|| Error::corrupt(format!("{}: not a gitdir file", dot_git.display())))?;
            return Ok(Some(path.join(target)));
        }

        if path.join("objects").is_dir() && path.join("HEAD").is_file() {
            return Ok(Some(path.to_path_buf()));
        }

        Ok(None)
    }
}
