use crate::areas::database::Database;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use tracing::trace;

/// Heap entry ordered by committer timestamp, ties broken by id
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedCommit(Commit);

impl PartialOrd for QueuedCommit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCommit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .timestamp()
            .cmp(&other.0.timestamp())
            .then_with(|| self.0.id().cmp(other.0.id()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RevWalker<'d> {
    database: &'d Database,
}

impl<'d> RevWalker<'d> {
    pub fn new(database: &'d Database) -> Self {
        RevWalker { database }
    }

    /// Visit every commit reachable from `start`, newest first
    ///
    /// The first error returned by `visitor` stops the walk and is returned.
    pub fn walk<F>(&self, start: &Commit, mut visitor: F) -> Result<()>
    where
        F: FnMut(&Commit) -> Result<()>,
    {
        let mut seen = HashSet::from([start.id().clone()]);
        let mut queue = BinaryHeap::from([QueuedCommit(start.clone())]);

        while let Some(QueuedCommit(commit)) = queue.pop() {
            trace!(commit = %commit.id(), timestamp = commit.timestamp(), "visiting");
            visitor(&commit)?;

            for parent in commit.parents() {
                if seen.insert(parent.clone()) {
                    queue.push(QueuedCommit(self.load_commit(parent)?));
                }
            }
        }

        Ok(())
    }

    pub fn walk_from<F>(&self, start: &ObjectId, visitor: F) -> Result<()>
    where
        F: FnMut(&Commit) -> Result<()>,
    {
        let start = self.load_commit(start)?;

        self.walk(&start, visitor)
    }

    pub fn collect(&self, start: &Commit) -> Result<Vec<Commit>> {
        let mut commits = Vec::new();
        self.walk(start, |commit| {
            commits.push(commit.clone());
            Ok(())
        })?;

        Ok(commits)
    }

    fn load_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        let object = self.database.get(object_id)?;
        let object_type = object.object_type();

        object.into_commit().ok_or_else(|| {
            Error::invalid_spec(format!("{object_id} is a {object_type}, not a commit"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object::Object;
    use crate::artifacts::objects::tree::Tree;
    use crate::artifacts::objects::who_when::WhoWhen;
    use crate::test_support::write_loose;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    fn commit(parents: Vec<ObjectId>, timestamp: i64) -> Commit {
        let who = WhoWhen::new("Grace Hopper", "grace@example.com", timestamp, 0).unwrap();
        Commit::new(
            Tree::new(vec![]).id().clone(),
            parents,
            who.clone(),
            who,
            format!("commit at {timestamp}\n"),
        )
    }

    #[test]
    fn queue_pops_newest_first() {
        let mut queue = BinaryHeap::new();
        for timestamp in [3, 0, 5, 1, 4, 2] {
            queue.push(QueuedCommit(commit(vec![], timestamp)));
        }

        let popped: Vec<_> = std::iter::from_fn(|| queue.pop())
            .map(|QueuedCommit(commit)| commit.timestamp())
            .collect();
        assert_eq!(popped, [5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn walks_merges_in_timestamp_order() {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects"));
        let store = |commit: Commit| {
            write_loose(database.objects_path(), &Object::from(commit.clone()));
            commit
        };

        let c0 = store(commit(vec![], 0));
        let c1 = store(commit(vec![c0.id().clone()], 1));
        let c2 = store(commit(vec![c0.id().clone()], 2));
        let c3 = store(commit(vec![c1.id().clone()], 3));
        let c4 = store(commit(vec![c2.id().clone()], 4));
        let c5 = store(commit(vec![c3.id().clone(), c4.id().clone()], 5));

        let walker = RevWalker::new(&database);
        let timestamps: Vec<_> = walker
            .collect(&c5)
            .unwrap()
            .iter()
            .map(Commit::timestamp)
            .collect();
        assert_eq!(timestamps, [5, 4, 3, 2, 1, 0]);

        let mut visited = 0;
        let error = walker
            .walk_from(c5.id(), |_| {
                visited += 1;
                if visited == 2 {
                    Err(Error::not_found("stop"))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(visited, 2);
    }
}
