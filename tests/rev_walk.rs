use bit_odb::artifacts::objects::commit::Commit;
use bit_odb::artifacts::objects::file_mode::FileMode;
use bit_odb::artifacts::objects::object::Object;
use bit_odb::artifacts::objects::object_id::ObjectId;
use bit_odb::artifacts::objects::object_type::ObjectType;
use common::fixture::{TestRepository, test_repository};
use common::pack::PackWriter;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

fn walk_ids(test_repository: &TestRepository, start: &ObjectId) -> anyhow::Result<Vec<ObjectId>> {
    let repository = test_repository.open();
    let mut visited = Vec::new();
    repository.rev_walker().walk_from(start, |commit| {
        visited.push(commit.id().clone());
        Ok(())
    })?;

    Ok(visited)
}

/// ```text
///       A
///      / \
///     B   C
///     |   |
///     D   E
///      \ /
///       M
/// ```
#[rstest]
fn merges_are_walked_newest_first(test_repository: TestRepository) -> anyhow::Result<()> {
    let blob = test_repository.random_blob();
    let tree = test_repository.tree(&[("file.txt", FileMode::Regular, &blob)]);

    let a = test_repository.commit(&tree, &[], 0);
    let b = test_repository.commit(&tree, &[&a], 1);
    let c = test_repository.commit(&tree, &[&a], 2);
    let d = test_repository.commit(&tree, &[&b], 3);
    let e = test_repository.commit(&tree, &[&c], 4);
    let m = test_repository.commit(&tree, &[&d, &e], 5);

    assert_eq!(walk_ids(&test_repository, &m)?, [m, e, d, c, b, a]);

    Ok(())
}

#[rstest]
fn shared_ancestors_are_visited_once(test_repository: TestRepository) -> anyhow::Result<()> {
    let blob = test_repository.random_blob();
    let tree = test_repository.tree(&[("file.txt", FileMode::Regular, &blob)]);

    let root = test_repository.commit(&tree, &[], 0);
    let left = test_repository.commit(&tree, &[&root], 1);
    let right = test_repository.commit(&tree, &[&root], 1);
    let octopus = test_repository.commit(&tree, &[&left, &right, &root], 2);

    let visited = walk_ids(&test_repository, &octopus)?;
    assert_eq!(visited.len(), 4);
    assert_eq!(visited.first(), Some(&octopus));
    assert_eq!(visited.last(), Some(&root));

    // equal timestamps pop the higher id first
    let mut siblings = vec![left, right];
    siblings.sort();
    siblings.reverse();
    assert_eq!(visited[1..3], siblings[..]);

    Ok(())
}

#[rstest]
fn history_in_packs_is_walked(test_repository: TestRepository) -> anyhow::Result<()> {
    let blob = test_repository.random_blob();
    let tree = test_repository.tree(&[("file.txt", FileMode::Regular, &blob)]);
    let first = test_repository.build_commit(&tree, &[], 10);
    let second = test_repository.build_commit(&tree, &[first.id()], 20);

    let mut pack = PackWriter::new();
    for commit in [&first, &second] {
        pack.add_object(ObjectType::Commit, &Object::from(commit.clone()).payload());
    }
    pack.write(&test_repository.pack_dir())?;
    let third = test_repository.commit(&tree, &[second.id()], 30);
    test_repository.write_ref("refs/heads/main", &third);

    let repository = test_repository.open();
    let start = repository
        .resolve_revision("main")?
        .into_commit()
        .ok_or_else(|| anyhow::anyhow!("main is not a commit"))?;
    let walked = repository.rev_walker().collect(&start)?;

    assert_eq!(
        walked.iter().map(Commit::timestamp).collect::<Vec<_>>(),
        [30, 20, 10].map(|tick| common::fixture::EPOCH + tick)
    );

    Ok(())
}

#[rstest]
fn walking_from_a_non_commit_fails(test_repository: TestRepository) {
    let blob = test_repository.random_blob();

    assert!(walk_ids(&test_repository, &blob).is_err());
}
