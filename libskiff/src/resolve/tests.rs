use super::*;
use crate::linker::Linker;
use crate::test_utils::{ancestral_pair, commit_files, h, p, stage};

fn resolve(src: &Linker, dst: &Linker) -> SkiffResult<Vec<Pairing>> {
    Resolver::new(src, dst).resolve()
}

fn pairing_kinds(pairings: &[Pairing]) -> Vec<&'static str> {
    pairings
        .iter()
        .map(|pairing| match pairing {
            Pairing::Add { .. } => "add",
            Pairing::Remove { .. } => "remove",
            Pairing::Merge { .. } => "merge",
            Pairing::Conflict { .. } => "conflict",
            Pairing::TypeConflict { .. } => "type-conflict",
        })
        .collect()
}

#[test]
fn test_fresh_add_pairs_as_add() -> SkiffResult<()> {
    let mut src = Linker::new("alice");
    commit_files(&mut src, &[("/a", "one")])?;
    let dst = Linker::new("bob");

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        Pairing::Add { src } => {
            assert_eq!(src.path(), &p("/a"));
            assert_eq!(src.content_hash(), h("one"));
        }
        pairing => panic!("expected add, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_identical_trees_pair_to_nothing() -> SkiffResult<()> {
    let (src, dst) = ancestral_pair(&[("/a", "one"), ("/d/b", "two")])?;
    assert!(resolve(&src, &dst)?.is_empty());
    Ok(())
}

#[test]
fn test_src_only_modification_pairs_as_merge() -> SkiffResult<()> {
    let (mut src, dst) = ancestral_pair(&[("/a", "one")])?;
    commit_files(&mut src, &[("/a", "two")])?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        Pairing::Merge { src, dst, src_mask, dst_mask } => {
            assert_eq!(src.path(), &p("/a"));
            assert_eq!(dst.path(), &p("/a"));
            assert_eq!(*src_mask, ChangeType::MODIFY);
            assert!(dst_mask.is_empty());
        }
        pairing => panic!("expected merge, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_dst_only_modification_pairs_to_nothing() -> SkiffResult<()> {
    let (src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    commit_files(&mut dst, &[("/a", "two")])?;
    assert!(resolve(&src, &dst)?.is_empty());
    Ok(())
}

#[test]
fn test_both_modified_pairs_as_conflict() -> SkiffResult<()> {
    let (mut src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    commit_files(&mut src, &[("/a", "two")])?;
    commit_files(&mut dst, &[("/a", "three")])?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairing_kinds(&pairings), vec!["conflict"]);
    match &pairings[0] {
        Pairing::Conflict { src_mask, dst_mask, .. } => {
            assert_eq!(*src_mask, ChangeType::MODIFY);
            assert_eq!(*dst_mask, ChangeType::MODIFY);
        }
        pairing => panic!("expected conflict, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_converging_modifications_pair_to_nothing() -> SkiffResult<()> {
    let (mut src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    commit_files(&mut src, &[("/a", "same")])?;
    commit_files(&mut dst, &[("/a", "same")])?;
    assert!(resolve(&src, &dst)?.is_empty());
    Ok(())
}

#[test]
fn test_src_removal_pairs_as_remove() -> SkiffResult<()> {
    let (mut src, dst) = ancestral_pair(&[("/a", "one")])?;
    src.remove_node(&p("/a"))?;
    let author = src.owner().to_owned();
    src.make_commit(author, "remove a")?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        Pairing::Remove { dst } => assert_eq!(dst.path(), &p("/a")),
        pairing => panic!("expected remove, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_remove_versus_modify_pairs_as_conflict() -> SkiffResult<()> {
    let (mut src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    src.remove_node(&p("/a"))?;
    let author = src.owner().to_owned();
    src.make_commit(author, "remove a")?;
    commit_files(&mut dst, &[("/a", "two")])?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        Pairing::Conflict { src_mask, dst_mask, .. } => {
            assert_eq!(*src_mask, ChangeType::REMOVE);
            assert_eq!(*dst_mask, ChangeType::MODIFY);
        }
        pairing => panic!("expected conflict, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_src_move_pairs_as_move_merge() -> SkiffResult<()> {
    let (mut src, dst) = ancestral_pair(&[("/a", "one")])?;
    src.move_node(&p("/a"), &p("/b"))?;
    let author = src.owner().to_owned();
    src.make_commit(author, "mv a b")?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        Pairing::Merge { src, dst, src_mask, dst_mask } => {
            assert_eq!(src.path(), &p("/b"));
            assert_eq!(dst.path(), &p("/a"));
            assert_eq!(*src_mask, ChangeType::MOVE);
            assert!(dst_mask.is_empty());
        }
        pairing => panic!("expected merge, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_same_move_on_both_sides_pairs_to_nothing() -> SkiffResult<()> {
    let (mut src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    src.move_node(&p("/a"), &p("/b"))?;
    let author = src.owner().to_owned();
    src.make_commit(author, "mv a b")?;
    dst.move_node(&p("/a"), &p("/b"))?;
    let author = dst.owner().to_owned();
    dst.make_commit(author, "mv a b")?;

    assert!(resolve(&src, &dst)?.is_empty());
    Ok(())
}

#[test]
fn test_diverging_moves_pair_as_conflict() -> SkiffResult<()> {
    let (mut src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    src.move_node(&p("/a"), &p("/b"))?;
    let author = src.owner().to_owned();
    src.make_commit(author, "mv a b")?;
    dst.move_node(&p("/a"), &p("/c"))?;
    let author = dst.owner().to_owned();
    dst.make_commit(author, "mv a c")?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        // the source's destination is the proposed path
        Pairing::Conflict { src, dst, src_mask, dst_mask } => {
            assert_eq!(src.path(), &p("/b"));
            assert_eq!(dst.path(), &p("/c"));
            assert_eq!(*src_mask, ChangeType::MOVE);
            assert_eq!(*dst_mask, ChangeType::MOVE);
        }
        pairing => panic!("expected conflict, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_src_move_with_dst_removal_pairs_as_add() -> SkiffResult<()> {
    let (mut src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    src.move_node(&p("/a"), &p("/b"))?;
    let author = src.owner().to_owned();
    src.make_commit(author, "mv a b")?;
    dst.remove_node(&p("/a"))?;
    let author = dst.owner().to_owned();
    dst.make_commit(author, "remove a")?;

    // the move wins over the delete: the node comes back at its new path,
    // exactly once
    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        Pairing::Add { src } => {
            assert_eq!(src.path(), &p("/b"));
            assert_eq!(src.content_hash(), h("one"));
        }
        pairing => panic!("expected add, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_type_change_pairs_as_type_conflict() -> SkiffResult<()> {
    let (mut src, dst) = ancestral_pair(&[("/a", "one")])?;
    src.remove_node(&p("/a"))?;
    src.mkdir(&p("/a"), false)?;
    let author = src.owner().to_owned();
    src.make_commit(author, "a becomes a directory")?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairing_kinds(&pairings), vec!["type-conflict"]);
    Ok(())
}

#[test]
fn test_both_added_same_content_pairs_to_nothing() -> SkiffResult<()> {
    let mut src = Linker::new("alice");
    commit_files(&mut src, &[("/a", "same")])?;
    let mut dst = Linker::new("bob");
    commit_files(&mut dst, &[("/a", "same")])?;
    assert!(resolve(&src, &dst)?.is_empty());
    Ok(())
}

#[test]
fn test_both_added_different_content_pairs_as_conflict() -> SkiffResult<()> {
    let mut src = Linker::new("alice");
    commit_files(&mut src, &[("/a", "mine")])?;
    let mut dst = Linker::new("bob");
    commit_files(&mut dst, &[("/a", "yours")])?;

    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairing_kinds(&pairings), vec!["conflict"]);
    Ok(())
}

#[test]
fn test_emission_order_is_deterministic() -> SkiffResult<()> {
    let mut src = Linker::new("alice");
    commit_files(&mut src, &[("/c/d", "4"), ("/b", "2"), ("/a", "1")])?;
    let dst = Linker::new("bob");

    let paths: Vec<String> = resolve(&src, &dst)?
        .iter()
        .map(|pairing| match pairing {
            Pairing::Add { src } => src.path().as_str().to_owned(),
            pairing => panic!("expected add, found `{}`", pairing),
        })
        .collect();
    // name order within a directory, parents before children
    assert_eq!(paths, vec!["/a", "/b", "/c", "/c/d"]);
    Ok(())
}

#[test]
fn test_identical_subtrees_are_skipped_whole() -> SkiffResult<()> {
    let (mut src, dst) = ancestral_pair(&[("/big/x", "x"), ("/big/y", "y"), ("/a", "one")])?;
    commit_files(&mut src, &[("/a", "two")])?;

    // only `/a` may surface; `/big` agrees on both sides
    let pairings = resolve(&src, &dst)?;
    assert_eq!(pairings.len(), 1);
    match &pairings[0] {
        Pairing::Merge { src, .. } => assert_eq!(src.path(), &p("/a")),
        pairing => panic!("expected merge, found `{}`", pairing),
    }
    Ok(())
}

#[test]
fn test_nested_addition_emits_parents_first() -> SkiffResult<()> {
    let (mut src, dst) = ancestral_pair(&[("/a", "one")])?;
    commit_files(&mut src, &[("/d/e/f", "deep")])?;

    let pairings = resolve(&src, &dst)?;
    let paths: Vec<String> = pairings
        .iter()
        .map(|pairing| match pairing {
            Pairing::Add { src } => src.path().as_str().to_owned(),
            pairing => panic!("expected add, found `{}`", pairing),
        })
        .collect();
    assert_eq!(paths, vec!["/d", "/d/e", "/d/e/f"]);
    Ok(())
}

#[test]
fn test_merge_base_prefers_the_latest_shared_commit() -> SkiffResult<()> {
    let (mut src, dst) = ancestral_pair(&[("/a", "one")])?;
    let shared_head = dst.head().hash();
    commit_files(&mut src, &[("/a", "two")])?;

    let base = merge_base(&src, &dst).expect("forked histories share commits");
    assert_eq!(base.hash(), shared_head);
    Ok(())
}

#[test]
fn test_merge_base_falls_back_to_markers() -> SkiffResult<()> {
    // unrelated linkers, but dst once merged src's current head
    let mut src = Linker::new("alice");
    commit_files(&mut src, &[("/a", "one")])?;
    let mut dst = Linker::new("bob");
    commit_files(&mut dst, &[("/b", "two")])?;
    assert!(merge_base(&src, &dst).is_none());

    dst.set_merge_marker("alice", src.head().hash());
    stage(&mut dst, "/a", "one")?;
    dst.make_commit("alice", "Merge with alice")?;

    let base = merge_base(&src, &dst).expect("the marker names a shared point");
    assert_eq!(base.hash(), src.head().hash());
    Ok(())
}

#[test]
fn test_marker_short_circuits_resolution() -> SkiffResult<()> {
    let (mut src, mut dst) = ancestral_pair(&[("/a", "one")])?;
    commit_files(&mut src, &[("/a", "two")])?;

    dst.set_merge_marker("alice", src.head().hash());
    stage(&mut dst, "/a", "two")?;
    dst.make_commit("alice", "Merge with alice")?;

    assert!(resolve(&src, &dst)?.is_empty());
    Ok(())
}
