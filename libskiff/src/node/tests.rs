use super::*;
use crate::error::{SkiffErrorExt, SkiffResult};
use crate::test_utils::{h, p};

fn sample_file(path: &str, content: &str, inode: u64) -> File {
    let mut file = File::new(p(path), inode);
    file.set_content(h(content));
    file.set_size(content.len() as u64);
    file.set_key(b"wrap".to_vec());
    file
}

#[test]
fn test_file_round_trip() -> SkiffResult<()> {
    let node = Node::File(sample_file("/docs/a.txt", "hello", 42));
    let bytes = node.serialize_to_vec()?;
    assert_eq!(Node::deserialize_from_slice(&bytes)?, node);
    Ok(())
}

#[test]
fn test_directory_round_trip() -> SkiffResult<()> {
    let mut dir = Directory::new(p("/docs"), 1);
    dir.insert_child(Node::File(sample_file("/docs/a", "a", 2)))?;
    dir.insert_child(Node::File(sample_file("/docs/b", "b", 3)))?;
    dir.rehash();

    let node = Node::Directory(dir);
    let bytes = node.serialize_to_vec()?;
    assert_eq!(Node::deserialize_from_slice(&bytes)?, node);
    Ok(())
}

#[test]
fn test_commit_round_trip() -> SkiffResult<()> {
    let marker = MergeMarker { with_peer: "alice".to_owned(), with_hash: h("their head") };
    let commit = Commit::new(h("parent"), h("root"), "bob", "Merge with alice", Some(marker), 9);
    let node = Node::Commit(commit.clone());
    let bytes = node.serialize_to_vec()?;

    let restored = Node::deserialize_from_slice(&bytes)?;
    assert_eq!(restored, node);
    match restored {
        Node::Commit(restored) => assert_eq!(restored.hash(), commit.hash()),
        node => panic!("expected commit, found `{}`", node.node_type()),
    }
    Ok(())
}

#[test]
fn test_ghost_round_trip_nests_the_old_node() -> SkiffResult<()> {
    let file = sample_file("/a", "doomed", 7);
    let ghost = Ghost::entomb(Node::File(file.clone()))?;
    assert_eq!(ghost.old_type(), NodeType::File);
    assert_eq!(ghost.wrapped(), &Node::File(file.clone()));

    let node = Node::Ghost(ghost);
    let bytes = node.serialize_to_vec()?;
    let restored = Node::deserialize_from_slice(&bytes)?;
    assert_eq!(restored, node);
    // the ghost advertises the digest of what it replaced
    assert_eq!(restored.content_hash(), h("doomed"));
    Ok(())
}

#[test]
fn test_ghost_exhume_is_the_inverse_of_entomb() -> SkiffResult<()> {
    let original = Node::File(sample_file("/a", "content", 3));
    let ghost = Ghost::entomb(original.clone())?;
    assert_eq!(ghost.exhume(), original);
    Ok(())
}

#[test]
fn test_only_files_and_directories_can_be_entombed() {
    let commit = Commit::new(ContentHash::UNKNOWN, h("root"), "a", "init", None, 0);
    let err = Ghost::entomb(Node::Commit(commit)).unwrap_err();
    assert_eq!(
        err.try_into_skiff_error().unwrap(),
        crate::error::SkiffError::UnexpectedNodeType(NodeType::Commit)
    );
}

#[test]
fn test_unknown_fields_survive_a_round_trip() -> SkiffResult<()> {
    let node = Node::File(sample_file("/a", "x", 1));
    let mut bytes = node.serialize_to_vec()?;

    // splice in a field from an imaginary newer schema:
    // bump the field count and append `[tag][len][payload]`
    bytes[1] += 1;
    bytes.push(0xbb);
    bytes.extend_from_slice(&3u32.to_le_bytes());
    bytes.extend_from_slice(b"xyz");

    let restored = Node::deserialize_from_slice(&bytes)?;
    let reencoded = restored.serialize_to_vec()?;
    let round_tripped = Node::deserialize_from_slice(&reencoded)?;
    match &round_tripped {
        Node::File(file) => {
            assert_eq!(file.base.extra.len(), 1);
            assert_eq!(file.base.extra[0].tag, 0xbb);
            assert_eq!(file.base.extra[0].bytes, b"xyz");
        }
        node => panic!("expected file, found `{}`", node.node_type()),
    }
    assert_eq!(round_tripped, restored);
    Ok(())
}

#[test]
fn test_insert_child_rejects_live_duplicates() -> SkiffResult<()> {
    let mut dir = Directory::new(p("/d"), 1);
    dir.insert_child(Node::File(sample_file("/d/a", "one", 2)))?;
    let err = dir.insert_child(Node::File(sample_file("/d/a", "two", 3))).unwrap_err();
    assert_eq!(
        err.try_into_skiff_error().unwrap(),
        crate::error::SkiffError::Exists(p("/d/a"))
    );
    Ok(())
}

#[test]
fn test_insert_child_displaces_a_ghost() -> SkiffResult<()> {
    let mut dir = Directory::new(p("/d"), 1);
    let ghost = Ghost::entomb(Node::File(sample_file("/d/a", "old", 2)))?;
    dir.put_child(Node::Ghost(ghost))?;

    dir.insert_child(Node::File(sample_file("/d/a", "new", 3)))?;
    assert_eq!(dir.lookup("a").unwrap().content_hash(), h("new"));
    Ok(())
}

#[test]
fn test_take_child_requires_membership() {
    let mut dir = Directory::new(p("/d"), 1);
    let err = dir.take_child("missing").unwrap_err();
    assert_eq!(
        err.try_into_skiff_error().unwrap(),
        crate::error::SkiffError::BadNode(p("/d/missing"))
    );
}

#[test]
fn test_directory_hash_ignores_ghosts() -> SkiffResult<()> {
    let mut dir = Directory::new(p("/d"), 1);
    dir.insert_child(Node::File(sample_file("/d/a", "a", 2)))?;
    dir.insert_child(Node::File(sample_file("/d/b", "b", 3)))?;
    dir.rehash();
    let with_both = dir.content_hash();

    let removed = dir.take_child("b")?;
    dir.put_child(Node::Ghost(Ghost::entomb(removed)?))?;
    dir.rehash();
    let with_ghost = dir.content_hash();
    assert_ne!(with_both, with_ghost);

    // resurrecting the identical content restores the old merkle value
    dir.insert_child(Node::File(sample_file("/d/b", "b", 4)))?;
    dir.rehash();
    assert_eq!(dir.content_hash(), with_both);
    Ok(())
}

#[test]
fn test_as_file_rejects_other_variants() {
    let dir = Node::Directory(Directory::new(p("/d"), 1));
    assert_eq!(
        dir.as_file().unwrap_err().try_into_skiff_error().unwrap(),
        crate::error::SkiffError::BadNode(p("/d"))
    );
    let file = Node::File(sample_file("/f", "x", 2));
    assert_eq!(
        file.as_directory().unwrap_err().try_into_skiff_error().unwrap(),
        crate::error::SkiffError::BadNode(p("/f"))
    );
}

#[quickcheck]
fn test_directory_hash_is_insertion_order_independent(contents: Vec<u8>) -> bool {
    let build = |reversed: bool| {
        let mut dir = Directory::new(p("/d"), 0);
        let mut entries: Vec<(usize, u8)> = contents.iter().copied().enumerate().collect();
        if reversed {
            entries.reverse();
        }
        for (idx, byte) in entries {
            let mut file = File::new(p("/d").join(format!("f{}", idx)), idx as u64 + 1);
            file.set_content(crate::hash::hash_bytes([byte]));
            file.set_size(1);
            dir.put_child(Node::File(file)).unwrap();
        }
        dir.rehash();
        dir.content_hash()
    };
    build(false) == build(true)
}
