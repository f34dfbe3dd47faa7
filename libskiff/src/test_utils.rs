use crate::error::SkiffResult;
use crate::hash::{hash_bytes, ContentHash};
use crate::linker::Linker;
use crate::node::Directory;
use crate::path::CatalogPath;

pub fn p(s: &str) -> CatalogPath {
    CatalogPath::new(s)
}

/// the content address a blob with these bytes would get
pub fn h(content: &str) -> ContentHash {
    hash_bytes(content.as_bytes())
}

pub fn stage(lkr: &mut Linker, path: &str, content: &str) -> SkiffResult<()> {
    lkr.stage_file(p(path), h(content), content.len() as u64, vec![])
}

/// stages `files` and seals them into a single commit
pub fn commit_files(lkr: &mut Linker, files: &[(&str, &str)]) -> SkiffResult<ContentHash> {
    for (path, content) in files {
        stage(lkr, path, content)?;
    }
    let author = lkr.owner().to_owned();
    lkr.make_commit(author, "generated commit")
}

/// `(src, dst)` linkers whose shared history ends at a commit containing
/// `files`; the fork stands in for a fetched remote snapshot
pub fn ancestral_pair(files: &[(&str, &str)]) -> SkiffResult<(Linker, Linker)> {
    let mut src = Linker::new("alice");
    if !files.is_empty() {
        commit_files(&mut src, files)?;
    }
    let dst = src.fork("bob");
    Ok((src, dst))
}

/// checks that every directory hash in the linker's staging tree is the
/// merkle of its live children
pub fn assert_merkle_consistent(lkr: &Linker) {
    fn check(dir: &Directory) {
        for child in dir.children() {
            if let crate::node::Node::Directory(subdir) = child {
                check(subdir);
            }
        }
        let mut copy = dir.clone();
        copy.rehash();
        assert_eq!(
            copy.content_hash(),
            dir.content_hash(),
            "stale merkle hash at `{}`",
            dir.path()
        );
    }
    check(lkr.lookup_directory(&CatalogPath::root()).unwrap());
}

/// checks that every live path resolves to exactly one non-ghost node
/// (the children maps make duplicates impossible, so this asserts that no
/// ghost shadows a live node and that paths are internally consistent)
pub fn assert_live_paths_consistent(lkr: &Linker) {
    for info in lkr.list(&CatalogPath::root(), None).unwrap() {
        let node = lkr.lookup_live(&info.path).unwrap();
        assert_eq!(node.path(), &info.path);
        assert!(!node.is_ghost());
    }
}
