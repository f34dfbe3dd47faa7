use crate::error::{SkiffError, SkiffResult};
use crate::hash::ContentHash;
use crate::io::{ReadExt, WriteExt};
use crate::node::{Commit, Directory, File, Ghost, MergeMarker, Node};
use crate::path::CatalogPath;
use crate::serialize::{Deserialize, Serialize, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::{BTreeSet, VecDeque};
use std::io::{BufRead, Write};


const SNAPSHOT_MAGIC: &[u8; 4] = b"SKIF";

/// where a `(peer, remote head)` pair was last integrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEntry {
    pub remote_head: ContentHash,
    pub merged_in: ContentHash,
}

/// a row of `Linker::list`
#[derive(Debug, Clone, PartialEq)]
pub struct StatInfo {
    pub path: CatalogPath,
    pub hash: ContentHash,
    pub size: u64,
    pub inode: u64,
    pub is_dir: bool,
    pub depth: usize,
    pub mod_time: DateTime<Utc>,
}

impl StatInfo {
    fn of(node: &Node) -> Self {
        Self {
            path: node.path().clone(),
            hash: node.content_hash(),
            size: match node {
                Node::File(file) => file.size(),
                _ => 0,
            },
            inode: node.inode(),
            is_dir: node.is_directory(),
            depth: node.path().depth(),
            mod_time: node.mod_time(),
        }
    }
}

/// the per-peer catalog: HEAD, the staging tree, the inode allocator and the
/// merge-marker table. All tree mutation goes through here so ancestor hashes
/// stay consistent and every call is transactional.
#[derive(Clone)]
pub struct Linker {
    owner: String,
    // the parent chain, oldest first; the last entry is HEAD
    commits: Vec<Commit>,
    // committed root trees by root hash, so ancestor trees stay reachable
    trees: FxHashMap<ContentHash, Directory>,
    // the working tree; starts out as a copy of HEAD's root
    staging: Directory,
    staged: BTreeSet<CatalogPath>,
    inode_counter: u64,
    merge_markers: FxHashMap<String, MarkerEntry>,
    // set by `set_merge_marker`, consumed by the next `make_commit`
    pending_marker: Option<MergeMarker>,
}

impl Linker {
    pub fn new(owner: impl Into<String>) -> Self {
        let owner = owner.into();
        let mut inode_counter = 0;
        let root_inode = inode_counter;
        inode_counter += 1;
        let staging = Directory::new(CatalogPath::root(), root_inode);

        let commit_inode = inode_counter;
        inode_counter += 1;
        let init = Commit::new(
            ContentHash::UNKNOWN,
            staging.content_hash(),
            &owner,
            "init",
            None,
            commit_inode,
        );

        let mut trees = FxHashMap::default();
        trees.insert(staging.content_hash(), staging.clone());

        Self {
            owner,
            commits: vec![init],
            trees,
            staging,
            staged: BTreeSet::new(),
            inode_counter,
            merge_markers: FxHashMap::default(),
            pending_marker: None,
        }
    }

    /// an owner-rebranded deep copy; the local stand-in for fetching a
    /// remote peer's store snapshot
    pub fn fork(&self, new_owner: impl Into<String>) -> Self {
        Self { owner: new_owner.into(), ..self.clone() }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn head(&self) -> &Commit {
        self.commits.last().expect("a linker always has its init commit")
    }

    pub fn history(&self) -> &[Commit] {
        &self.commits
    }

    pub fn commit_by_hash(&self, hash: ContentHash) -> Option<&Commit> {
        self.commits.iter().find(|commit| commit.hash() == hash)
    }

    /// the committed root tree for `root_hash`
    pub fn root_tree(&self, root_hash: ContentHash) -> Option<&Directory> {
        self.trees.get(&root_hash)
    }

    pub fn head_tree(&self) -> &Directory {
        self.trees
            .get(&self.head().root_hash())
            .expect("every committed root hash has its tree retained")
    }

    pub fn next_inode(&mut self) -> u64 {
        let inode = self.inode_counter;
        self.inode_counter += 1;
        inode
    }

    pub fn have_staged_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn staged_paths(&self) -> impl Iterator<Item = &CatalogPath> {
        self.staged.iter()
    }

    // === lookups (all against the staging tree) ===

    /// resolves `path` to a node, ghosts included. The root directory itself
    /// is not addressable as a child node.
    pub fn lookup_node(&self, path: &CatalogPath) -> SkiffResult<&Node> {
        if path.is_root() {
            bail!(SkiffError::BadNode(path.clone()));
        }
        self.staging
            .node_at(path)
            .ok_or_else(|| anyhow!(SkiffError::NoSuchFile(path.clone())))
    }

    /// like [`Linker::lookup_node`] but ghosts count as absent
    pub fn lookup_live(&self, path: &CatalogPath) -> SkiffResult<&Node> {
        let node = self.lookup_node(path)?;
        if node.is_ghost() {
            bail!(SkiffError::NoSuchFile(path.clone()));
        }
        Ok(node)
    }

    pub fn lookup_directory(&self, path: &CatalogPath) -> SkiffResult<&Directory> {
        if path.is_root() {
            return Ok(&self.staging);
        }
        match self.lookup_live(path)? {
            Node::Directory(dir) => Ok(dir),
            _ => bail!(SkiffError::NotADirectory(path.clone())),
        }
    }

    /// first live node with the given content hash in breadth-first name
    /// order; used by the resolver to detect moves
    pub fn lookup_by_hash(&self, hash: ContentHash) -> Option<&Node> {
        self.staging.find_by_hash(hash)
    }

    /// live nodes under `prefix` (inclusive walk, name order within each
    /// directory), at most `max_depth` levels below it
    pub fn list(&self, prefix: &CatalogPath, max_depth: Option<usize>) -> SkiffResult<Vec<StatInfo>> {
        let dir = self.lookup_directory(prefix)?;
        let mut entries = vec![];
        let mut queue: VecDeque<&Directory> = VecDeque::new();
        queue.push_back(dir);
        while let Some(dir) = queue.pop_front() {
            for child in dir.live_children() {
                let depth = child.path().depth() - prefix.depth();
                if matches!(max_depth, Some(max) if depth > max) {
                    continue;
                }
                entries.push(StatInfo::of(child));
                if let Node::Directory(subdir) = child {
                    queue.push_back(subdir);
                }
            }
        }
        Ok(entries)
    }

    // === mutators (transactional per call) ===

    /// runs `f` against the staging area; on error the staging state is
    /// restored to what it was before the call
    fn with_rollback<T>(&mut self, f: impl FnOnce(&mut Self) -> SkiffResult<T>) -> SkiffResult<T> {
        let staging = self.staging.clone();
        let staged = self.staged.clone();
        let inode_counter = self.inode_counter;
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.staging = staging;
                self.staged = staged;
                self.inode_counter = inode_counter;
                Err(err)
            }
        }
    }

    /// attaches a freshly constructed node under its parent directory;
    /// rejects a live occupant with `Exists`
    pub fn add_child(&mut self, node: Node) -> SkiffResult<()> {
        self.with_rollback(|lkr| lkr.attach(node, false))
    }

    /// inserts or updates `node` at its path, replacing whatever is there
    pub fn stage_node(&mut self, node: Node) -> SkiffResult<()> {
        self.with_rollback(|lkr| lkr.attach(node, true))
    }

    fn attach(&mut self, node: Node, replace: bool) -> SkiffResult<()> {
        let parent_path = node.parent_path()?;
        let path = node.path().clone();
        trace!("Linker::attach({}, replace: {})", path, replace);
        self.ensure_directory(&parent_path)?;
        let parent = self
            .staging
            .dir_at_mut(&parent_path)
            .expect("presence checked by ensure_directory");
        if replace { parent.put_child(node)? } else { parent.insert_child(node)? }
        self.note_change(&path);
        Ok(())
    }

    /// creates or updates the file at `path` with the given content address,
    /// creating missing parent directories
    pub fn stage_file(
        &mut self,
        path: CatalogPath,
        hash: ContentHash,
        size: u64,
        key: Vec<u8>,
    ) -> SkiffResult<()> {
        self.with_rollback(|lkr| {
            debug!("Linker::stage_file({}, {})", path, hash);
            let existing = lkr.staging.live_node_at(&path).cloned();
            let mut file = match existing {
                Some(node) => node.into_file()?,
                None => {
                    if let Some(parent) = path.parent() {
                        if !parent.is_root() && lkr.staging.dir_at(&parent).is_none() {
                            lkr.mkdir_inner(&parent, true)?;
                        }
                    }
                    File::new(path.clone(), lkr.next_inode())
                }
            };
            file.set_content(hash);
            file.set_size(size);
            file.set_key(key);
            lkr.attach(Node::File(file), true)
        })
    }

    pub fn mkdir(&mut self, path: &CatalogPath, create_parents: bool) -> SkiffResult<()> {
        self.with_rollback(|lkr| {
            if path.is_root() || lkr.staging.live_node_at(path).is_some() {
                bail!(SkiffError::Exists(path.clone()));
            }
            lkr.mkdir_inner(path, create_parents)
        })
    }

    fn mkdir_inner(&mut self, path: &CatalogPath, create_parents: bool) -> SkiffResult<()> {
        let mut current = CatalogPath::root();
        let components: Vec<String> = path.components().map(str::to_owned).collect();
        let last = components.len() - 1;
        for (idx, name) in components.into_iter().enumerate() {
            current = current.join(name);
            match self.staging.live_node_at(&current) {
                Some(Node::Directory(..)) => continue,
                Some(..) => bail!(SkiffError::NotADirectory(current.clone())),
                None if idx == last || create_parents => {
                    let dir = Directory::new(current.clone(), self.next_inode());
                    self.attach(Node::Directory(dir), false)?;
                }
                None => bail!(SkiffError::NoSuchFile(current.clone())),
            }
        }
        Ok(())
    }

    /// removes the live node at `path`, leaving a ghost in its place so the
    /// history survives
    pub fn remove_node(&mut self, path: &CatalogPath) -> SkiffResult<Ghost> {
        self.with_rollback(|lkr| {
            debug!("Linker::remove_node({})", path);
            if path.is_root() {
                bail!(SkiffError::BadNode(path.clone()));
            }
            lkr.lookup_live(path)?;
            let parent_path = path.parent().expect("non-root path has a parent");
            let parent = lkr
                .staging
                .dir_at_mut(&parent_path)
                .expect("lookup_live already resolved the parent chain");
            let node = parent.take_child(path.name())?;
            let ghost = Ghost::entomb(node)?;
            parent.put_child(Node::Ghost(ghost.clone()))?;
            lkr.note_change(path);
            Ok(ghost)
        })
    }

    /// moves the live node at `from` to `to`, preserving its inode and
    /// ghost-stamping the vacated path
    pub fn move_node(&mut self, from: &CatalogPath, to: &CatalogPath) -> SkiffResult<()> {
        self.with_rollback(|lkr| {
            debug!("Linker::move_node({} -> {})", from, to);
            if from.is_root() || to.is_root() || to.starts_with(from) {
                bail!(SkiffError::BadNode(to.clone()));
            }
            lkr.lookup_live(from)?;
            if lkr.staging.live_node_at(to).is_some() {
                bail!(SkiffError::Exists(to.clone()));
            }
            let to_parent = to.parent().expect("non-root path has a parent");
            lkr.ensure_directory(&to_parent)?;

            let from_parent = from.parent().expect("non-root path has a parent");
            let parent = lkr
                .staging
                .dir_at_mut(&from_parent)
                .expect("lookup_live already resolved the parent chain");
            let mut node = parent.take_child(from.name())?;
            let ghost = Ghost::entomb(node.clone())?;
            parent.put_child(Node::Ghost(ghost))?;
            lkr.note_change(from);

            node.set_path(to.clone());
            node.touch();
            let dest = lkr
                .staging
                .dir_at_mut(&to_parent)
                .expect("presence checked by ensure_directory");
            dest.insert_child(node)?;
            lkr.note_change(to);
            Ok(())
        })
    }

    pub fn set_merge_marker(&mut self, peer: impl Into<String>, hash: ContentHash) {
        let marker = MergeMarker { with_peer: peer.into(), with_hash: hash };
        debug!("Linker::set_merge_marker({})", marker);
        self.pending_marker = Some(marker);
    }

    pub fn merge_marker(&self, peer: &str) -> Option<&MarkerEntry> {
        self.merge_markers.get(peer)
    }

    /// seals the staging area into a commit and advances HEAD;
    /// `NothingToCommit` when staging is clean
    pub fn make_commit(
        &mut self,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> SkiffResult<ContentHash> {
        if !self.have_staged_changes() {
            bail!(SkiffError::NothingToCommit);
        }
        let root_hash = self.staging.content_hash();
        let inode = self.next_inode();
        let marker = self.pending_marker.take();
        let commit =
            Commit::new(self.head().hash(), root_hash, author, message, marker.clone(), inode);
        let hash = commit.hash();
        info!("Linker::make_commit() -> {:#} (root {:#})", hash, root_hash);

        self.trees.insert(root_hash, self.staging.clone());
        if let Some(marker) = marker {
            self.merge_markers.insert(
                marker.with_peer,
                MarkerEntry { remote_head: marker.with_hash, merged_in: hash },
            );
        }
        self.commits.push(commit);
        self.staged.clear();
        Ok(hash)
    }

    // === internals ===

    fn ensure_directory(&self, path: &CatalogPath) -> SkiffResult<()> {
        if path.is_root() {
            return Ok(());
        }
        match self.staging.live_node_at(path) {
            Some(Node::Directory(..)) => Ok(()),
            Some(..) => bail!(SkiffError::NotADirectory(path.clone())),
            None => bail!(SkiffError::NoSuchFile(path.clone())),
        }
    }

    /// records the staged path and recomputes the hashes of every directory
    /// on the way up to the root
    fn note_change(&mut self, path: &CatalogPath) {
        self.staged.insert(path.clone());
        let mut chain: SmallVec<[CatalogPath; 6]> = smallvec![];
        let mut current = path.parent();
        while let Some(dir_path) = current {
            current = dir_path.parent();
            chain.push(dir_path);
        }
        // deepest first so parents see the refreshed child hashes
        for dir_path in chain {
            if let Some(dir) = self.staging.dir_at_mut(&dir_path) {
                dir.rehash();
            }
        }
    }
}

impl Serialize for Linker {
    fn serialize(&self, writer: &mut dyn Write) -> SkiffResult<()> {
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_u8(SCHEMA_VERSION)?;
        writer.write_text(&self.owner)?;
        writer.write_u64(self.inode_counter)?;

        writer.write_u32(self.commits.len() as u32)?;
        for commit in &self.commits {
            Node::Commit(commit.clone()).serialize(writer)?;
        }

        writer.write_u32(self.trees.len() as u32)?;
        // name order is irrelevant here but keep the output deterministic
        let mut roots: Vec<&Directory> = self.trees.values().collect();
        roots.sort_by_key(|dir| *dir.content_hash().as_bytes());
        for root in roots {
            Node::Directory(root.clone()).serialize(writer)?;
        }

        Node::Directory(self.staging.clone()).serialize(writer)?;

        writer.write_u32(self.staged.len() as u32)?;
        for path in &self.staged {
            writer.write_text(path.as_str())?;
        }

        let mut peers: Vec<&String> = self.merge_markers.keys().collect();
        peers.sort();
        writer.write_u32(peers.len() as u32)?;
        for peer in peers {
            let entry = &self.merge_markers[peer];
            writer.write_text(peer)?;
            writer.write_hash(entry.remote_head)?;
            writer.write_hash(entry.merged_in)?;
        }

        match &self.pending_marker {
            Some(marker) => {
                writer.write_u8(1)?;
                writer.write_text(&marker.with_peer)?;
                writer.write_hash(marker.with_hash)?;
            }
            None => writer.write_u8(0)?,
        }
        Ok(())
    }
}

impl Deserialize for Linker {
    fn deserialize(reader: &mut impl BufRead) -> SkiffResult<Self> {
        let magic = reader.read_bytes(SNAPSHOT_MAGIC.len())?;
        ensure!(magic.as_slice() == &SNAPSHOT_MAGIC[..], "not a skiff catalog snapshot");
        let version = reader.read_u8()?;
        ensure!(version == SCHEMA_VERSION, "unsupported snapshot schema version `{}`", version);

        let owner = reader.read_text()?;
        let inode_counter = reader.read_u64()?;

        let commit_count = reader.read_u32()?;
        let mut commits = Vec::with_capacity(commit_count as usize);
        for _ in 0..commit_count {
            match Node::deserialize(reader)? {
                Node::Commit(commit) => commits.push(commit),
                node => bail!(SkiffError::UnexpectedNodeType(node.node_type())),
            }
        }
        ensure!(!commits.is_empty(), "catalog snapshot has no commits");

        let tree_count = reader.read_u32()?;
        let mut trees = FxHashMap::default();
        for _ in 0..tree_count {
            match Node::deserialize(reader)? {
                Node::Directory(dir) => {
                    trees.insert(dir.content_hash(), dir);
                }
                node => bail!(SkiffError::UnexpectedNodeType(node.node_type())),
            }
        }

        let staging = match Node::deserialize(reader)? {
            Node::Directory(dir) => dir,
            node => bail!(SkiffError::UnexpectedNodeType(node.node_type())),
        };

        let staged_count = reader.read_u32()?;
        let mut staged = BTreeSet::new();
        for _ in 0..staged_count {
            staged.insert(CatalogPath::new(reader.read_text()?));
        }

        let marker_count = reader.read_u32()?;
        let mut merge_markers = FxHashMap::default();
        for _ in 0..marker_count {
            let peer = reader.read_text()?;
            let remote_head = reader.read_hash()?;
            let merged_in = reader.read_hash()?;
            merge_markers.insert(peer, MarkerEntry { remote_head, merged_in });
        }

        let pending_marker = match reader.read_u8()? {
            0 => None,
            _ => Some(MergeMarker {
                with_peer: reader.read_text()?,
                with_hash: reader.read_hash()?,
            }),
        };

        Ok(Self {
            owner,
            commits,
            trees,
            staging,
            staged,
            inode_counter,
            merge_markers,
            pending_marker,
        })
    }
}
